use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratehub::core::config::AppConfig;
use ratehub::core::log::init_logging;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl From<Commands> for ratehub::AppCommand {
    fn from(cmd: Commands) -> ratehub::AppCommand {
        match cmd {
            Commands::UpdateRates { source } => ratehub::AppCommand::UpdateRates { source },
            Commands::ShowRates { currency, top } => {
                ratehub::AppCommand::ShowRates { currency, top }
            }
            Commands::GetRate { from, to } => ratehub::AppCommand::GetRate { from, to },
            Commands::Schedule { interval_minutes } => {
                ratehub::AppCommand::Schedule { interval_minutes }
            }
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Fetch rates from the providers and store them
    UpdateRates {
        /// Only query this provider (coingecko or exchangerate)
        #[arg(short, long)]
        source: Option<String>,
    },
    /// Display the stored rate table
    ShowRates {
        /// Only show pairs involving this currency
        #[arg(long)]
        currency: Option<String>,
        /// Keep the N highest crypto rates against the base currency
        #[arg(long)]
        top: Option<usize>,
    },
    /// Look up a single rate, refusing stale data
    GetRate {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },
    /// Refresh rates periodically until interrupted
    Schedule {
        /// Override the configured update interval
        #[arg(short, long)]
        interval_minutes: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_dir = AppConfig::peek_log_dir(cli.config_path.as_deref());
    let _log_guard = init_logging(cli.verbose, log_dir.as_deref())?;

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => ratehub::cli::setup::setup_at_path(path),
            None => ratehub::cli::setup::setup(),
        },
        Some(cmd) => ratehub::run_command(cmd.into(), cli.config_path.as_deref()).await,
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
