pub mod cli;
pub mod core;
pub mod lookup;
pub mod providers;
pub mod scheduler;
pub mod store;
pub mod updater;

use crate::core::config::{AppConfig, ParserConfig};
use crate::lookup::RateLookup;
use crate::scheduler::RateScheduler;
use crate::store::RateStore;
use crate::updater::RatesUpdater;
use anyhow::{Context, Result, bail};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

pub enum AppCommand {
    UpdateRates {
        source: Option<String>,
    },
    ShowRates {
        currency: Option<String>,
        top: Option<usize>,
    },
    GetRate {
        from: String,
        to: String,
    },
    Schedule {
        interval_minutes: Option<u64>,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Ratehub starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    let config = Arc::new(ParserConfig::from_app_config(&config)?);
    debug!(
        base = %config.base_currency,
        fiat = ?config.fiat_currencies,
        crypto = ?config.crypto_currencies,
        rates_file = %config.rates_file.display(),
        "Loaded config"
    );

    let store = RateStore::new(Arc::clone(&config));

    match command {
        AppCommand::UpdateRates { source } => {
            let updater = RatesUpdater::new(config, store);
            cli::update::update_rates(&updater, source.as_deref()).await
        }
        AppCommand::ShowRates { currency, top } => {
            let lookup = RateLookup::new(config, store);
            cli::rates::show_rates(&lookup, currency.as_deref(), top)
        }
        AppCommand::GetRate { from, to } => {
            let lookup = RateLookup::new(config, store);
            cli::rates::get_rate(&lookup, &from, &to)
        }
        AppCommand::Schedule { interval_minutes } => {
            let interval = match interval_minutes {
                Some(0) => bail!("--interval-minutes must be greater than zero"),
                Some(minutes) => minutes
                    .checked_mul(60)
                    .map(Duration::from_secs)
                    .context("--interval-minutes is too large")?,
                None => config.update_interval,
            };
            let updater = Arc::new(RatesUpdater::new(config, store));
            let scheduler = RateScheduler::new(updater, interval);
            cli::schedule::run_until_interrupted(&scheduler).await
        }
    }
}
