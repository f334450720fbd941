use anyhow::{Context, Result};
use std::path::Path;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{
    EnvFilter, Layer, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

pub const LOG_FILE_NAME: &str = "actions.log";

/// Console logging, plus a daily-rotated INFO log under `log_dir` when one is given.
///
/// The returned guard flushes the file writer on drop and must be held until exit.
pub fn init_logging(verbose: bool, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    // WARN floor: corrupt cache files and failed ticks must reach the console
    let (level_filter, level) = if verbose {
        (LevelFilter::DEBUG, "debug")
    } else {
        (LevelFilter::WARN, "warn")
    };
    let app_filter = Targets::new().with_target("ratehub", level_filter);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let console_layer = fmt::layer()
        .compact()
        .with_target(false)
        .with_filter(app_filter)
        .with_filter(env_filter);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let (layer, guard) = file_layer(dir)?;
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Plain-text INFO layer writing to `dir/actions.log.<date>`.
pub fn file_layer<S>(dir: &Path) -> Result<(impl Layer<S>, WorkerGuard)>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let layer = fmt::layer()
        .with_ansi(false)
        .with_target(true)
        .with_writer(writer)
        .with_filter(Targets::new().with_target("ratehub", LevelFilter::INFO));
    Ok((layer, guard))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_file_layer_records_info_and_above() {
        let dir = TempDir::new().unwrap();
        let log_dir = dir.path().join("logs");
        let (layer, guard) = file_layer(&log_dir).unwrap();
        let subscriber = tracing_subscriber::registry().with(layer);

        tracing::subscriber::with_default(subscriber, || {
            tracing::info!("Scheduled update stored rates");
            tracing::error!("Scheduled update failed");
            tracing::debug!("Request details");
        });
        drop(guard);

        let files: Vec<_> = std::fs::read_dir(&log_dir)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);
        let name = files[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with(LOG_FILE_NAME));

        let contents = std::fs::read_to_string(&files[0]).unwrap();
        assert!(contents.contains("Scheduled update stored rates"));
        assert!(contents.contains("Scheduled update failed"));
        assert!(!contents.contains("Request details"));
    }
}
