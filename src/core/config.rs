use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const API_KEY_ENV: &str = "EXCHANGERATE_API_KEY";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateProviderConfig {
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    #[serde(default = "default_coingecko")]
    pub coingecko: CoinGeckoProviderConfig,
    #[serde(default = "default_exchangerate")]
    pub exchangerate: ExchangeRateProviderConfig,
}

fn default_coingecko() -> CoinGeckoProviderConfig {
    CoinGeckoProviderConfig {
        base_url: "https://api.coingecko.com/api/v3".to_string(),
    }
}

fn default_exchangerate() -> ExchangeRateProviderConfig {
    ExchangeRateProviderConfig {
        base_url: "https://v6.exchangerate-api.com/v6".to_string(),
        api_key: None,
    }
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: default_coingecko(),
            exchangerate: default_exchangerate(),
        }
    }
}

fn default_base_currency() -> String {
    "USD".to_string()
}

fn default_fiat_currencies() -> Vec<String> {
    vec!["EUR".into(), "GBP".into(), "RUB".into()]
}

fn default_crypto_currencies() -> Vec<String> {
    vec!["BTC".into(), "ETH".into(), "SOL".into()]
}

fn default_crypto_id_map() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("BTC".to_string(), "bitcoin".to_string()),
        ("ETH".to_string(), "ethereum".to_string()),
        ("SOL".to_string(), "solana".to_string()),
    ])
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_rates_ttl_seconds() -> u64 {
    300
}

fn default_update_interval_minutes() -> u64 {
    60
}

/// On-disk configuration as written by the user.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_base_currency")]
    pub base_currency: String,
    #[serde(default = "default_fiat_currencies")]
    pub fiat_currencies: Vec<String>,
    #[serde(default = "default_crypto_currencies")]
    pub crypto_currencies: Vec<String>,
    #[serde(default = "default_crypto_id_map")]
    pub crypto_id_map: BTreeMap<String, String>,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_rates_ttl_seconds")]
    pub rates_ttl_seconds: u64,
    #[serde(default = "default_update_interval_minutes")]
    pub update_interval_minutes: u64,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub data_path: Option<String>,
    pub rates_file: Option<String>,
    pub history_file: Option<String>,
    /// Directory for the rotated `actions.log`; no file logging when unset.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "ratehub", "ratehub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn default_data_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.data_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("dev", "ratehub", "ratehub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().to_path_buf())
    }

    /// Log directory from the config file, if it can be read at all.
    ///
    /// Used before logging is set up, so read failures are left for the command to report.
    pub fn peek_log_dir(config_path: Option<&str>) -> Option<PathBuf> {
        let config = match config_path {
            Some(path) => Self::load_from_path(path),
            None => Self::load(),
        };
        config.ok()?.log_dir.map(PathBuf::from)
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

/// Validated, read-once settings handed to every rate component.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub base_currency: String,
    pub fiat_currencies: Vec<String>,
    pub crypto_currencies: Vec<String>,
    pub crypto_id_map: BTreeMap<String, String>,
    pub request_timeout: Duration,
    pub rates_ttl_seconds: u64,
    pub update_interval: Duration,
    pub coingecko_url: String,
    pub exchangerate_url: String,
    pub exchangerate_api_key: String,
    pub rates_file: PathBuf,
    pub history_file: PathBuf,
}

impl ParserConfig {
    /// Builds the settings, resolving the fiat API key from the environment first.
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Self::with_api_key(config, std::env::var(API_KEY_ENV).ok())
    }

    pub fn with_api_key(config: &AppConfig, env_key: Option<String>) -> Result<Self> {
        let api_key = resolve_api_key(env_key, config.providers.exchangerate.api_key.as_deref())?;
        if config.update_interval_minutes == 0 {
            bail!("update_interval_minutes must be greater than zero");
        }
        let update_interval_secs = config
            .update_interval_minutes
            .checked_mul(60)
            .context("update_interval_minutes is too large")?;

        let data_path = config.default_data_path()?;
        let rates_file = config
            .rates_file
            .as_ref()
            .map_or_else(|| data_path.join("rates.json"), PathBuf::from);
        let history_file = config
            .history_file
            .as_ref()
            .map_or_else(|| data_path.join("exchange_rates.json"), PathBuf::from);

        let normalize = |codes: &[String]| -> Vec<String> {
            codes.iter().map(|c| c.trim().to_uppercase()).collect()
        };

        Ok(Self {
            base_currency: config.base_currency.trim().to_uppercase(),
            fiat_currencies: normalize(&config.fiat_currencies),
            crypto_currencies: normalize(&config.crypto_currencies),
            crypto_id_map: config
                .crypto_id_map
                .iter()
                .map(|(code, id)| (code.trim().to_uppercase(), id.clone()))
                .collect(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            rates_ttl_seconds: config.rates_ttl_seconds,
            update_interval: Duration::from_secs(update_interval_secs),
            coingecko_url: config.providers.coingecko.base_url.trim_end_matches('/').to_string(),
            exchangerate_url: config
                .providers
                .exchangerate
                .base_url
                .trim_end_matches('/')
                .to_string(),
            exchangerate_api_key: api_key,
            rates_file,
            history_file,
        })
    }

    /// Tracks EUR and BTC against USD, with both providers and files pointed at test locations.
    #[cfg(test)]
    pub(crate) fn new_for_test(base_url: &str, data_dir: &std::path::Path) -> Self {
        Self {
            base_currency: "USD".to_string(),
            fiat_currencies: vec!["EUR".to_string()],
            crypto_currencies: vec!["BTC".to_string()],
            crypto_id_map: BTreeMap::from([("BTC".to_string(), "bitcoin".to_string())]),
            request_timeout: Duration::from_secs(2),
            rates_ttl_seconds: 300,
            update_interval: Duration::from_secs(3600),
            coingecko_url: format!("{base_url}/api/v3"),
            exchangerate_url: format!("{base_url}/v6"),
            exchangerate_api_key: "test-key".to_string(),
            rates_file: data_dir.join("rates.json"),
            history_file: data_dir.join("exchange_rates.json"),
        }
    }
}

fn resolve_api_key(env_key: Option<String>, file_key: Option<&str>) -> Result<String> {
    let key = env_key
        .filter(|k| !k.trim().is_empty())
        .or_else(|| file_key.map(str::to_string).filter(|k| !k.trim().is_empty()));
    match key {
        Some(key) => Ok(key.trim().to_string()),
        None => bail!(
            "ExchangeRate-API key not found. Set the '{API_KEY_ENV}' environment variable or providers.exchangerate.api_key"
        ),
    }
}
