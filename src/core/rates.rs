//! Rate table, history record and provider identity types

use crate::core::config::ParserConfig;
use crate::core::error::RateError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;

pub const UNKNOWN_SOURCE: &str = "unknown";

/// Identity of an external price provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub enum Provider {
    CoinGecko,
    ExchangeRate,
}

impl Provider {
    pub const ALL: [Provider; 2] = [Provider::CoinGecko, Provider::ExchangeRate];

    /// Selector name accepted on the command line and recorded in `sources_used`.
    pub fn id(&self) -> &'static str {
        match self {
            Provider::CoinGecko => "coingecko",
            Provider::ExchangeRate => "exchangerate",
        }
    }

    /// Human readable label used for pair provenance.
    pub fn label(&self) -> &'static str {
        match self {
            Provider::CoinGecko => "CoinGecko",
            Provider::ExchangeRate => "ExchangeRate-API",
        }
    }
}

impl Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for Provider {
    type Err = RateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Provider::ALL
            .into_iter()
            .find(|p| p.id().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RateError::UnknownSource(s.to_string()))
    }
}

/// Raw rates as returned by a single source, keyed by `FROM_TO`.
pub type RawRates = BTreeMap<String, f64>;

pub fn pair_key(from: &str, to: &str) -> String {
    format!("{from}_{to}")
}

pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    pair.split_once('_')
        .filter(|(from, to)| !from.is_empty() && !to.is_empty())
}

pub fn inverse_pair_key(pair: &str) -> Option<String> {
    split_pair(pair).map(|(from, to)| pair_key(to, from))
}

/// Provenance label for a fetched pair, based on which tracked list its base side is in.
pub fn source_for_pair(pair: &str, config: &ParserConfig) -> String {
    let currency = split_pair(pair).map_or(pair, |(from, _)| from);
    if config.crypto_currencies.iter().any(|c| c == currency) {
        Provider::CoinGecko.label().to_string()
    } else if config.fiat_currencies.iter().any(|c| c == currency) {
        Provider::ExchangeRate.label().to_string()
    } else {
        UNKNOWN_SOURCE.to_string()
    }
}

pub fn derived_source(origin_pair: &str) -> String {
    format!("calculated from {origin_pair}")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PairRate {
    pub rate: f64,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RatesMeta {
    #[serde(default)]
    pub sources_used: Vec<String>,
    #[serde(default)]
    pub errors_encountered: Option<Vec<String>>,
}

/// Snapshot written to the current-rates file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    #[serde(default)]
    pub pairs: BTreeMap<String, PairRate>,
    #[serde(default)]
    pub last_refresh: Option<String>,
    #[serde(default)]
    pub meta: RatesMeta,
}

impl RateTable {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty() && self.last_refresh.is_none()
    }

    pub fn get(&self, from: &str, to: &str) -> Option<&PairRate> {
        self.pairs.get(&pair_key(from, to))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMeta {
    pub record_id: String,
    pub status_code: u16,
}

/// One append-only entry of the history log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub id: String,
    pub from_currency: String,
    pub to_currency: String,
    pub rate: f64,
    pub timestamp: String,
    pub source: String,
    pub meta: HistoryMeta,
}

impl HistoryRecord {
    pub fn record_id(from: &str, to: &str, timestamp: &str) -> String {
        let sanitized = timestamp.replace([':', '+'], "-");
        format!("{from}_{to}_{sanitized}")
    }
}

/// Outcome of one aggregation run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    pub success: bool,
    /// Pairs fetched from providers.
    pub rates_count: usize,
    /// Pairs persisted, derived inverses included.
    pub pairs_stored: usize,
    pub last_refresh: Option<String>,
    pub errors: Vec<String>,
}

impl UpdateResult {
    pub fn rejected(error: String) -> Self {
        Self {
            success: false,
            errors: vec![error],
            ..Default::default()
        }
    }
}
