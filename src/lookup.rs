//! Read side of the rate cache used by trading logic

use crate::core::{CurrencyRegistry, ParserConfig, RateError, RateTable, check_freshness};
use crate::store::RateStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

#[derive(Debug, Clone, PartialEq)]
pub struct RateQuote {
    pub from: String,
    pub to: String,
    pub rate: f64,
    pub inverse_rate: f64,
    pub updated_at: String,
    pub source: String,
}

pub struct RateLookup {
    config: Arc<ParserConfig>,
    store: RateStore,
    registry: CurrencyRegistry,
}

impl RateLookup {
    pub fn new(config: Arc<ParserConfig>, store: RateStore) -> Self {
        let registry = CurrencyRegistry::from_config(&config);
        Self {
            config,
            store,
            registry,
        }
    }

    pub fn registry(&self) -> &CurrencyRegistry {
        &self.registry
    }

    pub fn base_currency(&self) -> &str {
        &self.config.base_currency
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.config.rates_ttl_seconds
    }

    /// The full persisted table, empty when nothing has been stored yet.
    pub fn current_table(&self) -> RateTable {
        self.store.load_current_rates()
    }

    pub fn get_rate(&self, from: &str, to: &str) -> Result<RateQuote, RateError> {
        self.get_rate_at(from, to, Utc::now())
    }

    /// Freshness-checked lookup of a single pair as of `now`.
    pub fn get_rate_at(&self, from: &str, to: &str, now: DateTime<Utc>) -> Result<RateQuote, RateError> {
        let from = self.registry.get(from)?.code().to_string();
        let to = self.registry.get(to)?.code().to_string();

        let table = self.store.load_current_rates();
        check_freshness(table.last_refresh.as_deref(), self.config.rates_ttl_seconds, now)?;

        let entry = table.get(&from, &to).ok_or_else(|| RateError::RateUnavailable {
            from: from.clone(),
            to: to.clone(),
        })?;
        debug!(from = %from, to = %to, rate = entry.rate, "Rate lookup hit");

        let updated_at = if entry.updated_at.is_empty() {
            table.last_refresh.clone().unwrap_or_else(|| "unknown".to_string())
        } else {
            entry.updated_at.clone()
        };

        Ok(RateQuote {
            inverse_rate: if entry.rate > 0.0 { 1.0 / entry.rate } else { 0.0 },
            rate: entry.rate,
            source: entry.source.clone(),
            updated_at,
            from,
            to,
        })
    }
}
