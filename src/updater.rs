//! Polls the configured rate sources and persists the merged pair table

use crate::core::rates::{RatesMeta, derived_source, inverse_pair_key, source_for_pair};
use crate::core::{
    PairRate, ParserConfig, Provider, RateError, RateSource, RateTable, RawRates, UpdateResult,
};
use crate::providers;
use crate::store::RateStore;
use chrono::{SecondsFormat, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Coordinates one update run across the selected sources.
pub struct RatesUpdater {
    config: Arc<ParserConfig>,
    store: RateStore,
    sources: Vec<Box<dyn RateSource>>,
}

impl RatesUpdater {
    pub fn new(config: Arc<ParserConfig>, store: RateStore) -> Self {
        let sources = providers::default_sources(&config);
        Self::with_sources(config, store, sources)
    }

    pub fn with_sources(
        config: Arc<ParserConfig>,
        store: RateStore,
        sources: Vec<Box<dyn RateSource>>,
    ) -> Self {
        Self {
            config,
            store,
            sources,
        }
    }

    pub fn store(&self) -> &RateStore {
        &self.store
    }

    /// Runs one update against every source, or only against `source` when given.
    ///
    /// A failing source is recorded in the result and does not stop the others.
    /// When every selected source fails, or the results cannot be persisted,
    /// the run fails and the stored snapshot is left as it was.
    pub async fn run_update(&self, source: Option<&str>) -> Result<UpdateResult, RateError> {
        info!("Starting rates update...");
        let selected = match self.select_sources(source) {
            Ok(selected) => selected,
            Err(e) => {
                error!("{}", e);
                return Ok(UpdateResult::rejected(e.to_string()));
            }
        };

        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, false);
        let mut raw_rates = RawRates::new();
        let mut errors = Vec::new();

        for client in &selected {
            let provider = client.provider();
            info!("Fetching rates from {}...", provider);
            match client.fetch_rates().await {
                Ok(rates) => {
                    info!("{}: OK ({} rates)", provider, rates.len());
                    raw_rates.extend(rates);
                }
                Err(e) => {
                    let message = format!("Failed to fetch rates from {provider}: {e}");
                    error!("{}", message);
                    errors.push(message);
                }
            }
        }

        raw_rates.retain(|pair, rate| {
            let positive = *rate > 0.0;
            if !positive {
                warn!(pair = %pair, rate = *rate, "Dropping non-positive rate");
            }
            positive
        });

        if raw_rates.is_empty() && !errors.is_empty() {
            return Err(RateError::AllSourcesFailed(errors));
        }

        let pairs = self.build_pairs(&raw_rates, &timestamp);
        let table = RateTable {
            pairs,
            last_refresh: Some(timestamp.clone()),
            meta: RatesMeta {
                sources_used: selected.iter().map(|s| s.provider().id().to_string()).collect(),
                errors_encountered: (!errors.is_empty()).then(|| errors.clone()),
            },
        };

        self.store
            .save_current_rates(&table)
            .and_then(|_| self.store.save_to_history(&raw_rates, &timestamp))
            .map_err(|e| {
                let err = RateError::Persistence(format!("{e:#}"));
                error!("{}", err);
                err
            })?;

        info!(
            "Update finished. Stored {} pairs ({} fetched).",
            table.pairs.len(),
            raw_rates.len()
        );
        Ok(UpdateResult {
            success: true,
            rates_count: raw_rates.len(),
            pairs_stored: table.pairs.len(),
            last_refresh: Some(timestamp),
            errors,
        })
    }

    fn select_sources(&self, source: Option<&str>) -> Result<Vec<&dyn RateSource>, RateError> {
        let Some(name) = source else {
            return Ok(self.sources.iter().map(|s| s.as_ref()).collect());
        };
        info!("Updating from a single source: {}", name);
        let provider: Provider = name.parse()?;
        let selected: Vec<&dyn RateSource> = self
            .sources
            .iter()
            .filter(|s| s.provider() == provider)
            .map(|s| s.as_ref())
            .collect();
        if selected.is_empty() {
            return Err(RateError::UnknownSource(name.to_string()));
        }
        Ok(selected)
    }

    /// Fetched pairs with provenance, plus the inverse of each one that was not fetched itself.
    fn build_pairs(&self, raw_rates: &RawRates, timestamp: &str) -> BTreeMap<String, PairRate> {
        let mut pairs: BTreeMap<String, PairRate> = raw_rates
            .iter()
            .map(|(pair, rate)| {
                let entry = PairRate {
                    rate: *rate,
                    updated_at: timestamp.to_string(),
                    source: source_for_pair(pair, &self.config),
                };
                (pair.clone(), entry)
            })
            .collect();

        for (pair, rate) in raw_rates {
            let Some(inverse) = inverse_pair_key(pair) else {
                warn!(pair = %pair, "Cannot derive inverse of malformed pair");
                continue;
            };
            if raw_rates.contains_key(&inverse) {
                continue;
            }
            pairs.insert(
                inverse,
                PairRate {
                    rate: 1.0 / rate,
                    updated_at: timestamp.to_string(),
                    source: derived_source(pair),
                },
            );
        }

        pairs
    }
}
