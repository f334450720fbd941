pub mod disk;

use crate::core::rates::{HistoryMeta, HistoryRecord, RawRates, source_for_pair, split_pair};
use crate::core::{ParserConfig, RateTable};
use anyhow::{Result, anyhow};
use disk::{JsonFile, read_json, write_json_atomic};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

const HISTORY_STATUS_CODE: u16 = 200;

/// File-backed store for the current rate snapshot and the append-only history log.
///
/// Every write goes through [`write_json_atomic`], so concurrent readers never
/// observe a partially written file. Missing or corrupt files read as empty.
#[derive(Clone)]
pub struct RateStore {
    config: Arc<ParserConfig>,
}

impl RateStore {
    pub fn new(config: Arc<ParserConfig>) -> Self {
        Self { config }
    }

    pub fn rates_file(&self) -> &Path {
        &self.config.rates_file
    }

    pub fn history_file(&self) -> &Path {
        &self.config.history_file
    }

    /// Replaces the current snapshot with `table`.
    pub fn save_current_rates(&self, table: &RateTable) -> Result<()> {
        write_json_atomic(self.rates_file(), table)?;
        info!(
            pairs = table.pairs.len(),
            "Current rates saved to {}",
            self.rates_file().display()
        );
        Ok(())
    }

    /// Appends one record per raw rate to the history log and returns how many were added.
    pub fn save_to_history(&self, rates: &RawRates, timestamp: &str) -> Result<usize> {
        let mut history = self.load_history_entries();

        for (pair, rate) in rates {
            let (from, to) =
                split_pair(pair).ok_or_else(|| anyhow!("Malformed currency pair: {pair}"))?;
            let record = HistoryRecord {
                id: HistoryRecord::record_id(from, to, timestamp),
                from_currency: from.to_string(),
                to_currency: to.to_string(),
                rate: *rate,
                timestamp: timestamp.to_string(),
                source: source_for_pair(pair, &self.config),
                meta: HistoryMeta {
                    record_id: short_record_id(),
                    status_code: HISTORY_STATUS_CODE,
                },
            };
            history.push(serde_json::to_value(record)?);
        }

        write_json_atomic(self.history_file(), &history)?;
        debug!("Appended {} records to history", rates.len());
        Ok(rates.len())
    }

    /// Returns the last persisted snapshot, or an empty table.
    pub fn load_current_rates(&self) -> RateTable {
        match read_json::<RateTable>(self.rates_file()) {
            JsonFile::Loaded(table) => table,
            JsonFile::Missing => {
                debug!("No current rates file at {}", self.rates_file().display());
                RateTable::default()
            }
            JsonFile::Corrupt(reason) => {
                warn!("Could not load current rates: {}", reason);
                RateTable::default()
            }
        }
    }

    /// Typed view of the history log; entries of another shape are skipped.
    pub fn load_history(&self) -> Vec<HistoryRecord> {
        self.load_history_entries()
            .into_iter()
            .filter_map(|entry| match serde_json::from_value(entry) {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!("Skipping unrecognised history entry: {}", e);
                    None
                }
            })
            .collect()
    }

    // Untyped so that entries written by other versions survive a rewrite
    fn load_history_entries(&self) -> Vec<serde_json::Value> {
        match read_json::<Vec<serde_json::Value>>(self.history_file()) {
            JsonFile::Loaded(entries) => entries,
            JsonFile::Missing => Vec::new(),
            JsonFile::Corrupt(reason) => {
                warn!(
                    "History file {} is corrupt, starting a new log: {}",
                    self.history_file().display(),
                    reason
                );
                Vec::new()
            }
        }
    }
}

fn short_record_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()[..8].to_string()
}
