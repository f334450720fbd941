//! Error types for rate acquisition, storage and lookup

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RateError {
    /// A single source failed: transport, status or payload problem.
    #[error("API request to {provider} failed: {reason}")]
    Api { provider: String, reason: String },

    #[error("Unknown rate source: {0}")]
    UnknownSource(String),

    #[error("All rate sources are unavailable. Errors: {}", .0.join("; "))]
    AllSourcesFailed(Vec<String>),

    #[error("Failed to persist rates: {0}")]
    Persistence(String),

    #[error("Rates are stale. TTL: {ttl_seconds} seconds. Last refresh: {last_refresh}")]
    Stale {
        ttl_seconds: u64,
        last_refresh: String,
    },

    #[error("Rate {from}->{to} is unavailable")]
    RateUnavailable { from: String, to: String },

    #[error("Unknown currency '{0}'")]
    CurrencyNotFound(String),

    #[error("Invalid currency code '{0}'")]
    InvalidCurrencyCode(String),
}

impl RateError {
    pub fn api(provider: impl Into<String>, reason: impl ToString) -> Self {
        RateError::Api {
            provider: provider.into(),
            reason: reason.to_string(),
        }
    }

    /// Errors carried by a run result, if any.
    pub fn source_errors(&self) -> &[String] {
        match self {
            RateError::AllSourcesFailed(errors) => errors,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_message_carries_context() {
        let err = RateError::Stale {
            ttl_seconds: 300,
            last_refresh: "2025-10-10T12:00:00+00:00".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("300"));
        assert!(msg.contains("2025-10-10T12:00:00+00:00"));
    }

    #[test]
    fn test_all_sources_failed_lists_errors() {
        let err = RateError::AllSourcesFailed(vec!["coingecko: down".into(), "exchangerate: down".into()]);
        assert_eq!(
            err.to_string(),
            "All rate sources are unavailable. Errors: coingecko: down; exchangerate: down"
        );
        assert_eq!(err.source_errors().len(), 2);
    }
}
