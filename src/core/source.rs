//! Rate source abstraction

use crate::core::error::RateError;
use crate::core::rates::{Provider, RawRates};
use async_trait::async_trait;

/// A provider of pair rates quoted against the configured base currency.
///
/// Implementations issue their request once, honour the configured timeout and
/// never retry; retrying is left to whoever drives the update.
#[async_trait]
pub trait RateSource: Send + Sync {
    fn provider(&self) -> Provider;

    async fn fetch_rates(&self) -> Result<RawRates, RateError>;
}
