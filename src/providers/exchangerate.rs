use super::util::get_json;
use crate::core::rates::pair_key;
use crate::core::{ParserConfig, Provider, RateError, RateSource, RawRates};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    /// Units of each currency per one unit of the base.
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

/// Fiat rates from the ExchangeRate-API "latest" endpoint.
pub struct ExchangeRateClient {
    config: Arc<ParserConfig>,
}

impl ExchangeRateClient {
    pub fn new(config: Arc<ParserConfig>) -> Self {
        Self { config }
    }
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    fn provider(&self) -> Provider {
        Provider::ExchangeRate
    }

    #[instrument(name = "ExchangeRateFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<RawRates, RateError> {
        let base = &self.config.base_currency;
        let url = format!(
            "{}/{}/latest/{}",
            self.config.exchangerate_url, self.config.exchangerate_api_key, base
        );
        debug!(
            "Requesting fiat rates from {}/***/latest/{}",
            self.config.exchangerate_url, base
        );

        let data: LatestRatesResponse =
            get_json(self.provider(), &url, self.config.request_timeout).await?;

        if data.result != "success" {
            return Err(RateError::api(
                self.provider().label(),
                format!(
                    "API returned an error: {}",
                    data.error_type.as_deref().unwrap_or("unknown")
                ),
            ));
        }

        let mut rates = RawRates::new();
        for currency in &self.config.fiat_currencies {
            match data.conversion_rates.get(currency) {
                // Provider quotes base->currency; the pair is currency->base
                Some(per_base) if *per_base > 0.0 => {
                    let pair = pair_key(currency, base);
                    let rate = 1.0 / per_base;
                    debug!("Received rate {}: {}", pair, rate);
                    rates.insert(pair, rate);
                }
                Some(per_base) => {
                    warn!(currency = %currency, rate = per_base, "Ignoring non-positive rate");
                }
                None => warn!(currency = %currency, "Currency not found in ExchangeRate-API response"),
            }
        }

        info!("ExchangeRate-API: fetched {} rates", rates.len());
        Ok(rates)
    }
}
