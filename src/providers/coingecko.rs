use super::util::get_json;
use crate::core::rates::pair_key;
use crate::core::{ParserConfig, Provider, RateError, RateSource, RawRates};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// `{"bitcoin": {"usd": 59337.21}, ...}`
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

/// Crypto prices from the CoinGecko simple price endpoint.
pub struct CoinGeckoClient {
    config: Arc<ParserConfig>,
}

impl CoinGeckoClient {
    pub fn new(config: Arc<ParserConfig>) -> Self {
        Self { config }
    }

    /// Provider ids for every tracked crypto code that has a mapping, in tracking order.
    fn resolve_ids(&self) -> Vec<(&str, &str)> {
        self.config
            .crypto_currencies
            .iter()
            .filter_map(|code| match self.config.crypto_id_map.get(code) {
                Some(id) => Some((code.as_str(), id.as_str())),
                None => {
                    warn!(code = %code, "No CoinGecko id mapped for currency, skipping");
                    None
                }
            })
            .collect()
    }
}

#[async_trait]
impl RateSource for CoinGeckoClient {
    fn provider(&self) -> Provider {
        Provider::CoinGecko
    }

    #[instrument(name = "CoinGeckoFetch", skip(self))]
    async fn fetch_rates(&self) -> Result<RawRates, RateError> {
        let ids = self.resolve_ids();
        if ids.is_empty() {
            warn!("No crypto currencies to request from CoinGecko");
            return Ok(RawRates::new());
        }

        let base = &self.config.base_currency;
        let quote = base.to_lowercase();
        let ids_param = ids.iter().map(|(_, id)| *id).collect::<Vec<_>>().join(",");
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.config.coingecko_url, ids_param, quote
        );
        debug!("Requesting crypto rates from {}", url);

        let data: SimplePriceResponse =
            get_json(self.provider(), &url, self.config.request_timeout).await?;

        let mut rates = RawRates::new();
        for (code, id) in ids {
            match data.get(id).and_then(|prices| prices.get(&quote)) {
                Some(rate) if *rate <= 0.0 => {
                    warn!(code = %code, rate = *rate, "Non-positive CoinGecko price, skipping");
                }
                Some(rate) => {
                    let pair = pair_key(code, base);
                    debug!("Received rate {}: {}", pair, rate);
                    rates.insert(pair, *rate);
                }
                None => warn!(code = %code, id = %id, "CoinGecko response has no price"),
            }
        }

        info!("CoinGecko: fetched {} rates", rates.len());
        Ok(rates)
    }
}
