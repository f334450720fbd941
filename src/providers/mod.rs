pub mod coingecko;
pub mod exchangerate;
pub mod util;

use crate::core::{ParserConfig, RateSource};
use std::sync::Arc;

pub use coingecko::CoinGeckoClient;
pub use exchangerate::ExchangeRateClient;

/// All configured sources, in polling order.
pub fn default_sources(config: &Arc<ParserConfig>) -> Vec<Box<dyn RateSource>> {
    vec![
        Box::new(CoinGeckoClient::new(Arc::clone(config))),
        Box::new(ExchangeRateClient::new(Arc::clone(config))),
    ]
}
