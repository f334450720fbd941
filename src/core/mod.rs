//! Core rate abstractions and types

pub mod config;
pub mod currency;
pub mod error;
pub mod freshness;
pub mod log;
pub mod rates;
pub mod source;

// Re-export main types for cleaner imports
pub use config::{AppConfig, ParserConfig};
pub use currency::{Currency, CurrencyRegistry};
pub use error::RateError;
pub use freshness::check_freshness;
pub use rates::{PairRate, Provider, RateTable, RawRates, UpdateResult};
pub use source::RateSource;
