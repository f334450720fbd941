//! Currency registry used to validate codes before a rate lookup

use crate::core::config::ParserConfig;
use crate::core::error::RateError;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Currency {
    Fiat {
        code: String,
        name: String,
        issuing_country: String,
    },
    Crypto {
        code: String,
        name: String,
        algorithm: String,
    },
}

impl Currency {
    pub fn code(&self) -> &str {
        match self {
            Currency::Fiat { code, .. } | Currency::Crypto { code, .. } => code,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Currency::Fiat { name, .. } | Currency::Crypto { name, .. } => name,
        }
    }

    pub fn is_crypto(&self) -> bool {
        matches!(self, Currency::Crypto { .. })
    }

    pub fn display_info(&self) -> String {
        match self {
            Currency::Fiat {
                code,
                name,
                issuing_country,
            } => format!("[FIAT] {code} - {name} (Issuing: {issuing_country})"),
            Currency::Crypto {
                code,
                name,
                algorithm,
            } => format!("[CRYPTO] {code} - {name} (Algo: {algorithm})"),
        }
    }
}

// (code, name, issuing country)
const FIAT_CATALOGUE: &[(&str, &str, &str)] = &[
    ("USD", "US Dollar", "United States"),
    ("EUR", "Euro", "European Union"),
    ("GBP", "British Pound", "United Kingdom"),
    ("RUB", "Russian Ruble", "Russia"),
    ("JPY", "Japanese Yen", "Japan"),
    ("CNY", "Chinese Yuan", "China"),
    ("CHF", "Swiss Franc", "Switzerland"),
    ("INR", "Indian Rupee", "India"),
];

// (code, name, algorithm)
const CRYPTO_CATALOGUE: &[(&str, &str, &str)] = &[
    ("BTC", "Bitcoin", "SHA-256"),
    ("ETH", "Ethereum", "Ethash"),
    ("SOL", "Solana", "Proof of History"),
    ("XRP", "Ripple", "XRP Ledger"),
];

/// Normalizes a user supplied code and checks its shape.
pub fn normalize_code(code: &str) -> Result<String, RateError> {
    let code = code.trim().to_uppercase();
    let valid = (2..=5).contains(&code.len()) && code.chars().all(|c| c.is_ascii_alphanumeric());
    if !valid {
        return Err(RateError::InvalidCurrencyCode(code));
    }
    Ok(code)
}

/// Currencies the application knows about: the base, tracked fiat and tracked crypto codes.
#[derive(Debug, Clone, Default)]
pub struct CurrencyRegistry {
    currencies: BTreeMap<String, Currency>,
}

impl CurrencyRegistry {
    pub fn from_config(config: &ParserConfig) -> Self {
        let mut registry = Self::default();
        let fiat_codes = std::iter::once(&config.base_currency).chain(&config.fiat_currencies);
        for code in fiat_codes {
            let (name, country) = FIAT_CATALOGUE
                .iter()
                .find(|(c, _, _)| c == code)
                .map_or((code.as_str(), "Unknown"), |(_, n, i)| (*n, *i));
            registry.insert(Currency::Fiat {
                code: code.clone(),
                name: name.to_string(),
                issuing_country: country.to_string(),
            });
        }
        for code in &config.crypto_currencies {
            let (name, algorithm) = CRYPTO_CATALOGUE
                .iter()
                .find(|(c, _, _)| c == code)
                .map_or((code.as_str(), "Unknown"), |(_, n, a)| (*n, *a));
            registry.insert(Currency::Crypto {
                code: code.clone(),
                name: name.to_string(),
                algorithm: algorithm.to_string(),
            });
        }
        registry
    }

    fn insert(&mut self, currency: Currency) {
        self.currencies.insert(currency.code().to_string(), currency);
    }

    pub fn get(&self, code: &str) -> Result<&Currency, RateError> {
        let code = normalize_code(code)?;
        self.currencies
            .get(&code)
            .ok_or(RateError::CurrencyNotFound(code))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Currency> {
        self.currencies.values()
    }
}
