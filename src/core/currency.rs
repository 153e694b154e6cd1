//! The closed set of supported currencies.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use crate::core::error::CoreError;

/// The base currency every trade settles against.
pub const BASE_CURRENCY: CurrencyCode = CurrencyCode::USD;

/// Supported currency codes. The set is fixed; adding a currency is a code
/// change, not a runtime one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CurrencyCode {
    USD,
    EUR,
    RUB,
    GBP,
    JPY,
    BTC,
    ETH,
    SOL,
    XRP,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencyCategory {
    Fiat,
    Crypto,
}

impl CurrencyCode {
    pub const ALL: [CurrencyCode; 9] = [
        CurrencyCode::USD,
        CurrencyCode::EUR,
        CurrencyCode::RUB,
        CurrencyCode::GBP,
        CurrencyCode::JPY,
        CurrencyCode::BTC,
        CurrencyCode::ETH,
        CurrencyCode::SOL,
        CurrencyCode::XRP,
    ];

    pub const FIAT: [CurrencyCode; 5] = [
        CurrencyCode::USD,
        CurrencyCode::EUR,
        CurrencyCode::RUB,
        CurrencyCode::GBP,
        CurrencyCode::JPY,
    ];

    pub const CRYPTO: [CurrencyCode; 4] = [
        CurrencyCode::BTC,
        CurrencyCode::ETH,
        CurrencyCode::SOL,
        CurrencyCode::XRP,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CurrencyCode::USD => "USD",
            CurrencyCode::EUR => "EUR",
            CurrencyCode::RUB => "RUB",
            CurrencyCode::GBP => "GBP",
            CurrencyCode::JPY => "JPY",
            CurrencyCode::BTC => "BTC",
            CurrencyCode::ETH => "ETH",
            CurrencyCode::SOL => "SOL",
            CurrencyCode::XRP => "XRP",
        }
    }

    pub fn category(&self) -> CurrencyCategory {
        match self {
            CurrencyCode::USD
            | CurrencyCode::EUR
            | CurrencyCode::RUB
            | CurrencyCode::GBP
            | CurrencyCode::JPY => CurrencyCategory::Fiat,
            CurrencyCode::BTC | CurrencyCode::ETH | CurrencyCode::SOL | CurrencyCode::XRP => {
                CurrencyCategory::Crypto
            }
        }
    }

    pub fn is_crypto(&self) -> bool {
        self.category() == CurrencyCategory::Crypto
    }

    /// CoinGecko coin identifier, for crypto codes only.
    pub fn coingecko_id(&self) -> Option<&'static str> {
        match self {
            CurrencyCode::BTC => Some("bitcoin"),
            CurrencyCode::ETH => Some("ethereum"),
            CurrencyCode::SOL => Some("solana"),
            CurrencyCode::XRP => Some("ripple"),
            _ => None,
        }
    }
}

impl Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CurrencyCode {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "USD" => Ok(CurrencyCode::USD),
            "EUR" => Ok(CurrencyCode::EUR),
            "RUB" => Ok(CurrencyCode::RUB),
            "GBP" => Ok(CurrencyCode::GBP),
            "JPY" => Ok(CurrencyCode::JPY),
            "BTC" => Ok(CurrencyCode::BTC),
            "ETH" => Ok(CurrencyCode::ETH),
            "SOL" => Ok(CurrencyCode::SOL),
            "XRP" => Ok(CurrencyCode::XRP),
            other => Err(CoreError::UnknownCurrency(other.to_string())),
        }
    }
}
