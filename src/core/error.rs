//! Failure taxonomy for the trading core.
//!
//! Every failure is a typed value returned to the caller; nothing is
//! silently truncated or substituted with a default. Validation failures
//! are raised before any mutation is attempted.

use rust_decimal::Decimal;
use thiserror::Error;

use crate::core::currency::CurrencyCode;
use crate::store::StoreError;

pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown currency '{0}'")]
    UnknownCurrency(String),

    #[error("amount must be a positive number, got '{0}'")]
    InvalidAmount(String),

    #[error("no {0} wallet exists; one is created on the first credit of {0}")]
    NoSuchWallet(CurrencyCode),

    #[error("insufficient funds: available {available} {currency}, requested {requested} {currency}")]
    InsufficientFunds {
        currency: CurrencyCode,
        available: Decimal,
        requested: Decimal,
    },

    #[error("no exchange-rate snapshot has been installed yet; run a refresh first")]
    NoCurrentSnapshot,

    #[error("no rate for {from}/{to} in the current snapshot, directly or via USD")]
    RateUnavailable {
        from: CurrencyCode,
        to: CurrencyCode,
    },

    #[error("{0} is the settlement currency and cannot be bought or sold against itself")]
    BaseCurrencyTrade(CurrencyCode),

    #[error("provider {provider} unavailable: {reason}")]
    ProviderUnavailable { provider: String, reason: String },

    #[error("provider {provider} returned a malformed response: {reason}")]
    ProviderMalformedResponse { provider: String, reason: String },

    #[error("rate ingestion failed, all providers errored: {0}")]
    IngestionFailed(String),

    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
}

/// Parses a user-supplied amount string. Non-numeric input is an
/// `InvalidAmount`, same as a non-positive value.
pub fn parse_amount(raw: &str) -> Result<Decimal> {
    let amount: Decimal = raw
        .trim()
        .parse()
        .map_err(|_| CoreError::InvalidAmount(raw.trim().to_string()))?;
    ensure_positive(amount)?;
    Ok(amount)
}

pub fn ensure_positive(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(CoreError::InvalidAmount(amount.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_amount_accepts_positive_decimals() {
        assert_eq!(parse_amount("0.05").unwrap(), dec!(0.05));
        assert_eq!(parse_amount(" 10000.00 ").unwrap(), dec!(10000.00));
    }

    #[test]
    fn test_parse_amount_rejects_non_numeric() {
        assert!(matches!(
            parse_amount("lots"),
            Err(CoreError::InvalidAmount(raw)) if raw == "lots"
        ));
    }

    #[test]
    fn test_parse_amount_rejects_non_positive() {
        assert!(matches!(parse_amount("0"), Err(CoreError::InvalidAmount(_))));
        assert!(matches!(
            parse_amount("-3.5"),
            Err(CoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_insufficient_funds_carries_both_figures() {
        let err = CoreError::InsufficientFunds {
            currency: CurrencyCode::BTC,
            available: dec!(0.03),
            requested: dec!(100),
        };
        let text = err.to_string();
        assert!(text.contains("0.03"));
        assert!(text.contains("100"));
        assert!(text.contains("BTC"));
    }
}
