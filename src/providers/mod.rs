//! External quote sources, normalized to `pair → rate` maps.

pub mod coingecko;
pub mod exchange_rate_api;

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::time::Duration;

use crate::core::currency::CurrencyCategory;
use crate::core::error::{CoreError, Result};
use crate::core::snapshot::PairKey;

/// One provider call's worth of normalized quotes.
pub type PairQuotes = HashMap<PairKey, Decimal>;

/// A source of exchange-rate quotes covering a subset of the currency set.
///
/// Implementations make exactly one fetch attempt per call; retrying a
/// failed cycle is the scheduler's decision, never the provider's.
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// The currency category this provider is authoritative for when two
    /// providers report the same pair.
    fn authority(&self) -> CurrencyCategory;

    async fn fetch_quotes(&self) -> Result<PairQuotes>;
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("valutatrade/0.2")
        .timeout(timeout)
        .build()
        .map_err(|e| CoreError::ProviderUnavailable {
            provider: "http".to_string(),
            reason: e.to_string(),
        })
}

/// Transport-level failures are `ProviderUnavailable`; a body that arrives
/// but cannot be decoded is `ProviderMalformedResponse`. A timeout counts
/// as unavailable, same as a refused connection.
pub(crate) fn classify_request_error(provider: &'static str, err: reqwest::Error) -> CoreError {
    if err.is_decode() {
        CoreError::ProviderMalformedResponse {
            provider: provider.to_string(),
            reason: err.to_string(),
        }
    } else {
        CoreError::ProviderUnavailable {
            provider: provider.to_string(),
            reason: err.to_string(),
        }
    }
}

pub(crate) fn malformed(provider: &'static str, reason: impl Into<String>) -> CoreError {
    CoreError::ProviderMalformedResponse {
        provider: provider.to_string(),
        reason: reason.into(),
    }
}

pub(crate) fn unavailable(provider: &'static str, reason: impl Into<String>) -> CoreError {
    CoreError::ProviderUnavailable {
        provider: provider.to_string(),
        reason: reason.into(),
    }
}
