//! ExchangeRate-API client for fiat quotes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::currency::{BASE_CURRENCY, CurrencyCategory, CurrencyCode};
use crate::core::error::Result;
use crate::providers::{
    PairQuotes, RateProvider, build_client, classify_request_error, malformed, unavailable,
};

const PROVIDER: &str = "ExchangeRate-API";

pub struct ExchangeRateApiProvider {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self> {
        Ok(ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    #[serde(default)]
    conversion_rates: HashMap<String, f64>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn authority(&self) -> CurrencyCategory {
        CurrencyCategory::Fiat
    }

    #[instrument(name = "ExchangeRateApiFetch", skip(self))]
    async fn fetch_quotes(&self) -> Result<PairQuotes> {
        if self.api_key.is_empty() {
            return Err(unavailable(
                PROVIDER,
                "API key not configured; set EXCHANGERATE_API_KEY or the config file",
            ));
        }

        let url = format!("{}/v6/{}/latest/{}", self.base_url, self.api_key, BASE_CURRENCY);
        debug!("Requesting fiat rates");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_request_error(PROVIDER, e))?
            .error_for_status()
            .map_err(|e| classify_request_error(PROVIDER, e))?;

        let body: LatestResponse = response
            .json()
            .await
            .map_err(|e| classify_request_error(PROVIDER, e))?;

        if body.result != "success" {
            let reason = body.error_type.unwrap_or_else(|| "unknown error".to_string());
            return Err(unavailable(PROVIDER, reason));
        }

        // The API quotes units of X per 1 USD; the snapshot wants X → USD.
        let mut quotes = PairQuotes::new();
        for code in CurrencyCode::FIAT {
            if code == BASE_CURRENCY {
                continue;
            }
            let Some(per_usd) = body.conversion_rates.get(code.as_str()) else {
                continue;
            };
            match Decimal::from_f64(*per_usd)
                .filter(|rate| rate.is_sign_positive() && !rate.is_zero())
            {
                Some(rate) => {
                    quotes.insert((code, BASE_CURRENCY), Decimal::ONE / rate);
                }
                None => warn!(currency = %code, per_usd, "Discarding unusable fiat quote"),
            }
        }

        if quotes.is_empty() {
            return Err(malformed(PROVIDER, "response contained no usable quotes"));
        }
        debug!("Fetched {} fiat rates", quotes.len());
        Ok(quotes)
    }
}
