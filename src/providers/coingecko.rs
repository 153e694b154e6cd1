//! CoinGecko `simple/price` client for crypto quotes.

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::core::currency::{BASE_CURRENCY, CurrencyCategory, CurrencyCode};
use crate::core::error::Result;
use crate::providers::{
    PairQuotes, RateProvider, build_client, classify_request_error, malformed,
};

const PROVIDER: &str = "CoinGecko";

pub struct CoinGeckoProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        Ok(CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: build_client(timeout)?,
        })
    }
}

#[async_trait]
impl RateProvider for CoinGeckoProvider {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    fn authority(&self) -> CurrencyCategory {
        CurrencyCategory::Crypto
    }

    #[instrument(name = "CoinGeckoFetch", skip(self))]
    async fn fetch_quotes(&self) -> Result<PairQuotes> {
        let ids: Vec<&str> = CurrencyCode::CRYPTO
            .iter()
            .filter_map(CurrencyCode::coingecko_id)
            .collect();
        let url = format!(
            "{}/api/v3/simple/price?ids={}&vs_currencies=usd",
            self.base_url,
            ids.join(",")
        );
        debug!("Requesting crypto rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify_request_error(PROVIDER, e))?
            .error_for_status()
            .map_err(|e| classify_request_error(PROVIDER, e))?;

        // {"bitcoin": {"usd": 76929.0}, ...}
        let body: HashMap<String, HashMap<String, f64>> = response
            .json()
            .await
            .map_err(|e| classify_request_error(PROVIDER, e))?;

        let mut quotes = PairQuotes::new();
        for code in CurrencyCode::CRYPTO {
            let Some(id) = code.coingecko_id() else {
                continue;
            };
            let Some(value) = body.get(id).and_then(|prices| prices.get("usd")) else {
                continue;
            };
            match Decimal::from_f64(*value).filter(|rate| rate.is_sign_positive() && !rate.is_zero()) {
                Some(rate) => {
                    quotes.insert((code, BASE_CURRENCY), rate);
                }
                None => warn!(coin = id, value, "Discarding unusable CoinGecko quote"),
            }
        }

        if quotes.is_empty() {
            return Err(malformed(PROVIDER, "response contained no usable quotes"));
        }
        debug!("Fetched {} crypto rates", quotes.len());
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::CoreError;
    use rust_decimal_macros::dec;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn mock_server(body: &str, status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v3/simple/price"))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_fetch_parses_covered_coins() {
        let server = mock_server(
            r#"{"bitcoin":{"usd":76929.0},"ethereum":{"usd":3720.0},"solana":{"usd":145.5},"ripple":{"usd":0.58}}"#,
            200,
        )
        .await;
        let provider =
            CoinGeckoProvider::new(&server.uri(), Duration::from_secs(5)).unwrap();

        let quotes = provider.fetch_quotes().await.unwrap();
        assert_eq!(quotes.len(), 4);
        assert_eq!(
            quotes[&(CurrencyCode::BTC, CurrencyCode::USD)],
            dec!(76929.0)
        );
        assert_eq!(quotes[&(CurrencyCode::XRP, CurrencyCode::USD)], dec!(0.58));
    }

    #[tokio::test]
    async fn test_partial_coverage_is_not_an_error() {
        let server = mock_server(r#"{"bitcoin":{"usd":76929.0}}"#, 200).await;
        let provider =
            CoinGeckoProvider::new(&server.uri(), Duration::from_secs(5)).unwrap();

        let quotes = provider.fetch_quotes().await.unwrap();
        assert_eq!(quotes.len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_is_unavailable() {
        let server = mock_server("rate limited", 429).await;
        let provider =
            CoinGeckoProvider::new(&server.uri(), Duration::from_secs(5)).unwrap();

        assert!(matches!(
            provider.fetch_quotes().await,
            Err(CoreError::ProviderUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_garbage_body_is_malformed() {
        let server = mock_server("<html>not json</html>", 200).await;
        let provider =
            CoinGeckoProvider::new(&server.uri(), Duration::from_secs(5)).unwrap();

        assert!(matches!(
            provider.fetch_quotes().await,
            Err(CoreError::ProviderMalformedResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_usable_quotes_is_malformed() {
        let server = mock_server(r#"{"dogecoin":{"usd":0.2}}"#, 200).await;
        let provider =
            CoinGeckoProvider::new(&server.uri(), Duration::from_secs(5)).unwrap();

        assert!(matches!(
            provider.fetch_quotes().await,
            Err(CoreError::ProviderMalformedResponse { .. })
        ));
    }
}
