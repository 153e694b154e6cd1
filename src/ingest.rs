//! One refresh cycle: fetch, reconcile, persist, install.

use chrono::{DateTime, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::currency::CurrencyCategory;
use crate::core::error::{CoreError, Result};
use crate::core::rates::RateCache;
use crate::core::snapshot::{PairKey, RateSnapshot};
use crate::providers::{PairQuotes, RateProvider};
use crate::store::DataStore;

/// Reciprocal-drift tolerance: |rate(A,B) * rate(B,A) - 1| above this is
/// reported as provider disagreement. 0.01 = 1%.
const RECIPROCAL_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// What one refresh cycle produced, for the scheduler's log line.
#[derive(Debug)]
pub struct RefreshOutcome {
    pub as_of: DateTime<Utc>,
    pub pair_count: usize,
    pub provider_errors: Vec<String>,
}

impl RefreshOutcome {
    pub fn is_partial(&self) -> bool {
        !self.provider_errors.is_empty()
    }
}

pub struct RateIngestor {
    providers: Vec<Box<dyn RateProvider>>,
    cache: Arc<RateCache>,
    store: Arc<DataStore>,
}

impl RateIngestor {
    pub fn new(
        providers: Vec<Box<dyn RateProvider>>,
        cache: Arc<RateCache>,
        store: Arc<DataStore>,
    ) -> Self {
        RateIngestor {
            providers,
            cache,
            store,
        }
    }

    /// Runs one ingestion cycle: exactly one attempt per provider, merge by
    /// category authority, last-known-good on total failure.
    ///
    /// A non-empty partial merge is installed as-is; the cache copes with
    /// the missing pairs via triangulation and fails explicitly where that
    /// is impossible.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        info!("Starting rates refresh");
        let fetches = self.providers.iter().map(|provider| async move {
            (
                provider.name(),
                provider.authority(),
                provider.fetch_quotes().await,
            )
        });

        let mut merged: HashMap<PairKey, (Decimal, CurrencyCategory)> = HashMap::new();
        let mut provider_errors = Vec::new();
        for (name, authority, result) in join_all(fetches).await {
            match result {
                Ok(quotes) => {
                    info!(provider = name, pairs = quotes.len(), "Provider fetch ok");
                    merge_quotes(&mut merged, quotes, authority);
                }
                Err(err) => {
                    warn!(provider = name, error = %err, "Provider fetch failed");
                    provider_errors.push(format!("{name}: {err}"));
                }
            }
        }

        if merged.is_empty() {
            // Never install a partial or empty snapshot over a good one.
            return Err(CoreError::IngestionFailed(provider_errors.join("; ")));
        }

        let pairs: HashMap<PairKey, Decimal> = merged
            .into_iter()
            .map(|(pair, (rate, _))| (pair, rate))
            .collect();
        warn_on_reciprocal_drift(&pairs);

        let snapshot = RateSnapshot::new(Utc::now(), pairs);
        let outcome = RefreshOutcome {
            as_of: snapshot.as_of,
            pair_count: snapshot.pair_count(),
            provider_errors,
        };

        // History first: a snapshot is only current once it is also durable.
        self.store.append_snapshot(&snapshot)?;
        self.cache.install(snapshot);
        info!(
            pairs = outcome.pair_count,
            partial = outcome.is_partial(),
            "Refresh complete"
        );
        Ok(outcome)
    }
}

/// Which provider category owns a pair: any crypto leg makes the crypto
/// provider authoritative, fiat-fiat pairs belong to the fiat provider.
fn preferred_authority((from, to): PairKey) -> CurrencyCategory {
    if from.is_crypto() || to.is_crypto() {
        CurrencyCategory::Crypto
    } else {
        CurrencyCategory::Fiat
    }
}

/// Merges one provider's quotes into the accumulator. The authoritative
/// provider for a pair's category always wins; quotes are never averaged,
/// so a lagging provider cannot drag a healthy one toward its numbers.
fn merge_quotes(
    merged: &mut HashMap<PairKey, (Decimal, CurrencyCategory)>,
    quotes: PairQuotes,
    authority: CurrencyCategory,
) {
    for (pair, rate) in quotes {
        match merged.entry(pair) {
            Entry::Vacant(slot) => {
                slot.insert((rate, authority));
            }
            Entry::Occupied(mut slot) => {
                let preferred = preferred_authority(pair);
                if authority == preferred && slot.get().1 != preferred {
                    warn!(
                        from = %pair.0,
                        to = %pair.1,
                        "Overriding non-authoritative quote"
                    );
                    slot.insert((rate, authority));
                }
            }
        }
    }
}

fn warn_on_reciprocal_drift(pairs: &HashMap<PairKey, Decimal>) {
    for (&(from, to), &rate) in pairs {
        if from >= to {
            continue; // each unordered pair once
        }
        if let Some(&back) = pairs.get(&(to, from)) {
            let drift = (rate * back - Decimal::ONE).abs();
            if drift > RECIPROCAL_TOLERANCE {
                warn!(%from, %to, %drift, "Reciprocal rates disagree beyond tolerance");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use async_trait::async_trait;
    use chrono::Duration;
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    struct StaticProvider {
        name: &'static str,
        authority: CurrencyCategory,
        quotes: Option<PairQuotes>,
    }

    impl StaticProvider {
        fn crypto(quotes: PairQuotes) -> Self {
            StaticProvider {
                name: "crypto-fixture",
                authority: CurrencyCategory::Crypto,
                quotes: Some(quotes),
            }
        }

        fn fiat(quotes: PairQuotes) -> Self {
            StaticProvider {
                name: "fiat-fixture",
                authority: CurrencyCategory::Fiat,
                quotes: Some(quotes),
            }
        }

        fn failing(name: &'static str, authority: CurrencyCategory) -> Self {
            StaticProvider {
                name,
                authority,
                quotes: None,
            }
        }
    }

    #[async_trait]
    impl RateProvider for StaticProvider {
        fn name(&self) -> &'static str {
            self.name
        }

        fn authority(&self) -> CurrencyCategory {
            self.authority
        }

        async fn fetch_quotes(&self) -> crate::core::error::Result<PairQuotes> {
            match &self.quotes {
                Some(quotes) => Ok(quotes.clone()),
                None => Err(CoreError::ProviderUnavailable {
                    provider: self.name.to_string(),
                    reason: "fixture outage".to_string(),
                }),
            }
        }
    }

    fn fixture(providers: Vec<Box<dyn RateProvider>>) -> (RateIngestor, Arc<RateCache>, Arc<DataStore>, TempDir)
    {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(DataStore::open(dir.path()).unwrap());
        let cache = Arc::new(RateCache::new(Duration::seconds(300)));
        let ingestor = RateIngestor::new(providers, Arc::clone(&cache), Arc::clone(&store));
        (ingestor, cache, store, dir)
    }

    fn btc_usd(rate: Decimal) -> PairQuotes {
        PairQuotes::from([((CurrencyCode::BTC, CurrencyCode::USD), rate)])
    }

    #[tokio::test]
    async fn test_successful_cycle_installs_and_records_history() {
        let (ingestor, cache, store, _dir) = fixture(vec![
            Box::new(StaticProvider::crypto(btc_usd(dec!(76929)))),
            Box::new(StaticProvider::fiat(PairQuotes::from([(
                (CurrencyCode::EUR, CurrencyCode::USD),
                dec!(1.0786),
            )]))),
        ]);

        let outcome = ingestor.refresh().await.unwrap();
        assert_eq!(outcome.pair_count, 2);
        assert!(!outcome.is_partial());
        assert_eq!(
            cache.get_rate(CurrencyCode::BTC, CurrencyCode::USD).unwrap(),
            dec!(76929)
        );
        assert_eq!(store.history_len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_one_failed_provider_still_installs_partial_snapshot() {
        let (ingestor, cache, _store, _dir) = fixture(vec![
            Box::new(StaticProvider::crypto(btc_usd(dec!(76929)))),
            Box::new(StaticProvider::failing("fiat-fixture", CurrencyCategory::Fiat)),
        ]);

        let outcome = ingestor.refresh().await.unwrap();
        assert!(outcome.is_partial());
        assert_eq!(outcome.pair_count, 1);
        assert_eq!(
            cache.get_rate(CurrencyCode::BTC, CurrencyCode::USD).unwrap(),
            dec!(76929)
        );
        // Fiat pairs are absent and triangulation has nothing to work with.
        assert!(matches!(
            cache.get_rate(CurrencyCode::EUR, CurrencyCode::GBP),
            Err(CoreError::RateUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_total_failure_keeps_last_known_good() {
        let (ingestor, cache, store, _dir) = fixture(vec![
            Box::new(StaticProvider::failing("crypto-fixture", CurrencyCategory::Crypto)),
            Box::new(StaticProvider::failing("fiat-fixture", CurrencyCategory::Fiat)),
        ]);
        cache.install(RateSnapshot::new(Utc::now(), btc_usd(dec!(70000))));

        let err = ingestor.refresh().await.unwrap_err();
        assert!(matches!(err, CoreError::IngestionFailed(_)));
        // The pre-existing snapshot is untouched and history gained nothing.
        assert_eq!(
            cache.get_rate(CurrencyCode::BTC, CurrencyCode::USD).unwrap(),
            dec!(70000)
        );
        assert_eq!(store.history_len().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_crypto_authority_wins_pairs_involving_crypto() {
        // Both providers quote BTC/USD; the fiat provider's number must lose
        // regardless of arrival order.
        let (ingestor, cache, _store, _dir) = fixture(vec![
            Box::new(StaticProvider::fiat(btc_usd(dec!(70000)))),
            Box::new(StaticProvider::crypto(btc_usd(dec!(76929)))),
        ]);

        ingestor.refresh().await.unwrap();
        assert_eq!(
            cache.get_rate(CurrencyCode::BTC, CurrencyCode::USD).unwrap(),
            dec!(76929)
        );
    }

    #[tokio::test]
    async fn test_fiat_authority_wins_fiat_pairs() {
        let eur_usd = |rate| PairQuotes::from([((CurrencyCode::EUR, CurrencyCode::USD), rate)]);
        let (ingestor, cache, _store, _dir) = fixture(vec![
            Box::new(StaticProvider::crypto(eur_usd(dec!(1.2)))),
            Box::new(StaticProvider::fiat(eur_usd(dec!(1.0786)))),
        ]);

        ingestor.refresh().await.unwrap();
        assert_eq!(
            cache.get_rate(CurrencyCode::EUR, CurrencyCode::USD).unwrap(),
            dec!(1.0786)
        );
    }

    #[test]
    fn test_preferred_authority_rules() {
        assert_eq!(
            preferred_authority((CurrencyCode::BTC, CurrencyCode::USD)),
            CurrencyCategory::Crypto
        );
        assert_eq!(
            preferred_authority((CurrencyCode::USD, CurrencyCode::ETH)),
            CurrencyCategory::Crypto
        );
        assert_eq!(
            preferred_authority((CurrencyCode::EUR, CurrencyCode::GBP)),
            CurrencyCategory::Fiat
        );
    }
}
