//! Embedded persistence for portfolios, rate history, and trade records.
//!
//! Three partitions in one fjall keyspace:
//! - `portfolios`: owner → portfolio, overwritten on every mutation;
//! - `rate_history`: RFC 3339 timestamp → snapshot, append-only;
//! - `trades`: timestamp/user → transaction record, append-only.
//!
//! History keys are RFC 3339 with fixed-width fractional seconds, so the
//! partition's lexicographic order is chronological order.

use chrono::SecondsFormat;
use fjall::{Config, Keyspace, PartitionCreateOptions, PartitionHandle};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

use crate::core::engine::TransactionRecord;
use crate::core::ledger::Portfolio;
use crate::core::snapshot::RateSnapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store backend error: {0}")]
    Backend(#[from] fjall::Error),

    #[error("corrupt stored record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("could not prepare data directory: {0}")]
    Io(#[from] std::io::Error),
}

pub struct DataStore {
    _keyspace: Keyspace,
    portfolios: PartitionHandle,
    rate_history: PartitionHandle,
    trades: PartitionHandle,
}

impl DataStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        std::fs::create_dir_all(path)?;
        let keyspace = Config::new(path).open()?;
        let portfolios = keyspace.open_partition("portfolios", PartitionCreateOptions::default())?;
        let rate_history =
            keyspace.open_partition("rate_history", PartitionCreateOptions::default())?;
        let trades = keyspace.open_partition("trades", PartitionCreateOptions::default())?;
        debug!(path = %path.display(), "Opened data store");
        Ok(DataStore {
            _keyspace: keyspace,
            portfolios,
            rate_history,
            trades,
        })
    }

    pub fn save_portfolio(&self, portfolio: &Portfolio) -> Result<(), StoreError> {
        self.portfolios
            .insert(portfolio.owner.as_bytes(), serde_json::to_vec(portfolio)?)?;
        Ok(())
    }

    pub fn load_portfolios(&self) -> Result<Vec<Portfolio>, StoreError> {
        let mut portfolios = Vec::new();
        for entry in self.portfolios.iter() {
            let (_, value) = entry?;
            portfolios.push(serde_json::from_slice(&value)?);
        }
        Ok(portfolios)
    }

    /// Appends a snapshot to the rate history. History is never rewritten;
    /// the cache's "current" notion lives elsewhere.
    pub fn append_snapshot(&self, snapshot: &RateSnapshot) -> Result<(), StoreError> {
        let key = snapshot
            .as_of
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        self.rate_history
            .insert(key.as_bytes(), serde_json::to_vec(snapshot)?)?;
        Ok(())
    }

    /// The newest snapshot in history, used to warm the cache at startup.
    pub fn latest_snapshot(&self) -> Result<Option<RateSnapshot>, StoreError> {
        match self.rate_history.iter().next_back().transpose()? {
            Some((_, value)) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    pub fn history_len(&self) -> Result<usize, StoreError> {
        let mut count = 0;
        for entry in self.rate_history.iter() {
            entry?;
            count += 1;
        }
        Ok(count)
    }

    pub fn append_trade(&self, record: &TransactionRecord) -> Result<(), StoreError> {
        let key = format!(
            "{}/{}",
            record.timestamp.to_rfc3339_opts(SecondsFormat::Micros, true),
            record.user
        );
        self.trades
            .insert(key.as_bytes(), serde_json::to_vec(record)?)?;
        Ok(())
    }

    pub fn load_trades(&self) -> Result<Vec<TransactionRecord>, StoreError> {
        let mut records = Vec::new();
        for entry in self.trades.iter() {
            let (_, value) = entry?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn test_portfolio_round_trip() {
        let dir = tempdir().unwrap();
        let store = DataStore::open(dir.path()).unwrap();

        let mut portfolio = Portfolio::new("alice");
        portfolio.credit(CurrencyCode::USD, dec!(10000)).unwrap();
        portfolio.credit(CurrencyCode::BTC, dec!(0.05)).unwrap();
        store.save_portfolio(&portfolio).unwrap();

        let loaded = store.load_portfolios().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].owner, "alice");
        assert_eq!(loaded[0].balance(CurrencyCode::BTC), dec!(0.05));
    }

    #[test]
    fn test_save_portfolio_overwrites_by_owner() {
        let dir = tempdir().unwrap();
        let store = DataStore::open(dir.path()).unwrap();

        let mut portfolio = Portfolio::new("alice");
        portfolio.credit(CurrencyCode::USD, dec!(100)).unwrap();
        store.save_portfolio(&portfolio).unwrap();
        portfolio.credit(CurrencyCode::USD, dec!(50)).unwrap();
        store.save_portfolio(&portfolio).unwrap();

        let loaded = store.load_portfolios().unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].balance(CurrencyCode::USD), dec!(150));
    }

    #[test]
    fn test_history_is_append_only_and_ordered() {
        let dir = tempdir().unwrap();
        let store = DataStore::open(dir.path()).unwrap();

        let first = Utc::now();
        store
            .append_snapshot(&RateSnapshot::new(
                first,
                [((CurrencyCode::BTC, CurrencyCode::USD), dec!(70000))],
            ))
            .unwrap();
        store
            .append_snapshot(&RateSnapshot::new(
                first + Duration::seconds(60),
                [((CurrencyCode::BTC, CurrencyCode::USD), dec!(76929))],
            ))
            .unwrap();

        assert_eq!(store.history_len().unwrap(), 2);
        let latest = store.latest_snapshot().unwrap().unwrap();
        assert_eq!(
            latest.rate(CurrencyCode::BTC, CurrencyCode::USD),
            Some(dec!(76929))
        );
    }

    #[test]
    fn test_empty_history_has_no_latest() {
        let dir = tempdir().unwrap();
        let store = DataStore::open(dir.path()).unwrap();
        assert!(store.latest_snapshot().unwrap().is_none());
    }
}
