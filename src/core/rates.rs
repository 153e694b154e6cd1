//! The process-wide rate cache.
//!
//! Readers clone the current snapshot `Arc` under a short read lock and
//! work against that value from then on; `install` swaps the whole `Arc`
//! under a write lock. A reader can never observe a half-written snapshot,
//! and a refresh landing mid-trade cannot change a rate the trade already
//! captured.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use std::sync::{Arc, RwLock};
use tracing::debug;

use crate::core::currency::{BASE_CURRENCY, CurrencyCode};
use crate::core::error::{CoreError, Result};
use crate::core::snapshot::RateSnapshot;

/// A rate answer enriched for display: the inverse and the snapshot's age
/// travel with the rate so staleness is always observable.
#[derive(Debug, Clone)]
pub struct RateQuote {
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    pub rate: Decimal,
    pub inverse: Decimal,
    pub as_of: DateTime<Utc>,
    pub stale: bool,
}

pub struct RateCache {
    current: RwLock<Option<Arc<RateSnapshot>>>,
    max_age: Duration,
}

impl RateCache {
    pub fn new(max_age: Duration) -> Self {
        RateCache {
            current: RwLock::new(None),
            max_age,
        }
    }

    /// The current snapshot, if one was ever installed.
    pub fn current(&self) -> Option<Arc<RateSnapshot>> {
        self.current.read().unwrap().clone()
    }

    /// Atomically replaces the current snapshot. The previous one stays
    /// alive for as long as any in-flight operation still holds its `Arc`.
    pub fn install(&self, snapshot: RateSnapshot) {
        let as_of = snapshot.as_of;
        let pairs = snapshot.pair_count();
        *self.current.write().unwrap() = Some(Arc::new(snapshot));
        debug!(%as_of, pairs, "Installed rate snapshot");
    }

    /// Resolves `from` → `to` against the current snapshot: identity, then
    /// the direct pair, then the reciprocal of the reverse pair, then
    /// triangulation through USD.
    pub fn get_rate(&self, from: CurrencyCode, to: CurrencyCode) -> Result<Decimal> {
        let snapshot = self.current().ok_or(CoreError::NoCurrentSnapshot)?;
        resolve_rate(&snapshot, from, to)
    }

    /// Like `get_rate`, but the rate, its inverse, and `as_of` all come
    /// from the same snapshot.
    pub fn quote(
        &self,
        from: CurrencyCode,
        to: CurrencyCode,
        now: DateTime<Utc>,
    ) -> Result<RateQuote> {
        let snapshot = self.current().ok_or(CoreError::NoCurrentSnapshot)?;
        let rate = resolve_rate(&snapshot, from, to)?;
        Ok(RateQuote {
            from,
            to,
            rate,
            inverse: Decimal::ONE / rate,
            as_of: snapshot.as_of,
            stale: now - snapshot.as_of > self.max_age,
        })
    }

    /// Staleness is advisory: queries keep succeeding against a stale
    /// snapshot, but callers displaying a rate surface `as_of`.
    pub fn is_stale(&self, now: DateTime<Utc>) -> bool {
        match self.current() {
            Some(snapshot) => now - snapshot.as_of > self.max_age,
            None => true,
        }
    }
}

fn resolve_rate(
    snapshot: &RateSnapshot,
    from: CurrencyCode,
    to: CurrencyCode,
) -> Result<Decimal> {
    if from == to {
        return Ok(Decimal::ONE);
    }
    if let Some(rate) = snapshot.rate(from, to) {
        return Ok(rate);
    }
    if let Some(reverse) = snapshot.rate(to, from) {
        if !reverse.is_zero() {
            return Ok(Decimal::ONE / reverse);
        }
    }
    match (base_value(snapshot, from), base_value(snapshot, to)) {
        (Some(from_usd), Some(to_usd)) if !to_usd.is_zero() => Ok(from_usd / to_usd),
        _ => Err(CoreError::RateUnavailable { from, to }),
    }
}

/// One unit of `code` in USD, from the direct pair or the reciprocal.
fn base_value(snapshot: &RateSnapshot, code: CurrencyCode) -> Option<Decimal> {
    if code == BASE_CURRENCY {
        return Some(Decimal::ONE);
    }
    snapshot.rate(code, BASE_CURRENCY).or_else(|| {
        snapshot
            .rate(BASE_CURRENCY, code)
            .filter(|rate| !rate.is_zero())
            .map(|rate| Decimal::ONE / rate)
    })
}
