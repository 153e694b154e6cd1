//! Immutable exchange-rate snapshots.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::core::currency::CurrencyCode;

/// A directed currency pair: `(from, to)` quotes one unit of `from` in `to`.
pub type PairKey = (CurrencyCode, CurrencyCode);

/// One full set of currency-pair rates taken at a single instant.
///
/// A snapshot is never mutated after creation; a refresh builds a new one
/// and swaps it into the cache wholesale. That immutability is what makes
/// it safe for a trade to keep reading a snapshot while the cache moves on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub as_of: DateTime<Utc>,
    rates: HashMap<CurrencyCode, HashMap<CurrencyCode, Decimal>>,
}

impl RateSnapshot {
    pub fn new(
        as_of: DateTime<Utc>,
        quotes: impl IntoIterator<Item = (PairKey, Decimal)>,
    ) -> Self {
        let mut rates: HashMap<CurrencyCode, HashMap<CurrencyCode, Decimal>> = HashMap::new();
        for ((from, to), rate) in quotes {
            rates.entry(from).or_default().insert(to, rate);
        }
        RateSnapshot { as_of, rates }
    }

    /// Direct pair lookup only. Inversion and triangulation are the cache's
    /// job, not the snapshot's.
    pub fn rate(&self, from: CurrencyCode, to: CurrencyCode) -> Option<Decimal> {
        self.rates.get(&from).and_then(|quoted| quoted.get(&to)).copied()
    }

    pub fn pair_count(&self) -> usize {
        self.rates.values().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn pairs(&self) -> impl Iterator<Item = (CurrencyCode, CurrencyCode, Decimal)> + '_ {
        self.rates.iter().flat_map(|(from, quoted)| {
            quoted.iter().map(move |(to, rate)| (*from, *to, *rate))
        })
    }
}
