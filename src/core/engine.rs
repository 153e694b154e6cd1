//! The transactional conversion engine.
//!
//! The only component allowed to combine a rate lookup with a two-wallet
//! mutation. Validation happens before any state changes; the rate is read
//! exactly once per trade; both wallet mutations happen under the user's
//! portfolio lock, so a concurrent snapshot install cannot split a trade
//! across two prices and two trades for one user cannot interleave.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::core::currency::{BASE_CURRENCY, CurrencyCode};
use crate::core::error::{Result, ensure_positive};
use crate::core::ledger::{Portfolio, PortfolioLedger};
use crate::core::rates::{RateCache, RateQuote};
use crate::store::DataStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeKind {
    Buy,
    Sell,
}

impl Display for TradeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeKind::Buy => write!(f, "BUY"),
            TradeKind::Sell => write!(f, "SELL"),
        }
    }
}

/// Audit artifact appended to the store for every executed trade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub user: String,
    pub kind: TradeKind,
    pub currency: CurrencyCode,
    pub amount: Decimal,
    pub rate: Decimal,
    pub counter_amount: Decimal,
    pub timestamp: DateTime<Utc>,
}

/// What a completed trade hands back to the caller. `counter_amount` is the
/// USD cost of a buy or the USD proceeds of a sell.
#[derive(Debug, Clone)]
pub struct TradeReceipt {
    pub user: String,
    pub kind: TradeKind,
    pub currency: CurrencyCode,
    pub amount: Decimal,
    pub rate: Decimal,
    pub counter_amount: Decimal,
    pub new_balance: Decimal,
    pub base_balance: Decimal,
    pub executed_at: DateTime<Utc>,
}

pub struct TransactionEngine {
    cache: Arc<RateCache>,
    ledger: Arc<PortfolioLedger>,
    store: Arc<DataStore>,
}

impl TransactionEngine {
    pub fn new(cache: Arc<RateCache>, ledger: Arc<PortfolioLedger>, store: Arc<DataStore>) -> Self {
        TransactionEngine {
            cache,
            ledger,
            store,
        }
    }

    /// Buys `amount` of `currency` against the USD wallet.
    #[instrument(name = "Buy", skip(self), fields(user = %user, currency = %currency))]
    pub fn buy(&self, user: &str, currency: CurrencyCode, amount: Decimal) -> Result<TradeReceipt> {
        ensure_tradable(currency)?;
        ensure_positive(amount)?;

        // Single rate read; the snapshot backing it cannot change under us.
        let rate = self.cache.get_rate(currency, BASE_CURRENCY)?;
        let cost = amount * rate;

        let handle = self.ledger.handle(user);
        let mut portfolio = handle.lock().unwrap();
        // Debit first: if it fails, no credit has happened. Credit after a
        // successful debit cannot fail (the amount was validated above).
        portfolio.debit(BASE_CURRENCY, cost)?;
        let new_balance = portfolio.credit(currency, amount)?;
        let base_balance = portfolio.balance(BASE_CURRENCY);

        // Persist before releasing the user's lock: a later trade must not
        // write an older portfolio state over this one.
        let receipt = self.commit(
            &portfolio,
            TradeKind::Buy,
            user,
            currency,
            amount,
            rate,
            cost,
            new_balance,
            base_balance,
        )?;
        info!(%amount, %rate, %cost, "Buy executed");
        Ok(receipt)
    }

    /// Sells `amount` of `currency` into the USD wallet.
    #[instrument(name = "Sell", skip(self), fields(user = %user, currency = %currency))]
    pub fn sell(
        &self,
        user: &str,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<TradeReceipt> {
        ensure_tradable(currency)?;
        ensure_positive(amount)?;

        let rate = self.cache.get_rate(currency, BASE_CURRENCY)?;
        let proceeds = amount * rate;

        let handle = self.ledger.handle(user);
        let mut portfolio = handle.lock().unwrap();
        let new_balance = portfolio.debit(currency, amount)?;
        portfolio.credit(BASE_CURRENCY, proceeds)?;
        let base_balance = portfolio.balance(BASE_CURRENCY);

        let receipt = self.commit(
            &portfolio,
            TradeKind::Sell,
            user,
            currency,
            amount,
            rate,
            proceeds,
            new_balance,
            base_balance,
        )?;
        info!(%amount, %rate, %proceeds, "Sell executed");
        Ok(receipt)
    }

    /// Funds a wallet from outside the system. Routed through the engine so
    /// the ledger keeps a single mutation path; deposits are logged but are
    /// not trades and produce no `TransactionRecord`.
    #[instrument(name = "Deposit", skip(self), fields(user = %user, currency = %currency))]
    pub fn deposit(
        &self,
        user: &str,
        currency: CurrencyCode,
        amount: Decimal,
    ) -> Result<Decimal> {
        ensure_positive(amount)?;
        let new_balance = self.ledger.credit(user, currency, amount)?;
        self.store.save_portfolio(&self.ledger.snapshot_of(user))?;
        info!(%amount, %new_balance, "Deposit credited");
        Ok(new_balance)
    }

    /// Read-through to the cache; rate, inverse, and `as_of` come from one
    /// snapshot.
    pub fn get_rate_quote(&self, from: CurrencyCode, to: CurrencyCode) -> Result<RateQuote> {
        self.cache.quote(from, to, Utc::now())
    }

    #[allow(clippy::too_many_arguments)]
    fn commit(
        &self,
        portfolio: &Portfolio,
        kind: TradeKind,
        user: &str,
        currency: CurrencyCode,
        amount: Decimal,
        rate: Decimal,
        counter_amount: Decimal,
        new_balance: Decimal,
        base_balance: Decimal,
    ) -> Result<TradeReceipt> {
        let executed_at = Utc::now();
        let record = TransactionRecord {
            user: user.to_string(),
            kind,
            currency,
            amount,
            rate,
            counter_amount,
            timestamp: executed_at,
        };
        self.store.save_portfolio(portfolio)?;
        self.store.append_trade(&record)?;
        Ok(TradeReceipt {
            user: user.to_string(),
            kind,
            currency,
            amount,
            rate,
            counter_amount,
            new_balance,
            base_balance,
            executed_at,
        })
    }
}

fn ensure_tradable(currency: CurrencyCode) -> Result<()> {
    if currency == BASE_CURRENCY {
        return Err(crate::core::error::CoreError::BaseCurrencyTrade(currency));
    }
    Ok(())
}
