//! Per-user wallets and the portfolio ledger.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, RwLock};

use crate::core::currency::CurrencyCode;
use crate::core::error::{CoreError, Result, ensure_positive};

/// A single-currency balance. Created lazily on first credit and never
/// destroyed afterwards; a zero balance is a valid state, not absence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub currency: CurrencyCode,
    pub balance: Decimal,
}

impl Wallet {
    fn new(currency: CurrencyCode) -> Self {
        Wallet {
            currency,
            balance: Decimal::ZERO,
        }
    }

    fn credit(&mut self, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        self.balance += amount;
        Ok(())
    }

    fn debit(&mut self, amount: Decimal) -> Result<()> {
        ensure_positive(amount)?;
        if amount > self.balance {
            return Err(CoreError::InsufficientFunds {
                currency: self.currency,
                available: self.balance,
                requested: amount,
            });
        }
        self.balance -= amount;
        Ok(())
    }
}

/// All wallets owned by one user. Mutated only through `TransactionEngine`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Portfolio {
    pub owner: String,
    wallets: BTreeMap<CurrencyCode, Wallet>,
}

impl Portfolio {
    pub fn new(owner: impl Into<String>) -> Self {
        Portfolio {
            owner: owner.into(),
            wallets: BTreeMap::new(),
        }
    }

    /// Balance of `currency`, zero for a wallet that was never created.
    pub fn balance(&self, currency: CurrencyCode) -> Decimal {
        self.wallets
            .get(&currency)
            .map_or(Decimal::ZERO, |wallet| wallet.balance)
    }

    /// Credits `amount`, creating the wallet on first use. Returns the new
    /// balance.
    pub fn credit(&mut self, currency: CurrencyCode, amount: Decimal) -> Result<Decimal> {
        let wallet = self
            .wallets
            .entry(currency)
            .or_insert_with(|| Wallet::new(currency));
        wallet.credit(amount)?;
        Ok(wallet.balance)
    }

    /// Debits `amount`. Debiting a currency that was never bought is a
    /// `NoSuchWallet`, distinct from overdrawing an existing wallet.
    pub fn debit(&mut self, currency: CurrencyCode, amount: Decimal) -> Result<Decimal> {
        ensure_positive(amount)?;
        let wallet = self
            .wallets
            .get_mut(&currency)
            .ok_or(CoreError::NoSuchWallet(currency))?;
        wallet.debit(amount)?;
        Ok(wallet.balance)
    }

    /// Wallets in code order, for deterministic display and persistence.
    pub fn wallets(&self) -> impl Iterator<Item = &Wallet> {
        self.wallets.values()
    }

    pub fn is_empty(&self) -> bool {
        self.wallets.is_empty()
    }
}

/// Holds every user's portfolio behind its own lock.
///
/// The per-portfolio `Mutex` is the mutual-exclusion scope the engine uses
/// to serialize trades for one user; trades for different users never
/// contend.
#[derive(Default)]
pub struct PortfolioLedger {
    portfolios: RwLock<HashMap<String, Arc<Mutex<Portfolio>>>>,
}

impl PortfolioLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds the ledger from persisted portfolios at startup.
    pub fn with_portfolios(portfolios: impl IntoIterator<Item = Portfolio>) -> Self {
        let map = portfolios
            .into_iter()
            .map(|portfolio| (portfolio.owner.clone(), Arc::new(Mutex::new(portfolio))))
            .collect();
        PortfolioLedger {
            portfolios: RwLock::new(map),
        }
    }

    /// The lock handle for one user's portfolio, created empty on first
    /// touch.
    pub fn handle(&self, user: &str) -> Arc<Mutex<Portfolio>> {
        if let Some(handle) = self.portfolios.read().unwrap().get(user) {
            return Arc::clone(handle);
        }
        let mut portfolios = self.portfolios.write().unwrap();
        Arc::clone(
            portfolios
                .entry(user.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(Portfolio::new(user)))),
        )
    }

    pub fn get_balance(&self, user: &str, currency: CurrencyCode) -> Decimal {
        match self.portfolios.read().unwrap().get(user) {
            Some(handle) => handle.lock().unwrap().balance(currency),
            None => Decimal::ZERO,
        }
    }

    /// Single-operation credit. Applied completely or not at all; the
    /// larger buy/sell unit belongs to the engine.
    pub fn credit(&self, user: &str, currency: CurrencyCode, amount: Decimal) -> Result<Decimal> {
        let handle = self.handle(user);
        let mut portfolio = handle.lock().unwrap();
        portfolio.credit(currency, amount)
    }

    /// Single-operation debit.
    pub fn debit(&self, user: &str, currency: CurrencyCode, amount: Decimal) -> Result<Decimal> {
        let handle = self.handle(user);
        let mut portfolio = handle.lock().unwrap();
        portfolio.debit(currency, amount)
    }

    /// A point-in-time copy of one user's portfolio, for display and
    /// persistence.
    pub fn snapshot_of(&self, user: &str) -> Portfolio {
        match self.portfolios.read().unwrap().get(user) {
            Some(handle) => handle.lock().unwrap().clone(),
            None => Portfolio::new(user),
        }
    }
}
