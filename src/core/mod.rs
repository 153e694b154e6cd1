//! Core trading logic: currencies, rates, wallets, and the engine.

pub mod currency;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod log;
pub mod rates;
pub mod snapshot;

// Re-export main types for cleaner imports
pub use currency::{BASE_CURRENCY, CurrencyCategory, CurrencyCode};
pub use engine::{TradeKind, TradeReceipt, TransactionEngine, TransactionRecord};
pub use error::{CoreError, Result};
pub use ledger::{Portfolio, PortfolioLedger, Wallet};
pub use rates::{RateCache, RateQuote};
pub use snapshot::{PairKey, RateSnapshot};
