pub mod cli;
pub mod config;
pub mod core;
pub mod ingest;
pub mod providers;
pub mod store;

use anyhow::Result;
use chrono::Duration;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::engine::TransactionEngine;
use crate::core::ledger::PortfolioLedger;
use crate::core::rates::RateCache;
use crate::store::DataStore;

/// One user-facing operation, already parsed from the command line.
#[derive(Debug)]
pub enum AppCommand {
    Refresh,
    Rate {
        from: String,
        to: String,
    },
    Buy {
        user: String,
        currency: String,
        amount: String,
    },
    Sell {
        user: String,
        currency: String,
        amount: String,
    },
    Deposit {
        user: String,
        currency: String,
        amount: String,
    },
    Portfolio {
        user: String,
        base: String,
    },
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("valutatrade starting...");

    let config = match config_path {
        Some(path) => config::AppConfig::load_from_path(path)?,
        None => config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let store = Arc::new(DataStore::open(&config.data_path()?)?);
    let cache = Arc::new(RateCache::new(Duration::seconds(
        config.rates_ttl_seconds as i64,
    )));
    // Warm the cache with the newest persisted snapshot so a restart keeps
    // serving last-known-good rates until the next refresh.
    if let Some(snapshot) = store.latest_snapshot()? {
        debug!(as_of = %snapshot.as_of, "Reloaded snapshot from history");
        cache.install(snapshot);
    }
    let ledger = Arc::new(PortfolioLedger::with_portfolios(store.load_portfolios()?));
    let engine = TransactionEngine::new(Arc::clone(&cache), Arc::clone(&ledger), Arc::clone(&store));

    match command {
        AppCommand::Refresh => cli::refresh::run(&config, cache, store).await,
        AppCommand::Rate { from, to } => cli::rate::run(&engine, &from, &to),
        AppCommand::Buy {
            user,
            currency,
            amount,
        } => cli::trade::buy(&engine, &user, &currency, &amount),
        AppCommand::Sell {
            user,
            currency,
            amount,
        } => cli::trade::sell(&engine, &user, &currency, &amount),
        AppCommand::Deposit {
            user,
            currency,
            amount,
        } => cli::trade::deposit(&engine, &user, &currency, &amount),
        AppCommand::Portfolio { user, base } => cli::portfolio::run(&ledger, &cache, &user, &base),
    }
}
