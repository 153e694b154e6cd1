use anyhow::{Result, bail};
use chrono::SecondsFormat;
use std::sync::Arc;
use std::time::Duration;

use super::ui;
use crate::config::AppConfig;
use crate::core::rates::RateCache;
use crate::ingest::RateIngestor;
use crate::providers::RateProvider;
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::exchange_rate_api::ExchangeRateApiProvider;
use crate::store::DataStore;

pub async fn run(config: &AppConfig, cache: Arc<RateCache>, store: Arc<DataStore>) -> Result<()> {
    let timeout = Duration::from_secs(config.request_timeout_seconds);

    let mut providers: Vec<Box<dyn RateProvider>> = Vec::new();
    if let Some(coingecko) = &config.providers.coingecko {
        providers.push(Box::new(CoinGeckoProvider::new(&coingecko.base_url, timeout)?));
    }
    if let Some(exchangerate) = &config.providers.exchangerate {
        providers.push(Box::new(ExchangeRateApiProvider::new(
            &exchangerate.base_url,
            &exchangerate.resolved_api_key(),
            timeout,
        )?));
    }
    if providers.is_empty() {
        bail!("no rate providers configured; enable at least one in the config file");
    }

    let ingestor = RateIngestor::new(providers, cache, store);
    let outcome = ingestor.refresh().await?;

    for error in &outcome.provider_errors {
        println!("{}", ui::style_text(&format!("warning: {error}"), ui::StyleType::Error));
    }
    let summary = format!(
        "Installed {} pair(s) as of {}",
        outcome.pair_count,
        outcome.as_of.to_rfc3339_opts(SecondsFormat::Secs, true)
    );
    if outcome.is_partial() {
        println!(
            "{} {}",
            ui::style_text(&summary, ui::StyleType::TotalValue),
            ui::style_text("(partial: some providers failed)", ui::StyleType::Error)
        );
    } else {
        println!("{}", ui::style_text(&summary, ui::StyleType::TotalValue));
    }

    Ok(())
}
