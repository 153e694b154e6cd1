use anyhow::Result;
use chrono::SecondsFormat;

use super::ui;
use crate::core::currency::CurrencyCode;
use crate::core::engine::TransactionEngine;

pub fn run(engine: &TransactionEngine, from: &str, to: &str) -> Result<()> {
    let from: CurrencyCode = from.parse()?;
    let to: CurrencyCode = to.parse()?;

    let quote = engine.get_rate_quote(from, to)?;
    println!(
        "{}/{} {}    {}/{} {}",
        quote.from,
        quote.to,
        ui::style_text(&ui::fmt_rate(quote.rate), ui::StyleType::TotalValue),
        quote.to,
        quote.from,
        ui::fmt_rate(quote.inverse),
    );

    let as_of = quote.as_of.to_rfc3339_opts(SecondsFormat::Secs, true);
    let freshness = if quote.stale {
        format!("as of {as_of} {}", ui::style_text("(stale)", ui::StyleType::Error))
    } else {
        format!("as of {as_of}")
    };
    println!("{}", ui::style_text(&freshness, ui::StyleType::Subtle));

    Ok(())
}
