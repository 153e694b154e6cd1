use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use comfy_table::Cell;
use rust_decimal::Decimal;

use super::ui;
use crate::core::currency::CurrencyCode;
use crate::core::ledger::PortfolioLedger;
use crate::core::rates::RateCache;

pub fn run(ledger: &PortfolioLedger, cache: &RateCache, user: &str, base: &str) -> Result<()> {
    let base: CurrencyCode = base.parse()?;
    let portfolio = ledger.snapshot_of(user);

    println!(
        "Portfolio: {}\n",
        ui::style_text(&portfolio.owner, ui::StyleType::Title)
    );

    if portfolio.is_empty() {
        println!("No wallets yet. Fund one with `valutatrade deposit`.");
        return Ok(());
    }

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Balance"),
        ui::header_cell(&format!("Rate ({base})")),
        ui::header_cell(&format!("Value ({base})")),
    ]);

    let mut total = Decimal::ZERO;
    let mut all_valued = true;
    for wallet in portfolio.wallets() {
        // A wallet without a derivable rate is shown, not hidden, and the
        // total is marked incomplete instead of failing the whole view.
        match cache.get_rate(wallet.currency, base) {
            Ok(rate) => {
                let value = wallet.balance * rate;
                total += value;
                table.add_row(vec![
                    Cell::new(wallet.currency.as_str()),
                    ui::amount_cell(wallet.balance, wallet.currency),
                    Cell::new(ui::fmt_rate(rate)),
                    ui::amount_cell(value, base),
                ]);
            }
            Err(_) => {
                all_valued = false;
                table.add_row(vec![
                    Cell::new(wallet.currency.as_str()),
                    ui::amount_cell(wallet.balance, wallet.currency),
                    ui::na_cell(),
                    ui::na_cell(),
                ]);
            }
        }
    }
    println!("{table}");

    let total_label = if all_valued {
        format!("Total Value ({base})")
    } else {
        format!("Total Value ({base}, excluding N/A)")
    };
    println!(
        "\n{}: {}",
        ui::style_text(&total_label, ui::StyleType::TotalLabel),
        ui::style_text(&ui::fmt_amount(total, base), ui::StyleType::TotalValue)
    );

    match cache.current() {
        Some(snapshot) => {
            let as_of = snapshot.as_of.to_rfc3339_opts(SecondsFormat::Secs, true);
            let line = if cache.is_stale(Utc::now()) {
                format!(
                    "Rates as of {as_of} {}",
                    ui::style_text("(stale)", ui::StyleType::Error)
                )
            } else {
                format!("Rates as of {as_of}")
            };
            println!("{}", ui::style_text(&line, ui::StyleType::Subtle));
        }
        None => println!(
            "{}",
            ui::style_text(
                "No rates ingested yet; run `valutatrade refresh`.",
                ui::StyleType::Subtle
            )
        ),
    }

    Ok(())
}
