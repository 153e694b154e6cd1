use anyhow::Result;

use super::ui;
use crate::core::currency::{BASE_CURRENCY, CurrencyCode};
use crate::core::engine::{TradeKind, TradeReceipt, TransactionEngine};
use crate::core::error::parse_amount;

pub fn buy(engine: &TransactionEngine, user: &str, currency: &str, amount: &str) -> Result<()> {
    let currency: CurrencyCode = currency.parse()?;
    let amount = parse_amount(amount)?;
    let receipt = engine.buy(user, currency, amount)?;
    print_receipt(&receipt);
    Ok(())
}

pub fn sell(engine: &TransactionEngine, user: &str, currency: &str, amount: &str) -> Result<()> {
    let currency: CurrencyCode = currency.parse()?;
    let amount = parse_amount(amount)?;
    let receipt = engine.sell(user, currency, amount)?;
    print_receipt(&receipt);
    Ok(())
}

pub fn deposit(engine: &TransactionEngine, user: &str, currency: &str, amount: &str) -> Result<()> {
    let currency: CurrencyCode = currency.parse()?;
    let amount = parse_amount(amount)?;
    let new_balance = engine.deposit(user, currency, amount)?;
    println!(
        "Deposited {} {currency} for {user}",
        ui::fmt_amount(amount, currency)
    );
    println!(
        "New {currency} balance: {}",
        ui::style_text(&ui::fmt_amount(new_balance, currency), ui::StyleType::TotalValue)
    );
    Ok(())
}

fn print_receipt(receipt: &TradeReceipt) {
    let counter_label = match receipt.kind {
        TradeKind::Buy => "Cost",
        TradeKind::Sell => "Proceeds",
    };
    println!(
        "{} {} {} @ {} {BASE_CURRENCY}",
        ui::style_text(&receipt.kind.to_string(), ui::StyleType::Title),
        ui::fmt_amount(receipt.amount, receipt.currency),
        receipt.currency,
        ui::fmt_rate(receipt.rate),
    );
    println!(
        "{counter_label}: {} {BASE_CURRENCY}",
        ui::fmt_amount(receipt.counter_amount, BASE_CURRENCY)
    );
    println!(
        "New {} balance: {}",
        receipt.currency,
        ui::style_text(
            &ui::fmt_amount(receipt.new_balance, receipt.currency),
            ui::StyleType::TotalValue
        )
    );
    println!(
        "New {BASE_CURRENCY} balance: {}",
        ui::style_text(
            &ui::fmt_amount(receipt.base_balance, BASE_CURRENCY),
            ui::StyleType::TotalValue
        )
    );
}
