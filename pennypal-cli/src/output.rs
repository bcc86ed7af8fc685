//! Output formatting utilities

use std::time::Duration;

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, ContentArrangement, Table};
use indicatif::{ProgressBar, ProgressStyle};
use pennypal_core::domain::format_amount;
use pennypal_core::{Currency, Transaction};
use rust_decimal::Decimal;
use serde::Serialize;

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Pretty-printed JSON on stdout
pub fn json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Spinner on stderr while a backend call runs; hidden when `quiet`
pub fn spinner(msg: &str, quiet: bool) -> ProgressBar {
    if quiet || atty::isnt(atty::Stream::Stderr) {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Income in green, expense in red
pub fn signed_amount(tx: &Transaction) -> String {
    let currency = tx.currency().unwrap_or_default();
    let text = format_amount(tx.amount.abs(), currency);
    if tx.is_expense() {
        format!("-{}", text).red().to_string()
    } else {
        format!("+{}", text).green().to_string()
    }
}

pub fn money(amount: Decimal, currency: Currency) -> String {
    format_amount(amount, currency)
}

/// Percent change with an arrow; `None` shows a dash
pub fn change(value: Option<Decimal>, higher_is_good: bool) -> String {
    match value {
        None => "-".dimmed().to_string(),
        Some(v) => {
            let text = format!("{}{}%", if v >= Decimal::ZERO { "▲ " } else { "▼ " }, v.abs().round_dp(1));
            if (v >= Decimal::ZERO) == higher_is_good {
                text.green().to_string()
            } else {
                text.red().to_string()
            }
        }
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Horizontal bar for percentage columns
pub fn bar(percentage: u32, width: usize) -> String {
    let filled = (percentage.min(100) as usize * width) / 100;
    format!("{}{}", "█".repeat(filled), "░".repeat(width - filled))
}
