//! Receipt command - scan a receipt image and optionally save it

use std::path::Path;

use anyhow::{Context, Result};
use colored::Colorize;
use pennypal_core::services::ReceiptScan;
use pennypal_core::Currency;
use serde_json::json;

use super::get_signed_in_context;
use super::tx::print_transactions;
use crate::output;

pub fn scan(image: &Path, save: bool, json: bool) -> Result<()> {
    let ctx = get_signed_in_context()?;
    if !image.exists() {
        anyhow::bail!("File not found: {}", image.display());
    }

    let pb = output::spinner("Scanning receipt...", json);
    let result = ctx.receipt_service.scan_file(image);
    pb.finish_and_clear();
    let scan = result.with_context(|| format!("Failed to scan {}", image.display()))?;

    let base = ctx.currency_service.base_currency();
    let saved = if save {
        let draft = scan.fields.clone().into_draft(base)?;
        Some(ctx.transaction_service.create(draft)?)
    } else {
        None
    };

    if json {
        return output::json(&json!({ "scan": scan, "transaction": saved }));
    }

    print_scan(&scan, base);
    if let Some(tx) = saved {
        println!();
        output::success("Saved as expense");
        print_transactions(&[&tx]);
    } else if scan.fields.total.is_some() {
        println!();
        output::info("Run again with --save to record this receipt as an expense");
    }
    Ok(())
}

fn print_scan(scan: &ReceiptScan, base: Currency) {
    let fields = &scan.fields;
    let currency = fields.currency.unwrap_or(base);
    let unknown = || "-".dimmed().to_string();

    println!("{}", "Receipt".bold());
    println!(
        "  Merchant: {}",
        fields.merchant.clone().unwrap_or_else(unknown)
    );
    println!(
        "  Date:     {}",
        fields
            .date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(unknown)
    );
    println!(
        "  Total:    {}",
        fields
            .total
            .map(|t| output::money(t, currency).bold().to_string())
            .unwrap_or_else(unknown)
    );
    println!(
        "  Category: {}",
        fields.suggested_category.clone().unwrap_or_else(unknown)
    );
    if let Some(confidence) = scan.confidence {
        println!("  OCR confidence: {:.0}%", confidence * 100.0);
    }

    if !fields.line_items.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Item", "Amount"]);
        for item in &fields.line_items {
            table.add_row(vec![item.name.clone(), output::money(item.amount, currency)]);
        }
        println!("{}", table);
    }

    if fields.total.is_none() {
        output::warning("No total found. Enter the expense manually with `pennypal tx add`.");
    }
}
