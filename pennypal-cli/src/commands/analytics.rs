//! Dashboard and analytics commands

use anyhow::Result;
use chrono::{Datelike, Local};
use colored::Colorize;
use pennypal_core::domain::analytics::{Period, Sentiment};
use pennypal_core::domain::TransactionQuery;
use pennypal_core::services::{build_yearly_report, in_base_currency, Dashboard, SpendingAnalysis};
use pennypal_core::Currency;
use rust_decimal::Decimal;
use serde_json::json;

use super::get_signed_in_context;
use super::tx::print_transactions;
use crate::output;

pub fn dashboard(period: Period, json: bool) -> Result<()> {
    let ctx = get_signed_in_context()?;
    let today = Local::now().date_naive();

    let pb = output::spinner("Loading dashboard...", json);
    let result = ctx.analytics_service.dashboard(period, today);
    pb.finish_and_clear();
    let dash = result?;

    if json {
        return output::json(&dash);
    }
    print_dashboard(&dash);
    Ok(())
}

fn print_dashboard(dash: &Dashboard) {
    let base = dash.base_currency;
    println!("{} ({})", dash.label.bold(), base);
    println!();

    let mut table = output::create_table();
    table.set_header(vec!["", "Amount", "vs previous"]);
    table.add_row(vec![
        "Income".to_string(),
        output::money(dash.overview.income, base).green().to_string(),
        output::change(dash.income_change, true),
    ]);
    table.add_row(vec![
        "Expense".to_string(),
        output::money(dash.overview.expense, base).red().to_string(),
        output::change(dash.expense_change, false),
    ]);
    table.add_row(vec![
        "Balance".to_string(),
        balance(dash.overview.balance, base),
        String::new(),
    ]);
    println!("{}", table);

    if !dash.categories.is_empty() {
        println!();
        println!("{}", "Top spending".bold());
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Spent", "Share", ""]);
        for share in &dash.categories {
            table.add_row(vec![
                share.category.clone(),
                output::money(share.total, base),
                format!("{}%", share.percentage),
                output::bar(share.percentage, 20),
            ]);
        }
        println!("{}", table);
    }

    if !dash.recent.is_empty() {
        println!();
        println!("{}", "Recent transactions".bold());
        let recent: Vec<_> = dash.recent.iter().collect();
        print_transactions(&recent);
    }
}

pub fn analytics(year: Option<i32>, month: Option<u32>, insights: bool, json: bool) -> Result<()> {
    let ctx = get_signed_in_context()?;
    let year = year.unwrap_or_else(|| Local::now().year());
    if let Some(month) = month {
        if !(1..=12).contains(&month) {
            anyhow::bail!("Month must be between 1 and 12");
        }
    }

    let pb = output::spinner("Loading transactions...", json);
    let result = ctx.transaction_service.list_all(&TransactionQuery::default());
    pb.finish_and_clear();
    let base = ctx.currency_service.base_currency();
    let txs = in_base_currency(result?, &ctx.currency_service.local_table(), base);
    let report = build_yearly_report(&txs, base, year, month);

    // AI insights, falling back to the local ones when the backend cannot answer
    let ai = if insights {
        let in_year: Vec<_> = txs
            .iter()
            .filter(|t| t.timestamp.is_some_and(|ts| ts.year() == year))
            .cloned()
            .collect();
        let pb = output::spinner("Analyzing spending...", json);
        let analysis = ctx.assistant_service.analyze(&in_year);
        pb.finish_and_clear();
        match analysis {
            Ok(analysis) => Some(analysis),
            Err(e) if e.is_unauthorized() => return Err(e.into()),
            Err(e) => {
                if !json {
                    output::warning(&format!("{} Showing local insights.", e.user_message()));
                }
                None
            }
        }
    } else {
        None
    };

    if json {
        return output::json(&json!({ "report": report, "aiInsights": ai }));
    }

    println!("{} {} ({})", "Analytics".bold(), year, base);
    let mut table = output::create_table();
    table.set_header(vec!["Month", "Income", "Expense", "Net flow"]);
    for (i, label) in report.trend.labels.iter().enumerate() {
        table.add_row(vec![
            label.clone(),
            output::money(report.trend.income[i], base),
            output::money(report.trend.expense[i], base),
            format!("{}%", report.net_flow[i].normalize()),
        ]);
    }
    table.add_row(vec![
        "Total".bold().to_string(),
        output::money(report.overview.income, base).green().to_string(),
        output::money(report.overview.expense, base).red().to_string(),
        balance(report.overview.balance, base),
    ]);
    println!("{}", table);

    if let Some(weekly) = &report.weekly {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Week", "Income", "Expense"]);
        for (i, label) in weekly.labels.iter().enumerate() {
            table.add_row(vec![
                label.clone(),
                output::money(weekly.income[i], base),
                output::money(weekly.expense[i], base),
            ]);
        }
        println!("{}", table);
    }

    if !report.categories.is_empty() {
        println!();
        let mut table = output::create_table();
        table.set_header(vec!["Category", "Spent", "Share", ""]);
        for share in &report.categories {
            table.add_row(vec![
                share.category.clone(),
                output::money(share.total, base),
                format!("{}%", share.percentage),
                output::bar(share.percentage, 20),
            ]);
        }
        println!("{}", table);
    }

    if insights {
        println!();
        match (&ai, &report.insights) {
            (Some(analysis), _) => print_analysis(analysis),
            (None, Some(local)) => {
                println!("{}", "Insights".bold());
                println!("  {}", local.summary);
                println!("  Sentiment: {}", sentiment(local.sentiment));
                if !local.keywords.is_empty() {
                    println!("  Keywords: {}", local.keywords.join(", "));
                }
            }
            (None, None) => println!("No expense transactions in {} to analyze.", year),
        }
    }
    Ok(())
}

pub fn print_analysis(analysis: &SpendingAnalysis) {
    println!("{}", "AI insights".bold());
    if let Some(summary) = &analysis.summary {
        println!("  {}", summary);
    }
    if let Some(s) = analysis.sentiment {
        println!("  Sentiment: {}", sentiment(s));
    }
    if !analysis.keywords.is_empty() {
        println!("  Keywords: {}", analysis.keywords.join(", "));
    }
}

fn sentiment(s: Sentiment) -> String {
    match s {
        Sentiment::Positive => s.label().green().to_string(),
        Sentiment::Neutral => s.label().yellow().to_string(),
        Sentiment::Negative => s.label().red().to_string(),
    }
}

fn balance(amount: Decimal, base: Currency) -> String {
    let text = output::money(amount, base);
    if amount < Decimal::ZERO {
        text.red().bold().to_string()
    } else {
        text.bold().to_string()
    }
}
