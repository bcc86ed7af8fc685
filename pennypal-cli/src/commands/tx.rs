//! Transaction commands - list, add, edit, delete, export and search

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveTime};
use clap::{Args, Subcommand};
use colored::Colorize;
use dialoguer::Confirm;
use pennypal_core::domain::analytics::search;
use pennypal_core::domain::pagination::{page_numbers, showing_info, PageItem, DEFAULT_PER_PAGE};
use pennypal_core::domain::{parse_amount, TransactionPage, TransactionQuery};
use pennypal_core::{
    Currency, NewTransaction, OperationResult, PennypalContext, Transaction, TransactionType,
};
use serde_json::json;

use super::get_signed_in_context;
use crate::output;

#[derive(Args, Clone, Default)]
pub struct Filters {
    /// income or expense
    #[arg(long = "type")]
    kind: Option<TransactionType>,
    #[arg(long)]
    category: Option<String>,
    /// Free-text search on the backend
    #[arg(long)]
    search: Option<String>,
    /// First day (YYYY-MM-DD)
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day (YYYY-MM-DD)
    #[arg(long)]
    to: Option<NaiveDate>,
}

impl Filters {
    fn query(&self) -> TransactionQuery {
        TransactionQuery {
            kind: self.kind,
            category: self.category.clone(),
            search: self.search.clone(),
            start_date: self.from,
            end_date: self.to,
            ..Default::default()
        }
    }
}

#[derive(Subcommand)]
pub enum TxCommands {
    /// List transactions one page at a time
    List {
        #[arg(long, default_value = "1")]
        page: u32,
        #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
        limit: u32,
        #[command(flatten)]
        filters: Filters,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Record a new transaction
    Add {
        title: String,
        /// Amount, e.g. 25000 or "Rp 25,000"
        amount: String,
        #[arg(long = "type", default_value = "expense")]
        kind: TransactionType,
        #[arg(long)]
        category: Option<String>,
        /// Ask the assistant for a category when none is given
        #[arg(long)]
        suggest_category: bool,
        /// Defaults to the base currency
        #[arg(long)]
        currency: Option<Currency>,
        /// Defaults to now (YYYY-MM-DD)
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change fields of an existing transaction
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        amount: Option<String>,
        #[arg(long = "type")]
        kind: Option<TransactionType>,
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        currency: Option<Currency>,
        #[arg(long)]
        date: Option<NaiveDate>,
        /// Replace tags (comma-separated)
        #[arg(long, value_delimiter = ',')]
        tags: Option<Vec<String>>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete one or more transactions
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Export transactions as CSV
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
        #[command(flatten)]
        filters: Filters,
    },
    /// Search all transactions by title, category or tag
    Search {
        query: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: TxCommands) -> Result<()> {
    let ctx = get_signed_in_context()?;

    match command {
        TxCommands::List {
            page,
            limit,
            filters,
            json,
        } => {
            let mut query = filters.query();
            query.page = Some(page.max(1));
            query.limit = Some(limit.max(1));

            let pb = output::spinner("Loading transactions...", json);
            let result = ctx.transaction_service.list(&query);
            pb.finish_and_clear();
            let page = result?;

            if json {
                return output::json(&page);
            }
            print_page(&page, limit.max(1));
            if page.skipped > 0 {
                output::warning(&format!(
                    "{} transaction(s) on this page could not be read and were skipped",
                    page.skipped
                ));
            }
        }
        TxCommands::Add {
            title,
            amount,
            kind,
            category,
            suggest_category,
            currency,
            date,
            tags,
            json,
        } => {
            let currency = currency.unwrap_or_else(|| ctx.currency_service.base_currency());
            let mut draft = NewTransaction::new(title, parse_amount(&amount, currency)?, kind)
                .with_currency(currency)
                .with_tags(&tags);

            let category = match category {
                Some(c) => Some(c),
                None if suggest_category => ctx
                    .assistant_service
                    .categorize(&draft.title)
                    .ok()
                    .map(|c| c.category),
                None => None,
            };
            if let Some(category) = category {
                draft = draft.with_category(category);
            }
            if let Some(date) = date {
                draft = draft.with_timestamp(date.and_time(NaiveTime::MIN).and_utc());
            }

            let created = ctx.transaction_service.create(draft)?;
            if json {
                return output::json(&created);
            }
            output::success(&format!("Added transaction {}", created.id));
            print_transactions(&[&created]);
        }
        TxCommands::Edit {
            id,
            title,
            amount,
            kind,
            category,
            currency,
            date,
            tags,
            json,
        } => {
            let existing = find_transaction(&ctx, &id)?;
            let currency = match currency {
                Some(c) => c,
                None => existing.currency()?,
            };
            let amount = match amount {
                Some(text) => parse_amount(&text, currency)?,
                None => existing.amount,
            };

            let mut draft = NewTransaction::new(
                title.unwrap_or(existing.title),
                amount,
                kind.unwrap_or(existing.kind),
            )
            .with_currency(currency)
            .with_tags(&tags.unwrap_or(existing.tags));
            if let Some(category) = category.or(existing.category) {
                draft = draft.with_category(category);
            }
            let timestamp = date
                .map(|d| d.and_time(NaiveTime::MIN).and_utc())
                .or(existing.timestamp);
            if let Some(timestamp) = timestamp {
                draft = draft.with_timestamp(timestamp);
            }

            let updated = ctx.transaction_service.update(&id, draft)?;
            if json {
                return output::json(&updated);
            }
            output::success("Transaction updated");
            print_transactions(&[&updated]);
        }
        TxCommands::Delete { ids, force, json } => {
            if !force
                && !json
                && !Confirm::new()
                    .with_prompt(format!("Delete {} transaction(s)?", ids.len()))
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }

            let results: Vec<(String, OperationResult<String>)> = ids
                .into_iter()
                .map(|id| {
                    let result = ctx.transaction_service.delete(&id).into();
                    (id, result)
                })
                .collect();
            let failed = results.iter().filter(|(_, r)| !r.success).count();

            if json {
                let entries: Vec<_> = results
                    .iter()
                    .map(|(id, r)| json!({ "id": id, "result": r }))
                    .collect();
                output::json(&entries)?;
            } else {
                for (id, result) in &results {
                    match (&result.data, &result.error) {
                        (Some(message), _) => println!("{} {}: {}", "✓".green(), id, message),
                        (_, error) => println!(
                            "{} {}: {}",
                            "✗".red(),
                            id,
                            error.as_deref().unwrap_or("Unknown error")
                        ),
                    }
                }
            }
            if failed > 0 {
                anyhow::bail!("Failed to delete {} transaction(s)", failed);
            }
        }
        TxCommands::Export { output: path, filters } => {
            let quiet = path.is_none();
            let pb = output::spinner("Fetching transactions...", quiet);
            let result = ctx.transaction_service.list_all(&filters.query());
            pb.finish_and_clear();
            let txs = result?;

            match path {
                Some(path) => {
                    let file = std::fs::File::create(&path)
                        .with_context(|| format!("Failed to create {}", path.display()))?;
                    let written = ctx.transaction_service.export_csv(&txs, file)?;
                    output::success(&format!(
                        "Exported {} transactions to {}",
                        written,
                        path.display()
                    ));
                }
                None => {
                    ctx.transaction_service
                        .export_csv(&txs, std::io::stdout().lock())?;
                }
            }
        }
        TxCommands::Search { query, json } => {
            let pb = output::spinner("Searching...", json);
            let result = ctx.transaction_service.list_all(&TransactionQuery::default());
            pb.finish_and_clear();
            let txs = result?;
            let matches = search(&txs, &query);

            if json {
                return output::json(&matches);
            }
            if matches.is_empty() {
                println!("No transactions match '{}'", query);
                return Ok(());
            }
            print_transactions(&matches);
            println!("{} of {} transactions", matches.len(), txs.len());
        }
    }

    Ok(())
}

/// No single-transaction endpoint exists, so the id is looked up in the full list
fn find_transaction(ctx: &PennypalContext, id: &str) -> Result<Transaction> {
    let id = id.trim();
    ctx.transaction_service
        .list_all(&TransactionQuery::default())?
        .into_iter()
        .find(|t| t.id == id)
        .with_context(|| format!("Transaction not found: {}", id))
}

pub fn print_transactions(txs: &[&Transaction]) {
    let mut table = output::create_table();
    table.set_header(vec!["ID", "Date", "Title", "Category", "Amount", "Tags"]);
    for tx in txs {
        table.add_row(vec![
            tx.id.clone(),
            tx.timestamp
                .map(|t| t.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
            tx.title.clone(),
            tx.category_or_default().to_string(),
            output::signed_amount(tx),
            tx.tags.join(", "),
        ]);
    }
    println!("{}", table);
}

fn print_page(page: &TransactionPage, per_page: u32) {
    if page.transactions.is_empty() {
        println!("No transactions found.");
        return;
    }
    let rows: Vec<&Transaction> = page.transactions.iter().collect();
    print_transactions(&rows);

    let pages: Vec<String> = page_numbers(page.page, page.total_pages)
        .into_iter()
        .map(|item| match item {
            PageItem::Page(n) if n == page.page => format!("[{}]", n).bold().to_string(),
            other => other.to_string(),
        })
        .collect();
    println!(
        "{}    {}",
        showing_info(page.page, per_page, page.total_records).dimmed(),
        pages.join(" ")
    );
}
