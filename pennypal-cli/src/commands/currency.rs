//! Currency commands - conversion, rates and the display currency

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use pennypal_core::domain::{format_amount, parse_amount};
use pennypal_core::services::RateSource;
use pennypal_core::Currency;
use serde_json::json;

use super::get_context;
use crate::output;

#[derive(Subcommand)]
pub enum CurrencyCommands {
    /// Convert an amount between currencies
    Convert {
        amount: String,
        from: Currency,
        to: Currency,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show exchange rates against the base currency
    Rates {
        /// Use the built-in table without asking the backend
        #[arg(long)]
        offline: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Ask the backend to refetch exchange rates
    Refresh {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or set the display currency
    Base {
        currency: Option<Currency>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Format an amount the way PennyPal displays it
    Format {
        amount: String,
        #[arg(long)]
        currency: Option<Currency>,
    },
}

pub fn run(command: CurrencyCommands) -> Result<()> {
    let ctx = get_context()?;
    let service = &ctx.currency_service;

    match command {
        CurrencyCommands::Convert {
            amount,
            from,
            to,
            json,
        } => {
            let amount = parse_amount(&amount, from)?;
            let pb = output::spinner("Converting...", json);
            let result = service.convert(amount, from, to);
            pb.finish_and_clear();
            let conversion = result?;

            if json {
                return output::json(&conversion);
            }
            println!(
                "{} = {}",
                format_amount(conversion.amount, from),
                format_amount(conversion.converted, to).bold()
            );
            let source = match conversion.source {
                RateSource::Remote => conversion.source.to_string().green(),
                RateSource::Local => conversion.source.to_string().yellow(),
            };
            match conversion.rate {
                Some(rate) => println!("  1 {} = {} {} ({})", from, rate.normalize(), to, source),
                None => println!("  ({})", source),
            }
        }
        CurrencyCommands::Rates { offline, json } => {
            let base = service.base_currency();
            let remote = if offline {
                None
            } else {
                let pb = output::spinner("Loading rates...", json);
                let result = service.rates();
                pb.finish_and_clear();
                match result {
                    Ok(snapshot) => Some(snapshot),
                    Err(e) if e.is_unauthorized() => return Err(e.into()),
                    Err(e) => {
                        if !json {
                            output::warning(&format!(
                                "{} Showing offline rates.",
                                e.user_message()
                            ));
                        }
                        None
                    }
                }
            };

            // Fetched rates are already folded into the local table
            let table = service.local_table();
            let rows: Vec<(Currency, Option<rust_decimal::Decimal>)> = Currency::ALL
                .iter()
                .copied()
                .filter(|c| *c != base)
                .map(|c| (c, table.rate(base, c).ok()))
                .collect();

            if json {
                let rates: serde_json::Map<String, serde_json::Value> = rows
                    .iter()
                    .map(|(c, r)| (c.code().to_string(), json!(r.map(|r| r.normalize().to_string()))))
                    .collect();
                return output::json(&json!({
                    "base": base,
                    "source": if remote.is_some() { RateSource::Remote } else { RateSource::Local },
                    "rates": rates,
                    "remote": remote,
                }));
            }

            let mut out = output::create_table();
            out.set_header(vec!["Currency", "Symbol", format!("Per 1 {}", base).as_str()]);
            for (currency, rate) in rows {
                out.add_row(vec![
                    currency.code().to_string(),
                    currency.symbol().to_string(),
                    rate.map(|r| r.normalize().to_string()).unwrap_or_else(|| "-".to_string()),
                ]);
            }
            println!("{}", out);
        }
        CurrencyCommands::Refresh { json } => {
            let pb = output::spinner("Refreshing rates...", json);
            let result = service.refresh();
            pb.finish_and_clear();
            let (message, snapshot) = result?;
            if json {
                return output::json(&json!({ "message": message, "rates": snapshot }));
            }
            output::success(&message);
            if !snapshot.rates.is_empty() {
                println!("  {} rates updated", snapshot.rates.len());
            }
        }
        CurrencyCommands::Base { currency, json } => {
            if let Some(currency) = currency {
                service.set_base_currency(currency)?;
                if let Some(pinned) = service.base_override() {
                    output::warning(&format!(
                        "Saved {}, but settings or PENNYPAL_BASE_CURRENCY pin the display currency to {}",
                        currency, pinned
                    ));
                } else if !json {
                    output::success(&format!("Display currency set to {}", currency));
                }
            }
            let base = service.base_currency();
            if json {
                return output::json(&json!({ "baseCurrency": base, "symbol": base.symbol() }));
            }
            if currency.is_none() {
                println!("{} ({})", base.code().bold(), base.symbol());
            }
        }
        CurrencyCommands::Format { amount, currency } => {
            let currency = currency.unwrap_or_else(|| service.base_currency());
            println!("{}", format_amount(parse_amount(&amount, currency)?, currency));
        }
    }

    Ok(())
}
