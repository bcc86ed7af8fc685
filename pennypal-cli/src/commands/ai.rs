//! AI assistant commands

use std::io::{self, BufRead, Write};

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use pennypal_core::domain::TransactionQuery;
use serde_json::json;

use super::analytics::print_analysis;
use super::{get_context, get_signed_in_context};
use crate::output;

#[derive(Subcommand)]
pub enum AiCommands {
    /// Ask the finance assistant; starts an interactive session without a message
    Chat {
        message: Option<String>,
        /// Extra context sent with every message
        #[arg(long, default_value = "")]
        context: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Suggest a category for an expense description
    Categorize {
        description: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze recent expenses
    Analyze {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show which AI provider the backend uses
    Info {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn run(command: AiCommands) -> Result<()> {
    match command {
        AiCommands::Chat {
            message,
            context,
            json,
        } => {
            let ctx = get_signed_in_context()?;
            let assistant = &ctx.assistant_service;

            if let Some(message) = message {
                let pb = output::spinner("Thinking...", json);
                let reply = assistant.chat(&message, &context);
                pb.finish_and_clear();
                let reply = reply?;
                if json {
                    return output::json(&reply);
                }
                println!("{}", reply.message);
                return Ok(());
            }

            println!("{}", "PennyPal assistant. Empty line or Ctrl-D to quit.".dimmed());
            let stdin = io::stdin();
            loop {
                print!("{} ", ">".cyan().bold());
                io::stdout().flush()?;
                let mut line = String::new();
                if stdin.lock().read_line(&mut line)? == 0 || line.trim().is_empty() {
                    break;
                }
                let pb = output::spinner("Thinking...", false);
                let reply = assistant.chat(&line, &context);
                pb.finish_and_clear();
                match reply {
                    Ok(reply) => println!("{}\n", reply.message),
                    Err(e) => output::error(&e.user_message()),
                }
            }
        }
        AiCommands::Categorize { description, json } => {
            let ctx = get_signed_in_context()?;
            let result = ctx.assistant_service.categorize(&description)?;
            if json {
                return output::json(&result);
            }
            match result.confidence {
                Some(c) => println!("{} ({:.0}% confident)", result.category.bold(), c * 100.0),
                None => println!("{}", result.category.bold()),
            }
        }
        AiCommands::Analyze { json } => {
            let ctx = get_signed_in_context()?;
            let pb = output::spinner("Analyzing spending...", json);
            let analysis = ctx
                .transaction_service
                .list_all(&TransactionQuery::default())
                .and_then(|txs| ctx.assistant_service.analyze(&txs));
            pb.finish_and_clear();
            let analysis = analysis?;
            if json {
                return output::json(&analysis);
            }
            print_analysis(&analysis);
        }
        AiCommands::Info { json } => {
            let ctx = get_context()?;
            let info = ctx.assistant_service.service_info()?;
            if json {
                return output::json(&json!({ "service": info }));
            }
            match info.as_object() {
                Some(map) if !map.is_empty() => {
                    for (key, value) in map {
                        let value = value
                            .as_str()
                            .map(str::to_string)
                            .unwrap_or_else(|| value.to_string());
                        println!("  {}: {}", key.bold(), value);
                    }
                }
                _ => println!("{}", info),
            }
        }
    }

    Ok(())
}
