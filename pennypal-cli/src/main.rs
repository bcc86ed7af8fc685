//! PennyPal CLI - personal finance in your terminal

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use pennypal_core::domain::analytics::Period;
use pennypal_core::services::LogEvent;

mod commands;
mod output;

use commands::{ai, analytics, auth, currency, logs, profile, receipt, tx};

/// PennyPal - track income, expenses and receipts from your terminal
#[derive(Parser)]
#[command(name = "pennypal", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account
    Signup {
        /// Full name, sent as the username
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with email and password (password from PENNYPAL_PASSWORD or a prompt)
    Signin {
        #[arg(long)]
        email: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign out and forget the stored session
    Signout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the signed-in user
    Whoami {
        /// Reload the profile from the backend
        #[arg(long)]
        refresh: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with Google
    Oauth {
        #[command(subcommand)]
        command: auth::OauthCommands,
    },

    /// Manage your profile and password
    Profile {
        #[command(subcommand)]
        command: profile::ProfileCommands,
    },

    /// Manage transactions
    Tx {
        #[command(subcommand)]
        command: tx::TxCommands,
    },

    /// Receipt scanning
    Receipt {
        #[command(subcommand)]
        command: ReceiptCommands,
    },

    /// Currency conversion and display currency
    Currency {
        #[command(subcommand)]
        command: currency::CurrencyCommands,
    },

    /// Income, expenses and top categories for a period
    Dashboard {
        /// week, month, quarter or year
        #[arg(long, default_value = "month")]
        period: Period,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Monthly trend and category breakdown for a year
    Analytics {
        /// Defaults to the current year
        #[arg(long)]
        year: Option<i32>,
        /// Add a weekly breakdown of this month (1-12)
        #[arg(long)]
        month: Option<u32>,
        /// Include spending insights
        #[arg(long)]
        insights: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Finance assistant
    Ai {
        #[command(subcommand)]
        command: ai::AiCommands,
    },

    /// View and manage the local event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },
}

#[derive(Subcommand)]
enum ReceiptCommands {
    /// Extract merchant, date and total from a receipt photo
    Scan {
        image: PathBuf,
        /// Record the receipt as an expense
        #[arg(long)]
        save: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl Commands {
    /// Name used in log events
    fn name(&self) -> &'static str {
        match self {
            Commands::Signup { .. } => "signup",
            Commands::Signin { .. } => "signin",
            Commands::Signout { .. } => "signout",
            Commands::Whoami { .. } => "whoami",
            Commands::Oauth { .. } => "oauth",
            Commands::Profile { .. } => "profile",
            Commands::Tx { .. } => "tx",
            Commands::Receipt { .. } => "receipt",
            Commands::Currency { .. } => "currency",
            Commands::Dashboard { .. } => "dashboard",
            Commands::Analytics { .. } => "analytics",
            Commands::Ai { .. } => "ai",
            Commands::Logs { .. } => "logs",
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let name = cli.command.name();
    let logger = commands::get_logger();

    // Reading the log should not add to it
    if name != "logs" {
        commands::log_event(&logger, LogEvent::new("command_executed").with_command(name));
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            let message = user_message(&e);
            commands::log_event(
                &logger,
                LogEvent::new(format!("{}_failed", name))
                    .with_command(name)
                    .with_error(message.clone()),
            );
            output::error(&message);
            ExitCode::FAILURE
        }
    }
}

/// Core errors print without their variant prefix
fn user_message(e: &anyhow::Error) -> String {
    match e.downcast_ref::<pennypal_core::Error>() {
        Some(core) if core.is_unauthorized() => format!(
            "{}\nRun `pennypal signin` to sign in again.",
            core.user_message()
        ),
        Some(core) => core.user_message(),
        None => format!("{:#}", e),
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Signup { name, email, json } => auth::signup(name, email, json),
        Commands::Signin { email, json } => auth::signin(email, json),
        Commands::Signout { json } => auth::signout(json),
        Commands::Whoami { refresh, json } => auth::whoami(refresh, json),
        Commands::Oauth { command } => auth::oauth(command),
        Commands::Profile { command } => profile::run(command),
        Commands::Tx { command } => tx::run(command),
        Commands::Receipt { command } => match command {
            ReceiptCommands::Scan { image, save, json } => receipt::scan(&image, save, json),
        },
        Commands::Currency { command } => currency::run(command),
        Commands::Dashboard { period, json } => analytics::dashboard(period, json),
        Commands::Analytics {
            year,
            month,
            insights,
            json,
        } => analytics::analytics(year, month, insights, json),
        Commands::Ai { command } => ai::run(command),
        Commands::Logs { command } => logs::run(command),
    }
}
