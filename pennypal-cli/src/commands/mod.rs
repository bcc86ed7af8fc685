//! CLI command implementations

pub mod ai;
pub mod analytics;
pub mod auth;
pub mod currency;
pub mod logs;
pub mod profile;
pub mod receipt;
pub mod tx;

use std::path::PathBuf;

use anyhow::{Context, Result};
use dialoguer::{Input, Password};
use pennypal_core::ports::SessionStore;
use pennypal_core::services::{EntryPoint, LogEvent, LoggingService};
use pennypal_core::PennypalContext;

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<LoggingService> {
    let pennypal_dir = get_pennypal_dir().ok()?;
    std::fs::create_dir_all(&pennypal_dir).ok()?;
    LoggingService::new(&pennypal_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION")).ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<LoggingService>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the PennyPal directory from `PENNYPAL_DIR` or `~/.pennypal`
pub fn get_pennypal_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("PENNYPAL_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".pennypal"))
        .context("Could not find home directory")
}

/// Build the context over the PennyPal directory
pub fn get_context() -> Result<PennypalContext> {
    let pennypal_dir = get_pennypal_dir()?;
    std::fs::create_dir_all(&pennypal_dir)
        .with_context(|| format!("Failed to create PennyPal directory: {:?}", pennypal_dir))?;

    let ctx =
        PennypalContext::new(&pennypal_dir).context("Failed to initialize PennyPal context")?;
    if ctx.session.has_corrupt_user() {
        log_event(
            &get_logger(),
            LogEvent::new("session_user_unreadable").with_area("session"),
        );
    }
    Ok(ctx)
}

/// Context for commands that need a signed-in user
pub fn get_signed_in_context() -> Result<PennypalContext> {
    let ctx = get_context()?;
    if !ctx.auth_service.is_authenticated() {
        anyhow::bail!("Not signed in. Run `pennypal signin` first.");
    }
    Ok(ctx)
}

/// Use the flag value, or prompt for it on the terminal
pub fn value_or_prompt(value: Option<String>, prompt: &str) -> Result<String> {
    match value {
        Some(v) => Ok(v),
        None => Ok(Input::<String>::new().with_prompt(prompt).interact_text()?),
    }
}

/// Secrets are read from the environment variable or a hidden prompt,
/// never from argv
pub fn secret(env_var: &str, prompt: &str) -> Result<String> {
    if let Ok(value) = std::env::var(env_var) {
        return Ok(value);
    }
    Ok(Password::new().with_prompt(prompt).interact()?)
}

/// Hidden prompt asked twice; the values must match
pub fn new_secret(env_var: &str, prompt: &str) -> Result<(String, String)> {
    if let Ok(value) = std::env::var(env_var) {
        return Ok((value.clone(), value));
    }
    let first = Password::new().with_prompt(prompt).interact()?;
    let confirm = Password::new().with_prompt("Confirm password").interact()?;
    Ok((first, confirm))
}
