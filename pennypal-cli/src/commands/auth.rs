//! Auth commands - sign-up, sign-in, sign-out and Google OAuth

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;
use pennypal_core::domain::validation::validate_signup;
use pennypal_core::services::AuthOutcome;
use pennypal_core::User;

use super::{get_context, new_secret, secret, value_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum OauthCommands {
    /// Print the Google sign-in URL
    Url,
    /// Finish Google sign-in with the redirect URL or the bare token
    Callback {
        /// Redirect URL, query string or token
        callback: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

pub fn signup(name: Option<String>, email: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let name = value_or_prompt(name, "Full name")?;
    let email = value_or_prompt(email, "Email")?;
    let (password, confirm) = new_secret("PENNYPAL_PASSWORD", "Password")?;
    validate_signup(&name, &email, &password, &confirm)?;

    let pb = output::spinner("Creating account...", json);
    let outcome = ctx.auth_service.signup(&name, &email, &password);
    pb.finish_and_clear();
    print_outcome(&outcome?, json)
}

pub fn signin(email: Option<String>, json: bool) -> Result<()> {
    let ctx = get_context()?;
    let email = value_or_prompt(email, "Email")?;
    let password = secret("PENNYPAL_PASSWORD", "Password")?;

    let pb = output::spinner("Signing in...", json);
    let outcome = ctx.auth_service.signin(&email, &password);
    pb.finish_and_clear();
    print_outcome(&outcome?, json)
}

pub fn signout(json: bool) -> Result<()> {
    let ctx = get_context()?;
    ctx.auth_service.signout()?;
    if json {
        output::json(&serde_json::json!({"signedOut": true}))
    } else {
        output::success("Signed out");
        Ok(())
    }
}

pub fn whoami(refresh: bool, json: bool) -> Result<()> {
    let ctx = get_context()?;
    if !ctx.auth_service.is_authenticated() {
        if json {
            return output::json(&serde_json::json!({"authenticated": false}));
        }
        println!("Not signed in");
        return Ok(());
    }

    let user = if refresh {
        Some(ctx.auth_service.fetch_profile()?)
    } else {
        ctx.auth_service.current_user()
    };

    if json {
        return output::json(&serde_json::json!({"authenticated": true, "user": user}));
    }
    match user {
        Some(user) => print_user(&user),
        None => println!("Signed in (profile not loaded, try --refresh)"),
    }
    Ok(())
}

pub fn oauth(command: OauthCommands) -> Result<()> {
    let ctx = get_context()?;
    match command {
        OauthCommands::Url => {
            println!("{}", ctx.auth_service.google_auth_url());
        }
        OauthCommands::Callback { callback, json } => {
            let user = ctx.auth_service.handle_oauth_callback(&callback)?;
            if json {
                return output::json(&serde_json::json!({"signedIn": true, "user": user}));
            }
            output::success("Signed in with Google");
            if let Some(user) = user {
                print_user(&user);
            }
        }
    }
    Ok(())
}

fn print_outcome(outcome: &AuthOutcome, json: bool) -> Result<()> {
    if json {
        return output::json(outcome);
    }
    if outcome.signed_in {
        output::success(&outcome.message);
        if let Some(user) = &outcome.user {
            print_user(user);
        }
    } else {
        output::info(&outcome.message);
    }
    Ok(())
}

pub fn print_user(user: &User) {
    println!("{}", user.display_name().bold());
    println!("  Email:    {}", user.email);
    println!(
        "  Verified: {}",
        if user.is_verified { "yes".green() } else { "no".yellow() }
    );
    if let Some(created) = user.created_at {
        println!("  Joined:   {}", created.format("%Y-%m-%d"));
    }
    if let Some(last) = user.last_login {
        println!("  Last login: {}", last.format("%Y-%m-%d %H:%M"));
    }
}
