//! Profile command - account details, passwords and verification

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Subcommand;
use dialoguer::Confirm;
use pennypal_core::domain::validation::{image_data_url, validate_password_change};
use pennypal_core::domain::ProfileUpdate;

use super::auth::print_user;
use super::{get_context, get_signed_in_context, new_secret, secret, value_or_prompt};
use crate::output;

#[derive(Subcommand)]
pub enum ProfileCommands {
    /// Show the signed-in user's profile
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update username, email or profile picture
    Update {
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        email: Option<String>,
        /// Profile picture (JPEG, PNG, GIF or WebP, up to 5 MB)
        #[arg(long)]
        image: Option<PathBuf>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change password
    Password,
    /// Delete the account permanently
    Delete {
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
    /// Verify the email address with the token from the verification mail
    Verify {
        token: String,
    },
    /// Send the verification mail again
    Resend {
        #[arg(long)]
        email: Option<String>,
    },
    /// Request a password reset mail
    Forgot {
        #[arg(long)]
        email: Option<String>,
    },
    /// Set a new password with the token from the reset mail
    Reset {
        token: String,
    },
}

pub fn run(command: ProfileCommands) -> Result<()> {
    match command {
        ProfileCommands::Show { json } => {
            let ctx = get_signed_in_context()?;
            let pb = output::spinner("Loading profile...", json);
            let user = ctx.auth_service.fetch_profile();
            pb.finish_and_clear();
            let user = user?;
            if json {
                return output::json(&user);
            }
            print_user(&user);
        }
        ProfileCommands::Update {
            username,
            email,
            image,
            json,
        } => {
            let ctx = get_signed_in_context()?;
            let current = ctx
                .auth_service
                .current_user()
                .map(Ok)
                .unwrap_or_else(|| ctx.auth_service.fetch_profile())?;

            let image = match image {
                Some(path) => {
                    let bytes = std::fs::read(&path)
                        .with_context(|| format!("Failed to read {}", path.display()))?;
                    Some(image_data_url(&bytes)?)
                }
                None => None,
            };
            let update = ProfileUpdate {
                username: username.unwrap_or(current.username),
                email: email.unwrap_or(current.email),
                image,
            };

            let outcome = ctx.auth_service.update_profile(&update)?;
            if json {
                return output::json(&outcome);
            }
            output::success(&outcome.message);
            if let Some(user) = &outcome.user {
                print_user(user);
            }
        }
        ProfileCommands::Password => {
            let ctx = get_signed_in_context()?;
            let current = secret("PENNYPAL_PASSWORD", "Current password")?;
            let (new, confirm) = new_secret("PENNYPAL_NEW_PASSWORD", "New password")?;
            validate_password_change(&current, &new, &confirm)?;
            output::success(&ctx.auth_service.change_password(&current, &new)?);
        }
        ProfileCommands::Delete { force } => {
            let ctx = get_signed_in_context()?;
            if !force
                && !Confirm::new()
                    .with_prompt("Delete your account and all transactions? This cannot be undone")
                    .default(false)
                    .interact()?
            {
                println!("Cancelled.");
                return Ok(());
            }
            let password = secret("PENNYPAL_PASSWORD", "Password")?;
            output::success(&ctx.auth_service.delete_account(&password)?);
        }
        ProfileCommands::Verify { token } => {
            let ctx = get_context()?;
            output::success(&ctx.auth_service.verify_email(&token)?);
        }
        ProfileCommands::Resend { email } => {
            let ctx = get_context()?;
            let email = match email.or_else(|| ctx.auth_service.current_user().map(|u| u.email)) {
                Some(email) => email,
                None => value_or_prompt(None, "Email")?,
            };
            output::success(&ctx.auth_service.resend_verification(&email)?);
        }
        ProfileCommands::Forgot { email } => {
            let ctx = get_context()?;
            let email = value_or_prompt(email, "Email")?;
            output::success(&ctx.auth_service.forgot_password(&email)?);
        }
        ProfileCommands::Reset { token } => {
            let ctx = get_context()?;
            let (password, confirm) = new_secret("PENNYPAL_NEW_PASSWORD", "New password")?;
            if password != confirm {
                anyhow::bail!("Passwords do not match");
            }
            output::success(&ctx.auth_service.reset_password(&token, &password)?);
        }
    }

    Ok(())
}
