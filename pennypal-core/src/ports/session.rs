//! Session storage port
//!
//! Mirrors the browser local storage the web client used: a flat map of
//! string keys to string values holding the bearer token, the signed-in
//! user and the display currency preference.

use crate::domain::result::Result;
use crate::domain::{Currency, User};

pub const TOKEN_KEY: &str = "pennypal_token";
pub const USER_KEY: &str = "pennypal_user";
pub const BASE_CURRENCY_KEY: &str = "pennypal_base_currency";

/// Key/value store for the client session
///
/// Implementations provide `get`, `set` and `remove`; the session helpers
/// are built on top of those.
pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;

    fn set(&self, key: &str, value: &str) -> Result<()>;

    fn remove(&self, key: &str) -> Result<()>;

    /// Bearer token, if signed in
    fn token(&self) -> Option<String> {
        self.get(TOKEN_KEY)
            .ok()
            .flatten()
            .filter(|t| !t.trim().is_empty())
    }

    /// Stored user; a corrupt entry reads as no user
    fn user(&self) -> Option<User> {
        let raw = self.get(USER_KEY).ok().flatten()?;
        serde_json::from_str(&raw).ok()
    }

    /// True when a user entry is stored but cannot be read
    fn has_corrupt_user(&self) -> bool {
        match self.get(USER_KEY) {
            Ok(Some(raw)) => serde_json::from_str::<User>(&raw).is_err(),
            _ => false,
        }
    }

    fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn set_token(&self, token: &str) -> Result<()> {
        self.set(TOKEN_KEY, token)
    }

    fn set_user(&self, user: &User) -> Result<()> {
        self.set(USER_KEY, &serde_json::to_string(user)?)
    }

    /// Store the token and, when known, the user after a successful sign-in
    fn store_login(&self, token: &str, user: Option<&User>) -> Result<()> {
        self.set_token(token)?;
        match user {
            Some(user) => self.set_user(user),
            None => self.remove(USER_KEY),
        }
    }

    /// Remove the token and user; the currency preference survives sign-out
    fn clear(&self) -> Result<()> {
        self.remove(TOKEN_KEY)?;
        self.remove(USER_KEY)
    }

    /// Preferred display currency, `IDR` when unset or unknown
    fn base_currency(&self) -> Currency {
        self.get(BASE_CURRENCY_KEY)
            .ok()
            .flatten()
            .and_then(|c| c.parse().ok())
            .unwrap_or_default()
    }

    fn set_base_currency(&self, currency: Currency) -> Result<()> {
        self.set(BASE_CURRENCY_KEY, currency.code())
    }
}
