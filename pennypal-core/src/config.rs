//! Configuration management
//!
//! Settings live in `<pennypal_dir>/settings.json`:
//! ```json
//! {
//!   "app": { "backendUrl": "https://...", "baseCurrency": "IDR", "requestTimeoutSecs": 30 },
//!   ...
//! }
//! ```
//! Keys the client does not manage are preserved on save.
//! `PENNYPAL_BACKEND` and `PENNYPAL_BASE_CURRENCY` override the file.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::http::{BACKEND_URL_ENV, DEFAULT_BACKEND_URL};
use crate::domain::Currency;

pub const SETTINGS_FILE: &str = "settings.json";
pub const BASE_CURRENCY_ENV: &str = "PENNYPAL_BASE_CURRENCY";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_currency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// PennyPal client configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub backend_url: String,
    /// Display currency from settings or env; the session preference wins
    /// when this is unset
    pub base_currency: Option<Currency>,
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            base_currency: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load config from the PennyPal directory, applying environment overrides
    pub fn load(pennypal_dir: &Path) -> Result<Self> {
        Self::load_with_env(pennypal_dir, |key| std::env::var(key).ok())
    }

    /// Load with an explicit environment lookup
    pub fn load_with_env(pennypal_dir: &Path, env: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let raw = read_settings(pennypal_dir)?;
        let defaults = Self::default();

        let backend_url = env(BACKEND_URL_ENV)
            .or(raw.app.backend_url)
            .map(|u| u.trim().trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .unwrap_or(defaults.backend_url);

        let base_currency = env(BASE_CURRENCY_ENV)
            .or(raw.app.base_currency)
            .and_then(|c| c.parse().ok());

        Ok(Self {
            backend_url,
            base_currency,
            request_timeout_secs: raw
                .app
                .request_timeout_secs
                .filter(|s| *s > 0)
                .unwrap_or(defaults.request_timeout_secs),
        })
    }

    /// Save config to the PennyPal directory, preserving unmanaged settings
    pub fn save(&self, pennypal_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(pennypal_dir)
            .with_context(|| format!("Failed to create {}", pennypal_dir.display()))?;
        let settings_path = pennypal_dir.join(SETTINGS_FILE);

        let mut settings = read_settings(pennypal_dir)?;
        settings.app.backend_url = Some(self.backend_url.clone());
        settings.app.base_currency = self.base_currency.map(|c| c.code().to_string());
        settings.app.request_timeout_secs = Some(self.request_timeout_secs);

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }
}

/// Unreadable JSON is treated as empty settings
fn read_settings(pennypal_dir: &Path) -> Result<SettingsFile> {
    let settings_path = pennypal_dir.join(SETTINGS_FILE);
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_default())
}
