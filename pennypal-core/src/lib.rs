//! PennyPal Core - client logic for the PennyPal personal finance service
//!
//! This crate follows a hexagonal layout:
//!
//! - **domain**: DTOs and pure transforms (currency, receipts, analytics, validation)
//! - **ports**: Trait definitions for external collaborators (SessionStore)
//! - **services**: One service per backend area plus event logging
//! - **adapters**: Concrete implementations (session files, reqwest client)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;

use adapters::http::ApiClient;
use adapters::session::FileSessionStore;
use config::Config;
use ports::SessionStore;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, OperationResult};
pub use domain::{Currency, NewTransaction, Transaction, TransactionType, User};

/// Main context for PennyPal operations
///
/// Holds the configuration, the session store and one instance of every
/// backend service, all sharing a single API client.
pub struct PennypalContext {
    pub config: Config,
    pub session: Arc<dyn SessionStore>,
    pub api: Arc<ApiClient>,
    pub auth_service: AuthService,
    pub transaction_service: Arc<TransactionService>,
    pub receipt_service: ReceiptService,
    pub currency_service: Arc<CurrencyService>,
    pub assistant_service: AssistantService,
    pub analytics_service: AnalyticsService,
}

impl PennypalContext {
    /// Create a context backed by `<pennypal_dir>/settings.json` and
    /// `<pennypal_dir>/session.json`
    pub fn new(pennypal_dir: &Path) -> Result<Self> {
        let config = Config::load(pennypal_dir)?;
        let session: Arc<dyn SessionStore> = Arc::new(FileSessionStore::new(pennypal_dir));
        Self::with_session(config, session)
    }

    /// Create a context over an explicit session store
    pub fn with_session(config: Config, session: Arc<dyn SessionStore>) -> Result<Self> {
        let api = Arc::new(
            ApiClient::new(&config.backend_url, Arc::clone(&session))?
                .with_default_timeout(Duration::from_secs(config.request_timeout_secs)),
        );

        let transaction_service = Arc::new(TransactionService::new(Arc::clone(&api)));
        let currency_service = Arc::new(
            CurrencyService::new(Arc::clone(&api)).with_base_override(config.base_currency),
        );
        let analytics_service = AnalyticsService::new(
            Arc::clone(&transaction_service),
            Arc::clone(&currency_service),
        );

        Ok(Self {
            auth_service: AuthService::new(Arc::clone(&api)),
            receipt_service: ReceiptService::new(Arc::clone(&api)),
            assistant_service: AssistantService::new(Arc::clone(&api)),
            transaction_service,
            currency_service,
            analytics_service,
            config,
            session,
            api,
        })
    }
}
