//! Service layer - business logic orchestration
//!
//! Each service wraps one backend area and combines it with the pure
//! domain transforms.

mod analytics;
mod assistant;
mod auth;
mod currency;
pub mod logging;
mod receipt;
mod transaction;

pub use analytics::{
    build_dashboard, build_yearly_report, in_base_currency, AnalyticsService, Dashboard,
    YearlyReport,
};
pub use assistant::{AssistantService, Categorization, ChatReply, SpendingAnalysis, FALLBACK_REPLY};
pub use auth::{parse_oauth_callback, AuthOutcome, AuthService};
pub use currency::{Conversion, CurrencyService, RateSnapshot, RateSource};
pub use logging::{EntryPoint, LogEntry, LogEvent, LogStats, LoggingService};
pub use receipt::{scan_from_response, ReceiptScan, ReceiptService};
pub use transaction::{write_csv, TransactionService};
