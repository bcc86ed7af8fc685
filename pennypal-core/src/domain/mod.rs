//! Core domain entities
//!
//! All business entities and pure transforms are defined here. Nothing in
//! this module performs I/O.

pub mod amount;
pub mod analytics;
mod api;
pub mod currency;
pub mod pagination;
pub mod receipt;
pub mod result;
mod transaction;
mod user;
pub mod validation;

pub use api::{error_message, ApiEnvelope};
pub use currency::{format_amount, parse_amount, Currency, RateTable};
pub use receipt::{extract_fields, LineItem, ReceiptFields};
pub use transaction::{
    parse_timestamp, NewTransaction, Transaction, TransactionPage, TransactionQuery,
    TransactionType, DEFAULT_CATEGORY, MAX_TITLE_LEN,
};
pub use user::{ProfileUpdate, User};
