//! Transaction domain model
//!
//! Transactions are owned by the backend; the client only reads them,
//! builds create/update payloads and aggregates them locally.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::amount::{
    decimal_from_json, serialize_amount, serialize_optional_amount,
};
use super::currency::Currency;
use super::result::{Error, Result};

/// Longest title the transaction form accepts
pub const MAX_TITLE_LEN: usize = 100;

/// Category used when a transaction has none
pub const DEFAULT_CATEGORY: &str = "Other";

/// Income or expense
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(Error::validation(format!(
                "Transaction type must be 'income' or 'expense', got '{}'",
                other
            ))),
        }
    }
}

/// A transaction as returned by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawTransaction")]
pub struct Transaction {
    pub id: String,
    pub title: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    pub category: Option<String>,
    /// ISO code as sent by the backend
    pub currency: String,
    pub timestamp: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
    /// Amount already converted to the user's base currency, when known
    #[serde(
        serialize_with = "serialize_optional_amount",
        skip_serializing_if = "Option::is_none"
    )]
    pub converted_amount: Option<Decimal>,
}

impl Transaction {
    /// Create a transaction with required fields
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        amount: Decimal,
        kind: TransactionType,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            amount,
            kind,
            category: None,
            currency: Currency::default().code().to_string(),
            timestamp: None,
            tags: Vec::new(),
            converted_amount: None,
        }
    }

    pub fn is_expense(&self) -> bool {
        self.kind == TransactionType::Expense
    }

    pub fn is_income(&self) -> bool {
        self.kind == TransactionType::Income
    }

    /// Category name, falling back to `Other`
    pub fn category_or_default(&self) -> &str {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CATEGORY)
    }

    /// Parsed currency code
    pub fn currency(&self) -> Result<Currency> {
        self.currency.parse()
    }

    /// Normalize tags: deduplicate, trim whitespace, remove empty
    pub fn normalize_tags(tags: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut result = Vec::new();

        for tag in tags {
            let trimmed = tag.trim().to_string();
            if !trimmed.is_empty() && seen.insert(trimmed.clone()) {
                result.push(trimmed);
            }
        }

        result
    }
}

/// Wire shape accepted from the backend.
///
/// Older records use `_id`, `description` and `createdAt`; newer ones use
/// `id`, `title` and `timestamp`. Both may be present at once.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTransaction {
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<JsonValue>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    amount: Option<JsonValue>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    tags: Option<Vec<String>>,
    #[serde(default)]
    converted_amount: Option<JsonValue>,
}

fn id_from_json(value: Option<JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl TryFrom<RawTransaction> for Transaction {
    type Error = String;

    fn try_from(raw: RawTransaction) -> std::result::Result<Self, Self::Error> {
        let kind = raw
            .kind
            .as_deref()
            .ok_or_else(|| "transaction is missing 'type'".to_string())?
            .parse::<TransactionType>()
            .map_err(|e| e.to_string())?;

        let amount = raw
            .amount
            .as_ref()
            .and_then(decimal_from_json)
            .ok_or_else(|| "transaction has an invalid 'amount'".to_string())?;

        let timestamp = [raw.timestamp, raw.created_at, raw.date]
            .into_iter()
            .flatten()
            .find_map(|s| parse_timestamp(&s));

        Ok(Transaction {
            id: id_from_json(raw.id)
                .or_else(|| id_from_json(raw.mongo_id))
                .unwrap_or_default(),
            title: raw
                .title
                .filter(|t| !t.trim().is_empty())
                .or(raw.description)
                .unwrap_or_default(),
            amount,
            kind,
            category: raw.category.filter(|c| !c.trim().is_empty()),
            currency: raw
                .currency
                .map(|c| c.trim().to_ascii_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| Currency::default().code().to_string()),
            timestamp,
            tags: Transaction::normalize_tags(&raw.tags.unwrap_or_default()),
            converted_amount: raw.converted_amount.as_ref().and_then(decimal_from_json),
        })
    }
}

/// Parse RFC 3339 timestamps, naive ISO datetimes and plain dates
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(dt.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Payload for creating or updating a transaction
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewTransaction {
    pub title: String,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: Decimal,
    #[serde(rename = "type")]
    pub kind: TransactionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub currency: Currency,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    pub tags: Vec<String>,
}

impl NewTransaction {
    pub fn new(title: impl Into<String>, amount: Decimal, kind: TransactionType) -> Self {
        Self {
            title: title.into(),
            amount,
            kind,
            category: None,
            currency: Currency::default(),
            timestamp: None,
            tags: Vec::new(),
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn with_currency(mut self, currency: Currency) -> Self {
        self.currency = currency;
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    pub fn with_tags(mut self, tags: &[String]) -> Self {
        self.tags = Transaction::normalize_tags(tags);
        self
    }

    /// Check the form rules and normalize fields in place
    pub fn validate(&mut self) -> Result<()> {
        self.title = self.title.trim().to_string();
        if self.title.is_empty() {
            return Err(Error::validation("Title is required"));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(Error::validation(format!(
                "Title must be at most {} characters",
                MAX_TITLE_LEN
            )));
        }
        if self.amount <= Decimal::ZERO {
            return Err(Error::validation("Amount must be greater than zero"));
        }
        self.category = self
            .category
            .take()
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());
        self.tags = Transaction::normalize_tags(&self.tags);
        Ok(())
    }
}

/// Filters for listing transactions, sent as query parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<TransactionType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

/// One page of transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    pub page: u32,
    pub total_pages: u32,
    pub total_records: u64,
    /// Records on this page that could not be read
    #[serde(skip_serializing_if = "is_zero")]
    pub skipped: usize,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

impl TransactionPage {
    /// Build a page from any of the list shapes the backend returns:
    /// a bare array, `{ data: [...] }`, `{ transactions: [...] }` or
    /// `{ data: { transactions: [...], pagination: {...} } }`.
    pub fn from_json(value: JsonValue) -> Result<Self> {
        let (items, pagination) = match value {
            JsonValue::Array(items) => (items, None),
            JsonValue::Object(mut map) => {
                let mut pagination = map.remove("pagination");
                let list = match map.remove("data") {
                    Some(JsonValue::Array(items)) => items,
                    Some(JsonValue::Object(mut inner)) => {
                        if pagination.is_none() {
                            pagination = inner.remove("pagination");
                        }
                        match inner.remove("transactions") {
                            Some(JsonValue::Array(items)) => items,
                            _ => Vec::new(),
                        }
                    }
                    _ => match map.remove("transactions") {
                        Some(JsonValue::Array(items)) => items,
                        _ => Vec::new(),
                    },
                };
                (list, pagination)
            }
            _ => {
                return Err(Error::Other(
                    "Unexpected transaction list response".to_string(),
                ))
            }
        };

        let received = items.len();
        let transactions: Vec<Transaction> = items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect();
        let skipped = received - transactions.len();

        let field = |names: &[&str]| -> Option<u64> {
            let p = pagination.as_ref()?;
            names.iter().find_map(|n| p.get(*n).and_then(JsonValue::as_u64))
        };

        let total_records = field(&["totalRecords", "total", "totalItems"])
            .unwrap_or(transactions.len() as u64);
        let page = field(&["currentPage", "page"]).unwrap_or(1) as u32;
        let total_pages = field(&["totalPages", "pages"]).unwrap_or(1) as u32;

        Ok(Self {
            transactions,
            page,
            total_pages,
            total_records,
            skipped,
        })
    }

    pub fn has_more(&self) -> bool {
        self.page < self.total_pages
    }
}
