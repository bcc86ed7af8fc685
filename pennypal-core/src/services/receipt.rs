//! Receipt service - OCR scanning through the backend
//!
//! The image is validated locally, sent as a base64 data URL to
//! `/ocr/receipt`, and the fields returned by the backend are completed
//! with the local text heuristics.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};

use crate::adapters::http::{ApiArea, ApiClient};
use crate::domain::amount::decimal_from_json;
use crate::domain::receipt::{parse_date, parse_receipt_number};
use crate::domain::result::Result;
use crate::domain::validation::image_data_url;
use crate::domain::{extract_fields, parse_timestamp, ApiEnvelope, LineItem, ReceiptFields};

const TEXT_KEYS: [&str; 5] = ["text", "rawText", "extractedText", "fullText", "ocrText"];
const MERCHANT_KEYS: [&str; 4] = ["merchant", "merchantName", "storeName", "store"];
const TOTAL_KEYS: [&str; 4] = ["total", "totalAmount", "amount", "grandTotal"];
const ITEM_KEYS: [&str; 2] = ["items", "lineItems"];

/// Result of scanning one receipt
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptScan {
    /// Raw OCR text, empty when the backend returned none
    pub text: String,
    pub fields: ReceiptFields,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

pub struct ReceiptService {
    api: Arc<ApiClient>,
}

impl ReceiptService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    pub fn scan(&self, image: &[u8], filename: &str) -> Result<ReceiptScan> {
        let image_data = image_data_url(image)?;
        let body = self.api.post(
            "/ocr/receipt",
            &json!({
                "imageData": image_data,
                "filename": filename,
                "useGoogleVision": true,
            }),
            ApiArea::Ai,
            "Failed to scan receipt",
        )?;

        let envelope = ApiEnvelope::from_body(body)?;
        let data = envelope.data.unwrap_or(JsonValue::Null);
        Ok(scan_from_response(&data))
    }

    pub fn scan_file(&self, path: &Path) -> Result<ReceiptScan> {
        let image = std::fs::read(path)?;
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("receipt.jpg");
        self.scan(&image, filename)
    }
}

/// Combine backend-extracted fields with the local heuristics
pub fn scan_from_response(data: &JsonValue) -> ReceiptScan {
    let text = first_str(data, &TEXT_KEYS).unwrap_or_default();
    let remote = remote_fields(data);
    let fields = remote.merge(extract_fields(&text));

    ReceiptScan {
        text,
        fields,
        confidence: data.get("confidence").and_then(JsonValue::as_f64),
    }
}

fn first_str(data: &JsonValue, keys: &[&str]) -> Option<String> {
    keys.iter()
        .find_map(|k| data.get(*k).and_then(JsonValue::as_str))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn amount_value(value: &JsonValue) -> Option<rust_decimal::Decimal> {
    decimal_from_json(value).or_else(|| value.as_str().and_then(parse_receipt_number))
}

fn date_value(value: &str) -> Option<NaiveDate> {
    parse_timestamp(value)
        .map(|t| t.date_naive())
        .or_else(|| parse_date(value))
}

fn remote_fields(data: &JsonValue) -> ReceiptFields {
    let total = TOTAL_KEYS
        .iter()
        .find_map(|k| data.get(*k).and_then(amount_value));

    let line_items = ITEM_KEYS
        .iter()
        .find_map(|k| data.get(*k).and_then(JsonValue::as_array))
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let name = first_str(item, &["name", "description"])?;
                    let amount = ["amount", "price", "total"]
                        .iter()
                        .find_map(|k| item.get(*k).and_then(amount_value))?;
                    Some(LineItem { name, amount })
                })
                .collect()
        })
        .unwrap_or_default();

    ReceiptFields {
        merchant: first_str(data, &MERCHANT_KEYS),
        total,
        date: first_str(data, &["date", "transactionDate"]).and_then(|d| date_value(&d)),
        currency: first_str(data, &["currency"]).and_then(|c| c.parse().ok()),
        suggested_category: first_str(data, &["category", "suggestedCategory"]),
        line_items,
    }
}
