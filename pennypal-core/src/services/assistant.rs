//! Assistant service - the `/ai` endpoints
//!
//! Chat never fails: any backend error yields a canned reply.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use crate::adapters::http::{ApiArea, ApiClient};
use crate::domain::analytics::{expense_payload, Sentiment};
use crate::domain::result::{Error, Result};
use crate::domain::{ApiEnvelope, Transaction};

pub const FALLBACK_REPLY: &str = "I'm here to help with your finances! Try asking about budgeting, saving money, or expense management.";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatReply {
    pub message: String,
    pub total_tokens: u64,
    /// True when the canned reply was used
    pub fallback: bool,
}

impl ChatReply {
    fn fallback() -> Self {
        Self {
            message: FALLBACK_REPLY.to_string(),
            total_tokens: 0,
            fallback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Categorization {
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// Insights produced by the AI analysis endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpendingAnalysis {
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default, deserialize_with = "lenient_sentiment")]
    pub sentiment: Option<Sentiment>,
}

fn lenient_sentiment<'de, D>(deserializer: D) -> std::result::Result<Option<Sentiment>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    Ok(value.and_then(|s| match s.trim().to_lowercase().as_str() {
        "positive" => Some(Sentiment::Positive),
        "neutral" => Some(Sentiment::Neutral),
        "negative" | "concerning" => Some(Sentiment::Negative),
        _ => None,
    }))
}

pub struct AssistantService {
    api: Arc<ApiClient>,
}

impl AssistantService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// Ask for financial advice; `context` is free text about the user
    pub fn chat(&self, message: &str, context: &str) -> Result<ChatReply> {
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::validation("Message cannot be empty"));
        }

        let reply = self
            .api
            .post(
                "/ai/chat",
                &json!({ "message": message, "context": context }),
                ApiArea::Ai,
                "Failed to get a reply",
            )
            .and_then(ApiEnvelope::from_body)
            .ok()
            .filter(|envelope| envelope.success)
            .and_then(|envelope| envelope.data)
            .and_then(|data| {
                let text = data.get("message").and_then(JsonValue::as_str)?.to_string();
                let tokens = data
                    .pointer("/usage/total_tokens")
                    .and_then(JsonValue::as_u64)
                    .unwrap_or(0);
                Some(ChatReply {
                    message: text,
                    total_tokens: tokens,
                    fallback: false,
                })
            });

        Ok(reply.unwrap_or_else(ChatReply::fallback))
    }

    pub fn categorize(&self, description: &str) -> Result<Categorization> {
        let description = description.trim();
        if description.is_empty() {
            return Err(Error::validation("Description is required"));
        }

        let body = self.api.post(
            "/ai/categorize",
            &json!({ "description": description }),
            ApiArea::Ai,
            "Could not categorize the expense.",
        )?;
        let data = ApiEnvelope::from_body(body)?
            .data
            .unwrap_or(JsonValue::Null);

        let category = data
            .get("category")
            .and_then(JsonValue::as_str)
            .or_else(|| data.as_str())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Other("Could not categorize the expense.".to_string()))?;

        Ok(Categorization {
            category: category.to_string(),
            confidence: data.get("confidence").and_then(JsonValue::as_f64),
        })
    }

    /// Send the first expenses for AI analysis
    pub fn analyze(&self, txs: &[Transaction]) -> Result<SpendingAnalysis> {
        let expenses = expense_payload(txs);
        if expenses.is_empty() {
            return Err(Error::Insight(
                "No expense transactions found for analysis".to_string(),
            ));
        }

        let body = self.api.post(
            "/ai/analyze",
            &json!({ "expenses": expenses }),
            ApiArea::Ai,
            "Failed to analyze spending patterns",
        )?;
        let envelope = ApiEnvelope::from_body(body)?;
        if !envelope.success {
            return Err(Error::Insight(
                envelope.message_or("Failed to analyze spending patterns"),
            ));
        }
        let data = envelope.data.unwrap_or(JsonValue::Null);
        Ok(serde_json::from_value(data).unwrap_or_default())
    }

    /// Provider information from `/ai/`
    pub fn service_info(&self) -> Result<JsonValue> {
        let body = self
            .api
            .get("/ai/", ApiArea::Ai, "Failed to load AI service info")?;
        let envelope = ApiEnvelope::from_body(body)?;
        Ok(envelope.data.unwrap_or(JsonValue::Null))
    }
}
