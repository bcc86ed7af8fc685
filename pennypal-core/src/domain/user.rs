//! User domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::transaction::parse_timestamp;

/// The signed-in user as returned by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawUser")]
pub struct User {
    pub id: String,
    pub username: String,
    pub email: String,
    /// Profile picture as a data URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
}

/// Wire shape accepted from the backend; `_id` and `id` may both appear
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUser {
    #[serde(default)]
    id: Option<JsonValue>,
    #[serde(default, rename = "_id")]
    mongo_id: Option<JsonValue>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    is_verified: Option<bool>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    last_login: Option<String>,
}

fn id_string(value: Option<JsonValue>) -> Option<String> {
    match value? {
        JsonValue::String(s) if !s.is_empty() => Some(s),
        JsonValue::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl From<RawUser> for User {
    fn from(raw: RawUser) -> Self {
        Self {
            id: id_string(raw.id)
                .or_else(|| id_string(raw.mongo_id))
                .unwrap_or_default(),
            username: raw.username.or(raw.name).unwrap_or_default(),
            email: raw.email.unwrap_or_default(),
            image: raw.image.filter(|i| !i.is_empty()),
            is_verified: raw.is_verified.unwrap_or(false),
            created_at: raw.created_at.as_deref().and_then(parse_timestamp),
            last_login: raw.last_login.as_deref().and_then(parse_timestamp),
        }
    }
}

impl User {
    pub fn new(id: impl Into<String>, username: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            username: username.into(),
            email: email.into(),
            image: None,
            is_verified: false,
            created_at: None,
            last_login: None,
        }
    }

    /// Name to greet the user with
    pub fn display_name(&self) -> &str {
        if self.username.trim().is_empty() {
            &self.email
        } else {
            &self.username
        }
    }
}

/// Fields sent when updating the profile
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}
