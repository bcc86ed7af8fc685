//! Backend response envelope

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use super::user::User;

/// Common shape of backend responses: `{ success, data?, message?, token?, user? }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T = JsonValue> {
    #[serde(default = "default_success")]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<User>,
}

fn default_success() -> bool {
    true
}

impl<T> ApiEnvelope<T> {
    /// Message from the backend, or `fallback`
    pub fn message_or(&self, fallback: &str) -> String {
        self.message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(fallback)
            .to_string()
    }
}

impl ApiEnvelope<JsonValue> {
    /// Read a response body as an envelope.
    ///
    /// Bodies that are not JSON objects (bare arrays, strings, empty
    /// responses) become the envelope's `data`.
    pub fn from_body(body: JsonValue) -> crate::domain::result::Result<Self> {
        match body {
            JsonValue::Object(_) => Ok(serde_json::from_value(body)?),
            JsonValue::Null => Ok(Self::with_data(None)),
            other => Ok(Self::with_data(Some(other))),
        }
    }

    fn with_data(data: Option<JsonValue>) -> Self {
        Self {
            success: true,
            data,
            message: None,
            token: None,
            user: None,
        }
    }

    /// `user` from the envelope, falling back to `data.user` or `data`
    pub fn user_or_data(&self) -> Option<User> {
        if let Some(user) = &self.user {
            return Some(user.clone());
        }
        let data = self.data.as_ref()?;
        let candidate = data.get("user").unwrap_or(data);
        if candidate.get("email").is_none() {
            return None;
        }
        serde_json::from_value(candidate.clone()).ok()
    }
}

/// Extract a human-readable message from an error body.
///
/// Looks at `message`, then `error` (string or `{ message }`), then the
/// first entry of an `errors` array.
pub fn error_message(body: &JsonValue) -> Option<String> {
    let non_empty = |s: &str| {
        let s = s.trim();
        (!s.is_empty()).then(|| s.to_string())
    };

    if let Some(msg) = body.get("message").and_then(JsonValue::as_str).and_then(non_empty) {
        return Some(msg);
    }
    match body.get("error") {
        Some(JsonValue::String(s)) => {
            if let Some(msg) = non_empty(s) {
                return Some(msg);
            }
        }
        Some(obj @ JsonValue::Object(_)) => {
            if let Some(msg) = obj.get("message").and_then(JsonValue::as_str).and_then(non_empty) {
                return Some(msg);
            }
        }
        _ => {}
    }
    body.get("errors")
        .and_then(JsonValue::as_array)
        .and_then(|errs| errs.first())
        .and_then(|first| match first {
            JsonValue::String(s) => non_empty(s),
            other => other.get("msg").or_else(|| other.get("message"))?.as_str().and_then(non_empty),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_with_token_and_user() {
        let env: ApiEnvelope = serde_json::from_value(json!({
            "success": true,
            "message": "Login successful",
            "token": "jwt-abc",
            "user": {"id": "1", "username": "ana", "email": "ana@example.com"}
        }))
        .unwrap();

        assert!(env.success);
        assert_eq!(env.token.as_deref(), Some("jwt-abc"));
        assert_eq!(env.user.unwrap().username, "ana");
    }

    #[test]
    fn test_from_body_wraps_non_objects() {
        let env = ApiEnvelope::from_body(json!([1, 2])).unwrap();
        assert!(env.success);
        assert_eq!(env.data, Some(json!([1, 2])));

        let env = ApiEnvelope::from_body(JsonValue::Null).unwrap();
        assert!(env.data.is_none());
    }

    #[test]
    fn test_user_from_data() {
        let env = ApiEnvelope::from_body(json!({
            "success": true,
            "data": {"user": {"_id": "u1", "username": "ana", "email": "ana@example.com"}}
        }))
        .unwrap();
        assert_eq!(env.user_or_data().map(|u| u.id), Some("u1".to_string()));

        let env = ApiEnvelope::from_body(json!({"data": {"count": 3}})).unwrap();
        assert!(env.user_or_data().is_none());
    }

    #[test]
    fn test_message_or_fallback() {
        let env: ApiEnvelope = serde_json::from_value(json!({"message": " "})).unwrap();
        assert!(env.success);
        assert_eq!(env.message_or("Login failed"), "Login failed");
    }

    #[test]
    fn test_error_message_sources() {
        assert_eq!(
            error_message(&json!({"message": "Email already registered"})).as_deref(),
            Some("Email already registered")
        );
        assert_eq!(
            error_message(&json!({"error": "Invalid token"})).as_deref(),
            Some("Invalid token")
        );
        assert_eq!(
            error_message(&json!({"errors": [{"msg": "Password too short"}]})).as_deref(),
            Some("Password too short")
        );
        assert_eq!(error_message(&json!({"success": false})), None);
    }
}
