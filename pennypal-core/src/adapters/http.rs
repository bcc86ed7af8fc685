//! PennyPal backend HTTP client
//!
//! Thin blocking wrapper over reqwest that adds the bearer token from the
//! session store, applies per-area timeouts and maps HTTP failures onto
//! [`Error`] variants. A 401 from any endpoint clears the stored session.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::{Client, RequestBuilder};
use reqwest::Method;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::domain::error_message;
use crate::domain::result::{Error, Result};
use crate::ports::SessionStore;

/// Default backend used when nothing is configured
pub const DEFAULT_BACKEND_URL: &str = "https://pennypal-backend.ddns.net";

/// Environment variable overriding the backend URL
pub const BACKEND_URL_ENV: &str = "PENNYPAL_BACKEND";

/// Backend area a request belongs to; each has its own timeout
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiArea {
    Auth,
    Ai,
    Default,
}

impl ApiArea {
    fn timeout(self, default: Duration) -> Duration {
        match self {
            ApiArea::Auth => Duration::from_secs(10),
            ApiArea::Ai => Duration::from_secs(30),
            ApiArea::Default => default,
        }
    }
}

/// Blocking client for the PennyPal backend
pub struct ApiClient {
    client: Client,
    base_url: String,
    session: Arc<dyn SessionStore>,
    default_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, session: Arc<dyn SessionStore>) -> Result<Self> {
        let base_url = base_url.trim().trim_end_matches('/');
        if base_url.is_empty() {
            return Err(Error::Config("Backend URL cannot be empty".to_string()));
        }
        url::Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid backend URL '{}': {}", base_url, e)))?;

        let client = Client::builder()
            .user_agent(concat!("pennypal/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            session,
            default_timeout: Duration::from_secs(30),
        })
    }

    /// Override the timeout used outside the auth and AI areas
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Absolute URL for a backend path
    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get(&self, path: &str, area: ApiArea, fallback: &str) -> Result<JsonValue> {
        self.send(self.request(Method::GET, path, area), area, fallback)
    }

    pub fn get_with_query<Q: Serialize + ?Sized>(
        &self,
        path: &str,
        query: &Q,
        area: ApiArea,
        fallback: &str,
    ) -> Result<JsonValue> {
        self.send(self.request(Method::GET, path, area).query(query), area, fallback)
    }

    pub fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        area: ApiArea,
        fallback: &str,
    ) -> Result<JsonValue> {
        self.send(self.request(Method::POST, path, area).json(body), area, fallback)
    }

    /// POST without a body
    pub fn post_empty(&self, path: &str, area: ApiArea, fallback: &str) -> Result<JsonValue> {
        self.send(self.request(Method::POST, path, area), area, fallback)
    }

    pub fn put<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        area: ApiArea,
        fallback: &str,
    ) -> Result<JsonValue> {
        self.send(self.request(Method::PUT, path, area).json(body), area, fallback)
    }

    pub fn delete(&self, path: &str, area: ApiArea, fallback: &str) -> Result<JsonValue> {
        self.send(self.request(Method::DELETE, path, area), area, fallback)
    }

    /// DELETE with a JSON body (account deletion sends the password)
    pub fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
        area: ApiArea,
        fallback: &str,
    ) -> Result<JsonValue> {
        self.send(self.request(Method::DELETE, path, area).json(body), area, fallback)
    }

    fn request(&self, method: Method, path: &str, area: ApiArea) -> RequestBuilder {
        let mut builder = self
            .client
            .request(method, self.url(path))
            .timeout(area.timeout(self.default_timeout));
        if let Some(token) = self.session.token() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    fn send(&self, builder: RequestBuilder, area: ApiArea, fallback: &str) -> Result<JsonValue> {
        let response = builder
            .send()
            .map_err(|e| self.map_request_error(e, area))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .map_err(|e| self.map_request_error(e, area))?;
        let body = parse_body(&text);

        if (200..300).contains(&status) {
            return Ok(body);
        }

        let mut message = error_message(&body).unwrap_or_else(|| fallback.to_string());
        if status == 401 {
            // Logout-on-401: a rejected token is never reused
            if let Err(e) = self.session.clear() {
                message = format!(
                    "{} (the stored session could not be cleared: {})",
                    message,
                    e.user_message()
                );
            }
        }
        Err(map_status(status, message))
    }

    fn map_request_error(&self, error: reqwest::Error, area: ApiArea) -> Error {
        if error.is_timeout() {
            Error::Transport(format!(
                "Request timed out after {} seconds",
                area.timeout(self.default_timeout).as_secs()
            ))
        } else if error.is_connect() {
            Error::Transport(format!(
                "Unable to connect to PennyPal servers at {}",
                self.base_url
            ))
        } else {
            Error::Transport(format!("Request failed: {}", error))
        }
    }
}

fn parse_body(text: &str) -> JsonValue {
    if text.trim().is_empty() {
        return JsonValue::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| JsonValue::String(text.to_string()))
}

/// Map a non-success status onto an error variant
pub fn map_status(status: u16, message: String) -> Error {
    match status {
        400 | 422 => Error::Validation(message),
        401 => Error::Unauthorized(message),
        403 => Error::Forbidden(message),
        404 => Error::NotFound(message),
        409 => Error::Conflict(message),
        429 => Error::RateLimited(message),
        status => Error::Server { status, message },
    }
}
