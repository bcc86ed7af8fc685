//! Auth service - sign-in, sign-up, OAuth and profile management
//!
//! Successful sign-in stores the token and user in the session store.
//! Sign-out and account deletion always clear the local session, even
//! when the backend call fails.

use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use crate::adapters::http::{ApiArea, ApiClient};
use crate::domain::result::{Error, Result};
use crate::domain::validation::{
    validate_email, validate_name, validate_password_strength, validate_username,
};
use crate::domain::{ApiEnvelope, ProfileUpdate, User};

/// Outcome of a sign-in or sign-up call
#[derive(Debug, Clone, Serialize)]
pub struct AuthOutcome {
    pub message: String,
    /// False when the backend accepted the request without issuing a token,
    /// e.g. when the email must be verified first
    pub signed_in: bool,
    pub user: Option<User>,
}

/// Service for the `/auth` backend area
pub struct AuthService {
    api: Arc<ApiClient>,
}

impl AuthService {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    /// The free-text name is sent as `username`
    pub fn signup(&self, name: &str, email: &str, password: &str) -> Result<AuthOutcome> {
        validate_name(name)?;
        validate_email(email)?;
        if password.is_empty() {
            return Err(Error::validation("Password is required"));
        }

        let body = self.api.post(
            "/auth/signup",
            &json!({
                "username": name.trim(),
                "email": email.trim(),
                "password": password,
            }),
            ApiArea::Auth,
            "Registration failed",
        )?;
        self.finish_login(body, "Registration successful")
    }

    pub fn signin(&self, email: &str, password: &str) -> Result<AuthOutcome> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(Error::validation("Email and password are required"));
        }

        let body = self.api.post(
            "/auth/signin",
            &json!({ "email": email.trim(), "password": password }),
            ApiArea::Auth,
            "Login failed",
        )?;
        self.finish_login(body, "Login successful")
    }

    fn finish_login(&self, body: serde_json::Value, default_message: &str) -> Result<AuthOutcome> {
        let envelope = ApiEnvelope::from_body(body)?;
        let user = envelope.user_or_data();
        let token = envelope.token.as_deref().filter(|t| !t.trim().is_empty());

        if let Some(token) = token {
            self.api.session().store_login(token, user.as_ref())?;
        }

        Ok(AuthOutcome {
            message: envelope.message_or(default_message),
            signed_in: token.is_some(),
            user,
        })
    }

    /// Tell the backend and clear the local session regardless of the answer
    pub fn signout(&self) -> Result<()> {
        // A failed remote call still ends the local session
        let _ = self
            .api
            .post_empty("/auth/signout", ApiArea::Auth, "Logout failed");
        self.api.session().clear()
    }

    /// User stored at sign-in, without contacting the backend
    pub fn current_user(&self) -> Option<User> {
        self.api.session().user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.api.session().is_authenticated()
    }

    pub fn token(&self) -> Option<String> {
        self.api.session().token()
    }

    /// Exchange the current token for a new one; signs out on failure
    pub fn refresh_token(&self) -> Result<String> {
        let result = self
            .api
            .post_empty("/auth/refresh", ApiArea::Auth, "Token refresh failed")
            .and_then(ApiEnvelope::from_body);

        match result {
            Ok(envelope) => {
                if let Some(token) = envelope.token.as_deref().filter(|t| !t.trim().is_empty()) {
                    self.api.session().set_token(token)?;
                }
                self.token()
                    .ok_or_else(|| Error::Unauthorized("Token refresh failed".to_string()))
            }
            Err(e) => {
                self.signout()?;
                Err(e)
            }
        }
    }

    pub fn forgot_password(&self, email: &str) -> Result<String> {
        validate_email(email)?;
        self.post_message(
            "/auth/forgot-password",
            json!({ "email": email.trim() }),
            "Failed to send reset email",
            "Password reset email sent",
        )
    }

    pub fn reset_password(&self, token: &str, password: &str) -> Result<String> {
        if token.trim().is_empty() {
            return Err(Error::validation("Reset token is required"));
        }
        validate_password_strength(password)?;
        self.post_message(
            "/auth/reset-password",
            json!({ "token": token.trim(), "password": password }),
            "Password reset failed",
            "Password has been reset",
        )
    }

    pub fn change_password(&self, current: &str, new: &str) -> Result<String> {
        if current.is_empty() {
            return Err(Error::validation("Current password is required"));
        }
        validate_password_strength(new)?;
        self.post_message(
            "/auth/change-password",
            json!({ "currentPassword": current, "newPassword": new }),
            "Password change failed",
            "Password changed successfully",
        )
    }

    pub fn verify_email(&self, token: &str) -> Result<String> {
        if token.trim().is_empty() {
            return Err(Error::validation("Verification token is required"));
        }
        self.post_message(
            "/auth/verify-email",
            json!({ "token": token.trim() }),
            "Email verification failed",
            "Email verified",
        )
    }

    pub fn resend_verification(&self, email: &str) -> Result<String> {
        validate_email(email)?;
        self.post_message(
            "/auth/resend-verification",
            json!({ "email": email.trim() }),
            "Failed to resend verification email",
            "Verification email sent",
        )
    }

    fn post_message(
        &self,
        path: &str,
        body: serde_json::Value,
        fallback: &str,
        success: &str,
    ) -> Result<String> {
        let response = self.api.post(path, &body, ApiArea::Auth, fallback)?;
        Ok(ApiEnvelope::from_body(response)?.message_or(success))
    }

    /// Address that starts the Google sign-in flow in a browser
    pub fn google_auth_url(&self) -> String {
        self.api.url("/auth/google")
    }

    /// Complete an OAuth redirect.
    ///
    /// Accepts the full callback URL, its query string, or a bare token.
    /// The token is stored first; the user is then fetched from `/auth/me`
    /// and stored when the backend returns one.
    pub fn handle_oauth_callback(&self, callback: &str) -> Result<Option<User>> {
        let token = parse_oauth_callback(callback)?;
        self.api.session().store_login(&token, None)?;

        let user = self.fetch_profile().ok();
        Ok(user)
    }

    /// Fetch the signed-in user and refresh the stored copy
    pub fn fetch_profile(&self) -> Result<User> {
        let body = self
            .api
            .get("/auth/me", ApiArea::Auth, "Failed to load profile")?;
        let user = ApiEnvelope::from_body(body)?
            .user_or_data()
            .ok_or_else(|| Error::Other("Profile response did not include a user".to_string()))?;
        self.api.session().set_user(&user)?;
        Ok(user)
    }

    pub fn update_profile(&self, update: &ProfileUpdate) -> Result<AuthOutcome> {
        validate_username(&update.username)?;
        validate_email(&update.email)?;
        if let Some(image) = &update.image {
            if !image.starts_with("data:image/") {
                return Err(Error::validation("Profile image must be an image data URL"));
            }
        }

        let body = self
            .api
            .put("/auth/profile", update, ApiArea::Auth, "Profile update failed")?;
        let envelope = ApiEnvelope::from_body(body)?;
        let user = envelope.user_or_data();
        if let Some(user) = &user {
            self.api.session().set_user(user)?;
        }

        Ok(AuthOutcome {
            message: envelope.message_or("Profile updated successfully"),
            signed_in: self.is_authenticated(),
            user,
        })
    }

    /// Permanently delete the account; the local session is cleared on success
    pub fn delete_account(&self, password: &str) -> Result<String> {
        if password.is_empty() {
            return Err(Error::validation("Password is required to delete your account"));
        }
        let body = self.api.delete_with_body(
            "/auth/account",
            &json!({ "password": password }),
            ApiArea::Auth,
            "Account deletion failed",
        )?;
        self.api.session().clear()?;
        Ok(ApiEnvelope::from_body(body)?.message_or("Account deleted"))
    }
}

/// Pull the token out of an OAuth redirect
pub fn parse_oauth_callback(callback: &str) -> Result<String> {
    let callback = callback.trim();
    if callback.is_empty() {
        return Err(Error::Unauthorized(
            "Authentication failed - no token received.".to_string(),
        ));
    }

    let query = if let Some((_, query)) = callback.split_once('?') {
        query
    } else if callback.contains('=') {
        callback
    } else {
        return Ok(callback.to_string());
    };

    let params: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect();
    let param = |name: &str| {
        params
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.trim().to_string())
    };

    if param("error").is_some() {
        return Err(Error::Unauthorized(
            "Google authentication failed. Please try again.".to_string(),
        ));
    }
    param("token")
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::Unauthorized("Authentication failed - no token received.".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::mock_backend::MockBackend;
    use crate::adapters::session::MemorySessionStore;
    use crate::ports::SessionStore;

    fn service(server: &MockBackend, session: Arc<MemorySessionStore>) -> AuthService {
        let api = ApiClient::new(&server.base_url(), session).unwrap();
        AuthService::new(Arc::new(api))
    }

    fn login_body() -> serde_json::Value {
        json!({
            "success": true,
            "message": "Login successful",
            "token": "jwt-123",
            "user": {"_id": "u1", "username": "ana", "email": "ana@example.com"}
        })
    }

    #[test]
    fn test_signin_stores_session() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/signin", 200, login_body());
        let session = Arc::new(MemorySessionStore::new());
        let auth = service(&server, session.clone());

        let outcome = auth.signin("ana@example.com", "Secret@123").unwrap();

        assert!(outcome.signed_in);
        assert_eq!(outcome.message, "Login successful");
        assert_eq!(session.token().as_deref(), Some("jwt-123"));
        assert_eq!(auth.current_user().unwrap().username, "ana");
        assert_eq!(server.last_request().unwrap().body["email"], "ana@example.com");
    }

    #[test]
    fn test_signup_sends_username_and_validates_first() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/signup", 201, json!({"success": true, "message": "Check your email"}));
        let session = Arc::new(MemorySessionStore::new());
        let auth = service(&server, session.clone());

        let err = auth.signup("ana", "not-an-email", "Secret@123").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert!(server.requests().is_empty());

        let outcome = auth.signup("ana", "ana@example.com", "Secret@123").unwrap();
        assert!(!outcome.signed_in);
        assert_eq!(outcome.message, "Check your email");
        assert_eq!(server.last_request().unwrap().body["username"], "ana");
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_signup_accepts_full_name_and_plain_password() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/signup", 201, json!({"success": true, "message": "Registered"}));
        let auth = service(&server, Arc::new(MemorySessionStore::new()));

        let outcome = auth.signup("John Doe", "john@example.com", "password123").unwrap();
        assert_eq!(outcome.message, "Registered");
        let request = server.last_request().unwrap();
        assert_eq!(request.body["username"], "John Doe");
        assert_eq!(request.body["password"], "password123");

        let err = auth.signup("   ", "john@example.com", "password123").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_signin_failure_uses_backend_message() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/signin", 401, json!({"message": "Invalid credentials"}));
        let auth = service(&server, Arc::new(MemorySessionStore::new()));

        let err = auth.signin("ana@example.com", "nope").unwrap_err();
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_signout_clears_even_when_backend_fails() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/signout", 500, json!({}));
        let session = Arc::new(MemorySessionStore::with_token("jwt"));
        let auth = service(&server, session.clone());

        auth.signout().unwrap();
        assert!(!session.is_authenticated());
    }

    #[test]
    fn test_refresh_failure_signs_out() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/refresh", 500, json!({}));
        let session = Arc::new(MemorySessionStore::with_token("old"));
        let auth = service(&server, session.clone());

        assert!(auth.refresh_token().is_err());
        assert!(!session.is_authenticated());
        assert_eq!(server.requests_to("/auth/signout").len(), 1);
    }

    #[test]
    fn test_refresh_replaces_token() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/refresh", 200, json!({"token": "new"}));
        let session = Arc::new(MemorySessionStore::with_token("old"));
        let auth = service(&server, session.clone());

        assert_eq!(auth.refresh_token().unwrap(), "new");
        assert_eq!(
            server.last_request().unwrap().authorization.as_deref(),
            Some("Bearer old")
        );
    }

    #[test]
    fn test_oauth_callback_stores_token_and_user() {
        let server = MockBackend::start().unwrap();
        server.on(
            "GET",
            "/auth/me",
            200,
            json!({"success": true, "user": {"id": "g1", "username": "gina", "email": "gina@example.com"}}),
        );
        let session = Arc::new(MemorySessionStore::new());
        let auth = service(&server, session.clone());

        let user = auth
            .handle_oauth_callback("http://localhost:5173/oauth?token=tok-9")
            .unwrap();

        assert_eq!(user.unwrap().username, "gina");
        assert_eq!(session.token().as_deref(), Some("tok-9"));
        assert_eq!(
            server.last_request().unwrap().authorization.as_deref(),
            Some("Bearer tok-9")
        );
    }

    #[test]
    fn test_oauth_callback_keeps_token_when_profile_fails() {
        let server = MockBackend::start().unwrap();
        server.on("GET", "/auth/me", 500, json!({}));
        let session = Arc::new(MemorySessionStore::new());
        let auth = service(&server, session.clone());

        assert_eq!(auth.handle_oauth_callback("tok-1").unwrap(), None);
        assert_eq!(session.token().as_deref(), Some("tok-1"));
    }

    #[test]
    fn test_parse_oauth_callback() {
        assert_eq!(parse_oauth_callback("?token=abc").unwrap(), "abc");
        assert_eq!(parse_oauth_callback("token=abc&x=1").unwrap(), "abc");
        assert_eq!(parse_oauth_callback("raw-token").unwrap(), "raw-token");

        let err = parse_oauth_callback("https://app/oauth?error=access_denied").unwrap_err();
        assert!(err.user_message().contains("Google authentication failed"));
        let err = parse_oauth_callback("https://app/oauth?state=1").unwrap_err();
        assert!(err.user_message().contains("no token received"));
    }

    #[test]
    fn test_update_profile_stores_returned_user() {
        let server = MockBackend::start().unwrap();
        server.on(
            "PUT",
            "/auth/profile",
            200,
            json!({"success": true, "user": {"id": "u1", "username": "ana_b", "email": "ana@example.com"}}),
        );
        let session = Arc::new(MemorySessionStore::with_token("jwt"));
        let auth = service(&server, session.clone());

        let update = ProfileUpdate {
            username: "ana_b".to_string(),
            email: "ana@example.com".to_string(),
            image: None,
        };
        let outcome = auth.update_profile(&update).unwrap();

        assert_eq!(outcome.message, "Profile updated successfully");
        assert_eq!(session.user().unwrap().username, "ana_b");
        assert!(server.last_request().unwrap().body.get("image").is_none());
    }

    #[test]
    fn test_delete_account_clears_session() {
        let server = MockBackend::start().unwrap();
        server.on("DELETE", "/auth/account", 200, json!({"message": "Account deleted successfully"}));
        let session = Arc::new(MemorySessionStore::with_token("jwt"));
        let auth = service(&server, session.clone());

        assert!(auth.delete_account("").is_err());
        let message = auth.delete_account("Secret@123").unwrap();

        assert_eq!(message, "Account deleted successfully");
        assert!(!session.is_authenticated());
        assert_eq!(server.last_request().unwrap().body["password"], "Secret@123");
    }

    #[test]
    fn test_change_password_payload() {
        let server = MockBackend::start().unwrap();
        server.on("POST", "/auth/change-password", 200, json!({"success": true}));
        let auth = service(&server, Arc::new(MemorySessionStore::with_token("jwt")));

        auth.change_password("Old@1234", "New@12345").unwrap();
        let body = server.last_request().unwrap().body;
        assert_eq!(body["currentPassword"], "Old@1234");
        assert_eq!(body["newPassword"], "New@12345");
    }

    #[test]
    fn test_google_auth_url() {
        let session = Arc::new(MemorySessionStore::new());
        let api = ApiClient::new("https://api.example.com/", session).unwrap();
        let auth = AuthService::new(Arc::new(api));
        assert_eq!(auth.google_auth_url(), "https://api.example.com/auth/google");
    }
}
