//! Pre-auth flows (login, password reset) and logout.
//!
//! ARCHITECTURE
//! ============
//! Login and password reset must work before any credential exists, so they
//! go through [`PublicClient`], which talks to the same backend as the
//! dispatcher but never attaches an `Authorization` header. Login is the
//! only place a credential enters the [`SessionContext`]; [`logout`] is the
//! only place one leaves it (apart from expiry).

use std::fmt;
use std::time::Duration;

use reqwest::header::ACCEPT;
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::dispatcher::{AuthenticatedClient, REQUEST_ID_HEADER, interpret_response};
use crate::error::DispatchError;
use crate::path::ApiBase;
use crate::session::{SessionContext, SessionCredential};

pub const LOGIN_PATH: &str = "/auth/login";
pub const LOGOUT_PATH: &str = "/auth/logout";
pub const PASSWORD_RESET_PATH: &str = "/auth/password-reset";
pub const PASSWORD_RESET_CONFIRM_PATH: &str = "/auth/password-reset/confirm";
pub const HEALTH_PATH: &str = "/healthz";

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self { email: email.into(), password: password.into() }
    }
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(alias = "access_token")]
    token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

// =============================================================================
// VALIDATION
// =============================================================================

/// Trim and lower-case an email; `None` unless it has exactly one `@` with
/// non-empty local and domain parts.
#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

fn require_email(email: &str) -> Result<String, DispatchError> {
    normalize_email(email).ok_or_else(|| DispatchError::InvalidInput("invalid email".into()))
}

fn require_secret(value: &str, field: &str) -> Result<(), DispatchError> {
    if value.is_empty() {
        return Err(DispatchError::InvalidInput(format!("{field} must not be empty")));
    }
    Ok(())
}

// =============================================================================
// PUBLIC CLIENT
// =============================================================================

/// Unauthenticated client for flows that run before a session exists.
#[derive(Clone)]
pub struct PublicClient {
    http: reqwest::Client,
    base: ApiBase,
}

impl PublicClient {
    /// # Errors
    ///
    /// Returns [`DispatchError::HttpClientBuild`] if the HTTP client fails.
    pub fn new(config: &ClientConfig) -> Result<Self, DispatchError> {
        Ok(Self::with_http(config.http_client()?, config.base.clone()))
    }

    #[must_use]
    pub fn with_http(http: reqwest::Client, base: ApiBase) -> Self {
        Self { http, base }
    }

    /// Log in and install the issued credential on `session`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidInput`] before any network call when
    /// the email or password is unusable, [`DispatchError::Unauthenticated`]
    /// when the backend rejects the credentials, and
    /// [`DispatchError::Decode`] when the response carries no token or one
    /// that expires immediately.
    pub async fn login(
        &self,
        session: &SessionContext,
        request: &LoginRequest,
    ) -> Result<SessionCredential, DispatchError> {
        let email = require_email(&request.email)?;
        require_secret(&request.password, "password")?;

        let body = json!({ "email": email, "password": request.password });
        let value = self.send(Method::POST, LOGIN_PATH, Some(&body)).await?;

        let response: LoginResponse =
            serde_json::from_value(value).map_err(|e| DispatchError::Decode(format!("login response: {e}")))?;
        if response.token.trim().is_empty() {
            return Err(DispatchError::Decode("login response: empty token".into()));
        }
        if response.expires_in == Some(0) {
            return Err(DispatchError::Decode("login response: token already expired".into()));
        }

        let credential = match response.expires_in {
            Some(secs) => SessionCredential::expiring_in(response.token, Duration::from_secs(secs)),
            None => SessionCredential::new(response.token),
        };
        session.establish(credential.clone());
        tracing::info!(email = %email, expires_in = ?response.expires_in, "session established");
        Ok(credential)
    }

    /// Ask the backend to send a password-reset message to `email`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidInput`] for an unusable email, and
    /// any transport or backend error otherwise.
    pub async fn request_password_reset(&self, email: &str) -> Result<Value, DispatchError> {
        let email = require_email(email)?;
        let value = self.send(Method::POST, PASSWORD_RESET_PATH, Some(&json!({ "email": email }))).await?;
        tracing::info!(email = %email, "password reset requested");
        Ok(value)
    }

    /// Complete a password reset with the token the user received.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidInput`] for an empty token or
    /// password, and any transport or backend error otherwise.
    pub async fn confirm_password_reset(&self, reset_token: &str, new_password: &str) -> Result<Value, DispatchError> {
        require_secret(reset_token.trim(), "reset token")?;
        require_secret(new_password, "password")?;

        let body = json!({ "token": reset_token.trim(), "password": new_password });
        let value = self.send(Method::POST, PASSWORD_RESET_CONFIRM_PATH, Some(&body)).await?;
        tracing::info!("password reset confirmed");
        Ok(value)
    }

    /// Unauthenticated health check.
    ///
    /// # Errors
    ///
    /// Returns any transport or backend error.
    pub async fn health(&self) -> Result<Value, DispatchError> {
        self.send(Method::GET, HEALTH_PATH, None).await
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<Value, DispatchError> {
        let (endpoint, url) = self.base.url_for(path)?;
        let request_id = Uuid::new_v4();

        let mut request = self
            .http
            .request(method.clone(), url)
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path = %endpoint, %request_id, error = %e, "public request failed");
            DispatchError::NetworkFailure(e.to_string())
        })?;
        let status = response.status();
        let text = response.text().await.map_err(|e| DispatchError::NetworkFailure(e.to_string()))?;
        tracing::debug!(%method, path = %endpoint, %request_id, status = status.as_u16(), "public request complete");

        interpret_response(status, text)
    }
}

// =============================================================================
// LOGOUT
// =============================================================================

/// Tell the backend the session is over, then destroy it locally.
///
/// The backend call is best-effort; the local session is cleared whatever
/// it returns.
pub async fn logout(client: &(impl AuthenticatedClient + ?Sized), session: &SessionContext) {
    if session.is_authenticated() {
        if let Err(e) = client.post(LOGOUT_PATH, &json!({})).await {
            tracing::debug!(error = %e, "logout request failed; clearing session anyway");
        }
    }
    session.clear();
    tracing::info!("session cleared");
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
