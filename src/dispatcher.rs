//! Authenticated request dispatcher: the one path for authenticated calls.
//!
//! ARCHITECTURE
//! ============
//! Components receive an `Arc<dyn AuthenticatedClient>` and never build
//! their own authenticated requests. [`Dispatcher`] is the only
//! implementation: it reads the credential from the [`SessionContext`] it
//! was constructed with, normalizes the path against the configured
//! [`ApiBase`], attaches `Authorization: Bearer <token>`, and sends.
//!
//! ERROR HANDLING
//! ==============
//! - No credential: `Unauthenticated { status: None }`, nothing is sent.
//! - Transport failure: `NetworkFailure`.
//! - 401/403: `Unauthenticated { status: Some(..) }`.
//! - Any other non-2xx: `BackendError` with the payload untouched.
//!
//! The dispatcher does not retry, cache, queue, or refresh tokens, and it
//! never writes to the session.

use std::time::Instant;

use reqwest::header::ACCEPT;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::DispatchError;
use crate::path::ApiBase;
use crate::session::SessionContext;

/// Correlation header attached to every outbound request.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Query pairs appended to the request URL.
pub type Query<'a> = [(&'a str, &'a str)];

// =============================================================================
// TRAIT
// =============================================================================

/// Authenticated access to the backend. Enables mocking in tests.
#[async_trait::async_trait]
pub trait AuthenticatedClient: Send + Sync {
    /// Send one authenticated request and return the response body.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Unauthenticated`] without touching the
    /// network when no session credential is present, and otherwise any
    /// error described in the module docs.
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &Query<'_>,
        body: Option<&Value>,
    ) -> Result<Value, DispatchError>;

    async fn get(&self, path: &str, query: &Query<'_>) -> Result<Value, DispatchError> {
        self.send(Method::GET, path, query, None).await
    }

    async fn post(&self, path: &str, body: &Value) -> Result<Value, DispatchError> {
        self.send(Method::POST, path, &[], Some(body)).await
    }

    async fn put(&self, path: &str, body: &Value) -> Result<Value, DispatchError> {
        self.send(Method::PUT, path, &[], Some(body)).await
    }

    async fn delete(&self, path: &str) -> Result<Value, DispatchError> {
        self.send(Method::DELETE, path, &[], None).await
    }
}

// =============================================================================
// TYPED HELPERS
// =============================================================================

/// `GET` and deserialize the response body.
///
/// # Errors
///
/// Returns any dispatch error, or [`DispatchError::Decode`] if the body does
/// not match `T`.
pub async fn get_json<T: DeserializeOwned>(
    client: &(impl AuthenticatedClient + ?Sized),
    path: &str,
    query: &Query<'_>,
) -> Result<T, DispatchError> {
    decode(client.get(path, query).await?)
}

/// `POST` a serializable body and deserialize the response body.
///
/// # Errors
///
/// Returns [`DispatchError::InvalidInput`] if `body` cannot be serialized,
/// any dispatch error, or [`DispatchError::Decode`] if the response body does
/// not match `T`.
pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
    client: &(impl AuthenticatedClient + ?Sized),
    path: &str,
    body: &B,
) -> Result<T, DispatchError> {
    let body = serde_json::to_value(body).map_err(|e| DispatchError::InvalidInput(format!("request body: {e}")))?;
    decode(client.post(path, &body).await?)
}

fn decode<T: DeserializeOwned>(value: Value) -> Result<T, DispatchError> {
    serde_json::from_value(value).map_err(|e| DispatchError::Decode(e.to_string()))
}

// =============================================================================
// DISPATCHER
// =============================================================================

#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    base: ApiBase,
    session: SessionContext,
}

impl Dispatcher {
    /// Build a dispatcher from config, reading credentials from `session`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HttpClientBuild`] if the HTTP client fails.
    pub fn new(config: &ClientConfig, session: SessionContext) -> Result<Self, DispatchError> {
        Ok(Self::with_http(config.http_client()?, config.base.clone(), session))
    }

    /// Build a dispatcher around an existing HTTP client, sharing its pool.
    #[must_use]
    pub fn with_http(http: reqwest::Client, base: ApiBase, session: SessionContext) -> Self {
        Self { http, base, session }
    }

    #[must_use]
    pub fn base(&self) -> &ApiBase {
        &self.base
    }

    #[must_use]
    pub fn session(&self) -> &SessionContext {
        &self.session
    }
}

#[async_trait::async_trait]
impl AuthenticatedClient for Dispatcher {
    async fn send(
        &self,
        method: Method,
        path: &str,
        query: &Query<'_>,
        body: Option<&Value>,
    ) -> Result<Value, DispatchError> {
        let Some(credential) = self.session.current() else {
            tracing::debug!(%method, path, "no session credential; request not sent");
            return Err(DispatchError::Unauthenticated { status: None });
        };

        let (endpoint, url) = self.base.url_for(path)?;
        let request_id = Uuid::new_v4();

        let mut request = self
            .http
            .request(method.clone(), url)
            .bearer_auth(credential.token())
            .header(ACCEPT, "application/json")
            .header(REQUEST_ID_HEADER, request_id.to_string());
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let started = Instant::now();
        let response = request.send().await.map_err(|e| {
            tracing::warn!(%method, path = %endpoint, %request_id, error = %e, "request failed");
            DispatchError::NetworkFailure(e.to_string())
        })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| DispatchError::NetworkFailure(e.to_string()))?;
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        tracing::debug!(%method, path = %endpoint, %request_id, status = status.as_u16(), elapsed_ms, "request complete");

        if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
            tracing::warn!(%method, path = %endpoint, status = status.as_u16(), "backend rejected session credential");
        }

        interpret_response(status, text)
    }
}

// =============================================================================
// RESPONSE MAPPING
// =============================================================================

/// Map a status and raw body to the dispatch result. Shared with the
/// public request path.
pub(crate) fn interpret_response(status: StatusCode, body: String) -> Result<Value, DispatchError> {
    if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
        return Err(DispatchError::Unauthenticated { status: Some(status.as_u16()) });
    }
    if !status.is_success() {
        return Err(DispatchError::BackendError { status: status.as_u16(), body });
    }
    if body.trim().is_empty() {
        return Ok(Value::Null);
    }
    match serde_json::from_str::<Value>(&body) {
        Ok(value) => Ok(value),
        Err(_) => Ok(Value::String(body)),
    }
}

#[cfg(test)]
#[path = "dispatcher_test.rs"]
mod tests;
