//! Dispatch errors shared by the authenticated and public request paths.
//!
//! ERROR HANDLING
//! ==============
//! Nothing in this crate recovers from these errors. They surface to the
//! calling component, which decides what the UI does (for example, send the
//! user back to the login screen on [`DispatchError::Unauthenticated`]).

// =============================================================================
// ERROR CODES
// =============================================================================

/// Grepable error code and retry hint for client errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    /// Advisory only. The dispatcher itself never retries.
    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by request dispatch.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// No usable session credential, or the backend rejected it (401/403).
    ///
    /// `status` is `None` when the call never left the process.
    #[error("{}", unauthenticated_message(.status))]
    Unauthenticated { status: Option<u16> },

    /// Transport-level failure: connect, timeout, or body read.
    #[error("network failure: {0}")]
    NetworkFailure(String),

    /// The backend answered with a non-success status. `body` is passed
    /// through unchanged.
    #[error("backend error: status {status}")]
    BackendError { status: u16, body: String },

    /// The endpoint path could not be normalized.
    #[error("invalid endpoint path: {0}")]
    InvalidPath(String),

    /// A request field failed local validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A configuration value is missing or malformed.
    #[error("config error: {0}")]
    Config(String),

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// A response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),
}

fn unauthenticated_message(status: &Option<u16>) -> String {
    match status {
        Some(status) => format!("unauthenticated: backend returned {status}"),
        None => "unauthenticated: no session credential".to_owned(),
    }
}

impl DispatchError {
    /// True when the caller should send the user back to login.
    #[must_use]
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated { .. })
    }

    /// HTTP status reported by the backend, if the request got that far.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthenticated { status } => *status,
            Self::BackendError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Parse a passed-through backend payload as JSON.
    ///
    /// Returns `None` for non-backend errors or non-JSON payloads.
    #[must_use]
    pub fn backend_json(&self) -> Option<serde_json::Value> {
        match self {
            Self::BackendError { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

impl ErrorCode for DispatchError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Unauthenticated { .. } => "E_UNAUTHENTICATED",
            Self::NetworkFailure(_) => "E_NETWORK",
            Self::BackendError { .. } => "E_BACKEND",
            Self::InvalidPath(_) => "E_INVALID_PATH",
            Self::InvalidInput(_) => "E_INVALID_INPUT",
            Self::Config(_) => "E_CONFIG",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Decode(_) => "E_DECODE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::NetworkFailure(_) | Self::BackendError { status: 429 | 500..=599, .. })
    }
}

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;
