//! Client configuration parsed from environment variables.

use std::time::Duration;

use crate::error::DispatchError;
use crate::path::ApiBase;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = concat!("admin-client/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base: ApiBase,
    pub timeouts: Timeouts,
    pub user_agent: String,
}

impl ClientConfig {
    /// Config for `base_url` with default timeouts and user agent.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] if `base_url` is not a usable
    /// absolute http(s) URL.
    pub fn new(base_url: &str) -> Result<Self, DispatchError> {
        Ok(Self { base: ApiBase::parse(base_url)?, timeouts: Timeouts::default(), user_agent: DEFAULT_USER_AGENT.into() })
    }

    /// Build typed client config from environment variables.
    ///
    /// Required:
    /// - `ADMIN_API_BASE_URL`
    ///
    /// Optional:
    /// - `ADMIN_API_REQUEST_TIMEOUT_SECS`: default 30
    /// - `ADMIN_API_CONNECT_TIMEOUT_SECS`: default 10
    /// - `ADMIN_API_USER_AGENT`: default `admin-client/<version>`
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Config`] if the base URL is missing or invalid.
    pub fn from_env() -> Result<Self, DispatchError> {
        let base_url = std::env::var("ADMIN_API_BASE_URL")
            .map_err(|_| DispatchError::Config("ADMIN_API_BASE_URL not set".into()))?;
        Ok(Self::new(&base_url)?.with_env_overrides())
    }

    /// Apply the optional `ADMIN_API_*` variables on top of `self`.
    ///
    /// Unset, blank, or unparseable values keep the current setting.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        self.timeouts = Timeouts {
            request_secs: env_parse_u64("ADMIN_API_REQUEST_TIMEOUT_SECS", self.timeouts.request_secs),
            connect_secs: env_parse_u64("ADMIN_API_CONNECT_TIMEOUT_SECS", self.timeouts.connect_secs),
        };
        if let Some(user_agent) = std::env::var("ADMIN_API_USER_AGENT").ok().filter(|value| !value.trim().is_empty()) {
            self.user_agent = user_agent;
        }
        self
    }

    /// Shared HTTP client for both request paths. Carries no auth headers.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::HttpClientBuild`] if the TLS backend or
    /// client settings are rejected.
    pub fn http_client(&self) -> Result<reqwest::Client, DispatchError> {
        reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(self.timeouts.connect_secs))
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| DispatchError::HttpClientBuild(e.to_string()))
    }
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
