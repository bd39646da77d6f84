//! Session credential and the shared session context.
//!
//! ARCHITECTURE
//! ============
//! A [`SessionContext`] is created once by the application and handed to
//! every component that needs it. The login/logout flow in [`crate::auth`]
//! writes it; the dispatcher only reads it. There is no global session.
//!
//! TRADE-OFFS
//! ==========
//! The lock is a plain `std::sync::RwLock`. Reads copy the credential out
//! and never hold the guard across an `.await`.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, SystemTime};

// =============================================================================
// CREDENTIAL
// =============================================================================

/// Opaque bearer token for a logged-in session.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionCredential {
    token: String,
    expires_at: Option<SystemTime>,
}

impl SessionCredential {
    /// Credential with no known expiry.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: token.into(), expires_at: None }
    }

    /// Credential that stops being usable `ttl` from now.
    #[must_use]
    pub fn expiring_in(token: impl Into<String>, ttl: Duration) -> Self {
        Self { token: token.into(), expires_at: SystemTime::now().checked_add(ttl) }
    }

    /// Credential that stops being usable at `expires_at`.
    #[must_use]
    pub fn expiring_at(token: impl Into<String>, expires_at: SystemTime) -> Self {
        Self { token: token.into(), expires_at: Some(expires_at) }
    }

    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }

    #[must_use]
    pub fn expires_at(&self) -> Option<SystemTime> {
        self.expires_at
    }

    /// Blank tokens and past expiries are never attached to a request.
    #[must_use]
    pub fn is_usable_at(&self, now: SystemTime) -> bool {
        if self.token.trim().is_empty() {
            return false;
        }
        self.expires_at.is_none_or(|expires_at| now < expires_at)
    }
}

impl fmt::Debug for SessionCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCredential")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// =============================================================================
// CONTEXT
// =============================================================================

/// Shared handle over the current session credential.
///
/// Clones share the same underlying slot.
#[derive(Clone, Default)]
pub struct SessionContext {
    slot: Arc<RwLock<Option<SessionCredential>>>,
}

impl SessionContext {
    /// Context with no session.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Context restored from a previously persisted credential.
    #[must_use]
    pub fn with_credential(credential: SessionCredential) -> Self {
        Self { slot: Arc::new(RwLock::new(Some(credential))) }
    }

    /// The credential to attach right now, if any.
    ///
    /// Expired credentials are dropped from the slot and reported as absent.
    #[must_use]
    pub fn current(&self) -> Option<SessionCredential> {
        let now = SystemTime::now();
        {
            let guard = self.slot.read().unwrap_or_else(PoisonError::into_inner);
            match guard.as_ref() {
                None => return None,
                Some(credential) if credential.is_usable_at(now) => return Some(credential.clone()),
                Some(_) => {}
            }
        }

        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        if guard.as_ref().is_some_and(|credential| !credential.is_usable_at(now)) {
            tracing::debug!("session credential expired");
            *guard = None;
        }
        guard.clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.current().is_some()
    }

    /// Install a freshly issued credential, replacing any previous one.
    pub(crate) fn establish(&self, credential: SessionCredential) {
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = Some(credential);
    }

    /// Destroy the current credential, if any.
    pub(crate) fn clear(&self) {
        let mut guard = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *guard = None;
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
