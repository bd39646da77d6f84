//! Client library for the admin backend.
//!
//! ARCHITECTURE
//! ============
//! Two request paths, one backend:
//! - [`Dispatcher`] implements [`AuthenticatedClient`], the only way to make
//!   an authenticated call. Components hold an `Arc<dyn AuthenticatedClient>`.
//! - [`PublicClient`] handles login and password reset, which must work
//!   before a credential exists and never carry one.
//!
//! Both read the same [`ClientConfig`] and resolve relative paths against
//! the one configured [`ApiBase`]. Session state lives in a
//! [`SessionContext`] that the application creates and passes in.

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod path;
pub mod session;

pub use auth::{LoginRequest, PublicClient, logout};
pub use config::ClientConfig;
pub use dispatcher::{AuthenticatedClient, Dispatcher, get_json, post_json};
pub use error::{DispatchError, ErrorCode};
pub use path::{ApiBase, EndpointPath};
pub use session::{SessionContext, SessionCredential};
