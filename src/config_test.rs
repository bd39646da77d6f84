use super::*;
use std::sync::{Mutex, MutexGuard, PoisonError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Serializes env mutation across tests and starts from a clean slate.
fn clean_env() -> MutexGuard<'static, ()> {
    let guard = ENV_LOCK.lock().unwrap_or_else(PoisonError::into_inner);
    clear_vars();
    guard
}

fn clear_vars() {
    // SAFETY: all env mutation in this module happens under ENV_LOCK.
    unsafe {
        std::env::remove_var("ADMIN_API_BASE_URL");
        std::env::remove_var("ADMIN_API_REQUEST_TIMEOUT_SECS");
        std::env::remove_var("ADMIN_API_CONNECT_TIMEOUT_SECS");
        std::env::remove_var("ADMIN_API_USER_AGENT");
    }
}

#[test]
fn from_env_requires_base_url() {
    let _guard = clean_env();
    let err = ClientConfig::from_env().unwrap_err();
    assert!(matches!(err, DispatchError::Config(_)));
    assert!(err.to_string().contains("ADMIN_API_BASE_URL"));
}

#[test]
fn from_env_defaults() {
    let _guard = clean_env();
    unsafe { std::env::set_var("ADMIN_API_BASE_URL", "https://crm.example.com/api/") };

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.base.to_string(), "https://crm.example.com/api");
    assert_eq!(cfg.timeouts, Timeouts::default());
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);

    clear_vars();
}

#[test]
fn from_env_parses_overrides() {
    let _guard = clean_env();
    unsafe {
        std::env::set_var("ADMIN_API_BASE_URL", "http://localhost:4000");
        std::env::set_var("ADMIN_API_REQUEST_TIMEOUT_SECS", "42");
        std::env::set_var("ADMIN_API_CONNECT_TIMEOUT_SECS", " 7 ");
        std::env::set_var("ADMIN_API_USER_AGENT", "dashboard/2.0");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.timeouts, Timeouts { request_secs: 42, connect_secs: 7 });
    assert_eq!(cfg.user_agent, "dashboard/2.0");

    clear_vars();
}

#[test]
fn from_env_bad_timeouts_fall_back() {
    let _guard = clean_env();
    unsafe {
        std::env::set_var("ADMIN_API_BASE_URL", "http://localhost:4000");
        std::env::set_var("ADMIN_API_REQUEST_TIMEOUT_SECS", "soon");
        std::env::set_var("ADMIN_API_CONNECT_TIMEOUT_SECS", "0");
    }

    let cfg = ClientConfig::from_env().unwrap();
    assert_eq!(cfg.timeouts, Timeouts::default());

    clear_vars();
}

#[test]
fn from_env_invalid_base_url_errors() {
    let _guard = clean_env();
    unsafe { std::env::set_var("ADMIN_API_BASE_URL", "not a url") };

    assert!(matches!(ClientConfig::from_env(), Err(DispatchError::Config(_))));

    clear_vars();
}

#[test]
fn new_uses_defaults() {
    let cfg = ClientConfig::new("https://crm.example.com").unwrap();
    assert_eq!(cfg.timeouts, Timeouts::default());
    assert_eq!(cfg.user_agent, DEFAULT_USER_AGENT);
    assert!(cfg.http_client().is_ok());
}

#[test]
fn env_overrides_apply_to_explicit_base() {
    let _guard = clean_env();
    unsafe {
        std::env::set_var("ADMIN_API_BASE_URL", "http://ignored.example.com");
        std::env::set_var("ADMIN_API_CONNECT_TIMEOUT_SECS", "3");
        std::env::set_var("ADMIN_API_USER_AGENT", "ops-console/1.4");
    }

    let cfg = ClientConfig::new("https://crm.example.com/api").unwrap().with_env_overrides();
    assert_eq!(cfg.base.to_string(), "https://crm.example.com/api");
    assert_eq!(cfg.timeouts, Timeouts { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: 3 });
    assert_eq!(cfg.user_agent, "ops-console/1.4");

    clear_vars();
}
