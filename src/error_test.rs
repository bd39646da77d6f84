use super::*;

// =============================================================================
// error_code / retryable
// =============================================================================

#[test]
fn error_codes_are_stable() {
    assert_eq!(DispatchError::Unauthenticated { status: None }.error_code(), "E_UNAUTHENTICATED");
    assert_eq!(DispatchError::NetworkFailure("x".into()).error_code(), "E_NETWORK");
    assert_eq!(DispatchError::BackendError { status: 400, body: String::new() }.error_code(), "E_BACKEND");
    assert_eq!(DispatchError::InvalidPath("x".into()).error_code(), "E_INVALID_PATH");
    assert_eq!(DispatchError::Decode("x".into()).error_code(), "E_DECODE");
}

#[test]
fn network_and_server_errors_are_retryable() {
    assert!(DispatchError::NetworkFailure("reset".into()).retryable());
    assert!(DispatchError::BackendError { status: 503, body: String::new() }.retryable());
    assert!(DispatchError::BackendError { status: 429, body: String::new() }.retryable());
}

#[test]
fn client_errors_are_not_retryable() {
    assert!(!DispatchError::BackendError { status: 404, body: String::new() }.retryable());
    assert!(!DispatchError::Unauthenticated { status: Some(401) }.retryable());
    assert!(!DispatchError::InvalidPath("x".into()).retryable());
}

// =============================================================================
// helpers
// =============================================================================

#[test]
fn only_unauthenticated_requires_login() {
    assert!(DispatchError::Unauthenticated { status: None }.requires_login());
    assert!(DispatchError::Unauthenticated { status: Some(403) }.requires_login());
    assert!(!DispatchError::BackendError { status: 500, body: String::new() }.requires_login());
    assert!(!DispatchError::NetworkFailure("down".into()).requires_login());
}

#[test]
fn status_reports_backend_codes() {
    assert_eq!(DispatchError::Unauthenticated { status: None }.status(), None);
    assert_eq!(DispatchError::Unauthenticated { status: Some(401) }.status(), Some(401));
    assert_eq!(DispatchError::BackendError { status: 422, body: String::new() }.status(), Some(422));
    assert_eq!(DispatchError::Config("x".into()).status(), None);
}

#[test]
fn backend_json_parses_payload() {
    let err = DispatchError::BackendError { status: 422, body: r#"{"error":"bad field"}"#.into() };
    let json = err.backend_json().unwrap();
    assert_eq!(json["error"], "bad field");

    let plain = DispatchError::BackendError { status: 502, body: "Bad Gateway".into() };
    assert!(plain.backend_json().is_none());
}

#[test]
fn display_distinguishes_local_and_remote_auth_failures() {
    let local = DispatchError::Unauthenticated { status: None }.to_string();
    let remote = DispatchError::Unauthenticated { status: Some(401) }.to_string();
    assert!(local.contains("no session credential"));
    assert!(remote.contains("401"));
}
