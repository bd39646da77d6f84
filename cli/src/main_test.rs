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
        for key in [
            "ADMIN_API_BASE_URL",
            "ADMIN_API_REQUEST_TIMEOUT_SECS",
            "ADMIN_API_CONNECT_TIMEOUT_SECS",
            "ADMIN_API_USER_AGENT",
            "ADMIN_SESSION_TOKEN",
        ] {
            std::env::remove_var(key);
        }
    }
}

// =============================================================================
// parse_query_pair
// =============================================================================

#[test]
fn query_pair_splits_on_first_equals() {
    assert_eq!(parse_query_pair("page=2").unwrap(), ("page", "2"));
    assert_eq!(parse_query_pair("filter=a=b").unwrap(), ("filter", "a=b"));
    assert_eq!(parse_query_pair("q=").unwrap(), ("q", ""));
}

#[test]
fn query_pair_requires_key_and_equals() {
    assert!(matches!(parse_query_pair("page"), Err(CliError::InvalidQuery(_))));
    assert!(matches!(parse_query_pair("=2"), Err(CliError::InvalidQuery(_))));
}

// =============================================================================
// argument parsing
// =============================================================================

#[test]
fn parses_api_get_with_queries() {
    let cli = Cli::try_parse_from([
        "admin-cli",
        "--base-url",
        "https://crm.example.com/api",
        "--session-token",
        "tok",
        "api",
        "get",
        "/admin/users",
        "-q",
        "page=2",
        "--query",
        "sort=name",
    ])
    .unwrap();

    assert_eq!(cli.base_url.as_deref(), Some("https://crm.example.com/api"));
    assert_eq!(cli.session_token.as_deref(), Some("tok"));
    match cli.command {
        Command::Api(ApiCommand { command: ApiSubcommand::Get { path, query } }) => {
            assert_eq!(path, "/admin/users");
            assert_eq!(query, ["page=2", "sort=name"]);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_password_reset_confirm() {
    let cli = Cli::try_parse_from([
        "admin-cli",
        "password-reset",
        "confirm",
        "--token",
        "reset-1",
        "--password",
        "n3w",
    ])
    .unwrap();

    assert!(matches!(
        cli.command,
        Command::PasswordReset(PasswordResetCommand {
            command: PasswordResetSubcommand::Confirm { ref token, ref password }
        }) if token == "reset-1" && password == "n3w"
    ));
}

#[test]
fn clap_definition_is_consistent() {
    use clap::CommandFactory;
    Cli::command().debug_assert();
}

// =============================================================================
// client_config
// =============================================================================

#[test]
fn config_comes_from_env_without_flags() {
    let _guard = clean_env();
    unsafe {
        std::env::set_var("ADMIN_API_BASE_URL", "https://crm.example.com/api");
        std::env::set_var("ADMIN_API_CONNECT_TIMEOUT_SECS", "4");
        std::env::set_var("ADMIN_API_USER_AGENT", "ops-console/1.4");
    }

    let cli = Cli::try_parse_from(["admin-cli", "ping"]).unwrap();
    let config = client_config(&cli).unwrap();
    assert_eq!(config.base.to_string(), "https://crm.example.com/api");
    assert_eq!(config.timeouts.connect_secs, 4);
    assert_eq!(config.user_agent, "ops-console/1.4");

    clear_vars();
}

#[test]
fn flags_override_env_config() {
    let _guard = clean_env();
    unsafe {
        std::env::set_var("ADMIN_API_BASE_URL", "https://crm.example.com/api");
        std::env::set_var("ADMIN_API_REQUEST_TIMEOUT_SECS", "20");
        std::env::set_var("ADMIN_API_CONNECT_TIMEOUT_SECS", "4");
    }

    let cli = Cli::try_parse_from([
        "admin-cli",
        "--base-url",
        "http://localhost:4000",
        "--timeout-secs",
        "9",
        "--user-agent",
        "smoke-test/0.1",
        "ping",
    ])
    .unwrap();
    let config = client_config(&cli).unwrap();
    assert_eq!(config.base.to_string(), "http://localhost:4000");
    assert_eq!(config.timeouts.request_secs, 9);
    assert_eq!(config.timeouts.connect_secs, 4);
    assert_eq!(config.user_agent, "smoke-test/0.1");

    clear_vars();
}

#[tokio::test]
async fn missing_base_url_is_config_error() {
    let _guard = clean_env();
    let cli = Cli::try_parse_from(["admin-cli", "ping"]).unwrap();
    let err = run(cli).await.unwrap_err();
    assert!(matches!(err, CliError::Dispatch(DispatchError::Config(ref msg)) if msg.contains("ADMIN_API_BASE_URL")));
}

// =============================================================================
// dotenv_failure
// =============================================================================

#[test]
fn missing_dotenv_file_is_not_reported() {
    assert!(dotenv_failure(Ok(PathBuf::from(".env"))).is_none());
    let missing = dotenvy::Error::Io(std::io::Error::from(std::io::ErrorKind::NotFound));
    assert!(dotenv_failure(Err(missing)).is_none());
}

#[test]
fn malformed_dotenv_file_is_reported() {
    let malformed = dotenvy::Error::LineParse("ADMIN_API_BASE_URL https://x".into(), 18);
    assert!(dotenv_failure(Err(malformed)).is_some());
}

// =============================================================================
// run
// =============================================================================

#[tokio::test]
async fn api_call_without_token_fails_before_network() {
    let _guard = clean_env();
    let cli = Cli::try_parse_from(["admin-cli", "--base-url", "http://127.0.0.1:1", "api", "delete", "/admin/x"]).unwrap();
    let err = run(cli).await.unwrap_err();
    assert!(matches!(err, CliError::Dispatch(DispatchError::Unauthenticated { status: None })));
}
