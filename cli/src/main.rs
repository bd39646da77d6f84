use std::path::PathBuf;
use std::process::ExitCode;

use admin_client::{
    AuthenticatedClient, ClientConfig, DispatchError, Dispatcher, ErrorCode, LoginRequest, PublicClient,
    SessionContext, SessionCredential,
};
use clap::{Args, Parser, Subcommand};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("invalid query pair '{0}' (expected key=value)")]
    InvalidQuery(String),
}

#[derive(Parser, Debug)]
#[command(name = "admin-cli", about = "Admin backend API client")]
struct Cli {
    /// Overrides `ADMIN_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, env = "ADMIN_SESSION_TOKEN", hide_env_values = true)]
    session_token: Option<String>,

    /// Overrides `ADMIN_API_REQUEST_TIMEOUT_SECS`.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Overrides `ADMIN_API_CONNECT_TIMEOUT_SECS`.
    #[arg(long)]
    connect_timeout_secs: Option<u64>,

    /// Overrides `ADMIN_API_USER_AGENT`.
    #[arg(long)]
    user_agent: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Unauthenticated health check.
    Ping,
    /// Log in and print the session token.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// End the session on the backend.
    Logout,
    PasswordReset(PasswordResetCommand),
    Api(ApiCommand),
}

#[derive(Args, Debug)]
struct PasswordResetCommand {
    #[command(subcommand)]
    command: PasswordResetSubcommand,
}

#[derive(Subcommand, Debug)]
enum PasswordResetSubcommand {
    Request {
        #[arg(long)]
        email: String,
    },
    Confirm {
        #[arg(long)]
        token: String,
        #[arg(long)]
        password: String,
    },
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Get {
        path: String,
        #[arg(long = "query", short = 'q')]
        query: Vec<String>,
    },
    Post {
        path: String,
        #[arg(long)]
        data: String,
    },
    Put {
        path: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        path: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    // Loaded before the subscriber so RUST_LOG may come from .env.
    let dotenv = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    if let Some(error) = dotenv_failure(dotenv) {
        tracing::debug!(error = %error, ".env not loaded");
    }

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Dispatch(error)) => {
            eprintln!("error [{}]: {error}", error.error_code());
            if error.requires_login() {
                eprintln!("hint: run `admin-cli login` and export ADMIN_SESSION_TOKEN");
            }
            if let DispatchError::BackendError { body, .. } = &error {
                if !body.is_empty() {
                    eprintln!("{body}");
                }
            }
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = client_config(&cli)?;
    tracing::debug!(base = %config.base, authenticated = cli.session_token.is_some(), "client configured");

    let session = match cli.session_token {
        Some(token) => SessionContext::with_credential(SessionCredential::new(token)),
        None => SessionContext::new(),
    };

    match cli.command {
        Command::Ping => {
            let public = PublicClient::new(&config)?;
            public.health().await?;
            println!("ok");
            Ok(())
        }
        Command::Login { email, password } => {
            let public = PublicClient::new(&config)?;
            let credential = public.login(&session, &LoginRequest::new(email, password)).await?;
            println!("{}", credential.token());
            Ok(())
        }
        Command::Logout => {
            let dispatcher = Dispatcher::new(&config, session.clone())?;
            admin_client::logout(&dispatcher, &session).await;
            eprintln!("logged out");
            Ok(())
        }
        Command::PasswordReset(reset) => run_password_reset(&config, reset).await,
        Command::Api(api) => {
            let dispatcher = Dispatcher::new(&config, session)?;
            run_api(&dispatcher, api).await
        }
    }
}

/// Env config with command-line flags layered on top.
fn client_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = match cli.base_url.as_deref() {
        Some(base_url) => ClientConfig::new(base_url)?.with_env_overrides(),
        None => ClientConfig::from_env()?,
    };
    if let Some(secs) = cli.timeout_secs.filter(|secs| *secs > 0) {
        config.timeouts.request_secs = secs;
    }
    if let Some(secs) = cli.connect_timeout_secs.filter(|secs| *secs > 0) {
        config.timeouts.connect_secs = secs;
    }
    if let Some(user_agent) = cli.user_agent.as_ref().filter(|value| !value.trim().is_empty()) {
        config.user_agent.clone_from(user_agent);
    }
    Ok(config)
}

/// A missing `.env` is normal; anything else is worth reporting.
fn dotenv_failure(result: Result<PathBuf, dotenvy::Error>) -> Option<dotenvy::Error> {
    match result {
        Err(error) if !error.not_found() => Some(error),
        _ => None,
    }
}

async fn run_password_reset(config: &ClientConfig, reset: PasswordResetCommand) -> Result<(), CliError> {
    let public = PublicClient::new(config)?;
    let json = match reset.command {
        PasswordResetSubcommand::Request { email } => public.request_password_reset(&email).await?,
        PasswordResetSubcommand::Confirm { token, password } => public.confirm_password_reset(&token, &password).await?,
    };
    print_json(&json)
}

async fn run_api(client: &dyn AuthenticatedClient, api: ApiCommand) -> Result<(), CliError> {
    let json = match api.command {
        ApiSubcommand::Get { path, query } => {
            let pairs = query.iter().map(|raw| parse_query_pair(raw)).collect::<Result<Vec<_>, _>>()?;
            client.get(&path, &pairs).await?
        }
        ApiSubcommand::Post { path, data } => {
            let body = serde_json::from_str::<Value>(&data)?;
            client.post(&path, &body).await?
        }
        ApiSubcommand::Put { path, data } => {
            let body = serde_json::from_str::<Value>(&data)?;
            client.put(&path, &body).await?
        }
        ApiSubcommand::Delete { path } => client.delete(&path).await?,
    };
    print_json(&json)
}

fn parse_query_pair(raw: &str) -> Result<(&str, &str), CliError> {
    match raw.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => Ok((key.trim(), value)),
        _ => Err(CliError::InvalidQuery(raw.to_owned())),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    if value.is_null() {
        return Ok(());
    }
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
