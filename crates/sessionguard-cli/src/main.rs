//! sessionguard - log in once, stay logged in until the token expires.
//!
//! A small terminal front-end over `sessionguard-core`. It plays the part
//! of the UI layer: it asks for credentials, reports route changes and
//! shows what the session manager restored from disk.

use std::io::{self, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sessionguard_core::{
    open_store, Credentials, HttpCredentialExchange, ResumeOutcome, Routes, SessionConfig,
    SessionError, SessionManager,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

// ============================================================================
// Constants
// ============================================================================

/// How often `watch` checks whether the session is still alive
const WATCH_POLL_INTERVAL_MS: u64 = 500;

/// Log file name prefix inside the configured log directory
const LOG_FILE_PREFIX: &str = "sessionguard.log";

const ENV_USERNAME: &str = "SESSIONGUARD_USERNAME";
const ENV_PASSWORD: &str = "SESSIONGUARD_PASSWORD";

const USAGE: &str = "\
Usage: sessionguard <command>

Commands:
  login [user]   Log in and persist the session
  status         Show the persisted session, if still valid
  logout         End the session and forget it
  watch          Resume the session and wait until it expires
";

#[derive(Debug, PartialEq, Eq)]
enum Command {
    Login(Option<String>),
    Status,
    Logout,
    Watch,
    Help,
}

fn parse_command(args: &[String]) -> Result<Command> {
    match args.first().map(String::as_str) {
        None | Some("help") | Some("--help") | Some("-h") => Ok(Command::Help),
        Some("login") => Ok(Command::Login(args.get(1).cloned())),
        Some("status") => Ok(Command::Status),
        Some("logout") => Ok(Command::Logout),
        Some("watch") => Ok(Command::Watch),
        Some(other) => Err(anyhow::anyhow!("Unknown command: {}\n\n{}", other, USAGE)),
    }
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the log file on drop and must be kept alive
/// for the duration of `main`.
fn init_tracing(config: &SessionConfig) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match config.log_dir {
        Some(ref dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_writer(writer).with_ansi(false)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let (mut config, config_error) = match SessionConfig::load() {
        Ok(c) => (c, None),
        Err(e) => (SessionConfig::default(), Some(e)),
    };
    config.apply_env_overrides();

    let _log_guard = init_tracing(&config);
    if let Some(e) = config_error {
        warn!(error = %e, "Failed to load config, using defaults");
    }

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = parse_command(&args)?;
    if command == Command::Help {
        print!("{}", USAGE);
        return Ok(());
    }

    info!(?command, store = ?config.store, "sessionguard starting");
    let manager = build_manager(&config)?;

    match command {
        Command::Login(user) => login(&manager, &mut config, user).await,
        Command::Status => status(&manager),
        Command::Logout => {
            manager.logout();
            println!("Logged out.");
            Ok(())
        }
        Command::Watch => watch(&manager).await,
        Command::Help => Ok(()),
    }
}

fn build_manager(config: &SessionConfig) -> Result<SessionManager> {
    let store = open_store(config).context("Failed to open session store")?;
    let exchange =
        HttpCredentialExchange::new(config).context("Failed to create HTTP client")?;
    let channel = exchange.channel(config.api_base_url.clone());
    let navigator = |route: &str| eprintln!("-> {}", route);

    Ok(
        SessionManager::builder(store, Arc::new(exchange), Arc::new(navigator))
            .channel(Arc::new(channel))
            .routes(Routes::from(config))
            .build(),
    )
}

// ============================================================================
// Commands
// ============================================================================

async fn login(
    manager: &SessionManager,
    config: &mut SessionConfig,
    user: Option<String>,
) -> Result<()> {
    let username = match user
        .or_else(|| std::env::var(ENV_USERNAME).ok())
        .filter(|u| !u.is_empty())
    {
        Some(u) => u,
        None => prompt_username(config.last_username.as_deref())?,
    };

    let password = match std::env::var(ENV_PASSWORD) {
        Ok(p) if !p.is_empty() => p,
        _ => rpassword::prompt_password("Password: ")?,
    };

    eprintln!("Authenticating...");
    match manager.login(Credentials::new(username.clone(), password)).await {
        Ok(()) => {
            config.last_username = Some(username);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            if let Some(expires_at) = manager.expires_at() {
                println!(
                    "Login successful. Session expires at {}.",
                    expires_at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S")
                );
            }
            Ok(())
        }
        Err(e) => {
            let message = friendly_message(&e);
            Err(anyhow::Error::new(e).context(message))
        }
    }
}

fn status(manager: &SessionManager) -> Result<()> {
    match manager.try_resume() {
        ResumeOutcome::Resumed { .. } => {
            println!(
                "Logged in as {} ({} min remaining).",
                manager.user_id().unwrap_or_else(|| "<unknown>".to_string()),
                manager.minutes_until_expiry().unwrap_or(0)
            );
        }
        ResumeOutcome::NoSession => println!("Not logged in."),
        ResumeOutcome::Expired => println!("Session expired. Please log in again."),
        ResumeOutcome::Corrupt => {
            println!("Stored session was unreadable and has been cleared. Please log in again.")
        }
        ResumeOutcome::StoreUnavailable => {
            return Err(anyhow::anyhow!("Session store could not be read"));
        }
    }
    Ok(())
}

async fn watch(manager: &SessionManager) -> Result<()> {
    if !matches!(manager.try_resume(), ResumeOutcome::Resumed { .. }) {
        println!("No active session to watch.");
        return Ok(());
    }

    let mut last_shown = None;
    let mut ticker = tokio::time::interval(Duration::from_millis(WATCH_POLL_INTERVAL_MS));
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("Stopped watching; session left intact.");
                return Ok(());
            }
            _ = ticker.tick() => {
                if !manager.is_authenticated() {
                    println!("Session expired.");
                    return Ok(());
                }
                let minutes = manager.minutes_until_expiry();
                if minutes != last_shown {
                    eprintln!("{} min remaining", minutes.unwrap_or(0));
                    last_shown = minutes;
                }
            }
        }
    }
}

fn prompt_username(last: Option<&str>) -> Result<String> {
    match last {
        Some(last) => print!("Username [{}]: ", last),
        None => print!("Username: "),
    }
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim();

    match (input.is_empty(), last) {
        (true, Some(last)) => Ok(last.to_string()),
        (true, None) => Err(anyhow::anyhow!("Username required")),
        (false, _) => Ok(input.to_string()),
    }
}

/// Provide user-friendly error messages based on error type
fn friendly_message(err: &SessionError) -> String {
    match err {
        SessionError::CredentialRejected(_) => "Invalid username or password".to_string(),
        SessionError::TransportFailure(msg) if msg.to_lowercase().contains("timed out") => {
            "Connection timed out. Please try again.".to_string()
        }
        SessionError::TransportFailure(_) => {
            "Unable to connect to server. Check your internet connection.".to_string()
        }
        SessionError::LoginSuperseded => "Login was cancelled by a logout".to_string(),
        other => format!("Login failed: {}", other),
    }
}
