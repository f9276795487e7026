//! RedBot console - terminal client for the RedBot automation backend.
//!
//! Manages the login session and the optional secondary security headers,
//! and drives accounts, tasks, execution logs and metrics through the
//! backend gateway.

mod commands;
mod format;
mod prompt;

use std::io;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;
use clap::{Parser, Subcommand};
use redbot_core::auth::{MemorySessionStore, SessionStore};
use redbot_core::config::CredentialBackend;
use redbot_core::models::TaskKind;
use redbot_core::{ApiError, Config, SecurityMode, SessionSecurityClient};
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "redbot")]
#[command(about = "Console for the RedBot social-media automation backend")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Gateway base URL (overrides config and REDBOT_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Keep the session in the OS keyring instead of the cache directory
    #[arg(long, global = true, conflicts_with = "ephemeral")]
    keyring: bool,

    /// Keep the session in memory only for this invocation
    #[arg(long, global = true)]
    ephemeral: bool,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and store the session token
    Login {
        /// Username (prompted when omitted)
        username: Option<String>,

        /// Also choose a security mode before logging in
        #[arg(long)]
        security: bool,
    },

    /// Create a new user
    Register {
        /// Username (prompted when omitted)
        username: Option<String>,
    },

    /// Forget the session and security configuration
    Logout,

    /// Show session and security status
    Status,

    /// Manage the secondary security headers
    Security {
        #[command(subcommand)]
        action: SecurityAction,
    },

    /// Manage social-media accounts
    Accounts {
        #[command(subcommand)]
        action: AccountAction,
    },

    /// Manage automation tasks
    Tasks {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Show execution logs
    Logs {
        /// Only logs for this account
        #[arg(long)]
        account_id: Option<i64>,
    },

    /// Run every task of an account now
    Execute {
        account_id: i64,
    },

    /// Show dashboard metrics
    Metrics,
}

#[derive(Subcommand)]
enum SecurityAction {
    /// Show the stored security mode
    Show,

    /// Choose a security mode and its credentials
    Configure {
        /// Mode to set; prompts interactively when omitted
        #[arg(long)]
        mode: Option<SecurityMode>,
    },

    /// Reset to disabled
    Clear,
}

#[derive(Subcommand)]
enum AccountAction {
    /// List accounts
    List,

    /// Show one account
    Show { id: i64 },

    /// Add an account (the access token is prompted)
    Add { platform: String, handle: String },

    /// Change handle and/or token
    Edit {
        id: i64,

        #[arg(long)]
        handle: Option<String>,

        /// Prompt for a new access token
        #[arg(long)]
        token: bool,
    },

    /// Delete an account
    Delete {
        id: i64,

        /// Skip the confirmation
        #[arg(long, short)]
        yes: bool,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// List tasks
    List,

    /// Show one task with its configuration
    Show { id: i64 },

    /// Create a task for an account
    Add {
        account_id: i64,

        /// Task type (publicar, responder, moderar, validar_cuentas, borrado_emergencia)
        #[arg(long = "type", value_parser = parse_task_kind)]
        kind: TaskKind,

        /// Configuration as a JSON object
        #[arg(long)]
        config: Option<String>,

        /// Moderation: post whose comments are moderated
        #[arg(long)]
        post_url: Option<String>,

        /// Moderation: comma-separated forbidden words
        #[arg(long, default_value = "")]
        forbidden_words: String,

        /// Moderation: comma-separated spam patterns
        #[arg(long, default_value = "")]
        spam_patterns: String,

        /// Moderation: maximum share of capital letters (0 or unset means 100)
        #[arg(long)]
        max_caps: Option<u32>,
    },

    /// Change type and/or configuration
    Edit {
        id: i64,

        #[arg(long = "type", value_parser = parse_task_kind)]
        kind: Option<TaskKind>,

        /// Configuration as a JSON object
        #[arg(long)]
        config: Option<String>,
    },

    /// Delete a task
    Delete {
        id: i64,

        /// Skip the confirmation
        #[arg(long, short)]
        yes: bool,
    },

    /// Draft a task from a natural-language prompt
    Generate {
        prompt: String,

        /// Create the drafted task for this account
        #[arg(long)]
        account_id: Option<i64>,
    },
}

fn parse_task_kind(s: &str) -> Result<TaskKind, String> {
    TaskKind::from_wire(s.trim()).ok_or_else(|| {
        let known: Vec<&str> = TaskKind::ALL.iter().map(|k| k.as_wire()).collect();
        format!("unknown task type '{}' (expected one of: {})", s, known.join(", "))
    })
}

/// Initialize the tracing subscriber for logging.
///
/// `RUST_LOG` controls the level (default `warn`). With a log file the
/// returned guard must stay alive until exit so buffered lines are flushed.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_file {
        Some(path) => {
            let file_name = path
                .file_name()
                .ok_or_else(|| anyhow::anyhow!("--log-file must name a file"))?;
            let directory = path
                .parent()
                .filter(|dir| !dir.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(io::stderr))
                .with(filter)
                .init();
            Ok(None)
        }
    }
}

/// Effective configuration: file, then environment, then flags.
fn resolve_config(cli: &Cli) -> Result<Config> {
    let mut config = Config::load()?.with_env_overrides()?;
    if let Some(ref url) = cli.api_url {
        config.api_base_url = url.clone();
    }
    if let Some(secs) = cli.timeout {
        config.request_timeout_secs = secs;
    }
    if cli.keyring {
        config.credential_backend = CredentialBackend::Keyring;
    }
    Ok(config)
}

/// Print a user-facing explanation for a failed command.
fn report_failure(client: Option<&SessionSecurityClient>, err: &anyhow::Error) {
    match err.downcast_ref::<ApiError>() {
        Some(ApiError::ReauthRequired) => {
            eprintln!("Your session has expired. Run `redbot login` to sign in again.");
        }
        Some(ApiError::SecurityMismatch(mismatch)) => {
            eprintln!("Security check failed: {}", mismatch.detail_or_default());
            let required = mismatch
                .expected
                .map(|mode| mode.label())
                .unwrap_or(mismatch.auth_type.as_str());
            eprintln!("The server requires: {}", required);
            if let Some(ref hint) = mismatch.hint {
                eprintln!("Hint: {}", hint);
            }

            match client {
                Some(client) if prompt::is_interactive() => {
                    match prompt::configure_security(client, &mismatch.prefill) {
                        Ok(mode) => eprintln!(
                            "Security mode set to {}. Run the command again.",
                            mode
                        ),
                        Err(e) => eprintln!("Error: {:#}", e),
                    }
                }
                _ => eprintln!("Run `redbot security configure` to update the security settings."),
            }
        }
        Some(ApiError::BadGateway(_)) => {
            eprintln!("Error: {}", err);
            eprintln!("The gateway could not reach a backend service. Check that the RedBot services are running.");
        }
        _ => eprintln!("Error: {:#}", err),
    }
}

async fn run(cli: Cli, client_slot: &mut Option<SessionSecurityClient>) -> Result<()> {
    let config = resolve_config(&cli)?;
    let store: Arc<dyn SessionStore> = if cli.ephemeral {
        Arc::new(MemorySessionStore::new())
    } else {
        config.open_store()?
    };
    debug!(url = config.api_base_url(), backend = ?config.credential_backend, "Resolved configuration");

    let client = client_slot.insert(SessionSecurityClient::new(&config, store)?);
    commands::dispatch(client, &config, cli.command).await
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let _guard = match init_tracing(cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    info!("RedBot console starting");

    let mut client = None;
    match run(cli, &mut client).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report_failure(client.as_ref(), &e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_task_add() {
        let cli = Cli::try_parse_from([
            "redbot", "tasks", "add", "3", "--type", "moderar", "--post-url", "https://x/1",
            "--forbidden-words", "spam, scam",
        ])
        .unwrap();
        match cli.command {
            Commands::Tasks {
                action: TaskAction::Add { account_id, kind, post_url, forbidden_words, .. },
            } => {
                assert_eq!(account_id, 3);
                assert_eq!(kind, TaskKind::Moderate);
                assert_eq!(post_url.as_deref(), Some("https://x/1"));
                assert_eq!(forbidden_words, "spam, scam");
            }
            _ => panic!("parsed the wrong command"),
        }
    }

    #[test]
    fn test_rejects_unknown_task_type() {
        assert!(Cli::try_parse_from(["redbot", "tasks", "add", "3", "--type", "spam"]).is_err());
    }

    #[test]
    fn test_security_mode_flag() {
        let cli =
            Cli::try_parse_from(["redbot", "security", "configure", "--mode", "Symmetric"]).unwrap();
        match cli.command {
            Commands::Security { action: SecurityAction::Configure { mode } } => {
                assert_eq!(mode, Some(SecurityMode::Symmetric));
            }
            _ => panic!("parsed the wrong command"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "redbot", "status", "--api-url", "http://gw:9000", "--timeout", "5", "--ephemeral",
        ])
        .unwrap();
        assert_eq!(cli.api_url.as_deref(), Some("http://gw:9000"));
        assert_eq!(cli.timeout, Some(5));
        assert!(cli.ephemeral);
        assert!(Cli::try_parse_from(["redbot", "status", "--keyring", "--ephemeral"]).is_err());
    }
}
