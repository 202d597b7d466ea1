//! oauth-guard -- validates Claude OAuth secrets before a workflow uses them.
//!
//! Entry point. Wires together:
//!   - Configuration loading
//!   - Tracing setup
//!   - Guidance sink selection (workflow commands or log lines)
//!   - The requested command: `check`, `status` or `secrets`

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use serde::Serialize;
use tracing_subscriber::EnvFilter;

use oauth_guard::clock::{Clock, SystemClock};
use oauth_guard::config::{Config, OutputFormat};
use oauth_guard::credentials::{
    CredentialBundle, EXPIRES_AT_VAR, EnvCredentialSource, LocalCredentials,
    default_credentials_path,
};
use oauth_guard::expiry::{self, ExpirationStatus};
use oauth_guard::guidance::{ActionsSink, GuidanceSink, TracingSink, Validator};

// ---------------------------------------------------------------------------
// CLI argument parsing (minimal, no clap dependency)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Check,
    Status { json: bool },
    Secrets { file: Option<PathBuf> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliArgs {
    config_path: Option<PathBuf>,
    command: Command,
}

#[derive(Debug, PartialEq, Eq)]
enum ParseOutcome {
    Run(CliArgs),
    Help,
    Version,
}

fn parse_args_from(args: impl IntoIterator<Item = String>) -> Result<ParseOutcome, String> {
    let mut args = args.into_iter();
    let mut config_path = None;
    let mut command: Option<Command> = None;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args.next().ok_or("--config requires a path argument")?;
                config_path = Some(PathBuf::from(path));
            }
            "--help" | "-h" => return Ok(ParseOutcome::Help),
            "--version" | "-V" => return Ok(ParseOutcome::Version),
            "--json" => match command {
                Some(Command::Status { ref mut json }) => *json = true,
                _ => return Err("--json is only valid with `status`".to_string()),
            },
            "--file" | "-f" => match command {
                Some(Command::Secrets { ref mut file }) => {
                    let path = args.next().ok_or("--file requires a path argument")?;
                    *file = Some(PathBuf::from(path));
                }
                _ => return Err("--file is only valid with `secrets`".to_string()),
            },
            "check" | "status" | "secrets" if command.is_none() => {
                command = Some(match arg.as_str() {
                    "check" => Command::Check,
                    "status" => Command::Status { json: false },
                    _ => Command::Secrets { file: None },
                });
            }
            other => return Err(format!("Unknown argument: {other}")),
        }
    }

    Ok(ParseOutcome::Run(CliArgs {
        config_path,
        command: command.unwrap_or(Command::Check),
    }))
}

fn print_usage() {
    println!(
        "\
oauth-guard {version} -- Claude OAuth credential checks for CI

USAGE:
    oauth-guard [OPTIONS] [COMMAND]

COMMANDS:
    check                  Validate the credential secrets (default)
    status [--json]        Show how long the access token has left
    secrets [--file PATH]  Print `gh secret set` commands from a local login

OPTIONS:
    -c, --config <PATH>    Path to configuration file [default: oauth-guard.toml]
    -h, --help             Print this help message
    -V, --version          Print version information

ENVIRONMENT:
    CLAUDE_ACCESS_TOKEN    OAuth access token
    CLAUDE_REFRESH_TOKEN   OAuth refresh token
    CLAUDE_EXPIRES_AT      Access token expiry, milliseconds since the epoch
    RUST_LOG               Override log level (e.g. RUST_LOG=debug)
    OAUTH_GUARD_CONFIG     Alternative to --config flag
",
        version = env!("CARGO_PKG_VERSION")
    );
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> anyhow::Result<ExitCode> {
    // 1. Parse CLI arguments
    let cli = match parse_args_from(std::env::args().skip(1)) {
        Ok(ParseOutcome::Run(cli)) => cli,
        Ok(ParseOutcome::Help) => {
            print_usage();
            return Ok(ExitCode::SUCCESS);
        }
        Ok(ParseOutcome::Version) => {
            println!("oauth-guard {}", env!("CARGO_PKG_VERSION"));
            return Ok(ExitCode::SUCCESS);
        }
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("Run with --help for usage information.");
            return Ok(ExitCode::from(2));
        }
    };

    // 2. Load configuration (flag, then OAUTH_GUARD_CONFIG, then default)
    let config_path = cli
        .config_path
        .or_else(|| std::env::var("OAUTH_GUARD_CONFIG").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("oauth-guard.toml"));
    let config = Config::load(&config_path)?;

    // 3. Initialize tracing/logging
    init_tracing(&config);
    tracing::debug!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        "Starting oauth-guard"
    );
    if config.loaded_from.is_none() {
        tracing::warn!("Config file not found at {}, using defaults", config_path.display());
    }

    // 4. Pick the guidance sink
    let in_actions = std::env::var("GITHUB_ACTIONS").is_ok_and(|v| v == "true");
    let sink = build_sink(config.output.format.resolve(in_actions));

    // 5. Run the command
    match cli.command {
        Command::Check => Ok(run_check(&config, sink)),
        Command::Status { json } => run_status(&config, sink.as_ref(), json),
        Command::Secrets { file } => run_secrets(file),
    }
}

fn build_sink(format: OutputFormat) -> Arc<dyn GuidanceSink> {
    match format {
        OutputFormat::Actions => Arc::new(ActionsSink::stdout()),
        OutputFormat::Plain | OutputFormat::Auto => Arc::new(TracingSink),
    }
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

/// Validate the credential secrets. Any failure ends the run with status 1.
fn run_check(config: &Config, sink: Arc<dyn GuidanceSink>) -> ExitCode {
    let source = Arc::new(EnvCredentialSource);

    // Redact the tokens from all later output before anything else is written.
    let raw = CredentialBundle::from_source(source.as_ref());
    sink.mask(&raw.access_token);
    sink.mask(&raw.refresh_token);

    let validator = Validator::new(source, Arc::new(SystemClock), sink.clone())
        .with_policy(config.advice_policy());
    check_with(&validator, &SystemClock, sink.as_ref())
}

/// Run both checks and report the outcome to `sink`.
fn check_with(validator: &Validator, clock: &dyn Clock, sink: &dyn GuidanceSink) -> ExitCode {
    match validator.run_checks() {
        Ok(bundle) => {
            let remaining = expiry::remaining_time(&bundle.expires_at, clock);
            sink.info(&format!(
                "Claude OAuth credentials are valid (access token expires in {remaining})."
            ));
            tracing::info!(%remaining, "Credential checks passed");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(code = err.code(), "Credential checks failed");
            sink.error(&err.to_string());
            ExitCode::FAILURE
        }
    }
}

/// Print the expiry status of `CLAUDE_EXPIRES_AT`.
fn run_status(config: &Config, sink: &dyn GuidanceSink, json: bool) -> anyhow::Result<ExitCode> {
    let expires_at = std::env::var(EXPIRES_AT_VAR).unwrap_or_default();
    let status = expiry::status(&expires_at, config.expiry.buffer_minutes, &SystemClock, sink);
    let report = StatusReport::new(&status, config);

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("expires at: {}", status.expires_at.as_deref().unwrap_or("unknown"));
        println!("remaining:  {}", status.remaining);
        println!("expired:    {}", status.is_expired);
        for (key, var) in &report.overrides {
            println!("override:   {key} (from {var})");
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Output of `status`: the expiry view plus any settings taken from the
/// environment.
#[derive(Debug, Serialize)]
struct StatusReport<'a> {
    #[serde(flatten)]
    status: &'a ExpirationStatus,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    overrides: BTreeMap<&'a str, &'a str>,
}

impl<'a> StatusReport<'a> {
    fn new(status: &'a ExpirationStatus, config: &'a Config) -> Self {
        let overrides = config
            .env_overrides
            .all()
            .iter()
            .map(|(key, var)| (key.as_str(), var.as_str()))
            .collect();
        Self { status, overrides }
    }
}

/// Print `gh secret set` commands for a local Claude login.
fn run_secrets(file: Option<PathBuf>) -> anyhow::Result<ExitCode> {
    let path = match file {
        Some(path) => path,
        None => default_credentials_path()?,
    };
    let creds = LocalCredentials::load(&path)?;

    let remaining = expiry::remaining_time(&creds.bundle.expires_at, &SystemClock);
    if remaining == expiry::EXPIRED_LABEL {
        eprintln!("Warning: the local access token has expired; run `claude login` first.");
    } else {
        eprintln!("Local access token expires in {remaining}.");
    }

    for command in creds.gh_commands() {
        println!("{command}");
    }
    Ok(ExitCode::SUCCESS)
}

// ---------------------------------------------------------------------------
// Tracing initialization
// ---------------------------------------------------------------------------

/// Set up the tracing subscriber on stderr; stdout carries workflow commands.
fn init_tracing(config: &Config) {
    // RUST_LOG env var takes precedence over config file
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.logging.level;
        EnvFilter::new(format!("oauth_guard={level},warn"))
    });

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    if config.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
