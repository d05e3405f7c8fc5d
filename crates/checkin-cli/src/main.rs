// crates/checkin-cli/src/main.rs
// ============================================================================
// Module: Check-in CLI Entry Point
// Description: Command dispatcher for the check-in server and table operations.
// Purpose: Run the HTTP API or apply one participant operation from a shell.
// Dependencies: clap, checkin-config, checkin-core, checkin-server, tokio
// ============================================================================

//! ## Overview
//! `checkin serve` runs the HTTP API until interrupted. `checkin config
//! validate` loads and checks a configuration file. `checkin participants`
//! runs a single operation against the configured spreadsheet (list, stats,
//! donors, check-in, donate, lottery) and prints the result as JSON. Errors
//! go to stderr with a non-zero exit code.
//!
//! The local UTC offset is read before any runtime threads start, since the
//! offset lookup is only reliable while the process is single-threaded.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use checkin_config::CheckinConfig;
use checkin_core::CheckinService;
use checkin_core::Clock;
use checkin_core::SystemClock;
use checkin_core::service::DEFAULT_LOTTERY_WINNERS;
use checkin_server::CheckinServer;
use checkin_server::build_audit_sink;
use checkin_server::sheets_service;
use clap::Args;
use clap::Parser;
use clap::Subcommand;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "checkin", version, disable_help_subcommand = true)]
struct Cli {
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Commands,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the participant HTTP API.
    Serve(ConfigArgs),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// One-shot participant operations against the spreadsheet.
    Participants {
        /// Selected participant subcommand.
        #[command(subcommand)]
        command: ParticipantsCommand,
    },
}

/// Configuration file selection shared by every command.
#[derive(Args, Debug)]
struct ConfigArgs {
    /// Path to `checkin.toml` (defaults to `CHECKIN_CONFIG`, then the
    /// working directory).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Configuration subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a configuration file.
    Validate(ConfigArgs),
}

/// Participant subcommands.
#[derive(Subcommand, Debug)]
enum ParticipantsCommand {
    /// Print every participant.
    List(ConfigArgs),
    /// Print table statistics.
    Stats(ConfigArgs),
    /// Print participants whose donations reach the lottery minimum.
    Donors(ConfigArgs),
    /// Mark a participant present.
    CheckIn(CheckInCommand),
    /// Add a donation to a participant.
    Donate(DonateCommand),
    /// Draw lottery winners among big donors.
    Lottery(LotteryCommand),
}

/// Arguments for `participants check-in`.
#[derive(Args, Debug)]
struct CheckInCommand {
    /// Configuration file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// QR code of the arriving participant.
    #[arg(long = "qr-code", value_name = "CODE")]
    qr_code: String,
}

/// Arguments for `participants donate`.
#[derive(Args, Debug)]
struct DonateCommand {
    /// Configuration file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// QR code of the donor.
    #[arg(long = "qr-code", value_name = "CODE")]
    qr_code: String,
    /// Amount to add.
    #[arg(long, value_name = "AMOUNT", allow_negative_numbers = true)]
    amount: f64,
}

/// Arguments for `participants lottery`.
#[derive(Args, Debug)]
struct LotteryCommand {
    /// Configuration file selection.
    #[command(flatten)]
    config: ConfigArgs,
    /// Number of winners to draw.
    #[arg(long, value_name = "COUNT", default_value_t = DEFAULT_LOTTERY_WINNERS)]
    winners: usize,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    const fn new(message: String) -> Self {
        Self {
            message,
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
fn main() -> ExitCode {
    let clock: Arc<dyn Clock> = Arc::new(SystemClock::detect());
    match run(Cli::parse(), clock) {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run(cli: Cli, clock: Arc<dyn Clock>) -> CliResult<ExitCode> {
    match cli.command {
        Commands::Serve(args) => command_serve(&args, clock),
        Commands::Config {
            command: ConfigCommand::Validate(args),
        } => command_config_validate(&args),
        Commands::Participants {
            command,
        } => command_participants(command, clock),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
fn command_serve(args: &ConfigArgs, clock: Arc<dyn Clock>) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let server = CheckinServer::from_config(&config, clock)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| CliError::new(format!("runtime init failed: {err}")))?;
    write_stderr_line(&format!("checkin: listening on {}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    runtime
        .block_on(server.serve(shutdown_signal()))
        .map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves when the process receives Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if tokio::signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::SignalKind;
        use tokio::signal::unix::signal;

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}

// ============================================================================
// SECTION: Config Command
// ============================================================================

/// Executes the config validation command.
fn command_config_validate(args: &ConfigArgs) -> CliResult<ExitCode> {
    let _config = load_config(args)?;
    write_stdout_line("config valid").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Participant Commands
// ============================================================================

/// Dispatches participant subcommands.
fn command_participants(
    command: ParticipantsCommand,
    clock: Arc<dyn Clock>,
) -> CliResult<ExitCode> {
    match command {
        ParticipantsCommand::List(args) => {
            let service = open_service(&args, clock)?;
            write_json(&service.list().map_err(operation_error)?)
        }
        ParticipantsCommand::Stats(args) => {
            let service = open_service(&args, clock)?;
            write_json(&service.stats().map_err(operation_error)?)
        }
        ParticipantsCommand::Donors(args) => {
            let service = open_service(&args, clock)?;
            write_json(&service.big_donors().map_err(operation_error)?)
        }
        ParticipantsCommand::CheckIn(command) => {
            let service = open_service(&command.config, clock)?;
            write_json(&service.check_in(&command.qr_code).map_err(operation_error)?)
        }
        ParticipantsCommand::Donate(command) => {
            let service = open_service(&command.config, clock)?;
            let receipt =
                service.add_donation(&command.qr_code, command.amount).map_err(operation_error)?;
            write_json(&receipt)
        }
        ParticipantsCommand::Lottery(command) => {
            let service = open_service(&command.config, clock)?;
            let draw = service
                .draw_lottery(command.winners, &mut rand::thread_rng())
                .map_err(operation_error)?;
            write_json(&draw)
        }
    }?;
    Ok(ExitCode::SUCCESS)
}

/// Loads configuration and builds the spreadsheet-backed service.
fn open_service(args: &ConfigArgs, clock: Arc<dyn Clock>) -> CliResult<CheckinService> {
    let config = load_config(args)?;
    let audit = build_audit_sink(&config.audit)
        .map_err(|err| CliError::new(format!("audit init failed: {err}")))?;
    Ok(sheets_service(&config, clock, audit))
}

/// Formats a failed participant operation.
fn operation_error(err: checkin_core::CheckinError) -> CliError {
    CliError::new(format!("operation failed: {err}"))
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<CheckinConfig> {
    CheckinConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// Writes `value` to stdout as pretty JSON.
fn write_json<T: Serialize>(value: &T) -> CliResult<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| CliError::new(format!("output serialization failed: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))
}

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}

// ============================================================================
// SECTION: Tests
// ============================================================================
