//! Purpose: `tractorbeam` CLI entry point.
//! Role: Binary crate root; parses args, sets up logging, runs a command, reports failures.
//! Invariants: stdout carries only the rewritten JSON document, and only on success.
//! Invariants: Diagnostics go to stderr (JSON when stderr is not a terminal and color is not
//! forced) or the error log.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
use std::io::{self, IsTerminal};
use std::path::PathBuf;

use clap::{
    CommandFactory, Parser, Subcommand, ValueEnum, ValueHint, error::ErrorKind as ClapErrorKind,
};
use clap_complete::aot::Shell;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod command_dispatch;
mod config_paths;
mod error_log;

use config_paths::{default_config_dir, error_log_path};
use error_log::append_error_report;
use tractorbeam::api::{Error, ErrorKind, to_exit_code};

#[derive(Copy, Clone, Debug)]
struct RunOutcome {
    exit_code: i32,
}

impl RunOutcome {
    fn ok() -> Self {
        Self { exit_code: 0 }
    }

    fn with_code(exit_code: i32) -> Self {
        Self { exit_code }
    }
}

/// Settings `main` needs to report a failure after `run` returns.
#[derive(Clone, Debug)]
struct Reporting {
    color: ColorMode,
    log_level: LogLevel,
    config_dir: Option<PathBuf>,
}

impl Default for Reporting {
    fn default() -> Self {
        Self {
            color: ColorMode::Auto,
            log_level: LogLevel::Info,
            config_dir: None,
        }
    }
}

fn main() {
    let exit_code = match run() {
        Ok(outcome) => outcome.exit_code,
        Err((err, reporting)) => {
            report_failure(&err, &reporting);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<RunOutcome, (Error, Reporting)> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => match err.kind() {
            ClapErrorKind::DisplayHelp
            | ClapErrorKind::DisplayVersion
            | ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
                err.print().map_err(|io_err| {
                    (
                        Error::new(ErrorKind::Io)
                            .with_message("failed to write help")
                            .with_source(io_err),
                        Reporting::default(),
                    )
                })?;
                let exit_code = if matches!(
                    err.kind(),
                    ClapErrorKind::DisplayHelpOnMissingArgumentOrSubcommand
                ) {
                    2
                } else {
                    0
                };
                return Ok(RunOutcome::with_code(exit_code));
            }
            _ => {
                let message = clap_error_summary(&err);
                let hint = clap_error_hint(&err);
                return Err((
                    Error::new(ErrorKind::Usage)
                        .with_message(message)
                        .with_hint(hint),
                    Reporting::default(),
                ));
            }
        },
    };

    let reporting = Reporting {
        color: cli.color,
        log_level: cli.log_level,
        config_dir: cli.config_dir.clone(),
    };
    init_tracing(cli.log_level);

    command_dispatch::dispatch_command(cli.command)
        .map_err(add_transfer_hint)
        .map_err(add_io_hint)
        .map_err(add_internal_hint)
        .map_err(|err| (err, reporting))
}

#[derive(Parser)]
#[command(
    name = "tractorbeam",
    version,
    about = "Stage files referenced by s3:// and file:// URLs inside JSON documents",
    long_about = None,
    before_help = r#"Reads one JSON document on stdin, transfers every referenced file, and
prints the document with each URL rewritten to its new location."#,
    after_help = r#"EXAMPLES
  $ echo '{"input": "s3://bucket1/dir/file.json"}' | tractorbeam fetch
  # {"input": "file:///current/dir/dir/file.json"}

  $ tractorbeam fetch --strip-components 1 < manifest.json > local.json
  $ tractorbeam publish s3://bucket2/out --strip-components 2 < local.json

NOTES
  - Fatal errors print nothing on stdout.
  - With --log-level error or critical, details go to ~/.config/tractorbeam/error.log."#,
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "info",
        value_enum,
        help = "Logging verbosity; error and critical also route failures to the error log"
    )]
    log_level: LogLevel,

    #[arg(
        long,
        global = true,
        help = "Directory holding error.log (default: ~/.config/tractorbeam)",
        value_hint = ValueHint::DirPath
    )]
    config_dir: Option<PathBuf>,

    #[arg(
        long,
        global = true,
        default_value = "auto",
        value_enum,
        help = "Colorize stderr diagnostics: auto|always|never (always forces colored text over JSON)"
    )]
    color: ColorMode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ColorMode {
    Auto,
    Always,
    Never,
}

impl ColorMode {
    fn use_color(self, is_tty: bool) -> bool {
        match self {
            ColorMode::Auto => is_tty,
            ColorMode::Always => true,
            ColorMode::Never => false,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Debug,
    Info,
    #[value(alias = "warn")]
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    fn filter_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "warn,tractorbeam=debug",
            LogLevel::Info => "warn,tractorbeam=info",
            LogLevel::Warning => "warn",
            LogLevel::Error | LogLevel::Critical => "error",
        }
    }

    /// Quiet levels summarize fatal errors and keep details in the error log.
    fn is_quiet(self) -> bool {
        matches!(self, LogLevel::Error | LogLevel::Critical)
    }
}

#[derive(Subcommand)]
enum Command {
    #[command(
        visible_aliases = ["pull", "down"],
        about = "Download s3:// references and rewrite them to file:// URLs",
        long_about = r#"Download every object referenced by an s3:// string in the JSON document on
stdin into the current directory, then print the document with those strings
replaced by file:// URLs of the downloaded copies."#,
        after_help = r#"EXAMPLES
  $ tractorbeam fetch < manifest.json
  $ tractorbeam pull --strip-components 2 < manifest.json   # s3://b/a/b/c.txt -> ./c.txt"#
    )]
    Fetch {
        #[arg(
            long,
            default_value_t = 0,
            value_name = "N",
            help = "Drop N leading key components from local destination paths"
        )]
        strip_components: usize,
    },
    #[command(
        visible_aliases = ["push", "up"],
        about = "Upload file:// references and rewrite them to s3:// URLs",
        long_about = r#"Upload every local file referenced by a file:// string in the JSON document on
stdin under DEST_S3_BASE_URL, then print the document with those strings
replaced by s3:// URLs of the uploaded objects.

Object keys are the base prefix followed by the absolute local path (without
its leading slash); use --strip-components to drop host-specific directories."#,
        after_help = r#"EXAMPLES
  $ tractorbeam publish s3://bucket2/out < local.json
  $ tractorbeam push s3://bucket2/out --strip-components 3 < local.json"#
    )]
    Publish {
        #[arg(value_name = "DEST_S3_BASE_URL", help = "Destination base, e.g. s3://bucket/prefix")]
        dest_s3_base_url: String,
        #[arg(
            long,
            default_value_t = 0,
            value_name = "N",
            help = "Drop N leading path components before composing object keys"
        )]
        strip_components: usize,
    },
    #[command(about = "Print a shell completion script")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn init_tracing(level: LogLevel) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.filter_directive()));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_ansi(io::stderr().is_terminal())
        .with_writer(io::stderr)
        .try_init();
}

fn add_transfer_hint(err: Error) -> Error {
    if err.hint().is_some() {
        return err;
    }
    let object = err
        .object()
        .map(|(bucket, key)| format!("s3://{bucket}/{key}"))
        .unwrap_or_else(|| "the object".to_string());
    match err.kind() {
        ErrorKind::NotFound => {
            let hint = format!("Check that {object} exists and the bucket name is spelled right.");
            err.with_hint(hint)
        }
        ErrorKind::Permission => {
            let hint = format!("Check the active AWS credentials and bucket policy for {object}.");
            err.with_hint(hint)
        }
        ErrorKind::Transfer => err.with_hint(
            "Transfer failed. Rerun with --log-level debug to see SDK details.",
        ),
        _ => err,
    }
}

fn add_io_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Io || err.hint().is_some() {
        return err;
    }
    err.with_hint("I/O error. Check the path, permissions, and disk space.")
}

fn add_internal_hint(err: Error) -> Error {
    if err.kind() != ErrorKind::Internal || err.hint().is_some() {
        return err;
    }
    err.with_hint(
        "Unexpected internal failure. Retry with RUST_BACKTRACE=1 and share command/context if it persists.",
    )
}

fn report_failure(err: &Error, reporting: &Reporting) {
    if !err.kind().is_loggable() || !reporting.log_level.is_quiet() {
        emit_error(err, reporting.color);
        return;
    }

    let Some(config_dir) = reporting.config_dir.clone().or_else(default_config_dir) else {
        emit_error(err, reporting.color);
        return;
    };
    let log_path = error_log_path(&config_dir);
    match append_error_report(&log_path, err) {
        Ok(()) => eprintln!(
            "{:?}: {}. See {} for error details.",
            err.kind(),
            error_message(err),
            log_path.display()
        ),
        Err(_) => emit_error(err, reporting.color),
    }
}

#[derive(Copy, Clone, Debug)]
enum AnsiColor {
    Red,
    Yellow,
}

fn colorize_label(label: &str, enabled: bool, color: AnsiColor) -> String {
    if !enabled {
        return label.to_string();
    }
    let code = match color {
        AnsiColor::Red => "31",
        AnsiColor::Yellow => "33",
    };
    format!("\u{1b}[{code}m{label}\u{1b}[0m")
}

fn emit_error(err: &Error, color_mode: ColorMode) {
    eprintln!(
        "{}",
        error_output(err, color_mode, io::stderr().is_terminal())
    );
}

/// Human text on a terminal or when color is forced, JSON otherwise.
fn error_output(err: &Error, color_mode: ColorMode, is_tty: bool) -> String {
    if is_tty || matches!(color_mode, ColorMode::Always) {
        return error_text(err, color_mode.use_color(is_tty));
    }

    let value = error_json(err);
    serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    })
}

fn error_message(err: &Error) -> String {
    if let Some(message) = err.message() {
        return message.to_string();
    }
    match err.kind() {
        ErrorKind::Internal => "internal error".to_string(),
        ErrorKind::Usage => "usage error".to_string(),
        ErrorKind::NotConfigured => "storage backend is not configured".to_string(),
        ErrorKind::NotFound => "not found".to_string(),
        ErrorKind::Permission => "permission denied".to_string(),
        ErrorKind::Transfer => "transfer failed".to_string(),
        ErrorKind::Io => "i/o error".to_string(),
    }
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(path) = err.path() {
        inner.insert("path".to_string(), json!(path.display().to_string()));
    }
    if let Some((bucket, key)) = err.object() {
        inner.insert("bucket".to_string(), json!(bucket));
        inner.insert("key".to_string(), json!(key));
    }
    let causes = err.causes();
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error, use_color: bool) -> String {
    let mut lines = Vec::new();
    lines.push(format!(
        "{} {}",
        colorize_label("error:", use_color, AnsiColor::Red),
        error_message(err)
    ));

    if let Some(hint) = err.hint() {
        lines.push(format!(
            "{} {hint}",
            colorize_label("hint:", use_color, AnsiColor::Yellow)
        ));
    }
    if let Some(path) = err.path() {
        lines.push(format!(
            "{} {}",
            colorize_label("path:", use_color, AnsiColor::Yellow),
            path.display()
        ));
    }
    if let Some((bucket, key)) = err.object() {
        lines.push(format!(
            "{} s3://{bucket}/{key}",
            colorize_label("object:", use_color, AnsiColor::Yellow)
        ));
    }
    for cause in err.causes() {
        lines.push(format!(
            "{} {cause}",
            colorize_label("caused by:", use_color, AnsiColor::Yellow)
        ));
    }

    lines.join("\n")
}

fn clap_error_summary(err: &clap::Error) -> String {
    for line in err.to_string().lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(rest) = trimmed.strip_prefix("error:") {
            return rest.trim().to_string();
        }
        return trimmed.to_string();
    }
    "invalid arguments".to_string()
}

fn clap_error_hint(err: &clap::Error) -> String {
    let rendered = err.to_string();
    let usage = rendered
        .lines()
        .find_map(|line| line.trim().strip_prefix("Usage: "))
        .map(str::trim);

    let Some(usage) = usage else {
        return "Try `tractorbeam --help`.".to_string();
    };

    let tokens: Vec<&str> = usage.split_whitespace().collect();
    let Some(pos) = tokens.iter().position(|t| *t == "tractorbeam") else {
        return "Try `tractorbeam --help`.".to_string();
    };

    let parts: Vec<&str> = tokens
        .iter()
        .skip(pos + 1)
        .take_while(|token| {
            !(token.starts_with('-') || token.starts_with('<') || token.starts_with('['))
        })
        .copied()
        .collect();

    if parts.is_empty() {
        return "Try `tractorbeam --help`.".to_string();
    }
    format!("Try `tractorbeam {} --help`.", parts.join(" "))
}
