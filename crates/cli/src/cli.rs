//! Command line definition, exit codes and error rendering

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, Subcommand};
use envsecrets::SecretError;
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;
/// Secret resolution error exit code
pub const EXIT_RESOLVE: i32 = 3;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// CLI or configuration error (exit code 2)
    #[error("CLI/configuration error: {message}")]
    #[diagnostic(code(envsecrets::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A lookup could not be resolved (exit code 3)
    #[error("Resolution error: {message}")]
    #[diagnostic(code(envsecrets::cli::resolve))]
    Resolve {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new configuration error with help text
    #[must_use]
    pub fn config_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a new resolution error
    #[must_use]
    pub fn resolve(message: impl Into<String>) -> Self {
        Self::Resolve {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new resolution error with help text
    #[must_use]
    pub fn resolve_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Resolve {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert `envsecrets::SecretError` to the matching `CliError` variant.
///
/// Malformed input and local setup problems are configuration errors (exit
/// code 2); everything that went wrong while looking a value up is a
/// resolution error (exit code 3).
impl From<SecretError> for CliError {
    fn from(err: SecretError) -> Self {
        let message = err.to_string();
        match err {
            SecretError::InvalidFormat { .. } => Self::config_with_help(
                message,
                "References look like @<provider>:<path>:<key> or @env:<NAME>",
            ),
            SecretError::ProviderNotImplemented { .. } => Self::config_with_help(
                message,
                "Run `envsecrets providers` to list the available providers",
            ),
            SecretError::Configuration { .. }
            | SecretError::EnvFile { .. }
            | SecretError::Runtime { .. } => Self::config(message),
            SecretError::BackendUnavailable { .. } => Self::resolve_with_help(
                message,
                "Check AWS credentials, region and network access to the secrets backend",
            ),
            SecretError::DocumentDecodeFailure { .. } => Self::resolve_with_help(
                message,
                "Keyed references need the secret to be stored as a JSON object",
            ),
            SecretError::SecretKeyNotFound { .. } | SecretError::EnvVarNotSet { .. } => {
                Self::resolve(message)
            }
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Resolve { .. } => EXIT_RESOLVE,
    }
}

/// Render error appropriately based on JSON flag
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Resolve { .. } => "resolve",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        // Use miette for human-friendly error display
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        // Ensure output is flushed before potential process exit
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Resolve environment variables that reference secrets.
///
/// Keys are either plain variable names or references such as
/// `@aws:dev/app:password` and `@env:RABBITMQ_HOST`.
#[derive(Parser, Debug)]
#[command(name = "envsecrets")]
#[command(about = "Resolve environment variables that reference secrets")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "compact", value_enum)]
    pub log_format: TracingFormat,

    /// Emit JSON envelope on stdout.
    #[arg(long, global = true, help = "Emit JSON envelope instead of plain text")]
    pub json: bool,

    /// Env file loaded before resolving (defaults to the nearest `.env`).
    #[arg(long, global = true, env = "ENVSECRETS_ENV_FILE", conflicts_with = "no_env_file")]
    pub env_file: Option<PathBuf>,

    /// Do not load any env file.
    #[arg(long, global = true)]
    pub no_env_file: bool,

    /// AWS region for `@aws:` references.
    #[arg(long, global = true, env = "AWS_REGION")]
    pub region: Option<String>,

    /// AWS Secrets Manager version stage.
    #[arg(long, global = true, env = "ENVSECRETS_AWS_VERSION_STAGE")]
    pub version_stage: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Resolve keys and print their values
    Get {
        /// Plain variable names or provider references
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Resolve keys and report success or failure without printing values
    Check {
        /// Plain variable names or provider references
        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Show how a reference is decomposed
    Parse {
        /// Reference such as `@aws:dev/app:password`
        reference: String,
    },
    /// List registered providers
    Providers,
}

/// Parse command line arguments
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
