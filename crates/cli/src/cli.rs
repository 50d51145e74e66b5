//! Command-line arguments, error categories and exit codes.

use crate::tracing::{LogLevel, TracingFormat};
use clap::{Parser, ValueEnum};
use miette::{Diagnostic, Report};
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Configuration, validation or preset error exit code
pub const EXIT_CLI: i32 = 2;
/// Internal defect or I/O failure exit code
pub const EXIT_INTERNAL: i32 = 3;

/// Generate GitHub Actions workflows for React Native projects.
#[derive(Parser, Debug)]
#[command(name = "rnflow", version, about, long_about = None)]
pub struct Cli {
    /// Workflow configuration file (`.json`, otherwise parsed as YAML).
    #[arg(
        short,
        long,
        value_name = "PATH",
        required_unless_present_any = ["preset", "list_presets"]
    )]
    pub config: Option<PathBuf>,

    /// Write the workflow here instead of stdout. A directory receives a
    /// file named after the workflow.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Start from a built-in preset; the configuration file becomes overrides.
    #[arg(short, long, value_name = "NAME")]
    pub preset: Option<String>,

    /// Format of the required secrets report printed to stderr.
    #[arg(long, value_enum, default_value_t = SecretsReportFormat::Text)]
    pub secrets_report: SecretsReportFormat,

    /// List the built-in presets and exit.
    #[arg(long, conflicts_with_all = ["config", "output", "preset"])]
    pub list_presets: bool,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        env = "RNFLOW_LOG",
        default_value = "warn",
        value_enum
    )]
    pub level: LogLevel,

    /// Log output format.
    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: TracingFormat,
}

/// Parse command-line arguments, exiting on usage errors.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}

/// Secrets report formats
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Default)]
pub enum SecretsReportFormat {
    /// Aligned human-readable table
    #[default]
    Text,
    /// JSON array of secret requirements
    Json,
}

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    /// The generation pipeline failed
    #[error(transparent)]
    #[diagnostic(transparent)]
    Generation(#[from] rnflow_engine::Error),

    /// The configuration file could not be read or parsed (exit code 2)
    #[error("configuration error: {message}")]
    #[diagnostic(code(rnflow::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },

    /// Writing output failed or another unexpected error occurred (exit code 3)
    #[error("unexpected error: {message}")]
    #[diagnostic(code(rnflow::cli::other))]
    Other {
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

    /// Create a new other error
    #[must_use]
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new other error with help text
    #[must_use]
    pub fn other_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Generation(inner) if inner.is_user_error() => EXIT_CLI,
        CliError::Generation(_) | CliError::Other { .. } => EXIT_INTERNAL,
    }
}

/// Render an error with its full diagnostic chain.
pub fn render_error(err: CliError, out: &mut impl Write) {
    let report = Report::new(err);
    let _ = writeln!(out, "{report:?}");
    let _ = out.flush();
}
