//! Error handling for the xref CLI.
//!
//! - [`CliError`] is what every command returns
//! - [`ConfigError`] covers loading and validating configuration
//!
//! Both are converted to a [`miette::Report`] in `main` by
//! [`cli_error_to_miette`]. Bundler errors keep their own diagnostic codes
//! and help text.

use std::path::PathBuf;
use thiserror::Error;
use xref_bundler::UnresolvedRef;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Errors from the bundler itself
    #[error(transparent)]
    Bundle(#[from] xref_bundler::Error),

    /// `--strict` was given and some refs could not be resolved
    #[error("{} external reference(s) could not be resolved", .0.len())]
    Unresolved(Vec<UnresolvedRef>),

    /// Failed to write the bundled document
    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Serializing the bundled document failed
    #[error("Failed to serialize output: {0}")]
    Serialize(String),

    /// I/O errors from stdout
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file passed with `--config` doesn't exist
    #[error("Config file not found: {}\n\nHint: Create xref.config.json or pass an existing file to --config", .0.display())]
    NotFound(PathBuf),

    /// Config file is neither JSON nor TOML
    #[error("Unsupported config file: {}\n\nHint: Use a .json or .toml file", .0.display())]
    UnsupportedFormat(PathBuf),

    /// A source could not be parsed into the configuration
    #[error("{0}\n\nHint: Check xref.config.json / xref.config.toml and XREF_* variables for typos and types")]
    Invalid(String),

    /// A value parsed but cannot be used
    #[error("Invalid value for '{field}': {value}\n\nHint: {hint}")]
    InvalidValue {
        field: String,
        value: String,
        hint: String,
    },
}

impl From<serde_json::Error> for CliError {
    fn from(err: serde_json::Error) -> Self {
        CliError::Serialize(err.to_string())
    }
}

impl From<serde_yaml::Error> for CliError {
    fn from(err: serde_yaml::Error) -> Self {
        CliError::Serialize(err.to_string())
    }
}

/// Result type alias using `CliError` as the default error type.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

/// Convert a CliError to a miette Report
pub fn cli_error_to_miette(err: CliError) -> miette::Report {
    match err {
        CliError::Bundle(e) => miette::Report::new(e),
        CliError::Unresolved(refs) => {
            let listing = refs
                .iter()
                .map(|r| format!("  {} -> {}", display_pointer(&r.pointer), r.reference))
                .collect::<Vec<_>>()
                .join("\n");
            miette::miette!(
                help = "Check that every referenced file exists and every URL is reachable",
                "{} external reference(s) could not be resolved:\n{}",
                refs.len(),
                listing
            )
        }
        other => miette::miette!("{}", other),
    }
}

fn display_pointer(pointer: &str) -> &str {
    if pointer.is_empty() { "/" } else { pointer }
}
