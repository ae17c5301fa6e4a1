//! xref CLI - bundle JSON/YAML documents with external `$ref`s into one file.
//!
//! The binary is a thin layer over [`xref_bundler`]:
//!
//! - [`cli`] - argument definitions (clap derive)
//! - [`config`] - layered configuration (defaults, file, `XREF_*` env, flags)
//! - [`commands`] - command implementations
//! - [`error`] - error types and miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status messages on stderr
//!
//! # Example
//!
//! ```rust,no_run
//! use xref_cli::{error::Result, logger};
//!
//! fn main() -> Result<()> {
//!     logger::init_logger(false, false, false);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, ConfigError, Result};
