//! Command-line interface definition.
//!
//! - `xref bundle <INPUT>` - resolve every external `$ref` in a document and
//!   write the self-contained result

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::OutputFormat;

/// xref - bundle JSON and YAML documents with external references
#[derive(Parser, Debug)]
#[command(
    name = "xref",
    version,
    about = "Bundle JSON/YAML documents by inlining external $ref targets",
    long_about = "xref resolves every external $ref in an OpenAPI, AsyncAPI or JSON Schema\n\
                  document (remote URLs and local files) and inlines the targets under a\n\
                  shared x-ext key, producing a single self-contained document."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    ///
    /// Shows every resource that is loaded and how refs are rewritten.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    ///
    /// Unresolved reference warnings are hidden as well.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available xref subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Bundle a document
    ///
    /// Loads INPUT (URL, file path, or raw JSON/YAML text), resolves its
    /// external references and prints the bundled document.
    Bundle(BundleArgs),
}

/// Arguments for the bundle command
#[derive(Args, Debug, Clone, Default)]
pub struct BundleArgs {
    /// Document to bundle: an http(s) URL, a file path, or raw JSON/YAML
    ///
    /// Examples:
    ///   xref bundle openapi.yaml
    ///   xref bundle https://example.com/openapi.json
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Write the result to FILE instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,

    /// Drop the parts of inlined documents that nothing references
    #[arg(long)]
    pub tree_shake: bool,

    /// Stop resolving below this depth
    #[arg(long, value_name = "N")]
    pub depth: Option<usize>,

    /// Location relative refs in INPUT resolve against
    ///
    /// Defaults to INPUT itself when it is a URL or a file path.
    #[arg(long, value_name = "URL")]
    pub origin: Option<String>,

    /// Always write the x-ext-urls mapping of bucket keys to sources
    #[arg(long)]
    pub url_map: bool,

    /// Maximum number of concurrent HTTP requests
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Exit with an error if any external reference stays unresolved
    #[arg(long)]
    pub strict: bool,

    /// Path to a configuration file (JSON or TOML)
    ///
    /// Without it, xref.config.json or xref.config.toml in the current
    /// directory is used when present.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}
