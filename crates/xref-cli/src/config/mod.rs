//! Configuration for the xref CLI with multi-source loading.
//!
//! Priority: CLI > Environment (`XREF_*`) > File > Defaults

mod loading;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub use loading::{DEFAULT_CONFIG_FILES, ENV_PREFIX};

/// Serialization format of the bundled document.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

impl OutputFormat {
    /// Guess the format from an output file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "json" => Some(OutputFormat::Json),
            "yaml" | "yml" => Some(OutputFormat::Yaml),
            _ => None,
        }
    }
}

/// Extra request headers for every URL whose host matches one of `domains`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeaderRule {
    /// Hosts (optionally `host:port`) the headers are sent to.
    pub domains: Vec<String>,
    /// Header name to value.
    pub headers: BTreeMap<String, String>,
}

/// xref configuration - loaded from xref.config.{json,toml}, the environment
/// and CLI flags.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct XrefConfig {
    /// Drop unreferenced parts of inlined documents
    #[serde(default)]
    pub tree_shake: bool,

    /// Maximum traversal depth
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<usize>,

    /// Base location for relative refs in the input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,

    /// Always emit `x-ext-urls`
    #[serde(default)]
    pub url_map: bool,

    /// Maximum concurrent HTTP requests; unlimited when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<usize>,

    /// Output format; guessed from the output file name when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<OutputFormat>,

    /// Per-domain request headers for remote refs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<HeaderRule>,
}

impl XrefConfig {
    /// Output format to use when writing to `output` (stdout when `None`).
    pub fn output_format(&self, output: Option<&Path>) -> OutputFormat {
        self.format
            .or_else(|| output.and_then(OutputFormat::from_path))
            .unwrap_or_default()
    }
}
