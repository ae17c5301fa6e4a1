#![cfg_attr(docsrs, feature(doc_cfg))]

//! # xref-bundler
//!
//! Bundles JSON/YAML documents (OpenAPI, JSON Schema, AsyncAPI, ...) by
//! resolving every external `$ref` and inlining the target under a shared
//! `x-ext` bucket keyed by a short content hash of the resource identifier.
//!
//! ## Quick Start
//!
//! ### Bundle a document in place
//!
//! ```no_run
//! use xref_bundler::{BundleOptions, bundle, plugins::{FetchUrls, ReadFiles}};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut document = serde_json::json!({
//!     "components": { "$ref": "https://example.com/components.json#/schemas" }
//! });
//!
//! let options = BundleOptions::new()
//!     .loader(FetchUrls::new())
//!     .loader(ReadFiles::new()?)
//!     .tree_shake(true);
//!
//! bundle(&mut document, &options).await?;
//! assert!(document.get("x-ext").is_some());
//! # Ok(()) }
//! ```
//!
//! ### Bundle from a URL, path or raw text
//!
//! ```no_run
//! use xref_bundler::{BundleOptions, bundle_source, plugins::{FetchUrls, ParseYaml}};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let options = BundleOptions::new()
//!     .loader(ParseYaml)
//!     .loader(FetchUrls::new());
//!
//! let document = bundle_source("https://example.com/openapi.yaml", &options).await?;
//! println!("{}", serde_json::to_string_pretty(&document)?);
//! # Ok(()) }
//! ```
//!
//! ### Partial bundling
//!
//! Sub-trees can be bundled one at a time. Share a [`ResolutionCache`]
//! between calls so a resource is fetched once across all of them.
//!
//! ```no_run
//! use xref_bundler::{BundleOptions, ResolutionCache, bundle_subtree, plugins::FetchUrls};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut document = serde_json::json!({
//!     "b": { "$ref": "https://example.com/chunk.json" },
//!     "c": { "$ref": "https://example.com/chunk.json" }
//! });
//! let options = BundleOptions::new()
//!     .loader(FetchUrls::new())
//!     .cache(ResolutionCache::new());
//!
//! bundle_subtree(&mut document, "/b", &options).await?;
//! bundle_subtree(&mut document, "/c", &options).await?;
//! # Ok(()) }
//! ```

pub mod bundle;
pub mod cache;
pub mod hash;
pub mod limiter;
pub mod plugins;
pub mod refs;
pub mod runtime;

pub use bundle::{
    BundleOptions, EXTERNAL_DOCUMENTS, EXTERNAL_DOCUMENTS_MAPPINGS, UnresolvedRef, bundle,
    bundle_source, bundle_subtree, tree_shake, unresolved_refs,
};
pub use cache::{ResolutionCache, VisitedNodes};
pub use hash::get_hash;
pub use limiter::ConcurrencyLimiter;
pub use plugins::{
    LifecyclePlugin, LoaderError, LoaderKind, LoaderPlugin, NodeContext, Plugin,
};
pub use refs::{
    get_nested_value, is_file_path, is_local_ref, is_remote_url, prefix_internal_ref,
    prefix_internal_ref_recursive, set_value_at_path,
};
pub use runtime::{MemoryRuntime, Runtime, RuntimeError, RuntimeResult};

#[cfg(not(target_family = "wasm"))]
pub use runtime::NativeRuntime;

// Logging utilities (optional, enabled with "logging" feature)
#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub mod logging;

#[cfg(feature = "logging")]
#[cfg_attr(docsrs, doc(cfg(feature = "logging")))]
pub use logging::{LogLevel, init_logging, init_logging_from_env};

/// Error types for xref-bundler operations.
///
/// Only failures that leave no document to work with are reported here.
/// A single reference that cannot be resolved is logged and left in place.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No loader accepted the string handed to [`bundle_source`].
    #[error("Failed to resolve input '{input}': no loader can process it")]
    UnresolvableInput { input: String },

    /// A loader accepted the input but could not produce a document.
    #[error("Failed to load input '{input}': {source}")]
    InputLoad {
        input: String,
        #[source]
        source: LoaderError,
    },

    /// The input was loaded but is not a mapping or a sequence.
    #[error("Input '{input}' did not produce an object or array document")]
    InputNotADocument { input: String },

    /// A JSON pointer does not address a node inside the document.
    #[error("Invalid JSON pointer: {0}")]
    InvalidPointer(String),

    /// An operation that expects a local (`#...`) reference got something else.
    #[error("Expected a local reference, got '{0}'")]
    NotALocalRef(String),

    /// A loader that needs a filesystem was used where none exists.
    #[error("{0} is not available in this environment")]
    UnsupportedEnvironment(&'static str),
}

/// Result type alias for xref-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::UnresolvableInput { .. } => "UNRESOLVABLE_INPUT",
            Error::InputLoad { .. } => "INPUT_LOAD_FAILED",
            Error::InputNotADocument { .. } => "INPUT_NOT_A_DOCUMENT",
            Error::InvalidPointer(_) => "INVALID_POINTER",
            Error::NotALocalRef(_) => "NOT_A_LOCAL_REF",
            Error::UnsupportedEnvironment(_) => "UNSUPPORTED_ENVIRONMENT",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::UnresolvableInput { input } => Some(Box::new(format!(
                "Add a loader that accepts '{}'.\nURLs need FetchUrls, paths need ReadFiles, raw text needs ParseJson or ParseYaml.",
                input
            ))),
            Error::InputLoad { input, .. } => Some(Box::new(format!(
                "Check that '{}' exists, is reachable and contains valid JSON or YAML.",
                input
            ))),
            Error::InputNotADocument { .. } => Some(Box::new(
                "The top-level value of a bundled document must be an object or an array.",
            )),
            Error::InvalidPointer(_) => Some(Box::new(
                "Pointers are '/'-separated with '~0' for '~' and '~1' for '/', e.g. /components/schemas/User",
            )),
            Error::UnsupportedEnvironment(_) => Some(Box::new(
                "Supply a Runtime implementation with ReadFiles::with_runtime() instead.",
            )),
            _ => None,
        }
    }
}
