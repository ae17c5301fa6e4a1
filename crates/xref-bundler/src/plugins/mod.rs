//! Loader and lifecycle plugins.
//!
//! Plugins come in two kinds, distinguished by the [`Plugin`] tag:
//!
//! - **Loaders** turn an identifier (URL, path, raw text) into a document.
//!   They are tried in list order and the first whose `validate` accepts the
//!   identifier is used.
//! - **Lifecycle plugins** observe (and may edit) nodes while the bundler
//!   walks the document.

#[cfg(all(feature = "fetch", not(target_family = "wasm")))]
mod fetch_urls;
mod parse_json;
mod parse_yaml;
mod read_files;

#[cfg(all(feature = "fetch", not(target_family = "wasm")))]
pub use fetch_urls::{DomainHeaders, FetchUrls};
pub use parse_json::ParseJson;
pub use parse_yaml::ParseYaml;
pub use read_files::ReadFiles;

use async_trait::async_trait;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::cache::{ResolutionCache, ResolveError};
use crate::refs::{get_nested_value, get_nested_value_mut, to_pointer};
use crate::runtime::RuntimeError;

/// Errors a loader can report for a single identifier.
#[derive(Debug, thiserror::Error)]
pub enum LoaderError {
    /// Transport failure talking to a remote host.
    #[error("request to '{url}' failed: {message}")]
    Http { url: String, message: String },

    /// The remote host answered with a non-success status.
    #[error("'{url}' responded with status {status}")]
    Status { url: String, status: u16 },

    /// Reading from the runtime failed.
    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    /// The content is neither JSON nor YAML, or is not a mapping/sequence.
    #[error("failed to parse '{identifier}': {message}")]
    Parse { identifier: String, message: String },

    /// The loader cannot work in this environment.
    #[error("{0}")]
    Unsupported(String),
}

/// How a loader relates to the identifier it loads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoaderKind {
    /// The identifier is a location (URL, path); it becomes the origin that
    /// relative refs in the loaded document resolve against.
    Source,
    /// The identifier is the content itself (raw JSON/YAML text).
    Inline,
}

/// A loader resolves identifiers into documents.
#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
pub trait LoaderPlugin: Send + Sync + fmt::Debug {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this loader handles `identifier`.
    fn validate(&self, identifier: &str) -> bool;

    /// Load `identifier`. Only called after `validate` returned true.
    async fn exec(&self, identifier: &str) -> Result<Value, LoaderError>;

    /// Whether the identifier is a location or inline content.
    fn kind(&self) -> LoaderKind {
        LoaderKind::Source
    }
}

/// Context handed to node lifecycle hooks.
///
/// Nodes are identified by their path from the document root. Hooks receive
/// the root itself and reach the node, its parent or any other part of the
/// document through these paths.
pub struct NodeContext<'a> {
    /// Path of the node from the document root.
    pub path: &'a [String],
    /// Path of the node this one was reached from; `None` for the starting node.
    pub parent_path: Option<&'a [String]>,
    /// Cache of resolved external resources for this run.
    pub resolution_cache: &'a ResolutionCache,
    /// Loaders configured for this run.
    pub loaders: &'a [Arc<dyn LoaderPlugin>],
}

impl NodeContext<'_> {
    /// The node's path as a JSON pointer.
    pub fn pointer(&self) -> String {
        to_pointer(self.path)
    }

    /// The parent's path as a JSON pointer.
    pub fn parent_pointer(&self) -> Option<String> {
        self.parent_path.map(to_pointer)
    }

    /// The node being processed.
    pub fn node<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        get_nested_value(root, self.path)
    }

    /// The node being processed, for editing.
    pub fn node_mut<'v>(&self, root: &'v mut Value) -> Option<&'v mut Value> {
        get_nested_value_mut(root, self.path)
    }

    /// The node this one was reached from.
    pub fn parent<'v>(&self, root: &'v Value) -> Option<&'v Value> {
        get_nested_value(root, self.parent_path?)
    }
}

/// Hooks fired while walking a document. All methods default to no-ops.
pub trait LifecyclePlugin: Send + Sync {
    /// Before a mapping or sequence is processed. Children added here are walked.
    ///
    /// `root` is the whole document; the node sits at `context.path`.
    fn on_before_node_process(&self, _root: &mut Value, _context: &NodeContext<'_>) {}

    /// After a node and all its descendants were processed.
    fn on_after_node_process(&self, _root: &mut Value, _context: &NodeContext<'_>) {}

    /// Before an external reference is resolved.
    fn on_resolve_start(&self, _node: &Value) {}

    /// After an external reference was resolved and rewritten.
    fn on_resolve_success(&self, _node: &Value) {}

    /// After an external reference failed to resolve.
    fn on_resolve_error(&self, _node: &Value) {}
}

/// A configured plugin.
#[derive(Clone)]
pub enum Plugin {
    Loader(Arc<dyn LoaderPlugin>),
    Lifecycle(Arc<dyn LifecyclePlugin>),
}

impl Plugin {
    /// Wrap a loader.
    pub fn loader(loader: impl LoaderPlugin + 'static) -> Self {
        Plugin::Loader(Arc::new(loader))
    }

    /// Wrap a lifecycle plugin.
    pub fn lifecycle(plugin: impl LifecyclePlugin + 'static) -> Self {
        Plugin::Lifecycle(Arc::new(plugin))
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plugin::Loader(loader) => f.debug_tuple("Loader").field(&loader.name()).finish(),
            Plugin::Lifecycle(_) => f.write_str("Lifecycle"),
        }
    }
}

/// First loader that accepts `identifier`.
pub fn find_loader<'a>(
    identifier: &str,
    loaders: &'a [Arc<dyn LoaderPlugin>],
) -> Option<&'a Arc<dyn LoaderPlugin>> {
    loaders.iter().find(|loader| loader.validate(identifier))
}

/// Resolve `identifier` with the first accepting loader.
pub async fn resolve_contents(
    identifier: &str,
    loaders: &[Arc<dyn LoaderPlugin>],
) -> Result<Value, ResolveError> {
    let loader = find_loader(identifier, loaders)
        .ok_or_else(|| ResolveError::NoLoader(identifier.to_string()))?;
    tracing::debug!(loader = loader.name(), identifier, "loading external resource");
    Ok(loader.exec(identifier).await?)
}

/// Parse fetched or read text as JSON, falling back to YAML.
///
/// Only mappings and sequences count as documents.
pub fn parse_document(identifier: &str, content: &str) -> Result<Value, LoaderError> {
    let value = match serde_json::from_str::<Value>(content) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_str::<Value>(content).map_err(|e| LoaderError::Parse {
            identifier: identifier.to_string(),
            message: e.to_string(),
        })?,
    };

    if value.is_object() || value.is_array() {
        Ok(value)
    } else {
        Err(LoaderError::Parse {
            identifier: identifier.to_string(),
            message: "content is not a mapping or a sequence".to_string(),
        })
    }
}
