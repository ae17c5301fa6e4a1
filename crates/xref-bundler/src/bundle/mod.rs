//! Bundle entry points and options.
//!
//! Three ways in:
//!
//! - [`bundle`] bundles a whole document in place
//! - [`bundle_subtree`] bundles the node at a JSON pointer, following local
//!   refs out of the subtree into the rest of the document
//! - [`bundle_source`] loads a URL, path or raw JSON/YAML text first and
//!   returns the bundled result
//!
//! Every external `$ref` that resolves is rewritten to
//! `#/x-ext/<key><fragment>`, where `<key>` is [`get_hash`](crate::get_hash)
//! of the resource identifier. Refs that fail to resolve are logged and left
//! as they were.

mod tree_shake;
mod walker;

pub use tree_shake::tree_shake;

use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

use crate::cache::{ResolutionCache, VisitedNodes};
use crate::plugins::{LifecyclePlugin, LoaderKind, LoaderPlugin, Plugin, find_loader};
use crate::refs::{get_nested_value, is_local_ref, pointer_segments, to_pointer};
use crate::{Error, Result};
use walker::{Frame, Walker};

/// Root key holding the inlined external documents.
pub const EXTERNAL_DOCUMENTS: &str = "x-ext";

/// Root key mapping bucket keys back to resource identifiers.
pub const EXTERNAL_DOCUMENTS_MAPPINGS: &str = "x-ext-urls";

/// Configuration for a bundle run.
#[derive(Clone, Default)]
pub struct BundleOptions {
    /// Loaders and lifecycle plugins, in priority order.
    pub plugins: Vec<Plugin>,
    /// Prune unreachable parts of inlined documents after resolution.
    pub tree_shake: bool,
    /// Resolution cache to share between runs.
    pub cache: Option<ResolutionCache>,
    /// Visited set to share between runs.
    pub visited_nodes: Option<VisitedNodes>,
    /// Maximum depth, counted from the starting node, that is processed.
    pub depth: Option<usize>,
    /// Location relative refs in the input resolve against.
    pub origin: Option<String>,
    /// Always write `x-ext-urls`.
    pub url_map: bool,
    /// Hooks called after the lifecycle plugins.
    pub hooks: Option<Arc<dyn LifecyclePlugin>>,
}

impl BundleOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plugin(mut self, plugin: Plugin) -> Self {
        self.plugins.push(plugin);
        self
    }

    pub fn loader(self, loader: impl LoaderPlugin + 'static) -> Self {
        self.plugin(Plugin::loader(loader))
    }

    pub fn lifecycle(self, plugin: impl LifecyclePlugin + 'static) -> Self {
        self.plugin(Plugin::lifecycle(plugin))
    }

    pub fn tree_shake(mut self, enabled: bool) -> Self {
        self.tree_shake = enabled;
        self
    }

    pub fn cache(mut self, cache: ResolutionCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn visited_nodes(mut self, visited: VisitedNodes) -> Self {
        self.visited_nodes = Some(visited);
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn url_map(mut self, enabled: bool) -> Self {
        self.url_map = enabled;
        self
    }

    pub fn hooks(mut self, hooks: impl LifecyclePlugin + 'static) -> Self {
        self.hooks = Some(Arc::new(hooks));
        self
    }

    fn loaders(&self) -> Vec<Arc<dyn LoaderPlugin>> {
        self.plugins
            .iter()
            .filter_map(|plugin| match plugin {
                Plugin::Loader(loader) => Some(Arc::clone(loader)),
                Plugin::Lifecycle(_) => None,
            })
            .collect()
    }
}

impl fmt::Debug for BundleOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BundleOptions")
            .field("plugins", &self.plugins)
            .field("tree_shake", &self.tree_shake)
            .field("cache", &self.cache.as_ref().map(ResolutionCache::len))
            .field("visited_nodes", &self.visited_nodes.as_ref().map(VisitedNodes::len))
            .field("depth", &self.depth)
            .field("origin", &self.origin)
            .field("url_map", &self.url_map)
            .field("hooks", &self.hooks.is_some())
            .finish()
    }
}

/// Bundle `document` in place.
pub async fn bundle(document: &mut Value, options: &BundleOptions) -> Result<()> {
    let origin = options.origin.clone().unwrap_or_default();
    run(document, Vec::new(), options, origin).await;
    Ok(())
}

/// Bundle only the node at `pointer` inside `root`.
///
/// Local refs reached from the subtree are followed into `root`, and the
/// resolved documents still land in the root's `x-ext`. An empty pointer
/// bundles the whole document.
pub async fn bundle_subtree(root: &mut Value, pointer: &str, options: &BundleOptions) -> Result<()> {
    let path = pointer_segments(pointer);
    if !(pointer.is_empty() || pointer.starts_with('/') || pointer.starts_with("#/"))
        || get_nested_value(root, &path).is_none()
    {
        return Err(Error::InvalidPointer(pointer.to_string()));
    }

    let origin = options.origin.clone().unwrap_or_default();
    run(root, path, options, origin).await;
    Ok(())
}

/// Load `input` with the first loader that accepts it, then bundle the result.
///
/// When a location loader (URL, file) produced the document and no origin is
/// configured, the input itself becomes the origin for relative refs.
pub async fn bundle_source(input: &str, options: &BundleOptions) -> Result<Value> {
    let loaders = options.loaders();
    let Some(loader) = find_loader(input, &loaders) else {
        return Err(Error::UnresolvableInput {
            input: input.to_string(),
        });
    };

    tracing::debug!("Loading bundle input with {}", loader.name());
    let mut document = loader.exec(input).await.map_err(|source| Error::InputLoad {
        input: input.to_string(),
        source,
    })?;
    if !(document.is_object() || document.is_array()) {
        return Err(Error::InputNotADocument {
            input: input.to_string(),
        });
    }

    let origin = match (&options.origin, loader.kind()) {
        (Some(origin), _) => origin.clone(),
        (None, LoaderKind::Source) => input.to_string(),
        (None, LoaderKind::Inline) => String::new(),
    };
    run(&mut document, Vec::new(), options, origin).await;
    Ok(document)
}

async fn run(root: &mut Value, start: Vec<String>, options: &BundleOptions, origin: String) {
    let partial = !start.is_empty();
    let walker = Walker::new(options, partial, origin.clone());
    walker.walk(root, Frame::start(start, origin)).await;

    let url_map = walker.into_url_map();
    if !url_map.is_empty() && (options.url_map || partial || options.depth.is_some()) {
        merge_url_map(root, url_map);
    }

    if options.tree_shake {
        tree_shake(root);
    }
}

fn merge_url_map(root: &mut Value, url_map: Map<String, Value>) {
    let Value::Object(root) = root else {
        return;
    };
    let mappings = root
        .entry(EXTERNAL_DOCUMENTS_MAPPINGS)
        .or_insert_with(|| Value::Object(Map::new()));
    if !mappings.is_object() {
        *mappings = Value::Object(Map::new());
    }
    if let Value::Object(mappings) = mappings {
        mappings.extend(url_map);
    }
}

/// An external ref still present after bundling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnresolvedRef {
    /// JSON pointer of the node holding the ref.
    pub pointer: String,
    /// The `$ref` value.
    pub reference: String,
}

/// List every `$ref` that does not point inside the document.
pub fn unresolved_refs(document: &Value) -> Vec<UnresolvedRef> {
    let mut found = Vec::new();
    let mut path = Vec::new();
    collect_unresolved(document, &mut path, &mut found);
    found
}

fn collect_unresolved(node: &Value, path: &mut Vec<String>, found: &mut Vec<UnresolvedRef>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if !is_local_ref(reference) {
                    found.push(UnresolvedRef {
                        pointer: to_pointer(path),
                        reference: reference.clone(),
                    });
                }
            }
            for (key, value) in map {
                path.push(key.clone());
                collect_unresolved(value, path, found);
                path.pop();
            }
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                collect_unresolved(item, path, found);
                path.pop();
            }
        }
        _ => {}
    }
}
