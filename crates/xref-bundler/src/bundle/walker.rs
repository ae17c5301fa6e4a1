//! Depth-first walk that resolves external refs into the `x-ext` bucket.
//!
//! Nodes are addressed by their path from the document root. The walker
//! holds the root mutably and looks nodes up again after every await, so no
//! borrow of a node lives across I/O.

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::{Map, Value};
use std::sync::Arc;

use super::{BundleOptions, EXTERNAL_DOCUMENTS, EXTERNAL_DOCUMENTS_MAPPINGS};
use crate::cache::{Resolution, ResolutionCache, VisitedNodes};
use crate::hash::get_hash;
use crate::plugins::{LifecyclePlugin, LoaderPlugin, NodeContext, Plugin, resolve_contents};
use crate::refs::{
    get_nested_value, get_nested_value_mut, is_local_ref, pointer_segments,
    prefix_internal_ref_recursive, ref_of, resolve_reference_path, split_ref, to_pointer,
};

#[cfg(not(target_family = "wasm"))]
type WalkFuture<'a> = futures::future::BoxFuture<'a, ()>;
#[cfg(target_family = "wasm")]
type WalkFuture<'a> = futures::future::LocalBoxFuture<'a, ()>;

/// Where the walk currently is and how refs found there resolve.
#[derive(Debug, Clone)]
pub(crate) struct Frame {
    pub path: Vec<String>,
    /// Location relative refs resolve against.
    pub origin: String,
    /// Inside a `$global` chunk: local refs address the root document.
    pub in_chunk: bool,
    pub depth: usize,
    pub parent_path: Option<Vec<String>>,
}

impl Frame {
    pub fn start(path: Vec<String>, origin: String) -> Self {
        Self {
            path,
            origin,
            in_chunk: false,
            depth: 0,
            parent_path: None,
        }
    }

    fn child(&self, key: String, origin: String) -> Self {
        let mut path = self.path.clone();
        path.push(key);
        Self {
            path,
            origin,
            in_chunk: self.in_chunk,
            depth: self.depth + 1,
            parent_path: Some(self.path.clone()),
        }
    }
}

pub(crate) struct Walker {
    loaders: Vec<Arc<dyn LoaderPlugin>>,
    lifecycle: Vec<Arc<dyn LifecyclePlugin>>,
    cache: ResolutionCache,
    /// Nodes processed by earlier runs sharing the set.
    visited: Option<VisitedNodes>,
    /// Pointers entered during this run.
    seen: Mutex<FxHashSet<String>>,
    depth_limit: Option<usize>,
    partial: bool,
    default_origin: String,
    /// Bucket key to resource identifier, for `x-ext-urls`.
    url_map: Mutex<Map<String, Value>>,
    /// Bucket key to the origin its content was walked with.
    bucket_origins: Mutex<FxHashMap<String, String>>,
}

impl Walker {
    pub fn new(options: &BundleOptions, partial: bool, default_origin: String) -> Self {
        let mut loaders = Vec::new();
        let mut lifecycle = Vec::new();
        for plugin in &options.plugins {
            match plugin {
                Plugin::Loader(loader) => loaders.push(Arc::clone(loader)),
                Plugin::Lifecycle(hooks) => lifecycle.push(Arc::clone(hooks)),
            }
        }
        if let Some(hooks) = &options.hooks {
            lifecycle.push(Arc::clone(hooks));
        }

        Self {
            loaders,
            lifecycle,
            cache: options.cache.clone().unwrap_or_default(),
            visited: options.visited_nodes.clone(),
            seen: Mutex::new(FxHashSet::default()),
            depth_limit: options.depth,
            partial,
            default_origin,
            url_map: Mutex::new(Map::new()),
            bucket_origins: Mutex::new(FxHashMap::default()),
        }
    }

    /// Resource identifiers recorded during the walk, keyed by bucket.
    pub fn into_url_map(self) -> Map<String, Value> {
        self.url_map.into_inner()
    }

    fn depth_exceeded(&self, depth: usize) -> bool {
        self.depth_limit.is_some_and(|limit| depth > limit)
    }

    pub fn walk<'s>(&'s self, root: &'s mut Value, frame: Frame) -> WalkFuture<'s> {
        Box::pin(async move {
            if self.depth_exceeded(frame.depth) {
                return;
            }
            let pointer = to_pointer(&frame.path);
            match get_nested_value(root, &frame.path) {
                Some(node) if node.is_object() || node.is_array() => {
                    if self.processed_before(&pointer, node) {
                        return;
                    }
                }
                _ => return,
            }
            if !self.seen.lock().insert(pointer.clone()) {
                return;
            }

            tracing::trace!("Processing node {}", pointer);
            self.fire_before(root, &frame);

            let reference = get_nested_value(root, &frame.path)
                .and_then(ref_of)
                .map(str::to_string);

            if let Some(reference) = reference {
                if is_local_ref(&reference) {
                    if self.partial {
                        self.follow_local(root, &reference, &frame).await;
                    }
                } else {
                    self.resolve_external(root, &reference, &frame).await;
                }
                self.finish(root, &frame, &pointer);
                return;
            }

            let children = child_keys(root, &frame.path);
            self.prefetch(root, &frame, &children).await;

            let is_bucket_map = frame.path.len() == 1 && frame.path[0] == EXTERNAL_DOCUMENTS;
            for key in children {
                let origin = if is_bucket_map {
                    self.bucket_origin(root, &key)
                        .unwrap_or_else(|| frame.origin.clone())
                } else {
                    frame.origin.clone()
                };
                let child = if is_bucket_map {
                    Frame {
                        in_chunk: false,
                        ..frame.child(key, origin)
                    }
                } else {
                    frame.child(key, origin)
                };
                self.walk(&mut *root, child).await;
            }

            self.finish(root, &frame, &pointer);
        })
    }

    /// Whether an earlier run sharing the visited set processed this exact node.
    fn processed_before(&self, pointer: &str, node: &Value) -> bool {
        self.visited
            .as_ref()
            .is_some_and(|visited| visited.contains(pointer, node))
    }

    /// Fire the after hooks, then record the processed node for later runs.
    fn finish(&self, root: &mut Value, frame: &Frame, pointer: &str) {
        self.fire_after(root, frame);
        if let (Some(visited), Some(node)) = (&self.visited, get_nested_value(root, &frame.path)) {
            visited.insert(pointer, node);
        }
    }

    /// Walk the target of a local ref (partial bundles only).
    async fn follow_local(&self, root: &mut Value, reference: &str, frame: &Frame) {
        let target = pointer_segments(reference);
        let origin = match target.as_slice() {
            [bucket, key, ..] if bucket == EXTERNAL_DOCUMENTS => self.bucket_origin(root, key),
            _ => None,
        }
        .unwrap_or_else(|| {
            if frame.in_chunk {
                frame.origin.clone()
            } else {
                self.default_origin.clone()
            }
        });

        let parent_path = target
            .split_last()
            .map(|(_, parent)| parent.to_vec());
        let next = Frame {
            path: target,
            origin,
            in_chunk: frame.in_chunk,
            depth: frame.depth + 1,
            parent_path,
        };
        self.walk(root, next).await;
    }

    async fn resolve_external(&self, root: &mut Value, reference: &str, frame: &Frame) {
        let (resource, fragment) = split_ref(reference);
        let identifier = resolve_reference_path(&frame.origin, resource);
        let key = get_hash(&identifier);
        let bucket_path = vec![EXTERNAL_DOCUMENTS.to_string(), key.clone()];

        let is_global = get_nested_value(root, &frame.path)
            .and_then(|node| node.get("$global"))
            .is_some_and(is_truthy);

        let bucket_exists = get_nested_value(root, &bucket_path).is_some();
        if !bucket_exists {
            if let Some(node) = get_nested_value(root, &frame.path) {
                for plugin in &self.lifecycle {
                    plugin.on_resolve_start(node);
                }
            }

            let inserted = match self.load(&identifier).await {
                Ok(document) => {
                    let mut document = Value::clone(&document);
                    if !is_global {
                        prefix_internal_ref_recursive(&mut document, &bucket_path);
                    }
                    insert_bucket(root, &key, document)
                }
                Err(e) => {
                    tracing::debug!("Resolution of {} failed: {}", identifier, e);
                    false
                }
            };

            if !inserted {
                if let Some(node) = get_nested_value(root, &frame.path) {
                    for plugin in &self.lifecycle {
                        plugin.on_resolve_error(node);
                    }
                }
                tracing::warn!(
                    "Failed to resolve external reference \"{}\". The reference may be invalid, inaccessible, or missing a loader for this type of reference.",
                    reference
                );
                return;
            }
        }

        self.url_map
            .lock()
            .insert(key.clone(), Value::String(identifier.clone()));

        if let Some(Value::Object(node)) = get_nested_value_mut(root, &frame.path) {
            node.insert(
                "$ref".to_string(),
                Value::String(format!("#/{EXTERNAL_DOCUMENTS}/{key}{fragment}")),
            );
        }
        if !bucket_exists {
            if let Some(node) = get_nested_value(root, &frame.path) {
                for plugin in &self.lifecycle {
                    plugin.on_resolve_success(node);
                }
            }
        }

        let origin = if is_global {
            frame.origin.clone()
        } else {
            identifier
        };
        self.bucket_origins.lock().insert(key, origin.clone());

        let next = Frame {
            path: bucket_path,
            origin,
            in_chunk: is_global,
            depth: frame.depth + 1,
            parent_path: Some(frame.path.clone()),
        };
        self.walk(root, next).await;
    }

    /// Start loading the external refs among `children` concurrently so the
    /// sequential walk below finds them in the cache.
    async fn prefetch(&self, root: &Value, frame: &Frame, children: &[String]) {
        if frame.path.len() == 1 && frame.path[0] == EXTERNAL_DOCUMENTS {
            return;
        }
        if self.depth_exceeded(frame.depth + 1) {
            return;
        }

        let mut identifiers: Vec<String> = Vec::new();
        for key in children {
            let mut path = frame.path.clone();
            path.push(key.clone());
            let Some(node) = get_nested_value(root, &path) else {
                continue;
            };
            let Some(reference) = ref_of(node) else {
                continue;
            };
            let pointer = to_pointer(&path);
            if is_local_ref(reference)
                || self.seen.lock().contains(&pointer)
                || self.processed_before(&pointer, node)
            {
                continue;
            }

            let (resource, _) = split_ref(reference);
            let identifier = resolve_reference_path(&frame.origin, resource);
            let key = get_hash(&identifier);
            if get_nested_value(root, &[EXTERNAL_DOCUMENTS, key.as_str()]).is_none()
                && !self.cache.contains(&identifier)
                && !identifiers.contains(&identifier)
            {
                identifiers.push(identifier);
            }
        }

        if identifiers.len() > 1 {
            tracing::debug!("Prefetching {} external resources", identifiers.len());
            futures::future::join_all(identifiers.iter().map(|id| self.load(id))).await;
        }
    }

    async fn load(&self, identifier: &str) -> Resolution {
        self.cache
            .get_or_resolve(identifier, || async {
                resolve_contents(identifier, &self.loaders)
                    .await
                    .map(Arc::new)
                    .map_err(Arc::new)
            })
            .await
    }

    /// Origin a bucket's content resolves relative refs against.
    fn bucket_origin(&self, root: &Value, key: &str) -> Option<String> {
        if let Some(origin) = self.bucket_origins.lock().get(key) {
            return Some(origin.clone());
        }
        root.get(EXTERNAL_DOCUMENTS_MAPPINGS)?
            .get(key)?
            .as_str()
            .map(str::to_string)
    }

    fn fire_before(&self, root: &mut Value, frame: &Frame) {
        self.fire(root, frame, |plugin, root, context| {
            plugin.on_before_node_process(root, context)
        });
    }

    fn fire_after(&self, root: &mut Value, frame: &Frame) {
        self.fire(root, frame, |plugin, root, context| {
            plugin.on_after_node_process(root, context)
        });
    }

    fn fire(
        &self,
        root: &mut Value,
        frame: &Frame,
        hook: impl Fn(&dyn LifecyclePlugin, &mut Value, &NodeContext<'_>),
    ) {
        if self.lifecycle.is_empty() || get_nested_value(root, &frame.path).is_none() {
            return;
        }
        let context = NodeContext {
            path: &frame.path,
            parent_path: frame.parent_path.as_deref(),
            resolution_cache: &self.cache,
            loaders: &self.loaders,
        };
        for plugin in &self.lifecycle {
            hook(plugin.as_ref(), &mut *root, &context);
        }
    }
}

/// Keys (or indices) of the node at `path`, snapshotted before descending.
fn child_keys(root: &Value, path: &[String]) -> Vec<String> {
    match get_nested_value(root, path) {
        Some(Value::Object(map)) => map.keys().cloned().collect(),
        Some(Value::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
        _ => Vec::new(),
    }
}

/// Store `document` under `x-ext/<key>`. Fails when the root is not a mapping.
fn insert_bucket(root: &mut Value, key: &str, document: Value) -> bool {
    let Value::Object(map) = root else {
        tracing::warn!("Cannot attach {} to a document whose root is not an object", EXTERNAL_DOCUMENTS);
        return false;
    };
    let buckets = map
        .entry(EXTERNAL_DOCUMENTS)
        .or_insert_with(|| Value::Object(Map::new()));
    if !buckets.is_object() {
        *buckets = Value::Object(Map::new());
    }
    if let Value::Object(buckets) = buckets {
        buckets.insert(key.to_string(), document);
    }
    true
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
