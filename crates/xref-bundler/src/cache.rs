//! Resolution memoization shared across references and across runs.
//!
//! # Architecture
//!
//! - **Keyed by resource**: the key is the resolved identifier without its
//!   fragment, so `a.json#/x` and `a.json#/y` share one load
//! - **In-flight dedup**: each key owns a `OnceCell`, concurrent lookups for
//!   the same key await the same load
//! - **Failures are cached**: a resource that failed once is not retried
//!   within the lifetime of the cache
//!
//! Both types are cheap handles; clone them to share state between
//! `bundle` calls.

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::{FxBuildHasher, FxHashSet, FxHasher};
use serde_json::Value;
use std::future::Future;
use std::hash::Hasher;
use std::sync::Arc;
use tokio::sync::OnceCell;

use crate::plugins::LoaderError;

/// Outcome of resolving one external resource.
pub type Resolution = Result<Arc<Value>, Arc<ResolveError>>;

/// Why an external resource could not be resolved.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    /// No loader accepted the identifier.
    #[error("no loader accepts '{0}'")]
    NoLoader(String),

    /// The accepting loader failed.
    #[error(transparent)]
    Loader(#[from] LoaderError),
}

/// Memoizes resolved documents by normalized resource identifier.
#[derive(Debug, Clone, Default)]
pub struct ResolutionCache {
    entries: Arc<DashMap<String, Arc<OnceCell<Resolution>>, FxBuildHasher>>,
}

impl ResolutionCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a load for `identifier` has been started.
    pub fn contains(&self, identifier: &str) -> bool {
        self.entries.contains_key(identifier)
    }

    /// The completed resolution for `identifier`, if any.
    pub fn get(&self, identifier: &str) -> Option<Resolution> {
        let cell = self.entries.get(identifier)?.value().clone();
        cell.get().cloned()
    }

    /// Number of resources started or completed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached resolution for `identifier` or run `load` once.
    ///
    /// Concurrent callers with the same identifier wait for the first load.
    pub async fn get_or_resolve<F, Fut>(&self, identifier: &str, load: F) -> Resolution
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Resolution>,
    {
        // Clone the cell out so the shard lock is not held across the await
        let cell = self
            .entries
            .entry(identifier.to_string())
            .or_default()
            .value()
            .clone();
        cell.get_or_init(load).await.clone()
    }
}

/// Nodes a bundle run already processed.
///
/// A node is identified by its location (JSON pointer from the document
/// root) together with a fingerprint of its processed value. Pass the same
/// set to consecutive `bundle` calls to skip nodes an earlier call already
/// walked; a node that was replaced or shifted to that location since then
/// no longer matches and is walked again.
#[derive(Debug, Clone, Default)]
pub struct VisitedNodes {
    nodes: Arc<Mutex<FxHashSet<(String, u64)>>>,
}

impl VisitedNodes {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `node` as processed at `pointer`. Returns false when that exact
    /// node was already present.
    pub fn insert(&self, pointer: &str, node: &Value) -> bool {
        self.nodes
            .lock()
            .insert((pointer.to_string(), fingerprint(node)))
    }

    /// Whether `node` at `pointer` was recorded.
    pub fn contains(&self, pointer: &str, node: &Value) -> bool {
        self.nodes
            .lock()
            .contains(&(pointer.to_string(), fingerprint(node)))
    }

    /// Number of recorded nodes.
    pub fn len(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Whether no node was recorded.
    pub fn is_empty(&self) -> bool {
        self.nodes.lock().is_empty()
    }
}

/// Hash of a node's serialized form. Mappings hash in insertion order.
fn fingerprint(node: &Value) -> u64 {
    let mut hasher = FxHasher::default();
    match serde_json::to_vec(node) {
        Ok(bytes) => hasher.write(&bytes),
        Err(_) => hasher.write_u8(0),
    }
    hasher.finish()
}
