//! Prune bundled external documents down to what is reachable.
//!
//! Entry points are the `#/x-ext/...` refs found outside the bucket map.
//! Every target is kept whole, and the refs inside a kept target are
//! followed in turn. A target already kept is not scanned again, which is
//! what stops circular refs.

use rustc_hash::{FxHashMap, FxHashSet};
use serde_json::Value;

use super::{EXTERNAL_DOCUMENTS, EXTERNAL_DOCUMENTS_MAPPINGS};
use crate::refs::{get_nested_value, pointer_segments};

/// Kept paths below one bucket, as a trie.
#[derive(Default)]
struct Keep {
    whole: bool,
    children: FxHashMap<String, Keep>,
}

impl Keep {
    fn insert(&mut self, segments: &[String]) {
        match segments.split_first() {
            None => self.whole = true,
            Some((head, rest)) => self
                .children
                .entry(head.clone())
                .or_default()
                .insert(rest),
        }
    }

    fn prune(&self, node: &mut Value) {
        if self.whole {
            return;
        }
        // Only mappings are narrowed; sequences on a kept path stay intact
        if let Value::Object(map) = node {
            map.retain(|key, _| self.children.contains_key(key));
            for (key, child) in map.iter_mut() {
                if let Some(keep) = self.children.get(key) {
                    keep.prune(child);
                }
            }
        }
    }
}

/// Remove everything in `x-ext` that no ref can reach.
///
/// Buckets with nothing reachable are dropped together with their
/// `x-ext-urls` entry.
pub fn tree_shake(document: &mut Value) {
    let Some(root) = document.as_object() else {
        return;
    };
    if !root.contains_key(EXTERNAL_DOCUMENTS) {
        return;
    }

    let mut pending = Vec::new();
    for (key, value) in root {
        if key != EXTERNAL_DOCUMENTS && key != EXTERNAL_DOCUMENTS_MAPPINGS {
            collect_bucket_refs(value, &mut pending);
        }
    }

    let mut kept: FxHashSet<Vec<String>> = FxHashSet::default();
    while let Some(path) = pending.pop() {
        if !kept.insert(path.clone()) {
            continue;
        }
        if let Some(target) = get_nested_value(document, &path) {
            collect_bucket_refs(target, &mut pending);
        }
    }

    let mut buckets: FxHashMap<String, Keep> = FxHashMap::default();
    for path in &kept {
        if let [_, key, rest @ ..] = path.as_slice() {
            buckets.entry(key.clone()).or_default().insert(rest);
        }
    }
    tracing::debug!("Tree shaking keeps {} reachable paths", kept.len());

    let Value::Object(root) = document else {
        return;
    };
    let mut removed: Vec<String> = Vec::new();
    if let Some(Value::Object(external)) = root.get_mut(EXTERNAL_DOCUMENTS) {
        external.retain(|key, _| {
            let keep = buckets.contains_key(key);
            if !keep {
                removed.push(key.clone());
            }
            keep
        });
        for (key, bucket) in external.iter_mut() {
            if let Some(keep) = buckets.get(key) {
                keep.prune(bucket);
            }
        }
    }

    if let Some(Value::Object(mappings)) = root.get_mut(EXTERNAL_DOCUMENTS_MAPPINGS) {
        mappings.retain(|key, _| !removed.contains(key));
    }

    root.retain(|key, value| {
        let generated = key == EXTERNAL_DOCUMENTS || key == EXTERNAL_DOCUMENTS_MAPPINGS;
        !(generated && value.as_object().is_some_and(|map| map.is_empty()))
    });
}

/// Push the target path of every `#/x-ext/<key>...` ref below `node`.
fn collect_bucket_refs(node: &Value, out: &mut Vec<Vec<String>>) {
    match node {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                let segments = pointer_segments(reference);
                if reference.starts_with('#')
                    && segments.len() >= 2
                    && segments[0] == EXTERNAL_DOCUMENTS
                {
                    out.push(segments);
                }
            }
            for value in map.values() {
                collect_bucket_refs(value, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_bucket_refs(item, out);
            }
        }
        _ => {}
    }
}
