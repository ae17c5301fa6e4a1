use async_trait::async_trait;
use parking_lot::RwLock;
use path_clean::PathClean;
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{Runtime, RuntimeError, RuntimeResult};

/// In-memory runtime
///
/// Holds virtual files keyed by normalized path. Useful on targets without a
/// filesystem and for documents that only exist in an editor buffer.
#[derive(Debug, Clone)]
pub struct MemoryRuntime {
    files: Arc<RwLock<FxHashMap<PathBuf, Vec<u8>>>>,
    cwd: PathBuf,
}

impl MemoryRuntime {
    /// Create an empty runtime rooted at `/`.
    pub fn new() -> Self {
        Self::with_cwd("/")
    }

    /// Create an empty runtime that resolves relative paths against `cwd`.
    pub fn with_cwd(cwd: impl Into<PathBuf>) -> Self {
        Self {
            files: Arc::new(RwLock::new(FxHashMap::default())),
            cwd: cwd.into(),
        }
    }

    /// Add or replace a file.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let normalized = self.normalize(path.as_ref());
        self.files.write().insert(normalized, content.into());
    }

    /// Builder variant of [`MemoryRuntime::add_file`].
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        self.add_file(path, content);
        self
    }

    /// Normalize a path so `./a.json` and `/cwd/a.json` are the same entry.
    fn normalize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf().clean()
        } else {
            self.cwd.join(path).clean()
        }
    }
}

impl Default for MemoryRuntime {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl Runtime for MemoryRuntime {
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>> {
        let normalized = self.normalize(path);
        self.files
            .read()
            .get(&normalized)
            .cloned()
            .ok_or(RuntimeError::FileNotFound(normalized))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_relative_and_absolute_lookup_match() {
        let runtime = MemoryRuntime::with_cwd("/project").with_file("specs/a.json", "{}");

        assert_eq!(runtime.read_file(Path::new("/project/specs/a.json")).await.unwrap(), b"{}");
        assert_eq!(runtime.read_file(Path::new("./specs/../specs/a.json")).await.unwrap(), b"{}");
        assert_eq!(runtime.read_file(Path::new("specs/a.json")).await.unwrap(), b"{}");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let runtime = MemoryRuntime::new();
        let err = runtime.read_file(Path::new("nope.yaml")).await.unwrap_err();
        assert!(matches!(err, RuntimeError::FileNotFound(path) if path == Path::new("/nope.yaml")));
    }
}
