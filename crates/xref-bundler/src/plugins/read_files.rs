use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;

use super::{LoaderError, LoaderPlugin, parse_document};
use crate::refs::is_file_path;
use crate::runtime::Runtime;

/// Loads filesystem paths through a [`Runtime`] and parses them as JSON or YAML.
#[derive(Debug, Clone)]
pub struct ReadFiles {
    runtime: Arc<dyn Runtime>,
}

impl ReadFiles {
    /// File loader backed by the native filesystem.
    ///
    /// Fails on targets without one; use [`ReadFiles::with_runtime`] there.
    pub fn new() -> crate::Result<Self> {
        #[cfg(not(target_family = "wasm"))]
        {
            Ok(Self::with_runtime(Arc::new(crate::runtime::NativeRuntime::new())))
        }

        #[cfg(target_family = "wasm")]
        {
            Err(crate::Error::UnsupportedEnvironment("Reading files"))
        }
    }

    /// File loader backed by a custom runtime.
    pub fn with_runtime(runtime: Arc<dyn Runtime>) -> Self {
        Self { runtime }
    }
}

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl LoaderPlugin for ReadFiles {
    fn name(&self) -> &'static str {
        "read-files"
    }

    fn validate(&self, identifier: &str) -> bool {
        is_file_path(identifier)
    }

    async fn exec(&self, identifier: &str) -> Result<Value, LoaderError> {
        let bytes = self.runtime.read_file(Path::new(identifier)).await?;
        let content = String::from_utf8_lossy(&bytes);
        parse_document(identifier, &content)
    }
}
