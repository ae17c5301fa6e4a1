use async_trait::async_trait;
use serde_json::Value;

use super::{LoaderError, LoaderKind, LoaderPlugin};
use crate::refs::{is_remote_url, looks_like_json};

/// Treats raw JSON text as the document itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseJson;

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl LoaderPlugin for ParseJson {
    fn name(&self) -> &'static str {
        "parse-json"
    }

    fn validate(&self, identifier: &str) -> bool {
        !is_remote_url(identifier) && looks_like_json(identifier)
    }

    async fn exec(&self, identifier: &str) -> Result<Value, LoaderError> {
        serde_json::from_str(identifier).map_err(|e| LoaderError::Parse {
            identifier: "<inline json>".to_string(),
            message: e.to_string(),
        })
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Inline
    }
}
