use async_trait::async_trait;
use serde_json::Value;

use super::{LoaderError, LoaderKind, LoaderPlugin};
use crate::refs::looks_like_yaml;

/// Treats raw multi-line YAML text as the document itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct ParseYaml;

#[cfg_attr(target_family = "wasm", async_trait(?Send))]
#[cfg_attr(not(target_family = "wasm"), async_trait)]
impl LoaderPlugin for ParseYaml {
    fn name(&self) -> &'static str {
        "parse-yaml"
    }

    fn validate(&self, identifier: &str) -> bool {
        looks_like_yaml(identifier)
    }

    async fn exec(&self, identifier: &str) -> Result<Value, LoaderError> {
        serde_yaml::from_str(identifier).map_err(|e| LoaderError::Parse {
            identifier: "<inline yaml>".to_string(),
            message: e.to_string(),
        })
    }

    fn kind(&self) -> LoaderKind {
        LoaderKind::Inline
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_parses_mapping() {
        let value = ParseYaml
            .exec("openapi: 3.1.0\ninfo:\n  title: Example\n")
            .await
            .unwrap();
        assert_eq!(value, json!({ "openapi": "3.1.0", "info": { "title": "Example" } }));
    }

    #[test]
    fn test_validate_requires_multiline_mapping() {
        assert!(ParseYaml.validate("a: b\nc: d\n"));
        assert!(!ParseYaml.validate("a: b"));
        assert!(!ParseYaml.validate("./openapi.yaml"));
    }
}
