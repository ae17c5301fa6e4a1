use crate::cli::BundleArgs;
use crate::config::{OutputFormat, XrefConfig};
use crate::error::{ConfigError, Result};
use figment::{
    Figment,
    providers::{Env, Format as _, Json, Serialized, Toml},
};
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Config files looked up in the working directory, in order.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["xref.config.json", "xref.config.toml"];

/// Prefix of environment variables that override config values.
pub const ENV_PREFIX: &str = "XREF_";

/// Keys that may be set from the environment. Header rules are file-only.
const ENV_KEYS: &[&str] = &["tree_shake", "depth", "origin", "url_map", "concurrency", "format"];

/// The subset of flags that override configuration; unset flags are skipped.
#[derive(Debug, Default, Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    tree_shake: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    origin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    url_map: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    concurrency: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<OutputFormat>,
}

impl From<&BundleArgs> for CliOverrides {
    fn from(args: &BundleArgs) -> Self {
        Self {
            tree_shake: args.tree_shake.then_some(true),
            depth: args.depth,
            origin: args.origin.clone(),
            url_map: args.url_map.then_some(true),
            concurrency: args.concurrency,
            format: args.format,
        }
    }
}

impl XrefConfig {
    /// Load configuration for `args`, looking for config files in the
    /// current directory.
    pub fn load(args: &BundleArgs) -> Result<Self> {
        Self::load_in(args, Path::new("."))
    }

    /// Load configuration for `args`, looking for config files in `cwd`.
    pub fn load_in(args: &BundleArgs, cwd: &Path) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = Self::config_file(args, cwd)? {
            tracing::debug!("Using config file {}", path.display());
            figment = merge_file(figment, &path)?;
        }

        figment = figment
            .merge(Env::prefixed(ENV_PREFIX).only(ENV_KEYS))
            .merge(Serialized::defaults(CliOverrides::from(args)));

        let config: Self = figment
            .extract()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn config_file(args: &BundleArgs, cwd: &Path) -> Result<Option<PathBuf>> {
        if let Some(path) = &args.config {
            if !path.is_file() {
                return Err(ConfigError::NotFound(path.clone()).into());
            }
            return Ok(Some(path.clone()));
        }

        Ok(DEFAULT_CONFIG_FILES
            .iter()
            .map(|name| cwd.join(name))
            .find(|path| path.is_file()))
    }

    /// Reject values that parse but cannot be used.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "concurrency".to_string(),
                value: "0".to_string(),
                hint: "Use a positive number, or leave it unset for no limit".to_string(),
            }
            .into());
        }

        if self.origin.as_deref().is_some_and(str::is_empty) {
            return Err(ConfigError::InvalidValue {
                field: "origin".to_string(),
                value: String::new(),
                hint: "Use a URL or file path, or leave it unset".to_string(),
            }
            .into());
        }

        if let Some(rule) = self.headers.iter().find(|rule| rule.domains.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "headers".to_string(),
                value: format!("{:?}", rule.headers.keys().collect::<Vec<_>>()),
                hint: "Every header rule needs at least one domain".to_string(),
            }
            .into());
        }

        Ok(())
    }
}

fn merge_file(figment: Figment, path: &Path) -> Result<Figment> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => Ok(figment.merge(Json::file_exact(path))),
        Some("toml") => Ok(figment.merge(Toml::file_exact(path))),
        _ => Err(ConfigError::UnsupportedFormat(path.to_path_buf()).into()),
    }
}
