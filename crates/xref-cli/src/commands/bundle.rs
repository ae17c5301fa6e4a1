//! Bundle command implementation.
//!
//! Implements `xref bundle`, which loads a document, resolves its external
//! references with xref-bundler and writes the self-contained result.

use std::io::Write;
use std::path::Path;
use std::time::Instant;

use serde_json::Value;
use tokio::fs;
use xref_bundler::plugins::{DomainHeaders, FetchUrls, ParseJson, ParseYaml, ReadFiles};
use xref_bundler::{BundleOptions, ConcurrencyLimiter, bundle_source, unresolved_refs};

use crate::cli::BundleArgs;
use crate::config::{OutputFormat, XrefConfig};
use crate::error::{CliError, Result};
use crate::ui;

/// Execute the bundle command.
///
/// 1. Load configuration (CLI > Env > File > Defaults)
/// 2. Load and bundle the input
/// 3. Fail on leftover external refs when `--strict` is set
/// 4. Write the result to `--output` or stdout
pub async fn execute(args: BundleArgs) -> Result<()> {
    let start_time = Instant::now();

    let config = XrefConfig::load(&args)?;
    let options = bundle_options(&config)?;

    tracing::debug!("Bundling {}", args.input);
    let document = bundle_source(&args.input, &options).await?;

    let unresolved = unresolved_refs(&document);
    if args.strict && !unresolved.is_empty() {
        return Err(CliError::Unresolved(unresolved));
    }

    let format = config.output_format(args.output.as_deref());
    let rendered = render(&document, format)?;

    match &args.output {
        Some(path) => {
            write_output(path, &rendered).await?;
            ui::success(&format!(
                "Bundled {} → {} in {}",
                args.input,
                path.display(),
                ui::format_duration(start_time.elapsed())
            ));
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes())?;
            stdout.flush()?;
        }
    }

    if !unresolved.is_empty() {
        ui::warning(&format!(
            "{} external reference(s) left unresolved",
            unresolved.len()
        ));
    }

    Ok(())
}

/// Build bundler options with every loader the CLI supports.
///
/// Raw JSON and YAML text is accepted as input next to URLs and file paths.
pub fn bundle_options(config: &XrefConfig) -> Result<BundleOptions> {
    let mut fetch = FetchUrls::new();
    for rule in &config.headers {
        let mut headers = DomainHeaders::new(rule.domains.iter().cloned());
        for (name, value) in &rule.headers {
            headers = headers.header(name, value);
        }
        fetch = fetch.with_headers(headers);
    }
    if let Some(max) = config.concurrency {
        fetch = fetch.with_limiter(ConcurrencyLimiter::new(max));
    }

    let mut options = BundleOptions::new()
        .loader(fetch)
        .loader(ReadFiles::new()?)
        .loader(ParseJson)
        .loader(ParseYaml)
        .tree_shake(config.tree_shake)
        .url_map(config.url_map);

    if let Some(depth) = config.depth {
        options = options.depth(depth);
    }
    if let Some(origin) = &config.origin {
        options = options.origin(origin);
    }

    Ok(options)
}

/// Serialize the bundled document.
pub fn render(document: &Value, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => {
            let mut rendered = serde_json::to_string_pretty(document)?;
            rendered.push('\n');
            Ok(rendered)
        }
        OutputFormat::Yaml => Ok(serde_yaml::to_string(document)?),
    }
}

async fn write_output(path: &Path, content: &str) -> Result<()> {
    let write_error = |source| CliError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).await.map_err(write_error)?;
        }
    }
    fs::write(path, content).await.map_err(write_error)
}
