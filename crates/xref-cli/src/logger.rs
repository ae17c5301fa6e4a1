//! Logging setup for the xref CLI.
//!
//! Log lines go to stderr so the bundled document on stdout stays clean.
//!
//! - `--verbose`: debug for the xref crates
//! - `--quiet`: errors only, unresolved reference warnings are hidden
//! - otherwise `RUST_LOG`, falling back to info (which includes warnings)

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const VERBOSE_FILTER: &str = "xref_bundler=debug,xref_cli=debug";
const QUIET_FILTER: &str = "xref_bundler=error,xref_cli=error";
const DEFAULT_FILTER: &str = "xref_bundler=info,xref_cli=info";

/// Pick the filter directives for the global flags.
fn filter_for(verbose: bool, quiet: bool) -> EnvFilter {
    if verbose {
        EnvFilter::new(VERBOSE_FILTER)
    } else if quiet {
        EnvFilter::new(QUIET_FILTER)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
    }
}

/// Initialize the tracing subscriber. Call once, before any logging occurs.
///
/// ```rust,no_run
/// use xref_cli::logger::init_logger;
///
/// // Debug logging without colors
/// init_logger(true, false, true);
/// ```
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool) {
    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color && crate::ui::should_use_color())
        .without_time()
        .compact();

    tracing_subscriber::registry()
        .with(filter_for(verbose, quiet))
        .with(fmt_layer)
        .init();
}
