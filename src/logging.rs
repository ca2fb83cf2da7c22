//! Log setup shared by both binaries.
//!
//! Logs always go to stderr: in server mode stdout carries the LSP stream.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "BREWLINE_LOG";

const DEFAULT_DIRECTIVE: &str = "brewline=info";

/// Install the global subscriber. `verbose` lowers the default level to
/// `debug`; an explicit `BREWLINE_LOG` always wins.
pub fn init(verbose: bool) -> anyhow::Result<()> {
    let filter = match std::env::var(LOG_ENV) {
        Ok(directives) if !directives.trim().is_empty() => EnvFilter::try_new(directives)?,
        _ if verbose => EnvFilter::try_new("brewline=debug")?,
        _ => EnvFilter::try_new(DEFAULT_DIRECTIVE)?,
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
}
