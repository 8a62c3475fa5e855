use anyhow::{Result, anyhow};
use tracing_subscriber::EnvFilter;

/// Log to stderr; stdout carries the MCP protocol.
///
/// `--debug` forces debug level, otherwise `RUST_LOG` applies, defaulting to `info`.
pub fn init(debug: bool) -> Result<()> {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .map_err(|err| anyhow!("Failed to initialise logging: {err}"))
}
