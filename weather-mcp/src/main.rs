//! Binary crate for the `weather-mcp` server.
//!
//! This crate focuses on:
//! - Parsing CLI arguments and logging setup
//! - Interactive configuration
//! - Binding the core weather operations as MCP tools

use clap::Parser;

mod cli;
mod logging;
mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cmd = cli::Cli::parse();
    logging::init(cmd.debug)?;
    cmd.run().await
}
