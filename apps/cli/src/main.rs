//! ContextFunnel CLI — aggregate any reference into LLM-ready text.
//!
//! Classifies a URL, scholarly id, or local path, extracts its content, and
//! writes raw + compressed artifacts with token counts.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
