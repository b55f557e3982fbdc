//! regcorpus CLI — regulatory PDF acquisition and corpus assembly.
//!
//! Fetches authoritative regulatory PDFs, normalizes them into a markdown
//! corpus with provenance, and assembles the strict-citation grounding
//! context consumed by the answering service.

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
