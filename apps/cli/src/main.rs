//! lessonforge CLI — resumable lesson-page crawler.
//!
//! Walks a subject catalog, downloads direct lesson assets, and converts
//! lesson pages into structured documents.

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
