//! llmstxt CLI: generate and maintain a site's `llms.txt` manifest.
//!
//! Extracts content metadata from a WordPress-style API, a local content
//! tree, or a sitemap, and registers the manifest in `sitemap.xml` and
//! `robots.txt`.

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
