//! recall
//!
//! Embed text snippets into an in-memory buffer and retrieve the nearest ones.
//!
//! # Usage
//!
//! ```bash
//! recall demo [--query TEXT] [-k N]
//! recall query --samples FILE [-k N] [--scores] QUERY
//! recall config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/recall/config.toml)
//! 3. Environment variables (RECALL_*)
//! 4. CLI flags

use std::io::{self, Write};

use anyhow::{Context, Result};
use clap::Parser;
use recall_vector::RetrievalBuffer;

use recall_cli::{
    init_logging, load_settings, read_samples, run_demo, run_query, show_config, Cli, Commands,
};

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;
    init_logging(&settings)?;

    let stdout = io::stdout();
    let mut out = stdout.lock();

    match cli.command {
        Commands::Demo { query, k } => {
            let mut buffer = RetrievalBuffer::from_settings(&settings)
                .context("Failed to create retrieval buffer")?;
            run_demo(&mut buffer, &query, k, &mut out)?;
        }
        Commands::Query {
            samples,
            k,
            scores,
            query,
        } => {
            let texts = read_samples(&samples)?;
            let mut buffer = RetrievalBuffer::from_settings(&settings)
                .context("Failed to create retrieval buffer")?;
            run_query(&mut buffer, &texts, &query, k, scores, &mut out)?;
        }
        Commands::Config => {
            show_config(&settings, &mut out)?;
        }
    }

    out.flush()?;
    Ok(())
}
