//! CLI argument parsing for recall.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use recall_types::DistanceMetric;

/// recall
///
/// In-memory semantic retrieval over text snippets.
#[derive(Parser, Debug)]
#[command(name = "recall")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/recall/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    /// Distance metric (l2, inner_product, cosine)
    #[arg(short, long, global = true)]
    pub metric: Option<DistanceMetric>,

    #[command(subcommand)]
    pub command: Commands,
}

/// recall commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fill a buffer with five sample sentences and query it
    Demo {
        /// Query text
        #[arg(short, long, default_value = crate::commands::DEMO_QUERY)]
        query: String,

        /// Number of neighbors to return
        #[arg(short, default_value = "2")]
        k: usize,
    },

    /// Query a buffer built from a samples file (one sample per line)
    Query {
        /// File with one sample per non-empty line
        #[arg(short, long)]
        samples: PathBuf,

        /// Number of neighbors (default from config)
        #[arg(short)]
        k: Option<usize>,

        /// Print distances and positions next to each match
        #[arg(long)]
        scores: bool,

        /// Query text
        query: String,
    },

    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_demo_defaults() {
        let cli = Cli::parse_from(["recall", "demo"]);
        match cli.command {
            Commands::Demo { query, k } => {
                assert_eq!(query, "I like outdoor and sports");
                assert_eq!(k, 2);
            }
            _ => panic!("Expected Demo command"),
        }
    }

    #[test]
    fn test_cli_query() {
        let cli = Cli::parse_from([
            "recall",
            "query",
            "--samples",
            "notes.txt",
            "-k",
            "3",
            "--scores",
            "outdoor sports",
        ]);
        match cli.command {
            Commands::Query {
                samples,
                k,
                scores,
                query,
            } => {
                assert_eq!(samples, PathBuf::from("notes.txt"));
                assert_eq!(k, Some(3));
                assert!(scores);
                assert_eq!(query, "outdoor sports");
            }
            _ => panic!("Expected Query command"),
        }
    }

    #[test]
    fn test_cli_global_flags() {
        let cli = Cli::parse_from([
            "recall",
            "--config",
            "/path/to/config.toml",
            "--metric",
            "inner_product",
            "config",
        ]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert_eq!(cli.metric, Some(DistanceMetric::InnerProduct));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_cli_rejects_unknown_metric() {
        let result = Cli::try_parse_from(["recall", "--metric", "hamming", "config"]);
        assert!(result.is_err());
    }
}
