//! Command implementations for recall.
//!
//! Handles:
//! - demo: five sample sentences, then a top-k query
//! - query: samples read from a file, then a top-k query
//! - config: print the effective settings

use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{bail, Context, Result};
use tracing::info;

use recall_embeddings::EmbeddingModel;
use recall_types::Settings;
use recall_vector::RetrievalBuffer;

use crate::cli::Cli;

/// Sentences loaded by `recall demo`
pub const DEMO_SAMPLES: &[&str] = &[
    "how are you",
    "the weather today is very nice, do you like some outdoor sports?",
    "My favourite sport is snowboarding",
    "I like sports very much, I like hiking",
    "I had shrimp pizza as dinner",
];

/// Query issued by `recall demo` unless overridden
pub const DEMO_QUERY: &str = "I like outdoor and sports";

/// Load layered settings and apply CLI overrides.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings =
        Settings::load(cli.config.as_deref()).context("Failed to load configuration")?;

    if let Some(log_level) = &cli.log_level {
        settings.log_level = log_level.clone();
    }
    if let Some(metric) = cli.metric {
        settings.index.metric = metric;
    }
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the configured level.
pub fn init_logging(settings: &Settings) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.log_level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Read one sample per non-blank line.
pub fn read_samples(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read samples file: {}", path.display()))?;
    let samples: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if samples.is_empty() {
        bail!("No samples in {}", path.display());
    }
    Ok(samples)
}

/// Load the demo sentences, list the buffer, then print the top-k for `query`.
pub fn run_demo<E: EmbeddingModel, W: Write>(
    buffer: &mut RetrievalBuffer<E>,
    query: &str,
    k: usize,
    out: &mut W,
) -> Result<()> {
    buffer
        .add_samples(DEMO_SAMPLES)
        .context("Failed to add demo samples")?;

    writeln!(out, "Buffer contents:")?;
    for sample in buffer.get_samples() {
        writeln!(out, "{}", sample.content())?;
    }

    let nearest = buffer
        .get_nearest_samples(query, k)
        .context("Query failed")?;
    writeln!(out)?;
    writeln!(out, "Nearest to {:?}:", query)?;
    for content in nearest {
        writeln!(out, "{}", content)?;
    }
    Ok(())
}

/// Add `texts` to the buffer and print the nearest matches for `query`.
pub fn run_query<E: EmbeddingModel, W: Write>(
    buffer: &mut RetrievalBuffer<E>,
    texts: &[String],
    query: &str,
    k: Option<usize>,
    scores: bool,
    out: &mut W,
) -> Result<()> {
    buffer
        .add_samples(&texts.iter().map(String::as_str).collect::<Vec<_>>())
        .context("Failed to add samples")?;
    info!(samples = buffer.len(), "Samples loaded");

    let k = k.unwrap_or(buffer.default_k());
    let neighbors = buffer.get_nearest(query, k).context("Query failed")?;
    for neighbor in neighbors {
        if scores {
            writeln!(
                out,
                "{:>4}  {:>10.4}  {}",
                neighbor.position, neighbor.distance, neighbor.content
            )?;
        } else {
            writeln!(out, "{}", neighbor.content)?;
        }
    }
    Ok(())
}

/// Print the effective settings as TOML.
pub fn show_config<W: Write>(settings: &Settings, out: &mut W) -> Result<()> {
    let rendered = toml::to_string_pretty(settings).context("Failed to render settings")?;
    write!(out, "{}", rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use recall_embeddings::{Embedding, EmbeddingError, ModelInfo};
    use recall_vector::PLACEHOLDER_TEXT;

    /// Scores text by a few topic words; enough to rank the demo sentences.
    struct TopicEmbedder {
        info: ModelInfo,
    }

    impl TopicEmbedder {
        fn new() -> Self {
            Self {
                info: ModelInfo {
                    name: "topic".to_string(),
                    dimension: 3,
                    max_sequence_length: 64,
                },
            }
        }
    }

    impl EmbeddingModel for TopicEmbedder {
        fn info(&self) -> &ModelInfo {
            &self.info
        }

        fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
            let lower = text.to_lowercase();
            let count = |words: &[&str]| words.iter().filter(|w| lower.contains(*w)).count() as f32;
            Ok(Embedding::new(vec![
                count(&["sport", "outdoor", "hiking", "snowboard"]),
                count(&["pizza", "dinner", "shrimp"]),
                0.1,
            ]))
        }
    }

    #[test]
    fn test_run_demo_lists_and_ranks() {
        let mut buffer = RetrievalBuffer::new(TopicEmbedder::new()).unwrap();
        let mut out = Vec::new();
        run_demo(&mut buffer, DEMO_QUERY, 2, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        let (listing, results) = text.split_once("\nNearest to").unwrap();
        assert!(listing.starts_with("Buffer contents:"));
        assert!(listing.contains(PLACEHOLDER_TEXT));
        assert_eq!(listing.lines().count(), 1 + 1 + DEMO_SAMPLES.len());
        assert!(!results.contains("pizza"));
        assert!(results.contains("sport"));
    }

    #[test]
    fn test_run_query_with_scores() {
        let mut buffer = RetrievalBuffer::new(TopicEmbedder::new()).unwrap();
        let texts = vec!["I had shrimp pizza".to_string(), "hiking trip".to_string()];
        let mut out = Vec::new();
        run_query(&mut buffer, &texts, "outdoor hiking", Some(1), true, &mut out).unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.contains("hiking trip"));
        assert!(text.trim_start().starts_with('2'));
    }

    #[test]
    fn test_read_samples_skips_blank_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "first sample\n\n   \n  second sample  ").unwrap();
        let samples = read_samples(file.path()).unwrap();
        assert_eq!(samples, vec!["first sample", "second sample"]);
    }

    #[test]
    fn test_read_samples_rejects_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(read_samples(file.path()).is_err());
    }

    #[test]
    fn test_show_config_renders_sections() {
        let mut out = Vec::new();
        show_config(&Settings::default(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("default_k = 5"));
        assert!(text.contains("[index]"));
        assert!(text.contains("metric = \"l2\""));
    }
}
