//! Configuration loading for recall.
//!
//! Layered config: defaults -> config file -> env vars -> CLI flags.
//! The default config file lives at ~/.config/recall/config.toml.

use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ConfigError;

/// Number of neighbors returned when the caller does not ask for a specific k.
pub const DEFAULT_K: usize = 5;

/// Distance used to rank stored vectors against a query.
///
/// Lower distance always means nearer, whatever the metric.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Squared Euclidean distance
    #[default]
    L2,
    /// 1 - dot product (for encoders trained with inner-product similarity)
    InnerProduct,
    /// 1 - cosine similarity
    Cosine,
}

impl DistanceMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::InnerProduct => "inner_product",
            DistanceMetric::Cosine => "cosine",
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DistanceMetric {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(DistanceMetric::L2),
            "ip" | "inner_product" | "dot" => Ok(DistanceMetric::InnerProduct),
            "cos" | "cosine" => Ok(DistanceMetric::Cosine),
            other => Err(ConfigError::Invalid {
                field: "index.metric",
                reason: format!("unknown metric `{}`", other),
            }),
        }
    }
}

/// Strategy for reducing per-token hidden states to a single vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pooling {
    /// Hidden state of the leading [CLS] token (DPR-style encoders)
    Cls,
    /// Mean over non-padding tokens (sentence-transformers)
    #[default]
    Mean,
}

/// Embedder configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedderSettings {
    /// HuggingFace repository holding config.json, tokenizer.json and model.safetensors
    #[serde(default = "default_repo_id")]
    pub repo_id: String,

    /// Model cache directory (defaults to the user cache dir)
    #[serde(default)]
    pub cache_dir: Option<String>,

    /// Tensor name prefix for the BERT weights inside the checkpoint
    #[serde(default)]
    pub weights_prefix: Option<String>,

    #[serde(default)]
    pub pooling: Pooling,

    /// Scale output vectors to unit length
    #[serde(default = "default_true")]
    pub normalize: bool,

    /// Maximum tokens per input; longer inputs are truncated
    #[serde(default = "default_max_sequence_length")]
    pub max_sequence_length: usize,
}

fn default_repo_id() -> String {
    "sentence-transformers/all-MiniLM-L6-v2".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_sequence_length() -> usize {
    256
}

impl Default for EmbedderSettings {
    fn default() -> Self {
        Self {
            repo_id: default_repo_id(),
            cache_dir: None,
            weights_prefix: None,
            pooling: Pooling::default(),
            normalize: true,
            max_sequence_length: default_max_sequence_length(),
        }
    }
}

/// Approximate nearest-neighbor index configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexSettings {
    #[serde(default)]
    pub metric: DistanceMetric,

    /// Connections per graph layer (HNSW M)
    #[serde(default = "default_connectivity")]
    pub connectivity: usize,

    /// Build-time search depth (ef_construction)
    #[serde(default = "default_expansion_add")]
    pub expansion_add: usize,

    /// Query-time search depth (ef_search)
    #[serde(default = "default_expansion_search")]
    pub expansion_search: usize,
}

fn default_connectivity() -> usize {
    16
}

fn default_expansion_add() -> usize {
    200
}

fn default_expansion_search() -> usize {
    100
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            metric: DistanceMetric::default(),
            connectivity: default_connectivity(),
            expansion_add: default_expansion_add(),
            expansion_search: default_expansion_search(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Neighbors returned by a query when k is not given
    #[serde(default = "default_k")]
    pub default_k: usize,

    #[serde(default)]
    pub embedder: EmbedderSettings,

    #[serde(default)]
    pub index: IndexSettings,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_k() -> usize {
    DEFAULT_K
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            default_k: DEFAULT_K,
            embedder: EmbedderSettings::default(),
            index: IndexSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings with layered precedence:
    /// 1. Built-in defaults
    /// 2. Config file (~/.config/recall/config.toml)
    /// 3. CLI-specified config file (optional)
    /// 4. Environment variables (RECALL_*, `__` between nested keys)
    ///
    /// CLI flags should be applied by the caller after this returns.
    pub fn load(cli_config_path: Option<&str>) -> Result<Self, ConfigError> {
        let default_config_path = ProjectDirs::from("", "", "recall")
            .map(|p| p.config_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."))
            .join("config");

        let mut builder = Config::builder()
            .set_default("log_level", default_log_level())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .set_default("default_k", DEFAULT_K as i64)
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .set_default("embedder.repo_id", default_repo_id())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .set_default("index.metric", DistanceMetric::default().as_str())
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .add_source(File::with_name(&default_config_path.to_string_lossy()).required(false));

        if let Some(path) = cli_config_path {
            builder = builder.add_source(File::with_name(path).required(true));
        }

        // Format: RECALL_LOG_LEVEL, RECALL_INDEX__METRIC, RECALL_EMBEDDER__REPO_ID
        builder = builder.add_source(
            Environment::with_prefix("RECALL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let settings: Settings = builder
            .build()
            .map_err(|e| ConfigError::Load(e.to_string()))?
            .try_deserialize()
            .map_err(|e| ConfigError::Load(e.to_string()))?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_k == 0 {
            return Err(ConfigError::Invalid {
                field: "default_k",
                reason: "must be > 0".to_string(),
            });
        }
        if self.embedder.max_sequence_length == 0 {
            return Err(ConfigError::Invalid {
                field: "embedder.max_sequence_length",
                reason: "must be > 0".to_string(),
            });
        }
        let index = &self.index;
        for (field, value) in [
            ("index.connectivity", index.connectivity),
            ("index.expansion_add", index.expansion_add),
            ("index.expansion_search", index.expansion_search),
        ] {
            if value == 0 {
                return Err(ConfigError::Invalid {
                    field,
                    reason: "must be > 0".to_string(),
                });
            }
        }
        Ok(())
    }

    /// Resolved model cache directory, if one was configured.
    pub fn model_cache_dir(&self) -> Option<PathBuf> {
        self.embedder.cache_dir.as_ref().map(|dir| {
            match (dir.strip_prefix("~/"), directories::BaseDirs::new()) {
                (Some(rest), Some(base)) => base.home_dir().join(rest),
                _ => PathBuf::from(dir),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_settings() {
        let settings = Settings::default();
        assert_eq!(settings.default_k, 5);
        assert_eq!(settings.log_level, "info");
        assert_eq!(settings.index.metric, DistanceMetric::L2);
        assert_eq!(settings.embedder.pooling, Pooling::Mean);
        assert!(settings.embedder.normalize);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_load_from_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
default_k = 3

[embedder]
repo_id = "facebook/dpr-ctx_encoder-single-nq-base"
pooling = "cls"
normalize = false

[index]
metric = "inner_product"
"#
        )
        .unwrap();

        let settings = Settings::load(Some(&file.path().to_string_lossy())).unwrap();
        assert_eq!(settings.default_k, 3);
        assert_eq!(settings.embedder.pooling, Pooling::Cls);
        assert!(!settings.embedder.normalize);
        assert_eq!(settings.index.metric, DistanceMetric::InnerProduct);
        // Untouched keys keep their defaults
        assert_eq!(settings.index.connectivity, 16);
    }

    #[test]
    fn test_validate_rejects_zero_k() {
        let settings = Settings {
            default_k: 0,
            ..Default::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(ConfigError::Invalid {
                field: "default_k",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_connectivity() {
        let mut settings = Settings::default();
        settings.index.connectivity = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("L2".parse::<DistanceMetric>().unwrap(), DistanceMetric::L2);
        assert_eq!(
            "ip".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::InnerProduct
        );
        assert_eq!(
            "cosine".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::Cosine
        );
        assert!("hamming".parse::<DistanceMetric>().is_err());
    }

    #[test]
    fn test_metric_serialization() {
        let json = serde_json::to_string(&DistanceMetric::InnerProduct).unwrap();
        assert_eq!(json, "\"inner_product\"");
        let decoded: DistanceMetric = serde_json::from_str("\"cosine\"").unwrap();
        assert_eq!(decoded, DistanceMetric::Cosine);
    }

    #[test]
    fn test_model_cache_dir_plain_path() {
        let mut settings = Settings::default();
        assert!(settings.model_cache_dir().is_none());
        settings.embedder.cache_dir = Some("/tmp/recall-models".to_string());
        assert_eq!(
            settings.model_cache_dir(),
            Some(PathBuf::from("/tmp/recall-models"))
        );
    }
}
