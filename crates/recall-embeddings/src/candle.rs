//! Candle-based embedding implementation.
//!
//! Runs any BERT-family encoder checkpoint. The default is all-MiniLM-L6-v2
//! (384 dimensions, mean pooled); DPR context encoders (768 dimensions,
//! CLS pooled) are available through [`EmbedderConfig::dpr_context`].

use std::path::PathBuf;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use recall_types::{Pooling, Settings};
use tokenizers::Tokenizer;
use tracing::{debug, info};

use crate::cache::{get_or_download_model, ModelCache, ModelPaths, DEFAULT_MODEL_REPO};
use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// Default maximum sequence length
pub const MAX_SEQ_LENGTH: usize = 256;

/// DPR context encoder checkpoint
pub const DPR_CONTEXT_REPO: &str = "facebook/dpr-ctx_encoder-single-nq-base";

/// Which checkpoint to load and how to turn its output into a vector.
#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    pub repo_id: String,
    /// Overrides the user cache directory
    pub cache_dir: Option<PathBuf>,
    /// Tensor name prefix of the BERT weights (e.g. `ctx_encoder.bert_model`)
    pub weights_prefix: Option<String>,
    pub pooling: Pooling,
    pub normalize: bool,
    pub max_sequence_length: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self::minilm()
    }
}

impl EmbedderConfig {
    /// all-MiniLM-L6-v2: mean pooling, unit-length output
    pub fn minilm() -> Self {
        Self {
            repo_id: DEFAULT_MODEL_REPO.to_string(),
            cache_dir: None,
            weights_prefix: None,
            pooling: Pooling::Mean,
            normalize: true,
            max_sequence_length: MAX_SEQ_LENGTH,
        }
    }

    /// DPR context encoder: CLS pooling, raw output for inner-product search
    pub fn dpr_context() -> Self {
        Self {
            repo_id: DPR_CONTEXT_REPO.to_string(),
            cache_dir: None,
            weights_prefix: Some("ctx_encoder.bert_model".to_string()),
            pooling: Pooling::Cls,
            normalize: false,
            max_sequence_length: 512,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let embedder = &settings.embedder;
        Self {
            repo_id: embedder.repo_id.clone(),
            cache_dir: settings.model_cache_dir(),
            weights_prefix: embedder.weights_prefix.clone(),
            pooling: embedder.pooling,
            normalize: embedder.normalize,
            max_sequence_length: embedder.max_sequence_length,
        }
    }

    pub fn model_cache(&self) -> ModelCache {
        match &self.cache_dir {
            Some(dir) => ModelCache::new(dir, &self.repo_id),
            None => ModelCache::for_repo(&self.repo_id),
        }
    }

    fn model_name(&self) -> String {
        self.repo_id
            .rsplit('/')
            .next()
            .unwrap_or(&self.repo_id)
            .to_string()
    }
}

/// Candle-based embedder for BERT-family encoders.
pub struct CandleEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    pooling: Pooling,
    normalize: bool,
    info: ModelInfo,
}

impl CandleEmbedder {
    /// Load the embedding model from cache (downloading if needed).
    pub fn load(config: &EmbedderConfig) -> Result<Self, EmbeddingError> {
        let paths = get_or_download_model(&config.model_cache())?;
        Self::load_from_paths(&paths, config)
    }

    /// Load with default settings (all-MiniLM-L6-v2)
    pub fn load_default() -> Result<Self, EmbeddingError> {
        Self::load(&EmbedderConfig::default())
    }

    /// Load from explicit file paths
    pub fn load_from_paths(
        paths: &ModelPaths,
        config: &EmbedderConfig,
    ) -> Result<Self, EmbeddingError> {
        info!(repo = %config.repo_id, "Loading embedding model...");

        // Use CPU device (GPU support can be added later with feature flags)
        let device = Device::Cpu;

        let config_str = std::fs::read_to_string(&paths.config)?;
        let bert_config: BertConfig = serde_json::from_str(&config_str)
            .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;
        let dimension = hidden_size(&config_str)?;

        let tokenizer = Tokenizer::from_file(&paths.tokenizer)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        // SAFETY: the weights file is not modified while mapped.
        let vb = unsafe {
            VarBuilder::from_mmaped_safetensors(&[paths.weights.clone()], DType::F32, &device)?
        };
        let vb = match &config.weights_prefix {
            Some(prefix) => vb.pp(prefix.as_str()),
            None => vb,
        };

        let model = BertModel::load(vb, &bert_config)?;

        info!(
            dim = dimension,
            max_seq = config.max_sequence_length,
            pooling = ?config.pooling,
            "Model loaded successfully"
        );

        Ok(Self {
            model,
            tokenizer,
            device,
            pooling: config.pooling,
            normalize: config.normalize,
            info: ModelInfo {
                name: config.model_name(),
                dimension,
                max_sequence_length: config.max_sequence_length,
            },
        })
    }

    /// Mean pooling over token embeddings (excluding padding)
    fn mean_pooling(
        &self,
        embeddings: &Tensor,
        attention_mask: &Tensor,
    ) -> Result<Tensor, EmbeddingError> {
        let mask = attention_mask
            .unsqueeze(2)?
            .broadcast_as(embeddings.shape())?;
        let mask_f32 = mask.to_dtype(DType::F32)?;

        let sum = embeddings.broadcast_mul(&mask_f32)?.sum(1)?;
        let mask_sum = mask_f32.sum(1)?.clamp(1e-9, f64::MAX)?;

        Ok(sum.broadcast_div(&mask_sum)?)
    }

    fn pool(&self, output: &Tensor, attention_mask: &Tensor) -> Result<Tensor, EmbeddingError> {
        match self.pooling {
            Pooling::Cls => Ok(output.narrow(1, 0, 1)?.squeeze(1)?),
            Pooling::Mean => self.mean_pooling(output, attention_mask),
        }
    }
}

/// Read `hidden_size` out of a BERT config.json
fn hidden_size(config_str: &str) -> Result<usize, EmbeddingError> {
    let value: serde_json::Value = serde_json::from_str(config_str)
        .map_err(|e| EmbeddingError::ModelNotFound(format!("Invalid config: {}", e)))?;
    value
        .get("hidden_size")
        .and_then(|v| v.as_u64())
        .map(|v| v as usize)
        .ok_or_else(|| EmbeddingError::ModelNotFound("config has no hidden_size".to_string()))
}

impl EmbeddingModel for CandleEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        self.embed_batch(&[text])?
            .into_iter()
            .next()
            .ok_or_else(|| EmbeddingError::InvalidInput("encoder returned no vector".to_string()))
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(vec![]);
        }
        if texts.iter().any(|t| t.trim().is_empty()) {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }

        debug!(count = texts.len(), "Embedding batch");

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| EmbeddingError::Tokenizer(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0)
            .min(self.info.max_sequence_length);

        let mut input_ids: Vec<u32> = Vec::with_capacity(texts.len() * max_len);
        let mut attention_masks: Vec<u32> = Vec::with_capacity(texts.len() * max_len);

        for encoding in &encodings {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let truncated_len = ids.len().min(max_len);

            input_ids.extend_from_slice(&ids[..truncated_len]);
            input_ids.extend(std::iter::repeat(0).take(max_len - truncated_len));
            attention_masks.extend_from_slice(&mask[..truncated_len]);
            attention_masks.extend(std::iter::repeat(0).take(max_len - truncated_len));
        }

        let batch_size = texts.len();
        let input_ids = Tensor::from_vec(input_ids, (batch_size, max_len), &self.device)?;
        let attention_mask =
            Tensor::from_vec(attention_masks, (batch_size, max_len), &self.device)?;
        let token_type_ids = Tensor::zeros_like(&input_ids)?;

        let output = self
            .model
            .forward(&input_ids, &token_type_ids, Some(&attention_mask))?;

        let pooled: Vec<Vec<f32>> = self.pool(&output, &attention_mask)?.to_vec2()?;

        let embeddings: Vec<Embedding> = pooled
            .into_iter()
            .map(|values| {
                if self.normalize {
                    Embedding::new(values)
                } else {
                    Embedding::from_raw(values)
                }
            })
            .collect();

        debug!(
            count = embeddings.len(),
            dim = self.info.dimension,
            "Batch complete"
        );

        Ok(embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_presets() {
        let minilm = EmbedderConfig::minilm();
        assert_eq!(minilm.pooling, Pooling::Mean);
        assert!(minilm.normalize);
        assert_eq!(minilm.model_name(), "all-MiniLM-L6-v2");

        let dpr = EmbedderConfig::dpr_context();
        assert_eq!(dpr.pooling, Pooling::Cls);
        assert!(!dpr.normalize);
        assert_eq!(dpr.weights_prefix.as_deref(), Some("ctx_encoder.bert_model"));
    }

    #[test]
    fn test_from_settings() {
        let mut settings = Settings::default();
        settings.embedder.repo_id = "org/encoder".to_string();
        settings.embedder.cache_dir = Some("/tmp/models".to_string());
        settings.embedder.pooling = Pooling::Cls;

        let config = EmbedderConfig::from_settings(&settings);
        assert_eq!(config.repo_id, "org/encoder");
        assert_eq!(config.pooling, Pooling::Cls);
        assert_eq!(
            config.model_cache().model_dir(),
            PathBuf::from("/tmp/models/org_encoder")
        );
    }

    #[test]
    fn test_hidden_size() {
        assert_eq!(hidden_size(r#"{"hidden_size": 768}"#).unwrap(), 768);
        assert!(hidden_size(r#"{"vocab_size": 30522}"#).is_err());
    }

    #[test]
    fn test_load_from_paths_missing_config() {
        let temp = TempDir::new().unwrap();
        let paths = ModelPaths {
            config: temp.path().join("config.json"),
            tokenizer: temp.path().join("tokenizer.json"),
            weights: temp.path().join("model.safetensors"),
        };
        let result = CandleEmbedder::load_from_paths(&paths, &EmbedderConfig::default());
        assert!(matches!(result, Err(EmbeddingError::Io(_))));
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_load_model() {
        let embedder = CandleEmbedder::load_default().unwrap();
        assert_eq!(embedder.info().dimension, 384);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_embed_empty_text_rejected() {
        let embedder = CandleEmbedder::load_default().unwrap();
        assert!(matches!(
            embedder.embed("   "),
            Err(EmbeddingError::InvalidInput(_))
        ));
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_embed_is_deterministic() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let a = embedder.embed("hello world").unwrap();
        let b = embedder.embed("hello world").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    #[ignore = "requires model download"]
    fn test_similar_texts_high_similarity() {
        let embedder = CandleEmbedder::load_default().unwrap();
        let emb1 = embedder.embed("The cat sat on the mat").unwrap();
        let emb2 = embedder.embed("A cat is sitting on a mat").unwrap();
        let emb3 = embedder.embed("Python programming language").unwrap();

        assert!(emb1.cosine_similarity(&emb2) > emb1.cosine_similarity(&emb3));
    }
}
