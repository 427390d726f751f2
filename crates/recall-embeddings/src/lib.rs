//! # recall-embeddings
//!
//! The embedder capability used by the recall buffer.
//!
//! The buffer only sees the [`EmbeddingModel`] trait; backends plug in behind
//! it. One backend ships here: [`CandleEmbedder`], a local BERT-family encoder
//! run with Candle.
//!
//! ## Features
//! - Local inference via Candle (no Python, no API)
//! - Configurable checkpoint, pooling and normalization
//! - Automatic model file caching via hf-hub

pub mod cache;
pub mod candle;
pub mod error;
pub mod model;

pub use crate::candle::{CandleEmbedder, EmbedderConfig};
pub use cache::{get_or_download_model, ModelCache, ModelPaths, DEFAULT_MODEL_REPO, MODEL_FILES};
pub use error::EmbeddingError;
pub use model::{Embedding, EmbeddingModel, ModelInfo};
