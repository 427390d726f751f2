//! # recall-vector
//!
//! In-memory retrieval buffer: an append-only sequence of text samples with
//! their embeddings, searched through an HNSW index (usearch).
//!
//! ## Features
//! - Lazily built approximate nearest-neighbor index
//! - Configurable metric (squared L2, inner product, cosine)
//! - Explicit rebuild and staleness reporting; adds never touch a built index
//!
//! The buffer depends only on the [`EmbeddingModel`] trait, so any encoder
//! backend can sit behind it.
//!
//! [`EmbeddingModel`]: recall_embeddings::EmbeddingModel

pub mod buffer;
pub mod error;
pub mod hnsw;
pub mod index;
pub mod sample;

pub use buffer::{BufferConfig, IndexState, Neighbor, RetrievalBuffer, PLACEHOLDER_TEXT};
pub use error::{BufferError, VectorError};
pub use hnsw::{HnswConfig, HnswIndex};
pub use index::{IndexStats, SearchResult, VectorIndex};
pub use sample::Sample;
