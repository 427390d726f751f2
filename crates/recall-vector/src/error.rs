//! Error types for the index and the retrieval buffer.

use recall_embeddings::EmbeddingError;
use thiserror::Error;

/// Errors that can occur during vector index operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// usearch index error
    #[error("Index error: {0}")]
    Index(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Vector contains NaN or infinite components
    #[error("Vector {0} has non-finite components")]
    NonFinite(u64),

    /// Key already present in the index
    #[error("Duplicate key: {0}")]
    DuplicateKey(u64),
}

/// Errors surfaced by [`RetrievalBuffer`](crate::RetrievalBuffer) operations.
///
/// Every failing operation leaves the buffer as it was before the call.
#[derive(Debug, Error)]
pub enum BufferError {
    /// The embedder could not be constructed, or could not embed the seed text
    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(#[source] EmbeddingError),

    /// The embedder failed on caller-provided text
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// Index or query operation attempted with zero samples
    #[error("Buffer is empty")]
    EmptyBuffer,

    /// The index could not be built over the current samples
    #[error("Index build failed: {0}")]
    IndexBuild(#[source] VectorError),

    /// Searching an already built index failed
    #[error("Index search failed: {0}")]
    Search(#[source] VectorError),

    /// A sample failed validation
    #[error("Invalid sample: {0}")]
    InvalidSample(String),
}
