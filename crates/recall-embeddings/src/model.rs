//! Embedding model trait and types.
//!
//! Defines the interface for generating vector embeddings from text.

use crate::error::EmbeddingError;

/// Vector embedding - a fixed-length float array.
#[derive(Debug, Clone, PartialEq)]
pub struct Embedding {
    pub values: Vec<f32>,
}

impl Embedding {
    /// Create a new embedding from a vector.
    /// Normalizes the vector to unit length.
    pub fn new(values: Vec<f32>) -> Self {
        let norm: f32 = values.iter().map(|x| x * x).sum::<f32>().sqrt();
        let normalized = if norm > 0.0 {
            values.iter().map(|x| x / norm).collect()
        } else {
            values
        };
        Self { values: normalized }
    }

    /// Create embedding without normalization (raw encoder output or pre-normalized vectors)
    pub fn from_raw(values: Vec<f32>) -> Self {
        Self { values }
    }

    /// Get the embedding dimension
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// True when every component is a finite number
    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Dot product. Returns 0.0 when dimensions differ.
    pub fn dot(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return 0.0;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| a * b)
            .sum()
    }

    /// Squared Euclidean distance. Returns +inf when dimensions differ.
    pub fn squared_l2(&self, other: &Embedding) -> f32 {
        if self.values.len() != other.values.len() {
            return f32::INFINITY;
        }
        self.values
            .iter()
            .zip(other.values.iter())
            .map(|(a, b)| (a - b) * (a - b))
            .sum()
    }

    /// Compute cosine similarity with another embedding.
    /// Returns value in [-1, 1] range (1 = identical direction).
    pub fn cosine_similarity(&self, other: &Embedding) -> f32 {
        let norms = self.dot(self).sqrt() * other.dot(other).sqrt();
        if norms == 0.0 {
            return 0.0;
        }
        self.dot(other) / norms
    }
}

/// Model information
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Model name (e.g., "all-MiniLM-L6-v2")
    pub name: String,
    /// Embedding dimension
    pub dimension: usize,
    /// Maximum sequence length in tokens
    pub max_sequence_length: usize,
}

/// Trait for embedding models.
///
/// Implementations must be deterministic for identical input text, and must
/// report failures as errors rather than returning a partial vector.
pub trait EmbeddingModel: Send + Sync {
    /// Get model information
    fn info(&self) -> &ModelInfo;

    /// Generate embedding for a single text.
    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError>;

    /// Generate embeddings for multiple texts (batch).
    /// Default implementation calls embed() for each text.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        texts.iter().map(|text| self.embed(text)).collect()
    }
}

impl<T: EmbeddingModel + ?Sized> EmbeddingModel for Box<T> {
    fn info(&self) -> &ModelInfo {
        (**self).info()
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        (**self).embed_batch(texts)
    }
}

impl<T: EmbeddingModel + ?Sized> EmbeddingModel for std::sync::Arc<T> {
    fn info(&self) -> &ModelInfo {
        (**self).info()
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        (**self).embed(text)
    }

    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Embedding>, EmbeddingError> {
        (**self).embed_batch(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedding_normalization() {
        let emb = Embedding::new(vec![3.0, 4.0]);
        // 3-4-5 triangle: normalized should be [0.6, 0.8]
        assert!((emb.values[0] - 0.6).abs() < 0.001);
        assert!((emb.values[1] - 0.8).abs() < 0.001);
    }

    #[test]
    fn test_from_raw_keeps_magnitude() {
        let emb = Embedding::from_raw(vec![3.0, 4.0]);
        assert_eq!(emb.values, vec![3.0, 4.0]);
        assert!((emb.dot(&emb) - 25.0).abs() < 0.001);
    }

    #[test]
    fn test_zero_vector_not_normalized() {
        let emb = Embedding::new(vec![0.0, 0.0]);
        assert_eq!(emb.values, vec![0.0, 0.0]);
        assert_eq!(emb.cosine_similarity(&Embedding::new(vec![1.0, 0.0])), 0.0);
    }

    #[test]
    fn test_cosine_similarity_identical() {
        let emb1 = Embedding::new(vec![1.0, 0.0, 0.0]);
        let emb2 = Embedding::new(vec![1.0, 0.0, 0.0]);
        assert!((emb1.cosine_similarity(&emb2) - 1.0).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let emb1 = Embedding::new(vec![1.0, 0.0]);
        let emb2 = Embedding::new(vec![0.0, 1.0]);
        assert!(emb1.cosine_similarity(&emb2).abs() < 0.001);
    }

    #[test]
    fn test_cosine_similarity_unnormalized() {
        let emb1 = Embedding::from_raw(vec![2.0, 0.0]);
        let emb2 = Embedding::from_raw(vec![-5.0, 0.0]);
        assert!((emb1.cosine_similarity(&emb2) + 1.0).abs() < 0.001);
    }

    #[test]
    fn test_squared_l2() {
        let a = Embedding::from_raw(vec![1.0, 2.0]);
        let b = Embedding::from_raw(vec![4.0, 6.0]);
        assert!((a.squared_l2(&b) - 25.0).abs() < 0.001);
        assert_eq!(a.squared_l2(&Embedding::from_raw(vec![1.0])), f32::INFINITY);
    }

    #[test]
    fn test_is_finite() {
        assert!(Embedding::from_raw(vec![0.5, -1.0]).is_finite());
        assert!(!Embedding::from_raw(vec![f32::NAN, 1.0]).is_finite());
    }
}
