//! Stored (text, embedding) pairs.

use recall_embeddings::Embedding;

use crate::error::BufferError;

/// A text snippet and its embedding. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    content: String,
    embedding: Embedding,
}

impl Sample {
    /// Validate and create a sample.
    ///
    /// Content must be non-blank; the embedding must be non-empty and finite.
    pub fn new(content: impl Into<String>, embedding: Embedding) -> Result<Self, BufferError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(BufferError::InvalidSample("content is empty".to_string()));
        }
        if embedding.dimension() == 0 {
            return Err(BufferError::InvalidSample(
                "embedding has no components".to_string(),
            ));
        }
        if !embedding.is_finite() {
            return Err(BufferError::InvalidSample(
                "embedding has non-finite components".to_string(),
            ));
        }
        Ok(Self { content, embedding })
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn embedding(&self) -> &Embedding {
        &self.embedding
    }

    pub fn dimension(&self) -> usize {
        self.embedding.dimension()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_sample() {
        let sample = Sample::new("how are you", Embedding::from_raw(vec![0.1, 0.2])).unwrap();
        assert_eq!(sample.content(), "how are you");
        assert_eq!(sample.dimension(), 2);
    }

    #[test]
    fn test_rejects_blank_content() {
        let result = Sample::new("  \n", Embedding::from_raw(vec![1.0]));
        assert!(matches!(result, Err(BufferError::InvalidSample(_))));
    }

    #[test]
    fn test_rejects_empty_embedding() {
        let result = Sample::new("text", Embedding::from_raw(vec![]));
        assert!(matches!(result, Err(BufferError::InvalidSample(_))));
    }

    #[test]
    fn test_rejects_non_finite_embedding() {
        let result = Sample::new("text", Embedding::from_raw(vec![1.0, f32::INFINITY]));
        assert!(matches!(result, Err(BufferError::InvalidSample(_))));
    }
}
