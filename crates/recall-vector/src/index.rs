//! Vector index trait and types.
//!
//! Defines the interface for vector similarity search.

use recall_embeddings::Embedding;
use recall_types::DistanceMetric;

use crate::error::VectorError;

/// Result of a vector search
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Key the vector was added under
    pub key: u64,
    /// Distance to the query under the index metric (lower = nearer)
    pub distance: f32,
}

impl SearchResult {
    pub fn new(key: u64, distance: f32) -> Self {
        Self { key, distance }
    }
}

/// Order results nearest first, breaking distance ties by ascending key.
pub fn rank(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        a.distance
            .total_cmp(&b.distance)
            .then_with(|| a.key.cmp(&b.key))
    });
}

/// Index statistics
#[derive(Debug, Clone)]
pub struct IndexStats {
    /// Number of vectors in the index
    pub vector_count: usize,
    /// Embedding dimension
    pub dimension: usize,
    /// Metric used for ranking
    pub metric: DistanceMetric,
    /// Reserved slots
    pub capacity: usize,
}

/// Trait for vector indexes.
pub trait VectorIndex {
    /// Get the embedding dimension
    fn dimension(&self) -> usize;

    /// Get the number of vectors in the index
    fn len(&self) -> usize;

    /// Check if the index is empty
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Add a vector with the given key.
    /// Returns error if the key already exists.
    fn add(&mut self, key: u64, embedding: &Embedding) -> Result<(), VectorError>;

    /// Add multiple vectors in batch.
    fn add_batch(&mut self, vectors: &[(u64, Embedding)]) -> Result<(), VectorError> {
        for (key, emb) in vectors {
            self.add(*key, emb)?;
        }
        Ok(())
    }

    /// Search for the k nearest neighbors.
    /// Returns at most `min(k, len())` results, nearest first.
    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError>;

    /// Check if a key exists
    fn contains(&self, key: u64) -> bool;

    /// Get index statistics
    fn stats(&self) -> IndexStats;

    /// Clear all vectors from the index
    fn clear(&mut self) -> Result<(), VectorError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_by_distance_then_key() {
        let mut results = vec![
            SearchResult::new(3, 0.5),
            SearchResult::new(1, 0.9),
            SearchResult::new(0, 0.5),
            SearchResult::new(2, 0.1),
        ];
        rank(&mut results);
        let keys: Vec<u64> = results.iter().map(|r| r.key).collect();
        assert_eq!(keys, vec![2, 0, 3, 1]);
    }
}
