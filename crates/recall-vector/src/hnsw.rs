//! HNSW index implementation using usearch.
//!
//! Parameters tuned for quality over speed:
//! - M = 16 (connections per layer)
//! - ef_construction = 200 (build-time quality)
//! - ef_search = 100 (search-time quality)
//!
//! The index lives in memory only.

use recall_embeddings::Embedding;
use recall_types::{DistanceMetric, IndexSettings};
use tracing::{debug, info};
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::error::VectorError;
use crate::index::{rank, IndexStats, SearchResult, VectorIndex};

/// HNSW index configuration
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Embedding dimension (must match model)
    pub dimension: usize,
    /// Ranking metric
    pub metric: DistanceMetric,
    /// Number of connections per layer (M parameter)
    pub connectivity: usize,
    /// Build-time search depth (ef_construction)
    pub expansion_add: usize,
    /// Query-time search depth (ef_search)
    pub expansion_search: usize,
    /// Initial capacity (for pre-allocation); grows on demand
    pub capacity: usize,
}

impl Default for HnswConfig {
    fn default() -> Self {
        Self {
            dimension: 384, // all-MiniLM-L6-v2
            metric: DistanceMetric::default(),
            connectivity: 16,
            expansion_add: 200,
            expansion_search: 100,
            capacity: 1024,
        }
    }
}

impl HnswConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            ..Default::default()
        }
    }

    pub fn from_settings(dimension: usize, settings: &IndexSettings) -> Self {
        Self::new(dimension)
            .with_metric(settings.metric)
            .with_connectivity(settings.connectivity)
            .with_expansion(settings.expansion_add, settings.expansion_search)
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }

    pub fn with_connectivity(mut self, m: usize) -> Self {
        self.connectivity = m;
        self
    }

    pub fn with_expansion(mut self, ef_add: usize, ef_search: usize) -> Self {
        self.expansion_add = ef_add;
        self.expansion_search = ef_search;
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    fn options(&self) -> IndexOptions {
        IndexOptions {
            dimensions: self.dimension,
            metric: metric_kind(self.metric),
            quantization: ScalarKind::F32,
            connectivity: self.connectivity,
            expansion_add: self.expansion_add,
            expansion_search: self.expansion_search,
            multi: false, // Single vector per key
        }
    }
}

fn metric_kind(metric: DistanceMetric) -> MetricKind {
    match metric {
        DistanceMetric::L2 => MetricKind::L2sq,
        DistanceMetric::InnerProduct => MetricKind::IP,
        DistanceMetric::Cosine => MetricKind::Cos,
    }
}

/// HNSW index wrapper around usearch.
pub struct HnswIndex {
    index: Index,
    config: HnswConfig,
}

impl HnswIndex {
    /// Create an empty index.
    pub fn create(config: HnswConfig) -> Result<Self, VectorError> {
        let index = new_index(&config)?;
        debug!(dim = config.dimension, metric = %config.metric, "Created vector index");
        Ok(Self { index, config })
    }

    /// Build an index over a full snapshot of keyed vectors.
    ///
    /// Fails on the first vector whose dimension differs from the config.
    pub fn build<'a, I>(config: HnswConfig, vectors: I) -> Result<Self, VectorError>
    where
        I: IntoIterator<Item = (u64, &'a Embedding)>,
        I::IntoIter: ExactSizeIterator,
    {
        let vectors = vectors.into_iter();
        let count = vectors.len();
        let mut index = Self::create(config.with_capacity(count.max(1)))?;
        for (key, embedding) in vectors {
            index.add(key, embedding)?;
        }
        info!(
            vectors = count,
            dim = index.config.dimension,
            metric = %index.config.metric,
            "Built vector index"
        );
        Ok(index)
    }

    fn check_dimension(&self, embedding: &Embedding) -> Result<(), VectorError> {
        if embedding.dimension() != self.config.dimension {
            return Err(VectorError::DimensionMismatch {
                expected: self.config.dimension,
                actual: embedding.dimension(),
            });
        }
        Ok(())
    }
}

fn new_index(config: &HnswConfig) -> Result<Index, VectorError> {
    let index = Index::new(&config.options()).map_err(|e| VectorError::Index(e.to_string()))?;
    index
        .reserve(config.capacity.max(1))
        .map_err(|e| VectorError::Index(e.to_string()))?;
    Ok(index)
}

impl VectorIndex for HnswIndex {
    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn len(&self) -> usize {
        self.index.size()
    }

    fn add(&mut self, key: u64, embedding: &Embedding) -> Result<(), VectorError> {
        self.check_dimension(embedding)?;
        if !embedding.is_finite() {
            return Err(VectorError::NonFinite(key));
        }
        if self.index.contains(key) {
            return Err(VectorError::DuplicateKey(key));
        }

        if self.index.size() >= self.index.capacity() {
            let grown = (self.index.capacity() * 2).max(16);
            self.index
                .reserve(grown)
                .map_err(|e| VectorError::Index(e.to_string()))?;
        }

        self.index
            .add(key, embedding.as_slice())
            .map_err(|e| VectorError::Index(e.to_string()))?;

        debug!(key = key, "Added vector");
        Ok(())
    }

    fn search(&self, query: &Embedding, k: usize) -> Result<Vec<SearchResult>, VectorError> {
        self.check_dimension(query)?;
        if k == 0 || self.index.size() == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .index
            .search(query.as_slice(), k)
            .map_err(|e| VectorError::Index(e.to_string()))?;

        let mut results: Vec<SearchResult> = matches
            .keys
            .iter()
            .zip(matches.distances.iter())
            .map(|(&key, &distance)| SearchResult::new(key, distance))
            .collect();
        rank(&mut results);

        debug!(k = k, found = results.len(), "Search complete");
        Ok(results)
    }

    fn contains(&self, key: u64) -> bool {
        self.index.contains(key)
    }

    fn stats(&self) -> IndexStats {
        IndexStats {
            vector_count: self.index.size(),
            dimension: self.config.dimension,
            metric: self.config.metric,
            capacity: self.index.capacity(),
        }
    }

    fn clear(&mut self) -> Result<(), VectorError> {
        self.index = new_index(&self.config)?;
        info!("Cleared vector index");
        Ok(())
    }
}
