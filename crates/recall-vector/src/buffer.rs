//! Embedding-indexed retrieval buffer.
//!
//! An append-only sequence of [`Sample`]s plus a lazily built HNSW index over
//! their embeddings. Sample positions double as index keys, so insertion order
//! is the stable identity of every sample.
//!
//! The index is a cache over a snapshot of the sequence:
//! - it is built on the first query (or by [`RetrievalBuffer::warm_index`]);
//! - [`RetrievalBuffer::add_sample`] never touches a built index, so samples
//!   added afterwards are invisible to queries until
//!   [`RetrievalBuffer::rebuild_index`] is called.
//!
//! The buffer is single-writer: every mutating call takes `&mut self`.

use recall_embeddings::{
    CandleEmbedder, Embedding, EmbedderConfig, EmbeddingError, EmbeddingModel,
};
use recall_types::{DistanceMetric, IndexSettings, Settings, DEFAULT_K};
use tracing::{debug, info, warn};

use crate::error::BufferError;
use crate::hnsw::{HnswConfig, HnswIndex};
use crate::index::VectorIndex;
use crate::sample::Sample;

/// Seed text embedded at construction to fix the vector dimension.
pub const PLACEHOLDER_TEXT: &str = "hello world";

/// Buffer configuration
#[derive(Debug, Clone)]
pub struct BufferConfig {
    /// Index parameters; the dimension is taken from the seed embedding
    pub index: IndexSettings,
    /// Neighbors returned by [`RetrievalBuffer::get_nearest_default`]
    pub default_k: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            index: IndexSettings::default(),
            default_k: DEFAULT_K,
        }
    }
}

impl BufferConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            index: settings.index.clone(),
            default_k: settings.default_k,
        }
    }

    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.index.metric = metric;
        self
    }
}

/// Observable state of the index cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    /// Not built yet
    Absent,
    /// Built over the first `indexed` samples
    Built { indexed: usize },
}

/// A query match.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor {
    /// Insertion position of the sample (0 is the seed)
    pub position: usize,
    pub content: String,
    /// Distance under the buffer metric (lower = nearer)
    pub distance: f32,
}

struct BuiltIndex {
    index: HnswIndex,
    indexed: usize,
}

/// In-memory buffer of text samples searchable by embedding similarity.
pub struct RetrievalBuffer<E: EmbeddingModel> {
    embedder: E,
    samples: Vec<Sample>,
    dimension: usize,
    index: Option<BuiltIndex>,
    config: BufferConfig,
}

impl RetrievalBuffer<CandleEmbedder> {
    /// Load the configured Candle encoder and seed a buffer with it.
    pub fn from_settings(settings: &Settings) -> Result<Self, BufferError> {
        let embedder = CandleEmbedder::load(&EmbedderConfig::from_settings(settings))
            .map_err(BufferError::EncoderUnavailable)?;
        Self::with_config(embedder, BufferConfig::from_settings(settings))
    }
}

impl<E: EmbeddingModel> RetrievalBuffer<E> {
    /// Create a buffer seeded with the placeholder sample, using default config.
    pub fn new(embedder: E) -> Result<Self, BufferError> {
        Self::with_config(embedder, BufferConfig::default())
    }

    /// Create a buffer seeded with the placeholder sample.
    pub fn with_config(embedder: E, config: BufferConfig) -> Result<Self, BufferError> {
        let seed = embedder
            .embed(PLACEHOLDER_TEXT)
            .map_err(BufferError::EncoderUnavailable)?;
        let seed = Sample::new(PLACEHOLDER_TEXT, seed).map_err(|e| {
            BufferError::EncoderUnavailable(EmbeddingError::InvalidInput(e.to_string()))
        })?;
        let dimension = seed.dimension();

        info!(
            model = %embedder.info().name,
            dim = dimension,
            metric = %config.index.metric,
            "Retrieval buffer created"
        );

        Ok(Self {
            embedder,
            samples: vec![seed],
            dimension,
            index: None,
            config,
        })
    }

    /// Embed `text` with the buffer's embedder. Nothing is stored.
    pub fn embed(&self, text: &str) -> Result<Embedding, BufferError> {
        Ok(self.embedder.embed(text)?)
    }

    /// Embed `text` and append it as a new sample.
    ///
    /// A built index is left as is; see [`Self::is_index_stale`].
    pub fn add_sample(&mut self, text: &str) -> Result<(), BufferError> {
        let embedding = self.embed_checked(text)?;
        let sample = Sample::new(text, embedding)?;
        self.samples.push(sample);
        debug!(position = self.samples.len() - 1, "Added sample");
        Ok(())
    }

    /// Append several samples with one batch embedding call.
    ///
    /// Either every text is appended or none is.
    pub fn add_samples(&mut self, texts: &[&str]) -> Result<(), BufferError> {
        for text in texts {
            require_text(text)?;
        }
        let embeddings = self.embedder.embed_batch(texts)?;
        if embeddings.len() != texts.len() {
            return Err(BufferError::Embedding(EmbeddingError::InvalidInput(format!(
                "expected {} vectors, encoder returned {}",
                texts.len(),
                embeddings.len()
            ))));
        }

        let mut batch = Vec::with_capacity(texts.len());
        for (text, embedding) in texts.iter().zip(embeddings) {
            self.check_embedding(&embedding)?;
            batch.push(Sample::new(*text, embedding)?);
        }
        self.samples.extend(batch);
        debug!(count = texts.len(), total = self.samples.len(), "Added samples");
        Ok(())
    }

    /// Contents of the `k` nearest samples to `query`, nearest first.
    pub fn get_nearest_samples(
        &mut self,
        query: &str,
        k: usize,
    ) -> Result<Vec<String>, BufferError> {
        Ok(self
            .get_nearest(query, k)?
            .into_iter()
            .map(|n| n.content)
            .collect())
    }

    /// [`Self::get_nearest_samples`] with the configured default k.
    pub fn get_nearest_default(&mut self, query: &str) -> Result<Vec<String>, BufferError> {
        self.get_nearest_samples(query, self.config.default_k)
    }

    /// The `k` nearest samples to `query` with their positions and distances.
    ///
    /// Builds the index on first use. When `k` exceeds the number of indexed
    /// samples, every indexed sample is returned. Distance ties are ordered by
    /// insertion position.
    pub fn get_nearest(&mut self, query: &str, k: usize) -> Result<Vec<Neighbor>, BufferError> {
        if self.samples.is_empty() {
            return Err(BufferError::EmptyBuffer);
        }
        let query_embedding = self.embed_checked(query)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        self.warm_index()?;
        let Some(built) = &self.index else {
            return Err(BufferError::EmptyBuffer);
        };
        if built.indexed < self.samples.len() {
            warn!(
                indexed = built.indexed,
                total = self.samples.len(),
                "Querying stale index; call rebuild_index to include newer samples"
            );
        }

        let results = built
            .index
            .search(&query_embedding, k)
            .map_err(BufferError::Search)?;

        let neighbors: Vec<Neighbor> = results
            .into_iter()
            .filter_map(|r| {
                let position = r.key as usize;
                self.samples.get(position).map(|sample| Neighbor {
                    position,
                    content: sample.content().to_string(),
                    distance: r.distance,
                })
            })
            .collect();

        debug!(k = k, found = neighbors.len(), "Query complete");
        Ok(neighbors)
    }

    /// Build the index if it does not exist yet.
    pub fn warm_index(&mut self) -> Result<(), BufferError> {
        if self.index.is_none() {
            self.index = Some(self.build_index()?);
        }
        Ok(())
    }

    /// Rebuild the index over every current sample.
    ///
    /// On failure the previous index state is kept.
    pub fn rebuild_index(&mut self) -> Result<(), BufferError> {
        let built = self.build_index()?;
        info!(indexed = built.indexed, "Rebuilt vector index");
        self.index = Some(built);
        Ok(())
    }

    pub fn index_state(&self) -> IndexState {
        match &self.index {
            None => IndexState::Absent,
            Some(built) => IndexState::Built {
                indexed: built.indexed,
            },
        }
    }

    /// True when the index exists but misses samples added after it was built.
    pub fn is_index_stale(&self) -> bool {
        matches!(self.index_state(), IndexState::Built { indexed } if indexed < self.samples.len())
    }

    /// Sample count, including the seed.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// All samples in insertion order.
    pub fn get_samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn get(&self, position: usize) -> Option<&Sample> {
        self.samples.get(position)
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn metric(&self) -> DistanceMetric {
        self.config.index.metric
    }

    pub fn default_k(&self) -> usize {
        self.config.default_k
    }

    fn build_index(&self) -> Result<BuiltIndex, BufferError> {
        if self.samples.is_empty() {
            return Err(BufferError::EmptyBuffer);
        }
        let config = HnswConfig::from_settings(self.dimension, &self.config.index);
        let index = HnswIndex::build(
            config,
            self.samples
                .iter()
                .enumerate()
                .map(|(position, sample)| (position as u64, sample.embedding())),
        )
        .map_err(BufferError::IndexBuild)?;

        Ok(BuiltIndex {
            indexed: index.len(),
            index,
        })
    }

    fn embed_checked(&self, text: &str) -> Result<Embedding, BufferError> {
        require_text(text)?;
        let embedding = self.embedder.embed(text)?;
        self.check_embedding(&embedding)?;
        Ok(embedding)
    }

    /// Encoder output must match the seed dimension and be finite.
    fn check_embedding(&self, embedding: &Embedding) -> Result<(), BufferError> {
        if embedding.dimension() != self.dimension {
            return Err(BufferError::Embedding(EmbeddingError::DimensionMismatch {
                expected: self.dimension,
                actual: embedding.dimension(),
            }));
        }
        if !embedding.is_finite() {
            return Err(BufferError::Embedding(EmbeddingError::InvalidInput(
                "non-finite embedding".to_string(),
            )));
        }
        Ok(())
    }
}

fn require_text(text: &str) -> Result<(), BufferError> {
    if text.trim().is_empty() {
        return Err(BufferError::Embedding(EmbeddingError::InvalidInput(
            "empty text".to_string(),
        )));
    }
    Ok(())
}
