//! End-to-end test infrastructure for recall.
//!
//! Deterministic embedders that stand in for a real encoder, so buffer
//! semantics can be tested without downloading a model.

use recall_embeddings::{Embedding, EmbeddingError, EmbeddingModel, ModelInfo};
use recall_vector::{BufferConfig, RetrievalBuffer};

/// Sentences from the sports/pizza retrieval scenario
pub const SCENARIO_SAMPLES: &[&str] = &[
    "how are you",
    "the weather today is very nice, do you like some outdoor sports?",
    "My favourite sport is snowboarding",
    "I like sports very much, I like hiking",
    "I had shrimp pizza as dinner",
];

/// Query from the sports/pizza retrieval scenario
pub const SCENARIO_QUERY: &str = "I like outdoor and sports";

/// Topic dimensions and the word stems that feed them
const TOPICS: &[&[&str]] = &[
    &["sport", "outdoor", "hiking", "hike", "snowboard", "ski"],
    &["pizza", "dinner", "shrimp", "lunch", "food"],
    &["weather", "nice", "sunny", "rain"],
    &["hello", "world", "how", "you"],
];

/// Extra dimensions that absorb words outside every topic
const HASH_BUCKETS: usize = 4;
const HASH_WEIGHT: f32 = 0.25;

/// Bag-of-topics embedder: counts topic stems, hashes everything else into a
/// few low-weight buckets, then normalizes.
pub struct KeywordEmbedder {
    info: ModelInfo,
}

impl KeywordEmbedder {
    pub fn new() -> Self {
        Self {
            info: ModelInfo {
                name: "keyword".to_string(),
                dimension: TOPICS.len() + HASH_BUCKETS,
                max_sequence_length: usize::MAX,
            },
        }
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::new()
    }
}

/// FNV-1a, stable across runs and platforms
fn bucket(word: &str) -> usize {
    let hash = word
        .bytes()
        .fold(0xcbf2_9ce4_8422_2325_u64, |h, b| {
            (h ^ b as u64).wrapping_mul(0x0100_0000_01b3)
        });
    (hash % HASH_BUCKETS as u64) as usize
}

impl EmbeddingModel for KeywordEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput("empty text".to_string()));
        }
        let mut values = vec![0.0f32; self.info.dimension];
        let lower = text.to_lowercase();
        for word in lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty()) {
            match TOPICS
                .iter()
                .position(|stems| stems.iter().any(|s| word.starts_with(s)))
            {
                Some(topic) => values[topic] += 1.0,
                None => values[TOPICS.len() + bucket(word)] += HASH_WEIGHT,
            }
        }
        Ok(Embedding::new(values))
    }
}

/// Reads vectors straight from text such as `"0.5, -1, 2"`.
///
/// Text that does not parse (the seed sample included) maps to the zero vector.
pub struct VectorEmbedder {
    info: ModelInfo,
}

impl VectorEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            info: ModelInfo {
                name: "literal".to_string(),
                dimension,
                max_sequence_length: usize::MAX,
            },
        }
    }
}

/// Render a vector in the form [`VectorEmbedder`] parses.
pub fn vector_text(values: &[f32]) -> String {
    values
        .iter()
        .map(|v| v.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl EmbeddingModel for VectorEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        let parsed: Result<Vec<f32>, _> = text.split(',').map(|p| p.trim().parse()).collect();
        match parsed {
            Ok(values) if values.len() == self.info.dimension => Ok(Embedding::from_raw(values)),
            Ok(values) => Err(EmbeddingError::DimensionMismatch {
                expected: self.info.dimension,
                actual: values.len(),
            }),
            Err(_) => Ok(Embedding::from_raw(vec![0.0; self.info.dimension])),
        }
    }
}

/// Delegates to [`KeywordEmbedder`] but fails on any text containing `marker`.
pub struct FailingEmbedder {
    inner: KeywordEmbedder,
    marker: String,
}

impl FailingEmbedder {
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            inner: KeywordEmbedder::new(),
            marker: marker.into(),
        }
    }
}

impl EmbeddingModel for FailingEmbedder {
    fn info(&self) -> &ModelInfo {
        self.inner.info()
    }

    fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        if text.contains(&self.marker) {
            return Err(EmbeddingError::InvalidInput(format!(
                "encoder fault on {:?}",
                text
            )));
        }
        self.inner.embed(text)
    }
}

/// Buffer over [`KeywordEmbedder`] holding the scenario sentences.
pub fn scenario_buffer(config: BufferConfig) -> RetrievalBuffer<KeywordEmbedder> {
    let mut buffer = RetrievalBuffer::with_config(KeywordEmbedder::new(), config)
        .expect("keyword embedder always embeds the seed");
    for text in SCENARIO_SAMPLES {
        buffer.add_sample(text).expect("Failed to add scenario sample");
    }
    buffer
}

/// Uniform random vector in [-1, 1)^dim
pub fn random_vector(dim: usize) -> Vec<f32> {
    use rand::Rng;
    let mut rng = rand::rng();
    (0..dim).map(|_| rng.random_range(-1.0..1.0)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_embedder_is_deterministic() {
        let embedder = KeywordEmbedder::new();
        let a = embedder.embed(SCENARIO_QUERY).unwrap();
        let b = embedder.embed(SCENARIO_QUERY).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.dimension(), 8);
    }

    #[test]
    fn test_keyword_embedder_separates_topics() {
        let embedder = KeywordEmbedder::new();
        let query = embedder.embed(SCENARIO_QUERY).unwrap();
        let hiking = embedder.embed(SCENARIO_SAMPLES[3]).unwrap();
        let pizza = embedder.embed(SCENARIO_SAMPLES[4]).unwrap();
        assert!(query.cosine_similarity(&hiking) > query.cosine_similarity(&pizza));
    }

    #[test]
    fn test_vector_embedder_parses_and_falls_back() {
        let embedder = VectorEmbedder::new(3);
        assert_eq!(
            embedder.embed(&vector_text(&[0.5, -1.0, 2.0])).unwrap().values,
            vec![0.5, -1.0, 2.0]
        );
        assert_eq!(embedder.embed("hello world").unwrap().values, vec![0.0; 3]);
        assert!(embedder.embed("1,2").is_err());
    }

    #[test]
    fn test_failing_embedder() {
        let embedder = FailingEmbedder::new("boom");
        assert!(embedder.embed("all fine").is_ok());
        assert!(embedder.embed("this goes boom").is_err());
    }
}
