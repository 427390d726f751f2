//! # recall-types
//!
//! Shared types for the recall retrieval buffer.
//!
//! - Settings: layered configuration (defaults, config file, env, CLI)
//! - `DistanceMetric`: the vector-space metric used for nearest-neighbor search
//! - `Pooling`: how token states are reduced to one sentence vector

pub mod config;
pub mod error;

pub use config::{
    DistanceMetric, EmbedderSettings, IndexSettings, Pooling, Settings, DEFAULT_K,
};
pub use error::ConfigError;
