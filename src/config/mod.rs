// Configuration module
// Handles loading, validation, and persistence of application settings

pub mod settings;

pub use crate::embeddings::chunking::ChunkingConfig;
pub use settings::{Config, ConfigError, EmbeddingConfig, get_base_dir};
