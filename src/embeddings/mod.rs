// Embeddings module
// Text chunking and the hosted embedding API client

pub mod chunking;
pub mod client;

pub use chunking::{ChunkingConfig, ContentChunk, chunk_text};
pub use client::EmbeddingClient;
