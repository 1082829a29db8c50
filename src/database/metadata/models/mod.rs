#[cfg(test)]
mod tests;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::reader::DocumentType;

/// Metadata-store row for a single chunk.
///
/// Carries the full untruncated chunk text; the vector index keeps only a
/// preview. `vector_id` links this row to its vector record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct ChunkRecord {
    pub id: i64,
    pub document_id: String,
    pub vector_id: String,
    pub file_path: String,
    pub file_name: String,
    pub document_type: DocumentType,
    pub category: String,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub content: String,
    pub content_length: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewChunkRecord {
    pub document_id: String,
    pub vector_id: String,
    pub file_path: String,
    pub file_name: String,
    pub document_type: DocumentType,
    pub category: String,
    pub chunk_index: i64,
    pub total_chunks: i64,
    pub content: String,
}

/// Per-document view reconstructed by grouping chunk rows on document_id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DocumentSummary {
    pub document_id: String,
    pub file_name: String,
    pub file_path: String,
    pub document_type: DocumentType,
    pub category: String,
    pub chunk_count: i64,
    pub total_content_length: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl NewChunkRecord {
    /// Length in bytes of the stored chunk text
    #[inline]
    pub fn content_length(&self) -> i64 {
        self.content.len() as i64
    }
}
