#[cfg(test)]
mod tests;

use anyhow::Context;
use chrono::Utc;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::database::metadata::models::{DocumentSummary, NewChunkRecord};
use crate::database::{MetadataStore, VectorPayload, VectorRecord, VectorStore};
use crate::embeddings::{EmbeddingClient, chunk_text};
use crate::reader::{DocumentType, read_document, validate_extension};
use crate::{KnowledgeError, Result};

/// Characters of chunk text kept on the vector-index side; the metadata
/// store holds the full text
const CONTENT_PREVIEW_CHARS: usize = 1000;

/// The knowledge base: ingestion and query pipelines over the paired
/// vector and metadata stores.
///
/// Writes to the two stores are not atomic. A crash mid-ingest or
/// mid-delete can leave an orphan on either side; reindexing a document
/// deletes and recreates all of its records and is the only repair path.
pub struct KnowledgeBase {
    config: Config,
    metadata: MetadataStore,
    vectors: VectorStore,
    embedder: EmbeddingClient,
}

/// Outcome of ingesting one uploaded document
#[derive(Debug, Clone, Serialize)]
pub struct IngestResult {
    pub document_id: String,
    pub chunks_created: usize,
    pub file_path: PathBuf,
}

/// One ranked search hit.
///
/// `content` is the vector-side preview; `full_content` is attached when
/// the paired metadata record was found.
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub vector_id: String,
    pub similarity_score: f32,
    pub content: String,
    pub full_content: Option<String>,
    pub file_name: String,
    pub document_type: String,
    pub category: String,
    pub chunk_index: u32,
    pub document_id: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct KnowledgeStats {
    pub total_documents: i64,
    pub total_chunks: i64,
    pub vector_records: u64,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ReindexResult {
    pub documents_processed: usize,
    pub chunks_created: usize,
}

impl KnowledgeBase {
    #[inline]
    pub async fn new(config: Config) -> Result<Self> {
        std::fs::create_dir_all(&config.base_dir)
            .with_context(|| format!("Failed to create {}", config.base_dir.display()))?;

        let metadata = MetadataStore::new(config.database_path())
            .await
            .context("Failed to initialize metadata store")?;

        let vectors = VectorStore::new(&config).await?;

        let embedder = EmbeddingClient::new(&config)?;

        Ok(Self {
            config,
            metadata,
            vectors,
            embedder,
        })
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Probe the embedding service; both stores were already opened during
    /// construction
    #[inline]
    pub fn health_check(&self) -> Result<()> {
        self.embedder.ping()
    }

    /// Ingest one uploaded document: persist the raw file, split it into
    /// chunks, embed each chunk in order, and write one linked
    /// vector/metadata record pair per chunk.
    ///
    /// A reader that produces zero chunks is a success with
    /// `chunks_created == 0`. A failure partway through leaves the records
    /// already written in place.
    #[inline]
    pub async fn add_document(
        &mut self,
        content: &[u8],
        file_name: &str,
        document_type: DocumentType,
        category: &str,
    ) -> Result<IngestResult> {
        validate_extension(document_type, file_name)?;
        validate_category(category)?;

        let document_id = Uuid::new_v4().to_string();

        let category_dir = self.config.knowledge_dir_path().join(category);
        std::fs::create_dir_all(&category_dir)
            .with_context(|| format!("Failed to create {}", category_dir.display()))?;

        let file_path = category_dir.join(format!("{document_id}_{file_name}"));
        std::fs::write(&file_path, content)
            .with_context(|| format!("Failed to store {}", file_path.display()))?;

        let text = read_document(&file_path, document_type)?;
        let chunks = chunk_text(&text, &self.config.chunking);

        if chunks.is_empty() {
            info!("Document {} produced no chunks", file_name);
            return Ok(IngestResult {
                document_id,
                chunks_created: 0,
                file_path,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;

        let created_at = Utc::now();
        let total_chunks = chunks.len() as i64;

        for (chunk, embedding) in chunks.iter().zip(embeddings) {
            let vector_id = Uuid::new_v4().to_string();

            let record = VectorRecord {
                id: vector_id.clone(),
                vector: embedding,
                payload: VectorPayload {
                    document_id: document_id.clone(),
                    file_name: file_name.to_string(),
                    document_type: document_type.to_string(),
                    category: category.to_string(),
                    chunk_index: chunk.chunk_index as u32,
                    content_preview: truncate_preview(&chunk.content),
                    created_at: created_at.to_rfc3339(),
                },
            };
            self.vectors.insert_batch(vec![record]).await?;

            self.metadata
                .insert_chunk(NewChunkRecord {
                    document_id: document_id.clone(),
                    vector_id,
                    file_path: file_path.to_string_lossy().into_owned(),
                    file_name: file_name.to_string(),
                    document_type,
                    category: category.to_string(),
                    chunk_index: chunk.chunk_index as i64,
                    total_chunks,
                    content: chunk.content.clone(),
                })
                .await
                .context("Failed to store chunk metadata")?;
        }

        info!("Added document {} with {} chunks", file_name, chunks.len());

        Ok(IngestResult {
            document_id,
            chunks_created: chunks.len(),
            file_path,
        })
    }

    /// Convenience wrapper for ingesting a file already on disk
    #[inline]
    pub async fn add_document_from_path(
        &mut self,
        path: &Path,
        document_type: DocumentType,
        category: &str,
    ) -> Result<IngestResult> {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                KnowledgeError::InvalidInput(format!("Invalid file path: {}", path.display()))
            })?
            .to_string();

        let content = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        self.add_document(&content, &file_name, document_type, category)
            .await
    }

    /// Search the knowledge base by cosine similarity.
    ///
    /// Hits below `threshold` (on the [-1, 1] scale) are dropped; the rest
    /// are enriched with their metadata record when one exists. A missing
    /// metadata record is not an error: the hit falls back to the
    /// vector-side preview.
    #[inline]
    pub async fn search(
        &self,
        query: &str,
        limit: usize,
        threshold: f32,
        document_type: Option<DocumentType>,
        category: Option<&str>,
    ) -> Result<Vec<SearchMatch>> {
        let query_vector = self.embedder.embed(query)?;

        let type_filter = document_type.map(DocumentType::as_str);
        let hits = self
            .vectors
            .search(&query_vector, limit, type_filter, category)
            .await?;

        let mut matches = Vec::with_capacity(hits.len());
        for hit in hits {
            if hit.similarity_score < threshold {
                continue;
            }

            let full_content = self
                .metadata
                .get_chunk_by_vector_id(&hit.id)
                .await
                .context("Failed to look up chunk metadata")?
                .map(|record| record.content);

            matches.push(SearchMatch {
                vector_id: hit.id,
                similarity_score: hit.similarity_score,
                content: hit.payload.content_preview,
                full_content,
                file_name: hit.payload.file_name,
                document_type: hit.payload.document_type,
                category: hit.payload.category,
                chunk_index: hit.payload.chunk_index,
                document_id: hit.payload.document_id,
            });
        }

        debug!(
            "Knowledge search for '{}' returned {} results",
            query,
            matches.len()
        );
        Ok(matches)
    }

    /// Delete a document: every vector record (individually, tolerating
    /// missing ids), every metadata row, and the stored file. Fails only
    /// when no metadata rows exist for the id at all.
    #[inline]
    pub async fn delete_document(&mut self, document_id: &str) -> Result<u64> {
        let records = self
            .metadata
            .list_chunks_for_document(document_id)
            .await
            .context("Failed to load chunk records")?;

        if records.is_empty() {
            return Err(KnowledgeError::NotFound(format!(
                "Document {document_id} not found"
            )));
        }

        for record in &records {
            self.vectors.delete(&record.vector_id).await?;
        }

        self.metadata
            .delete_document_chunks(document_id)
            .await
            .context("Failed to delete chunk records")?;

        let file_path = PathBuf::from(&records[0].file_path);
        if file_path.exists() {
            std::fs::remove_file(&file_path)
                .with_context(|| format!("Failed to remove {}", file_path.display()))?;
        }

        info!(
            "Deleted document {} with {} chunks",
            document_id,
            records.len()
        );
        Ok(records.len() as u64)
    }

    /// Per-document summaries, optionally filtered by type and category
    #[inline]
    pub async fn list_documents(
        &self,
        document_type: Option<DocumentType>,
        category: Option<&str>,
    ) -> Result<Vec<DocumentSummary>> {
        let type_filter = document_type.map(DocumentType::as_str);
        let summaries = self
            .metadata
            .document_summaries(type_filter, category)
            .await
            .context("Failed to list documents")?;

        Ok(summaries)
    }

    /// Aggregate counts across both stores
    #[inline]
    pub async fn stats(&self) -> Result<KnowledgeStats> {
        let total_documents = self.metadata.count_documents().await?;
        let total_chunks = self.metadata.count_chunks().await?;
        let vector_records = self.vectors.count().await?;

        Ok(KnowledgeStats {
            total_documents,
            total_chunks,
            vector_records,
        })
    }

    /// Delete and re-ingest every known document from its stored file.
    ///
    /// Documents whose stored file has gone missing are skipped. There is
    /// no concurrency control: a query during reindex may see zero or
    /// partial results for the document being rebuilt.
    #[inline]
    pub async fn reindex_all(&mut self) -> Result<ReindexResult> {
        let summaries = self.metadata.document_summaries(None, None).await?;

        let mut documents_processed = 0;
        let mut chunks_created = 0;

        for summary in summaries {
            let file_path = PathBuf::from(&summary.file_path);
            let Ok(content) = std::fs::read(&file_path) else {
                warn!(
                    "Skipping reindex of {}: stored file {} is unreadable",
                    summary.document_id,
                    file_path.display()
                );
                continue;
            };

            self.delete_document(&summary.document_id).await?;

            let result = self
                .add_document(
                    &content,
                    &summary.file_name,
                    summary.document_type,
                    &summary.category,
                )
                .await?;

            documents_processed += 1;
            chunks_created += result.chunks_created;
        }

        if let Err(e) = self.vectors.optimize().await {
            warn!("Failed to optimize vector database: {}", e);
        }

        info!(
            "Reindexed {} documents with {} chunks",
            documents_processed, chunks_created
        );

        Ok(ReindexResult {
            documents_processed,
            chunks_created,
        })
    }
}

/// Truncate chunk text to the preview length kept in the vector index
fn truncate_preview(text: &str) -> String {
    text.chars().take(CONTENT_PREVIEW_CHARS).collect()
}

/// Categories name a storage subdirectory, so they must be plain names
fn validate_category(category: &str) -> Result<()> {
    if category.is_empty()
        || category.contains('/')
        || category.contains('\\')
        || category.contains("..")
    {
        return Err(KnowledgeError::InvalidInput(format!(
            "Invalid category: {category}"
        )));
    }
    Ok(())
}
