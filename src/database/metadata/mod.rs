use anyhow::{Context, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use tracing::{debug, info};

use crate::database::metadata::models::{ChunkRecord, DocumentSummary, NewChunkRecord};
use crate::database::metadata::queries::ChunkRecordQueries;

#[cfg(test)]
mod tests;

pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// Metadata store over SQLite: one row per chunk, grouped into documents
/// by document_id
#[derive(Debug, Clone)]
pub struct MetadataStore {
    pool: DbPool,
}

impl MetadataStore {
    #[inline]
    pub async fn new<P: AsRef<Path>>(database_path: P) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(database_path)
            .create_if_missing(true)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .context("Failed to create database connection pool")?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    #[inline]
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn run_migrations(&self) -> Result<()> {
        info!("Running metadata store migrations");

        sqlx::migrate!("src/database/metadata/migrations")
            .run(&self.pool)
            .await
            .context("Failed to run schema migration")?;

        debug!("Metadata store migrations completed successfully");
        Ok(())
    }

    #[inline]
    pub async fn insert_chunk(&self, record: NewChunkRecord) -> Result<ChunkRecord> {
        ChunkRecordQueries::create(&self.pool, record).await
    }

    #[inline]
    pub async fn get_chunk_by_vector_id(&self, vector_id: &str) -> Result<Option<ChunkRecord>> {
        ChunkRecordQueries::get_by_vector_id(&self.pool, vector_id).await
    }

    #[inline]
    pub async fn list_chunks_for_document(&self, document_id: &str) -> Result<Vec<ChunkRecord>> {
        ChunkRecordQueries::list_by_document(&self.pool, document_id).await
    }

    #[inline]
    pub async fn delete_document_chunks(&self, document_id: &str) -> Result<u64> {
        ChunkRecordQueries::delete_by_document(&self.pool, document_id).await
    }

    #[inline]
    pub async fn document_summaries(
        &self,
        document_type: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<DocumentSummary>> {
        ChunkRecordQueries::document_summaries(&self.pool, document_type, category).await
    }

    #[inline]
    pub async fn count_chunks(&self) -> Result<i64> {
        ChunkRecordQueries::count_chunks(&self.pool).await
    }

    #[inline]
    pub async fn count_documents(&self) -> Result<i64> {
        ChunkRecordQueries::count_documents(&self.pool).await
    }
}
