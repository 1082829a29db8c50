
use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;

use super::models::{ChunkRecord, DocumentSummary, NewChunkRecord};

const CHUNK_COLUMNS: &str = "id, document_id, vector_id, file_path, file_name, document_type, \
     category, chunk_index, total_chunks, content, content_length, created_at, updated_at";

pub struct ChunkRecordQueries;

impl ChunkRecordQueries {
    #[inline]
    pub async fn create(pool: &SqlitePool, record: NewChunkRecord) -> Result<ChunkRecord> {
        let now = Utc::now().naive_utc();
        let content_length = record.content_length();

        let id = sqlx::query(
            "INSERT INTO chunk_records (document_id, vector_id, file_path, file_name, \
             document_type, category, chunk_index, total_chunks, content, content_length, \
             created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&record.document_id)
        .bind(&record.vector_id)
        .bind(&record.file_path)
        .bind(&record.file_name)
        .bind(record.document_type)
        .bind(&record.category)
        .bind(record.chunk_index)
        .bind(record.total_chunks)
        .bind(&record.content)
        .bind(content_length)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("Failed to create chunk record")?
        .last_insert_rowid();

        Self::get_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Failed to retrieve created chunk record"))
    }

    #[inline]
    pub async fn get_by_id(pool: &SqlitePool, id: i64) -> Result<Option<ChunkRecord>> {
        let record = sqlx::query_as::<_, ChunkRecord>(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunk_records WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to get chunk record by id")?;

        Ok(record)
    }

    /// Point lookup by link identifier
    #[inline]
    pub async fn get_by_vector_id(
        pool: &SqlitePool,
        vector_id: &str,
    ) -> Result<Option<ChunkRecord>> {
        let record = sqlx::query_as::<_, ChunkRecord>(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunk_records WHERE vector_id = ?"
        ))
        .bind(vector_id)
        .fetch_optional(pool)
        .await
        .context("Failed to get chunk record by vector id")?;

        Ok(record)
    }

    /// All chunk rows for a document, in chunk order
    #[inline]
    pub async fn list_by_document(
        pool: &SqlitePool,
        document_id: &str,
    ) -> Result<Vec<ChunkRecord>> {
        let records = sqlx::query_as::<_, ChunkRecord>(&format!(
            "SELECT {CHUNK_COLUMNS} FROM chunk_records WHERE document_id = ? ORDER BY chunk_index"
        ))
        .bind(document_id)
        .fetch_all(pool)
        .await
        .context("Failed to list chunk records for document")?;

        Ok(records)
    }

    /// Bulk delete of a document's rows, returning how many were removed
    #[inline]
    pub async fn delete_by_document(pool: &SqlitePool, document_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM chunk_records WHERE document_id = ?")
            .bind(document_id)
            .execute(pool)
            .await
            .context("Failed to delete chunk records for document")?;

        debug!(
            "Deleted {} chunk records for document {}",
            result.rows_affected(),
            document_id
        );
        Ok(result.rows_affected())
    }

    /// Reconstruct per-document summaries by grouping chunk rows on
    /// document_id. Optional equality filters on type and category are
    /// combined with AND; newest documents first.
    #[inline]
    pub async fn document_summaries(
        pool: &SqlitePool,
        document_type: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<DocumentSummary>> {
        let mut sql = String::from(
            "SELECT document_id, \
                    MIN(file_name) AS file_name, \
                    MIN(file_path) AS file_path, \
                    MIN(document_type) AS document_type, \
                    MIN(category) AS category, \
                    COUNT(*) AS chunk_count, \
                    COALESCE(SUM(content_length), 0) AS total_content_length, \
                    MIN(created_at) AS created_at, \
                    MAX(updated_at) AS updated_at \
             FROM chunk_records",
        );

        let mut conditions = Vec::new();
        if document_type.is_some() {
            conditions.push("document_type = ?");
        }
        if category.is_some() {
            conditions.push("category = ?");
        }
        if !conditions.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&conditions.join(" AND "));
        }
        sql.push_str(" GROUP BY document_id ORDER BY MIN(created_at) DESC");

        let mut query = sqlx::query_as::<_, DocumentSummary>(&sql);
        if let Some(document_type) = document_type {
            query = query.bind(document_type.to_string());
        }
        if let Some(category) = category {
            query = query.bind(category.to_string());
        }

        let summaries = query
            .fetch_all(pool)
            .await
            .context("Failed to aggregate document summaries")?;

        Ok(summaries)
    }

    #[inline]
    pub async fn count_chunks(pool: &SqlitePool) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chunk_records")
            .fetch_one(pool)
            .await
            .context("Failed to count chunk records")?;

        Ok(count)
    }

    #[inline]
    pub async fn count_documents(pool: &SqlitePool) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(DISTINCT document_id) FROM chunk_records")
                .fetch_one(pool)
                .await
                .context("Failed to count documents")?;

        Ok(count)
    }
}
