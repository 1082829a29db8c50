#[cfg(test)]
mod tests;

use arrow::array::{Array, FixedSizeListArray, Float32Array, RecordBatchIterator, StringArray, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use futures::TryStreamExt;
use lancedb::{
    Connection, DistanceType,
    query::{ExecutableQuery, QueryBase},
};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::{KnowledgeError, Result};

/// Vector index adapter over LanceDB.
///
/// One record per chunk: the embedding, a truncated text preview, and the
/// scalar fields used for filtering. Records are append-only; re-ingestion
/// deletes and recreates, never updates in place.
pub struct VectorStore {
    connection: Connection,
    table_name: String,
    dimension: usize,
}

/// Payload stored alongside each vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorPayload {
    /// Identifier of the owning document
    pub document_id: String,
    /// Original file name of the uploaded source
    pub file_name: String,
    /// Document type tag (pdf/docx/text)
    pub document_type: String,
    /// Category tag
    pub category: String,
    /// Position of the chunk within its document
    pub chunk_index: u32,
    /// Truncated chunk text, kept short on the index side; the full text
    /// lives in the metadata store
    pub content_preview: String,
    /// RFC 3339 creation timestamp
    pub created_at: String,
}

/// A record as written into the vector index
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Link identifier shared with the metadata store
    pub id: String,
    pub vector: Vec<f32>,
    pub payload: VectorPayload,
}

/// A similarity search hit
#[derive(Debug, Clone)]
pub struct VectorHit {
    pub id: String,
    /// Cosine similarity in [-1, 1], highest first
    pub similarity_score: f32,
    /// Raw cosine distance as reported by the index, in [0, 2]
    pub distance: f32,
    pub payload: VectorPayload,
}

/// Convert a raw cosine distance in [0, 2] into the similarity score
/// reported to callers, in [-1, 1]
#[inline]
pub fn similarity_from_distance(distance: f32) -> f32 {
    1.0 - distance
}

impl VectorStore {
    #[inline]
    pub async fn new(config: &Config) -> Result<Self> {
        let db_path = config.vector_database_path();
        debug!("Initializing LanceDB at path: {:?}", db_path);

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                KnowledgeError::Database(format!(
                    "Failed to create vector database directory: {e}"
                ))
            })?;
        }

        let uri = format!("file://{}", db_path.display());
        let connection = lancedb::connect(&uri)
            .execute()
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to connect to LanceDB: {e}")))?;

        let store = Self {
            connection,
            table_name: "chunks".to_string(),
            dimension: config.embedding.embedding_dimension as usize,
        };

        store.initialize_table().await?;

        info!("Vector store initialized successfully");
        Ok(store)
    }

    /// Create the chunks table with the configured vector dimension if it
    /// does not exist yet
    async fn initialize_table(&self) -> Result<()> {
        let table_names = self
            .connection
            .table_names()
            .execute()
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to list tables: {e}")))?;

        if table_names.contains(&self.table_name) {
            debug!("Chunks table already exists");
            return Ok(());
        }

        let schema = self.create_schema();
        self.connection
            .create_empty_table(&self.table_name, schema)
            .execute()
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to create table: {e}")))?;

        info!(
            "Chunks table created with {} dimensions",
            self.dimension
        );
        Ok(())
    }

    fn create_schema(&self) -> Arc<Schema> {
        Arc::new(Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new(
                "vector",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, false)),
                    self.dimension as i32,
                ),
                false,
            ),
            Field::new("content", DataType::Utf8, false),
            Field::new("file_name", DataType::Utf8, false),
            Field::new("document_type", DataType::Utf8, false),
            Field::new("category", DataType::Utf8, false),
            Field::new("chunk_index", DataType::UInt32, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("created_at", DataType::Utf8, false),
        ]))
    }

    /// Append a batch of records to the index
    #[inline]
    pub async fn insert_batch(&mut self, records: Vec<VectorRecord>) -> Result<()> {
        if records.is_empty() {
            debug!("No vector records to store");
            return Ok(());
        }

        debug!("Storing batch of {} vector records", records.len());

        for record in &records {
            if record.vector.len() != self.dimension {
                return Err(KnowledgeError::Database(format!(
                    "Vector dimension mismatch: expected {}, got {}",
                    self.dimension,
                    record.vector.len()
                )));
            }
        }

        let record_batch = self.create_record_batch(&records)?;
        let table = self.open_table().await?;

        let schema = record_batch.schema();
        let reader = RecordBatchIterator::new(std::iter::once(Ok(record_batch)), schema);
        table
            .add(reader)
            .execute()
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to insert records: {e}")))?;

        debug!("Stored {} vector records", records.len());
        Ok(())
    }

    fn create_record_batch(&self, records: &[VectorRecord]) -> Result<RecordBatch> {
        let len = records.len();

        let mut ids = Vec::with_capacity(len);
        let mut contents = Vec::with_capacity(len);
        let mut file_names = Vec::with_capacity(len);
        let mut document_types = Vec::with_capacity(len);
        let mut categories = Vec::with_capacity(len);
        let mut chunk_indices = Vec::with_capacity(len);
        let mut document_ids = Vec::with_capacity(len);
        let mut created_ats = Vec::with_capacity(len);

        let mut flat_values = Vec::with_capacity(len * self.dimension);
        for record in records {
            ids.push(record.id.as_str());
            contents.push(record.payload.content_preview.as_str());
            file_names.push(record.payload.file_name.as_str());
            document_types.push(record.payload.document_type.as_str());
            categories.push(record.payload.category.as_str());
            chunk_indices.push(record.payload.chunk_index);
            document_ids.push(record.payload.document_id.as_str());
            created_ats.push(record.payload.created_at.as_str());
            flat_values.extend_from_slice(&record.vector);
        }

        let values_array = Float32Array::from(flat_values);
        let item_field = Arc::new(Field::new("item", DataType::Float32, false));
        let vector_array = FixedSizeListArray::try_new(
            item_field,
            self.dimension as i32,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| KnowledgeError::Database(format!("Failed to create vector array: {e}")))?;

        let arrays: Vec<Arc<dyn Array>> = vec![
            Arc::new(StringArray::from(ids)),
            Arc::new(vector_array),
            Arc::new(StringArray::from(contents)),
            Arc::new(StringArray::from(file_names)),
            Arc::new(StringArray::from(document_types)),
            Arc::new(StringArray::from(categories)),
            Arc::new(UInt32Array::from(chunk_indices)),
            Arc::new(StringArray::from(document_ids)),
            Arc::new(StringArray::from(created_ats)),
        ];

        RecordBatch::try_new(self.create_schema(), arrays)
            .map_err(|e| KnowledgeError::Database(format!("Failed to create record batch: {e}")))
    }

    /// Search for the nearest chunks by cosine similarity.
    ///
    /// Type and category filters are combined with logical AND when
    /// supplied. Hits carry both the raw distance and the converted
    /// similarity score.
    #[inline]
    pub async fn search(
        &self,
        query_vector: &[f32],
        limit: usize,
        document_type: Option<&str>,
        category: Option<&str>,
    ) -> Result<Vec<VectorHit>> {
        debug!("Searching for similar vectors with limit: {}", limit);

        let table = self.open_table().await?;

        let mut query = table
            .vector_search(query_vector)
            .map_err(|e| KnowledgeError::Database(format!("Failed to create vector search: {e}")))?
            .column("vector")
            .distance_type(DistanceType::Cosine)
            .limit(limit);

        let mut predicates = Vec::new();
        if let Some(document_type) = document_type {
            predicates.push(format!("document_type = '{}'", escape_value(document_type)));
        }
        if let Some(category) = category {
            predicates.push(format!("category = '{}'", escape_value(category)));
        }
        if !predicates.is_empty() {
            query = query.only_if(predicates.join(" AND "));
        }

        let mut results = query
            .execute()
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to execute search: {e}")))?;

        let mut hits = Vec::new();
        while let Some(batch) = results
            .try_next()
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to read result stream: {e}")))?
        {
            hits.extend(self.parse_search_batch(&batch)?);
        }

        debug!("Parsed {} search hits", hits.len());
        Ok(hits)
    }

    fn parse_search_batch(&self, batch: &RecordBatch) -> Result<Vec<VectorHit>> {
        let num_rows = batch.num_rows();

        let ids = string_column(batch, "id")?;
        let contents = string_column(batch, "content")?;
        let file_names = string_column(batch, "file_name")?;
        let document_types = string_column(batch, "document_type")?;
        let categories = string_column(batch, "category")?;
        let document_ids = string_column(batch, "document_id")?;
        let created_ats = string_column(batch, "created_at")?;

        let chunk_indices = batch
            .column_by_name("chunk_index")
            .and_then(|col| col.as_any().downcast_ref::<UInt32Array>())
            .ok_or_else(|| KnowledgeError::Database("Missing chunk_index column".to_string()))?;

        let distances = batch
            .column_by_name("_distance")
            .and_then(|col| col.as_any().downcast_ref::<Float32Array>());

        let mut hits = Vec::with_capacity(num_rows);
        for row in 0..num_rows {
            let distance = distances.map_or(0.0, |d| if d.is_null(row) { 0.0 } else { d.value(row) });

            hits.push(VectorHit {
                id: ids.value(row).to_string(),
                similarity_score: similarity_from_distance(distance),
                distance,
                payload: VectorPayload {
                    document_id: document_ids.value(row).to_string(),
                    file_name: file_names.value(row).to_string(),
                    document_type: document_types.value(row).to_string(),
                    category: categories.value(row).to_string(),
                    chunk_index: chunk_indices.value(row),
                    content_preview: contents.value(row).to_string(),
                    created_at: created_ats.value(row).to_string(),
                },
            });
        }

        Ok(hits)
    }

    /// Delete a single record by link identifier.
    ///
    /// Deleting an id that is not present is not an error.
    #[inline]
    pub async fn delete(&mut self, id: &str) -> Result<()> {
        debug!("Deleting vector record: {}", id);

        let table = self.open_table().await?;
        let predicate = format!("id = '{}'", escape_value(id));
        table
            .delete(&predicate)
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to delete record: {e}")))?;

        Ok(())
    }

    /// Delete every record belonging to a document
    #[inline]
    pub async fn delete_document(&mut self, document_id: &str) -> Result<()> {
        debug!("Deleting vector records for document: {}", document_id);

        let table = self.open_table().await?;
        let predicate = format!("document_id = '{}'", escape_value(document_id));
        table.delete(&predicate).await.map_err(|e| {
            KnowledgeError::Database(format!("Failed to delete document records: {e}"))
        })?;

        Ok(())
    }

    /// Total number of records in the index
    #[inline]
    pub async fn count(&self) -> Result<u64> {
        let table = self.open_table().await?;
        let count = table
            .count_rows(None)
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to count rows: {e}")))?;

        Ok(count as u64)
    }

    /// Compact and reorganize the index after bulk changes
    #[inline]
    pub async fn optimize(&mut self) -> Result<()> {
        debug!("Optimizing vector database");

        let table = self.open_table().await?;
        table
            .optimize(lancedb::table::OptimizeAction::All)
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to optimize table: {e}")))?;

        info!("Vector database optimization completed");
        Ok(())
    }

    async fn open_table(&self) -> Result<lancedb::Table> {
        self.connection
            .open_table(&self.table_name)
            .execute()
            .await
            .map_err(|e| KnowledgeError::Database(format!("Failed to open table: {e}")))
    }
}

fn string_column<'a>(batch: &'a RecordBatch, name: &str) -> Result<&'a StringArray> {
    batch
        .column_by_name(name)
        .and_then(|col| col.as_any().downcast_ref::<StringArray>())
        .ok_or_else(|| KnowledgeError::Database(format!("Missing {name} column")))
}

/// Escape a value for use inside a single-quoted SQL predicate
fn escape_value(value: &str) -> String {
    value.replace('\'', "''")
}
