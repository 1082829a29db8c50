use super::*;
use crate::reader::DocumentType;
use anyhow::Result;
use std::collections::HashSet;
use tempfile::TempDir;

async fn create_test_store() -> Result<(TempDir, MetadataStore)> {
    let temp_dir = TempDir::new()?;
    let store = MetadataStore::new(temp_dir.path().join("metadata.db")).await?;
    Ok((temp_dir, store))
}

#[tokio::test]
async fn schema_migration_creates_tables() -> Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    let tables: Vec<String> = sqlx::query_scalar(
        "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%'",
    )
    .fetch_all(store.pool())
    .await?;

    let actual_tables: HashSet<&str> = tables.iter().map(|t| t.as_str()).collect();
    assert!(actual_tables.contains("chunk_records"));

    Ok(())
}

#[tokio::test]
async fn migrations_are_idempotent() -> Result<()> {
    let (_temp_dir, store) = create_test_store().await?;
    store.run_migrations().await?;
    Ok(())
}

#[tokio::test]
async fn store_round_trip() -> Result<()> {
    let (_temp_dir, store) = create_test_store().await?;

    let record = store
        .insert_chunk(models::NewChunkRecord {
            document_id: "doc-1".to_string(),
            vector_id: "vec-1".to_string(),
            file_path: "/kb/general/doc-1_notes.txt".to_string(),
            file_name: "notes.txt".to_string(),
            document_type: DocumentType::Text,
            category: "general".to_string(),
            chunk_index: 0,
            total_chunks: 1,
            content: "chunk text".to_string(),
        })
        .await?;

    let fetched = store
        .get_chunk_by_vector_id("vec-1")
        .await?
        .expect("record should exist");
    assert_eq!(fetched, record);

    assert_eq!(store.count_chunks().await?, 1);
    assert_eq!(store.count_documents().await?, 1);

    let deleted = store.delete_document_chunks("doc-1").await?;
    assert_eq!(deleted, 1);
    assert_eq!(store.count_chunks().await?, 0);

    Ok(())
}
