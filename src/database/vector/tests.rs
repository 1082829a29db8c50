use super::*;
use crate::config::{ChunkingConfig, EmbeddingConfig};
use tempfile::TempDir;

fn create_test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        embedding: EmbeddingConfig {
            embedding_dimension: 4,
            ..EmbeddingConfig::default()
        },
        chunking: ChunkingConfig::default(),
        base_dir: temp_dir.path().to_path_buf(),
    };
    (config, temp_dir)
}

fn test_record(id: &str, document_id: &str, category: &str, vector: Vec<f32>) -> VectorRecord {
    VectorRecord {
        id: id.to_string(),
        vector,
        payload: VectorPayload {
            document_id: document_id.to_string(),
            file_name: "contract.txt".to_string(),
            document_type: "text".to_string(),
            category: category.to_string(),
            chunk_index: 0,
            content_preview: format!("preview text for {}", id),
            created_at: "2024-01-01T00:00:00Z".to_string(),
        },
    }
}

#[test]
fn similarity_conversion_bounds() {
    // Raw cosine distance spans [0, 2]; callers must always see [-1, 1]
    for raw in [0.0_f32, 0.25, 0.5, 1.0, 1.5, 2.0] {
        let score = similarity_from_distance(raw);
        assert!((-1.0..=1.0).contains(&score), "score {score} out of range");
    }

    assert_eq!(similarity_from_distance(0.0), 1.0);
    assert_eq!(similarity_from_distance(1.0), 0.0);
    assert_eq!(similarity_from_distance(2.0), -1.0);
}

#[test]
fn predicate_values_are_escaped() {
    assert_eq!(escape_value("general"), "general");
    assert_eq!(escape_value("it's"), "it''s");
}

#[tokio::test]
async fn vector_store_initialization() {
    let (config, _temp_dir) = create_test_config();

    let store = VectorStore::new(&config)
        .await
        .expect("should initialize vector store");
    assert_eq!(store.table_name, "chunks");
    assert_eq!(store.dimension, 4);
    assert_eq!(store.count().await.expect("should count"), 0);
}

#[tokio::test]
async fn insert_and_count() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let records = vec![
        test_record("v1", "doc-1", "general", vec![1.0, 0.0, 0.0, 0.0]),
        test_record("v2", "doc-1", "general", vec![0.0, 1.0, 0.0, 0.0]),
    ];
    store
        .insert_batch(records)
        .await
        .expect("should insert records");

    assert_eq!(store.count().await.expect("should count"), 2);
}

#[tokio::test]
async fn dimension_mismatch_is_rejected() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let record = test_record("v1", "doc-1", "general", vec![1.0, 0.0]);
    let result = store.insert_batch(vec![record]).await;
    assert!(matches!(result, Err(KnowledgeError::Database(_))));
}

#[tokio::test]
async fn search_returns_nearest_first() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .insert_batch(vec![
            test_record("aligned", "doc-1", "general", vec![1.0, 0.0, 0.0, 0.0]),
            test_record("orthogonal", "doc-1", "general", vec![0.0, 1.0, 0.0, 0.0]),
        ])
        .await
        .expect("should insert records");

    let hits = store
        .search(&[1.0, 0.0, 0.0, 0.0], 10, None, None)
        .await
        .expect("should search");

    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "aligned");
    assert!(hits[0].similarity_score > hits[1].similarity_score);
    assert!(hits[0].similarity_score > 0.99);
    for hit in &hits {
        assert!((-1.0..=1.0).contains(&hit.similarity_score));
        assert!((0.0..=2.0).contains(&hit.distance));
    }
}

#[tokio::test]
async fn search_filters_by_type_and_category() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    let mut contract = test_record("v1", "doc-1", "contracts", vec![1.0, 0.0, 0.0, 0.0]);
    contract.payload.document_type = "pdf".to_string();
    let general = test_record("v2", "doc-2", "general", vec![1.0, 0.0, 0.0, 0.0]);

    store
        .insert_batch(vec![contract, general])
        .await
        .expect("should insert records");

    let hits = store
        .search(&[1.0, 0.0, 0.0, 0.0], 10, Some("pdf"), Some("contracts"))
        .await
        .expect("should search");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].id, "v1");

    let hits = store
        .search(&[1.0, 0.0, 0.0, 0.0], 10, Some("pdf"), Some("general"))
        .await
        .expect("should search");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn delete_by_id_and_document() {
    let (config, _temp_dir) = create_test_config();
    let mut store = VectorStore::new(&config)
        .await
        .expect("should create vector store");

    store
        .insert_batch(vec![
            test_record("v1", "doc-1", "general", vec![1.0, 0.0, 0.0, 0.0]),
            test_record("v2", "doc-1", "general", vec![0.0, 1.0, 0.0, 0.0]),
            test_record("v3", "doc-2", "general", vec![0.0, 0.0, 1.0, 0.0]),
        ])
        .await
        .expect("should insert records");

    store.delete("v1").await.expect("should delete by id");
    assert_eq!(store.count().await.expect("should count"), 2);

    // Deleting a missing id is tolerated
    store.delete("v1").await.expect("missing id should not error");

    store
        .delete_document("doc-1")
        .await
        .expect("should delete document records");
    assert_eq!(store.count().await.expect("should count"), 1);
}
