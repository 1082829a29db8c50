#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

// Embedding client tests against an in-process API double.
// Run with: cargo test --test integration_embeddings

use knowledge_mcp::KnowledgeError;
use knowledge_mcp::config::{ChunkingConfig, Config, EmbeddingConfig};
use knowledge_mcp::embeddings::EmbeddingClient;
use serde_json::{Value, json};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

const TEST_DIMENSION: usize = 8;

/// Deterministic embedding for a text: a near-one-hot vector whose hot
/// slot depends on the byte sum, so identical texts embed identically and
/// most differing texts land far apart.
fn embedding_for(text: &str, dimension: usize) -> Vec<f32> {
    let index = text.bytes().map(u32::from).sum::<u32>() as usize % dimension;
    let mut vector = vec![0.05_f32; dimension];
    vector[index] = 1.0;
    vector
}

/// Responds to both single (`input` string) and batch (`input` array)
/// embed requests
struct EmbedResponder {
    dimension: usize,
}

impl Respond for EmbedResponder {
    fn respond(&self, request: &Request) -> ResponseTemplate {
        let body: Value = match serde_json::from_slice(&request.body) {
            Ok(body) => body,
            Err(_) => return ResponseTemplate::new(400),
        };

        match &body["input"] {
            Value::String(text) => ResponseTemplate::new(200)
                .set_body_json(json!({"embedding": embedding_for(text, self.dimension)})),
            Value::Array(items) => {
                let embeddings: Vec<Vec<f32>> = items
                    .iter()
                    .filter_map(|item| item.as_str())
                    .map(|text| embedding_for(text, self.dimension))
                    .collect();
                ResponseTemplate::new(200).set_body_json(json!({"embeddings": embeddings}))
            }
            _ => ResponseTemplate::new(400),
        }
    }
}

fn client_config(server: &MockServer, dimension: u32, batch_size: u32) -> Config {
    let address = server.address();
    Config {
        embedding: EmbeddingConfig {
            protocol: "http".to_string(),
            host: address.ip().to_string(),
            port: address.port(),
            model: "test-embed".to_string(),
            batch_size,
            embedding_dimension: dimension,
        },
        chunking: ChunkingConfig::default(),
        base_dir: std::env::temp_dir(),
    }
}

async fn mount_embed_responder(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(EmbedResponder {
            dimension: TEST_DIMENSION,
        })
        .mount(server)
        .await;
}

#[tokio::test(flavor = "multi_thread")]
async fn single_embedding_has_fixed_dimension() {
    let server = MockServer::start().await;
    mount_embed_responder(&server).await;

    let config = client_config(&server, TEST_DIMENSION as u32, 4);
    let client = EmbeddingClient::new(&config).expect("should create client");

    let embedding = client.embed("notice periods").expect("should embed");
    assert_eq!(embedding.len(), TEST_DIMENSION);

    // Deterministic: the same text embeds identically
    let again = client.embed("notice periods").expect("should embed");
    assert_eq!(embedding, again);
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_embeddings_preserve_input_order() {
    let server = MockServer::start().await;
    mount_embed_responder(&server).await;

    let config = client_config(&server, TEST_DIMENSION as u32, 2);
    let client = EmbeddingClient::new(&config).expect("should create client");

    let texts: Vec<String> = ["alpha", "bravo", "charlie", "delta", "echo"]
        .into_iter()
        .map(String::from)
        .collect();

    // batch_size 2 forces three separate requests; order must survive
    let embeddings = client.embed_batch(&texts).expect("should embed batch");
    assert_eq!(embeddings.len(), texts.len());

    for (text, embedding) in texts.iter().zip(&embeddings) {
        assert_eq!(embedding, &embedding_for(text, TEST_DIMENSION));
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn dimension_mismatch_is_rejected() {
    let server = MockServer::start().await;
    mount_embed_responder(&server).await;

    // Client expects 16 dimensions but the service returns 8
    let config = client_config(&server, 16, 4);
    let client = EmbeddingClient::new(&config).expect("should create client");

    let result = client.embed("some text");
    assert!(matches!(result, Err(KnowledgeError::Embedding(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn server_error_surfaces_immediately_without_retry() {
    let server = MockServer::start().await;

    // Exactly one request must arrive: failures are not retried
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    let config = client_config(&server, TEST_DIMENSION as u32, 4);
    let client = EmbeddingClient::new(&config).expect("should create client");

    let result = client.embed("some text");
    assert!(matches!(result, Err(KnowledgeError::Embedding(_))));

    server.verify().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn batch_count_mismatch_is_rejected() {
    let server = MockServer::start().await;

    // Service replies with fewer embeddings than inputs
    Mock::given(method("POST"))
        .and(path("/api/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "embeddings": [embedding_for("only one", TEST_DIMENSION)]
        })))
        .mount(&server)
        .await;

    let config = client_config(&server, TEST_DIMENSION as u32, 4);
    let client = EmbeddingClient::new(&config).expect("should create client");

    let texts: Vec<String> = ["a", "b", "c"].into_iter().map(String::from).collect();
    let result = client.embed_batch(&texts);
    assert!(matches!(result, Err(KnowledgeError::Embedding(_))));
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_service_is_an_embedding_error() {
    let server = MockServer::start().await;
    let config = client_config(&server, TEST_DIMENSION as u32, 4);
    // Shut the double down so the port refuses connections
    drop(server);

    let client = EmbeddingClient::new(&config).expect("should create client");
    let result = client.embed("some text");
    assert!(matches!(result, Err(KnowledgeError::Embedding(_))));
}
