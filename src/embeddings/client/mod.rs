
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::Config;
use crate::{KnowledgeError, Result};

pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 1024;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Client for the hosted embedding API.
///
/// Calls are blocking and are not retried: any transport or HTTP failure
/// surfaces immediately to the caller.
#[derive(Debug, Clone)]
pub struct EmbeddingClient {
    base_url: Url,
    model: String,
    dimension: u32,
    batch_size: u32,
    agent: ureq::Agent,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
    dimensions: u32,
    normalize: bool,
}

#[derive(Debug, Serialize)]
struct BatchEmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
    dimensions: u32,
    normalize: bool,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl EmbeddingClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .embedding
            .endpoint_url()
            .map_err(|e| KnowledgeError::Config(e.to_string()))?;

        let agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
            .build()
            .into();

        Ok(Self {
            base_url,
            model: config.embedding.model.clone(),
            dimension: config.embedding.embedding_dimension,
            batch_size: config.embedding.batch_size,
            agent,
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .build()
            .into();
        self
    }

    /// Configured vector dimensionality; every returned embedding has
    /// exactly this length.
    #[inline]
    pub fn dimension(&self) -> u32 {
        self.dimension
    }

    /// Check that the embedding service is reachable
    #[inline]
    pub fn ping(&self) -> Result<()> {
        let url = self
            .base_url
            .join("/api/health")
            .map_err(|e| KnowledgeError::Embedding(format!("Failed to build ping URL: {e}")))?;

        debug!("Pinging embedding service at {}", url);

        self.agent
            .get(url.as_str())
            .call()
            .map_err(|e| KnowledgeError::Embedding(format!("Embedding service ping failed: {e}")))?;

        Ok(())
    }

    /// Generate an embedding for a single text input
    #[inline]
    pub fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Generating embedding for text (length: {})", text.len());

        let request = EmbedRequest {
            model: &self.model,
            input: text,
            dimensions: self.dimension,
            normalize: true,
        };

        let response_text = self.post_json(&request)?;

        let embed_response: EmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| KnowledgeError::Embedding(format!("Invalid embedding response: {e}")))?;

        self.check_dimension(&embed_response.embedding)?;
        Ok(embed_response.embedding)
    }

    /// Generate embeddings for multiple texts, preserving input order.
    ///
    /// Inputs are sent in batches of the configured batch size; the
    /// concatenated results line up one-to-one with `texts`.
    #[inline]
    pub fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let mut results = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size as usize) {
            results.extend(self.embed_single_batch(batch)?);
        }

        Ok(results)
    }

    fn embed_single_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if let [text] = texts {
            return Ok(vec![self.embed(text)?]);
        }

        let request = BatchEmbedRequest {
            model: &self.model,
            input: texts,
            dimensions: self.dimension,
            normalize: true,
        };

        let response_text = self.post_json(&request)?;

        let batch_response: BatchEmbedResponse = serde_json::from_str(&response_text)
            .map_err(|e| {
                KnowledgeError::Embedding(format!("Invalid batch embedding response: {e}"))
            })?;

        if batch_response.embeddings.len() != texts.len() {
            return Err(KnowledgeError::Embedding(format!(
                "Mismatch between request and response counts: {} vs {}",
                texts.len(),
                batch_response.embeddings.len()
            )));
        }

        for embedding in &batch_response.embeddings {
            self.check_dimension(embedding)?;
        }

        Ok(batch_response.embeddings)
    }

    fn post_json<T: Serialize>(&self, request: &T) -> Result<String> {
        let url = self
            .base_url
            .join("/api/embed")
            .map_err(|e| KnowledgeError::Embedding(format!("Failed to build embed URL: {e}")))?;

        let request_json = serde_json::to_string(request)
            .map_err(|e| KnowledgeError::Embedding(format!("Failed to serialize request: {e}")))?;

        self.agent
            .post(url.as_str())
            .header("Content-Type", "application/json")
            .send(&request_json)
            .and_then(|mut resp| resp.body_mut().read_to_string())
            .map_err(|e| KnowledgeError::Embedding(format!("Embedding request failed: {e}")))
    }

    fn check_dimension(&self, embedding: &[f32]) -> Result<()> {
        if embedding.len() != self.dimension as usize {
            return Err(KnowledgeError::Embedding(format!(
                "Expected {}-dimension embedding, got {}",
                self.dimension,
                embedding.len()
            )));
        }
        Ok(())
    }
}
