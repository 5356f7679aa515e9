use async_trait::async_trait;
use gamelens_common::{GameLensError, Result};
use reqwest::Client;
use tracing::{debug, info};

use crate::source::EmbeddingSource;
use crate::types::{instructed_prompt, EmbedRequest, EmbedResponse};

/// Ollama embeddings client
#[derive(Debug, Clone)]
pub struct OllamaEmbedder {
    base_url: String,
    model: String,
    max_query_tokens: usize,
    max_retries: u32,
    client: Client,
}

impl OllamaEmbedder {
    /// Create new Ollama embeddings client
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        max_query_tokens: usize,
    ) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let model = model.into();
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to create HTTP client: {}", e))?;

        info!("Ollama embedder initialized: {} (model={})", base_url, model);
        Ok(Self {
            base_url,
            model,
            max_query_tokens,
            max_retries: 3,
            client,
        })
    }

    /// Override the transport retry count (minimum 1 attempt)
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Embedding model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Test connection to Ollama
    pub async fn test_connection(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.base_url);

        let response = self.client.get(&url).send().await
            .map_err(|e| GameLensError::embedding(format!("Failed to connect to Ollama: {}", e)))?;
        Ok(response.status().is_success())
    }

    async fn embed_with_retry(&self, request: &EmbedRequest) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.base_url);
        let mut last_error = None;

        for attempt in 1..=self.max_retries {
            match self.try_embed(&url, request).await {
                Ok(embedding) => {
                    debug!("Received embedding - Dimension: {}", embedding.len());
                    return Ok(embedding);
                }
                Err(e) => {
                    if attempt < self.max_retries {
                        let delay = std::time::Duration::from_secs(2u64.pow(attempt - 1));
                        tracing::warn!(
                            "Embedding request failed (attempt {}/{}): {}. Retrying in {:?}...",
                            attempt,
                            self.max_retries,
                            e,
                            delay
                        );
                        tokio::time::sleep(delay).await;
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| GameLensError::embedding("All retries failed")))
    }

    /// Single attempt to generate embedding
    async fn try_embed(&self, url: &str, request: &EmbedRequest) -> Result<Vec<f32>> {
        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| GameLensError::embedding(format!("Failed to send embedding request: {}", e)))?
            .error_for_status()
            .map_err(|e| GameLensError::embedding(format!("Ollama embedding API error: {}", e)))?;

        let result: EmbedResponse = response.json().await
            .map_err(|e| GameLensError::embedding(format!("Failed to parse embedding response: {}", e)))?;

        if result.embedding.is_empty() {
            return Err(GameLensError::embedding("Empty embedding from Ollama"));
        }

        Ok(result.embedding)
    }
}

#[async_trait]
impl EmbeddingSource for OllamaEmbedder {
    async fn embed(&self, text: &str, instruction: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: self.model.clone(),
            prompt: instructed_prompt(instruction, text),
        };

        debug!(
            "Generating query embedding - Model: {}, Prompt length: {}",
            request.model,
            request.prompt.len()
        );

        self.embed_with_retry(&request).await
    }

    fn max_query_tokens(&self) -> usize {
        self.max_query_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let embedder = OllamaEmbedder::new("http://localhost:11434/", "nomic-embed-text", 512).unwrap();
        assert_eq!(embedder.base_url, "http://localhost:11434");
        assert_eq!(embedder.model(), "nomic-embed-text");
        assert_eq!(embedder.max_query_tokens(), 512);
    }

    #[test]
    fn test_retry_count_has_floor() {
        let embedder = OllamaEmbedder::new("http://localhost:11434", "m", 8)
            .unwrap()
            .with_max_retries(0);
        assert_eq!(embedder.max_retries, 1);
    }

    #[tokio::test]
    async fn test_too_long_query_fails_without_network() {
        // Port 9 is discard; the limit check must fail before any request is sent
        let embedder = OllamaEmbedder::new("http://127.0.0.1:9", "m", 2).unwrap();
        let err = embedder
            .embed_query("an open world game with crafting", "Represent a game:")
            .await
            .unwrap_err();
        assert!(matches!(err, GameLensError::QueryTooLong { .. }));
    }
}
