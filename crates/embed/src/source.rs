use async_trait::async_trait;
use gamelens_common::{GameLensError, Result};

use crate::tokens::approximate_token_count;

/// External model that turns instructed text into an embedding vector
#[async_trait]
pub trait EmbeddingSource: Send + Sync {
    /// Embed `text` under `instruction` without any length check
    async fn embed(&self, text: &str, instruction: &str) -> Result<Vec<f32>>;

    /// Maximum tokens accepted for instruction plus query
    fn max_query_tokens(&self) -> usize;

    /// Token count as seen by this source
    fn count_tokens(&self, text: &str) -> usize {
        approximate_token_count(text)
    }

    /// Reject queries over the token limit, returning the counted tokens otherwise
    fn check_query_length(&self, text: &str, instruction: &str) -> Result<usize> {
        let tokens = self.count_tokens(instruction) + self.count_tokens(text);
        let limit = self.max_query_tokens();
        if tokens > limit {
            return Err(GameLensError::QueryTooLong { tokens, limit });
        }
        Ok(tokens)
    }

    /// Validate the query length, then embed it
    async fn embed_query(&self, text: &str, instruction: &str) -> Result<Vec<f32>> {
        if text.trim().is_empty() {
            return Err(GameLensError::invalid_input("Query cannot be empty"));
        }
        self.check_query_length(text, instruction)?;
        self.embed(text, instruction).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingSource {
        calls: AtomicUsize,
        limit: usize,
    }

    #[async_trait]
    impl EmbeddingSource for CountingSource {
        async fn embed(&self, _text: &str, _instruction: &str) -> Result<Vec<f32>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![1.0, 0.0])
        }

        fn max_query_tokens(&self) -> usize {
            self.limit
        }
    }

    #[tokio::test]
    async fn test_query_within_limit_is_embedded() {
        let source = CountingSource { calls: AtomicUsize::new(0), limit: 16 };
        let embedding = source.embed_query("cozy farming", "Represent a game:").await.unwrap();
        assert_eq!(embedding, vec![1.0, 0.0]);
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_query_too_long_never_reaches_model() {
        let source = CountingSource { calls: AtomicUsize::new(0), limit: 4 };
        let err = source
            .embed_query("a very long query about many games", "Represent a game:")
            .await
            .unwrap_err();
        assert!(matches!(err, GameLensError::QueryTooLong { limit: 4, .. }));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_query_rejected() {
        let source = CountingSource { calls: AtomicUsize::new(0), limit: 16 };
        let err = source.embed_query("   ", "Represent a game:").await.unwrap_err();
        assert_eq!(err.status_code(), 400);
    }
}
