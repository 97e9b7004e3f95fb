//! Semantic cache: embeds a query through a pluggable provider and serves
//! a cached value when the nearest stored vector in the same bucket
//! clears the similarity threshold.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::vector::VectorStore;

const DEFAULT_THRESHOLD: f32 = 0.9;

/// Turns text into an embedding vector. Implement this against a real
/// embedding model; the gateway's core is agnostic to which one.
pub trait EmbeddingProvider: Send + Sync + 'static {
    fn embed<'a>(&'a self, text: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbeddingError>> + Send + 'a>>;
}

#[derive(Debug)]
pub struct EmbeddingError(pub String);

impl std::fmt::Display for EmbeddingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "embedding provider error: {}", self.0)
    }
}

impl std::error::Error for EmbeddingError {}

pub struct SemanticHit {
    pub value: Value,
    pub embedding: Vec<f32>,
}

pub struct SemanticCache {
    store: Arc<VectorStore>,
    provider: Arc<dyn EmbeddingProvider>,
    threshold: f32,
}

impl SemanticCache {
    /// `threshold` is clamped to a default of 0.9 when non-positive.
    pub fn new(provider: Arc<dyn EmbeddingProvider>, threshold: f32) -> Self {
        let threshold = if threshold <= 0.0 { DEFAULT_THRESHOLD } else { threshold };
        Self { store: Arc::new(VectorStore::new()), provider, threshold }
    }

    pub async fn get(&self, key: &str, text: &str) -> Result<Option<SemanticHit>, EmbeddingError> {
        let embedding = self.provider.embed(text).await?;
        let hit = self.store.search_top1(key, &embedding);
        Ok(hit
            .filter(|hit| hit.similarity >= self.threshold)
            .map(|hit| SemanticHit { value: hit.value, embedding }))
    }

    pub fn set(&self, key: &str, embedding: Vec<f32>, value: Value, ttl: Duration) {
        self.store.set(key, embedding, value, ttl);
    }

    pub fn prune(&self, key: &str) {
        self.store.prune(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoProvider;

    impl EmbeddingProvider for EchoProvider {
        fn embed<'a>(&'a self, text: &'a str) -> Pin<Box<dyn Future<Output = Result<Vec<f32>, EmbeddingError>> + Send + 'a>> {
            Box::pin(async move {
                if text == "fail" {
                    return Err(EmbeddingError("provider unavailable".into()));
                }
                Ok(if text.contains("weather") { vec![1.0, 0.0] } else { vec![0.0, 1.0] })
            })
        }
    }

    #[tokio::test]
    async fn a_similar_query_hits_the_cache() {
        let cache = SemanticCache::new(Arc::new(EchoProvider), 0.9);
        cache.set("tools.weather", vec![1.0, 0.0], Value::String("sunny".into()), Duration::from_secs(60));

        let hit = cache.get("tools.weather", "what's today's weather").await.unwrap().unwrap();
        assert_eq!(hit.value, Value::String("sunny".into()));
    }

    #[tokio::test]
    async fn a_dissimilar_query_misses() {
        let cache = SemanticCache::new(Arc::new(EchoProvider), 0.9);
        cache.set("tools.weather", vec![1.0, 0.0], Value::String("sunny".into()), Duration::from_secs(60));

        let hit = cache.get("tools.weather", "unrelated topic").await.unwrap();
        assert!(hit.is_none());
    }

    #[tokio::test]
    async fn non_positive_threshold_falls_back_to_the_default() {
        let cache = SemanticCache::new(Arc::new(EchoProvider), 0.0);
        assert_eq!(cache.threshold, DEFAULT_THRESHOLD);
    }

    #[tokio::test]
    async fn embedding_failure_propagates_as_an_error() {
        let cache = SemanticCache::new(Arc::new(EchoProvider), 0.9);
        let result = cache.get("tools.weather", "fail").await;
        assert!(result.is_err());
    }
}
