// Vector retriever: embeds the query, fetches top-K nearest fragments, and
// falls back to a keyword match when the primary path is unavailable.
// The fallback never propagates the underlying failure; worst case is an
// empty degraded set.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{RetrievalConfig, TimeoutConfig};
use crate::errors::Result;
use crate::providers::EmbeddingProvider;
use crate::retrieval::store::VectorStore;
use crate::types::Fragment;

/// Retrieval outcome. `degraded` marks results produced by the keyword
/// fallback so the validator can discount grounding confidence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedSet {
    /// Fragments in descending similarity order
    pub fragments: Vec<Fragment>,
    pub degraded: bool,
}

impl RetrievedSet {
    /// Mean similarity of the retrieved fragments; 0.0 when empty
    pub fn mean_similarity(&self) -> f64 {
        if self.fragments.is_empty() {
            return 0.0;
        }
        let sum: f64 = self.fragments.iter().map(|f| f.similarity as f64).sum();
        sum / self.fragments.len() as f64
    }
}

/// Semantic retriever over an embedding provider and a vector store
pub struct VectorRetriever {
    embedder: Arc<dyn EmbeddingProvider>,
    store: Arc<dyn VectorStore>,
    config: RetrievalConfig,
    timeouts: TimeoutConfig,
}

impl VectorRetriever {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        config: RetrievalConfig,
        timeouts: TimeoutConfig,
    ) -> Self {
        Self {
            embedder,
            store,
            config,
            timeouts,
        }
    }

    /// Retrieve the top-K fragments for a query. Embedding or search
    /// failures (including timeouts) switch to the keyword fallback instead
    /// of surfacing an error.
    pub async fn retrieve(&self, query: &str, top_k: usize) -> RetrievedSet {
        match self.retrieve_semantic(query, top_k).await {
            Ok(fragments) => RetrievedSet {
                fragments,
                degraded: false,
            },
            Err(_) => RetrievedSet {
                fragments: self.retrieve_fallback(query, top_k).await,
                degraded: true,
            },
        }
    }

    /// Retrieve with the configured default top-K
    pub async fn retrieve_default(&self, query: &str) -> RetrievedSet {
        self.retrieve(query, self.config.top_k).await
    }

    async fn retrieve_semantic(&self, query: &str, top_k: usize) -> Result<Vec<Fragment>> {
        let vector = tokio::time::timeout(
            Duration::from_millis(self.timeouts.embedding_ms),
            self.embedder.embed(query),
        )
        .await
        .map_err(|_| crate::errors::RagError::Timeout {
            duration_ms: self.timeouts.embedding_ms,
        })??;

        let fragments = tokio::time::timeout(
            Duration::from_millis(self.timeouts.retrieval_ms),
            self.store.similarity_search(&vector, top_k),
        )
        .await
        .map_err(|_| crate::errors::RagError::Timeout {
            duration_ms: self.timeouts.retrieval_ms,
        })??;

        Ok(fragments)
    }

    /// Keyword fallback: rank candidates from the store's textual path by
    /// case-insensitive query-keyword match count. Fragments are assigned
    /// the degraded default score. Returns an empty set if the textual path
    /// fails too.
    async fn retrieve_fallback(&self, query: &str, top_k: usize) -> Vec<Fragment> {
        let candidates = match tokio::time::timeout(
            Duration::from_millis(self.timeouts.retrieval_ms),
            self.store.text_search(query, self.config.fallback_scan_limit),
        )
        .await
        {
            Ok(Ok(fragments)) => fragments,
            _ => return Vec::new(),
        };

        let keywords: Vec<String> = query
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();

        let mut ranked: Vec<(usize, Fragment)> = candidates
            .into_iter()
            .filter_map(|mut fragment| {
                let haystack = fragment.text.to_lowercase();
                let matches: usize = keywords
                    .iter()
                    .map(|kw| haystack.matches(kw.as_str()).count())
                    .sum();
                if matches == 0 {
                    return None;
                }
                fragment.similarity = self.config.degraded_score;
                Some((matches, fragment))
            })
            .collect();

        // Stable sort keeps the store's return order for equal match counts
        ranked.sort_by(|a, b| b.0.cmp(&a.0));
        ranked.truncate(top_k);

        ranked.into_iter().map(|(_, fragment)| fragment).collect()
    }
}
