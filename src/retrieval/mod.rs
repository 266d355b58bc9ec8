// Retrieval layer: query embedding, similarity search, and the degraded
// keyword fallback.
//
// Components:
// - Vector Store: narrow contract over the similarity + textual query paths
// - Vector Retriever: embed -> top-K search -> fallback orchestration

pub mod retriever;
pub mod store;

// Re-export key types
pub use retriever::{RetrievedSet, VectorRetriever};
pub use store::{QdrantStore, VectorStore};
