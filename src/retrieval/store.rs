// Vector store contract and Qdrant implementation
//
// Fragment payloads are denormalized at ingestion: each point carries its
// chunk text, offsets, and source document metadata, so one query stage
// returns fully joined fragments (no per-fragment follow-up lookups).

use anyhow::{Context, Result};
use async_trait::async_trait;
use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        r#match::MatchValue, with_payload_selector::SelectorOptions, Condition, FieldCondition,
        Filter, Match, ScrollPoints, SearchPoints, Value as QdrantValue, WithPayloadSelector,
    },
};
use std::collections::HashMap;

use crate::types::{Fragment, SourceMetadata};

/// Narrow contract over the externally-owned vector store.
/// `similarity_search` is the primary path; `text_search` is the textual
/// fallback path used in degraded mode.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Top-K nearest fragments by cosine similarity, descending; ties keep
    /// the store's native return order. Fragments arrive with their source
    /// metadata already joined.
    async fn similarity_search(&self, vector: &[f32], top_k: usize) -> Result<Vec<Fragment>>;

    /// Case-insensitive textual match over fragment text. Scores are not
    /// meaningful on this path; the caller assigns the degraded default.
    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<Fragment>>;
}

/// Qdrant-backed vector store
pub struct QdrantStore {
    client: QdrantClient,
    collection: String,
}

impl QdrantStore {
    /// Connect to a Qdrant instance
    ///
    /// # Arguments
    /// * `url` - Qdrant endpoint (e.g. http://localhost:6334)
    /// * `collection` - Collection holding fragment points
    pub fn new(url: &str, collection: impl Into<String>) -> Result<Self> {
        let client = QdrantClient::from_url(url)
            .build()
            .context("Failed to create Qdrant client")?;

        Ok(Self {
            client,
            collection: collection.into(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }
}

#[async_trait]
impl VectorStore for QdrantStore {
    async fn similarity_search(&self, vector: &[f32], top_k: usize) -> Result<Vec<Fragment>> {
        let search_result = self
            .client
            .search_points(&SearchPoints {
                collection_name: self.collection.clone(),
                vector: vector.to_vec(),
                limit: top_k as u64,
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .context("Failed to search points")?;

        let fragments = search_result
            .result
            .into_iter()
            .map(|point| {
                let id = point_id_to_string(&point.id);
                fragment_from_payload(id, point.score, &point.payload)
            })
            .collect();

        Ok(fragments)
    }

    async fn text_search(&self, query: &str, limit: usize) -> Result<Vec<Fragment>> {
        let filter = Filter {
            must: vec![Condition {
                condition_one_of: Some(
                    qdrant_client::qdrant::condition::ConditionOneOf::Field(FieldCondition {
                        key: "text".to_string(),
                        r#match: Some(Match {
                            match_value: Some(MatchValue::Text(query.to_string())),
                        }),
                        ..Default::default()
                    }),
                ),
            }],
            ..Default::default()
        };

        let scroll_result = self
            .client
            .scroll(&ScrollPoints {
                collection_name: self.collection.clone(),
                filter: Some(filter),
                limit: Some(limit as u32),
                with_payload: Some(WithPayloadSelector {
                    selector_options: Some(SelectorOptions::Enable(true)),
                }),
                ..Default::default()
            })
            .await
            .context("Failed to scroll points")?;

        let fragments = scroll_result
            .result
            .into_iter()
            .map(|point| {
                let id = point_id_to_string(&point.id);
                fragment_from_payload(id, 0.0, &point.payload)
            })
            .collect();

        Ok(fragments)
    }
}

// Payload helpers

fn fragment_from_payload(
    id: String,
    score: f32,
    payload: &HashMap<String, QdrantValue>,
) -> Fragment {
    Fragment {
        id,
        source_doc_id: payload_string(payload, "source_doc_id"),
        text: payload_string(payload, "text"),
        start_offset: payload_usize(payload, "start_offset"),
        end_offset: payload_usize(payload, "end_offset"),
        similarity: score,
        metadata: SourceMetadata {
            title: payload_string(payload, "title"),
            path: payload_string(payload, "path"),
            summary: payload_string(payload, "summary"),
        },
    }
}

fn payload_string(payload: &HashMap<String, QdrantValue>, key: &str) -> String {
    payload
        .get(key)
        .and_then(qdrant_value_to_string)
        .unwrap_or_default()
}

fn payload_usize(payload: &HashMap<String, QdrantValue>, key: &str) -> usize {
    payload
        .get(key)
        .and_then(|v| {
            use qdrant_client::qdrant::value::Kind;
            match v.kind.as_ref() {
                Some(Kind::IntegerValue(i)) => Some(*i as usize),
                _ => None,
            }
        })
        .unwrap_or(0)
}

fn qdrant_value_to_string(value: &QdrantValue) -> Option<String> {
    value.kind.as_ref().and_then(|kind| {
        use qdrant_client::qdrant::value::Kind;
        match kind {
            Kind::StringValue(s) => Some(s.clone()),
            _ => None,
        }
    })
}

fn point_id_to_string(point_id: &Option<qdrant_client::qdrant::PointId>) -> String {
    point_id
        .as_ref()
        .map(|id| {
            use qdrant_client::qdrant::point_id::PointIdOptions;
            match &id.point_id_options {
                Some(PointIdOptions::Num(n)) => n.to_string(),
                Some(PointIdOptions::Uuid(u)) => u.clone(),
                None => "unknown".to_string(),
            }
        })
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_with(entries: &[(&str, QdrantValue)]) -> HashMap<String, QdrantValue> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_fragment_from_payload() {
        let payload = payload_with(&[
            ("text", QdrantValue::from("chunk body")),
            ("source_doc_id", QdrantValue::from("doc-7")),
            ("start_offset", QdrantValue::from(120i64)),
            ("end_offset", QdrantValue::from(420i64)),
            ("title", QdrantValue::from("resume.pdf")),
            ("path", QdrantValue::from("uploads/resume.pdf")),
            ("summary", QdrantValue::from("candidate profile")),
        ]);

        let fragment = fragment_from_payload("p1".to_string(), 0.87, &payload);
        assert_eq!(fragment.text, "chunk body");
        assert_eq!(fragment.source_doc_id, "doc-7");
        assert_eq!(fragment.start_offset, 120);
        assert_eq!(fragment.end_offset, 420);
        assert_eq!(fragment.similarity, 0.87);
        assert_eq!(fragment.metadata.title, "resume.pdf");
    }

    #[test]
    fn test_fragment_from_sparse_payload() {
        let payload = payload_with(&[("text", QdrantValue::from("orphan chunk"))]);

        let fragment = fragment_from_payload("p2".to_string(), 0.5, &payload);
        assert_eq!(fragment.text, "orphan chunk");
        assert_eq!(fragment.source_doc_id, "");
        assert_eq!(fragment.start_offset, 0);
        assert_eq!(fragment.metadata, SourceMetadata::default());
    }
}
