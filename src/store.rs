//! Qdrant vector store client
//!
//! Narrow search interface over one collection: existence check plus scored
//! point search with payloads and, when MMR needs them, stored vectors.
//! Payloads hold `page_content` and a `metadata` struct written by the
//! ingestion pipeline.

use qdrant_client::{
    client::QdrantClient,
    qdrant::{
        value::Kind, vectors::VectorsOptions, with_payload_selector,
        with_vectors_selector, ScoredPoint, SearchPoints, Value as QdrantValue,
        WithPayloadSelector, WithVectorsSelector,
    },
};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use tracing::debug;

use crate::errors::{AssistantError, Result};
use crate::types::Document;

/// A document returned from vector search with its score
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    pub score: f32,
    /// Stored embedding, present only when requested
    pub vector: Option<Vec<f32>>,
}

/// Client for one product-review collection
pub struct VectorStore {
    client: QdrantClient,
    collection: String,
}

impl VectorStore {
    /// Create a client. No network traffic happens until the first call.
    pub fn connect(url: &str, api_key: Option<&str>, collection: &str) -> Result<Self> {
        let mut builder = QdrantClient::from_url(url);
        if let Some(key) = api_key {
            builder = builder.with_api_key(key.to_string());
        }

        let client = builder
            .build()
            .map_err(|e| AssistantError::VectorStore(format!("Failed to create client: {}", e)))?;

        Ok(Self {
            client,
            collection: collection.to_string(),
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub async fn collection_exists(&self) -> Result<bool> {
        let collections = self
            .client
            .list_collections()
            .await
            .map_err(|e| AssistantError::VectorStore(format!("Failed to list collections: {}", e)))?;

        Ok(collections
            .collections
            .iter()
            .any(|c| c.name == self.collection))
    }

    /// Scored nearest-neighbor search over the collection
    pub async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
        with_vectors: bool,
    ) -> Result<Vec<ScoredDocument>> {
        let request = SearchPoints {
            collection_name: self.collection.clone(),
            vector,
            limit: limit as u64,
            with_payload: Some(WithPayloadSelector {
                selector_options: Some(with_payload_selector::SelectorOptions::Enable(true)),
            }),
            with_vectors: with_vectors.then(|| WithVectorsSelector {
                selector_options: Some(with_vectors_selector::SelectorOptions::Enable(true)),
            }),
            ..Default::default()
        };

        let response = self
            .client
            .search_points(&request)
            .await
            .map_err(|e| AssistantError::VectorStore(format!("Search failed: {}", e)))?;

        let mut results = Vec::with_capacity(response.result.len());
        for point in response.result {
            let score = point.score;
            let vector = point_vector(&point);
            match payload_to_document(point.payload) {
                Some(document) => results.push(ScoredDocument {
                    document,
                    score,
                    vector,
                }),
                None => debug!("Skipping point without a document payload"),
            }
        }

        Ok(results)
    }
}

fn point_vector(point: &ScoredPoint) -> Option<Vec<f32>> {
    point
        .vectors
        .as_ref()
        .and_then(|v| v.vectors_options.as_ref())
        .and_then(|options| match options {
            VectorsOptions::Vector(v) => Some(v.data.clone()),
            _ => None,
        })
}

fn payload_to_document(payload: HashMap<String, QdrantValue>) -> Option<Document> {
    let mut map = serde_json::Map::new();
    for (key, value) in payload {
        if let Some(json) = qdrant_to_json_value(&value) {
            map.insert(key, json);
        }
    }
    serde_json::from_value(JsonValue::Object(map)).ok()
}

fn qdrant_to_json_value(value: &QdrantValue) -> Option<JsonValue> {
    value.kind.as_ref().and_then(|kind| match kind {
        Kind::StringValue(s) => Some(JsonValue::String(s.clone())),
        Kind::IntegerValue(i) => Some(JsonValue::Number((*i).into())),
        Kind::DoubleValue(f) => serde_json::Number::from_f64(*f).map(JsonValue::Number),
        Kind::BoolValue(b) => Some(JsonValue::Bool(*b)),
        Kind::StructValue(s) => {
            let mut map = serde_json::Map::new();
            for (key, value) in &s.fields {
                if let Some(json) = qdrant_to_json_value(value) {
                    map.insert(key.clone(), json);
                }
            }
            Some(JsonValue::Object(map))
        }
        Kind::ListValue(list) => Some(JsonValue::Array(
            list.values.iter().filter_map(qdrant_to_json_value).collect(),
        )),
        Kind::NullValue(_) => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use qdrant_client::qdrant::Struct;

    fn string_value(s: &str) -> QdrantValue {
        QdrantValue {
            kind: Some(Kind::StringValue(s.to_string())),
        }
    }

    fn double_value(f: f64) -> QdrantValue {
        QdrantValue {
            kind: Some(Kind::DoubleValue(f)),
        }
    }

    #[test]
    fn test_store_creation_is_offline() {
        let store = VectorStore::connect("http://localhost:6334", None, "product_reviews");
        assert!(store.is_ok());
        assert_eq!(store.unwrap().collection(), "product_reviews");
    }

    #[test]
    fn test_payload_maps_to_document() {
        let mut metadata_fields = HashMap::new();
        metadata_fields.insert("product_title".to_string(), string_value("iPhone 15 Plus"));
        metadata_fields.insert("price".to_string(), string_value("$899"));
        metadata_fields.insert("rating".to_string(), double_value(4.5));

        let mut payload = HashMap::new();
        payload.insert("page_content".to_string(), string_value("Great battery life"));
        payload.insert(
            "metadata".to_string(),
            QdrantValue {
                kind: Some(Kind::StructValue(Struct {
                    fields: metadata_fields,
                })),
            },
        );

        let doc = payload_to_document(payload).unwrap();
        assert_eq!(doc.page_content, "Great battery life");
        assert_eq!(doc.metadata.product_title, "iPhone 15 Plus");
        assert_eq!(doc.metadata.price, "$899");
        assert_eq!(doc.metadata.rating, Some(4.5));
    }

    #[test]
    fn test_payload_without_content_is_skipped() {
        let mut payload = HashMap::new();
        payload.insert("metadata".to_string(), string_value("not a doc"));
        assert!(payload_to_document(payload).is_none());
    }

    #[test]
    fn test_vector_extraction() {
        let point = ScoredPoint {
            vectors: Some(qdrant_client::qdrant::Vectors {
                vectors_options: Some(VectorsOptions::Vector(qdrant_client::qdrant::Vector {
                    data: vec![0.1, 0.2],
                    ..Default::default()
                })),
            }),
            ..Default::default()
        };
        assert_eq!(point_vector(&point), Some(vec![0.1, 0.2]));

        let empty = ScoredPoint::default();
        assert_eq!(point_vector(&empty), None);
    }
}
