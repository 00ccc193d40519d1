//! Shared document types
//!
//! Documents are produced by the ingestion pipeline (external to this
//! crate), stored in the vector collection, and consumed by retrieval,
//! the MCP tool boundary, and answer formatting.

use serde::{Deserialize, Serialize};

/// A retrieved product-review document with its catalog metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Review text body
    pub page_content: String,
    /// Catalog fields attached at ingestion time
    #[serde(default)]
    pub metadata: ProductMetadata,
}

/// Catalog metadata stored alongside each review chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductMetadata {
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub product_title: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub total_reviews: Option<u64>,
    #[serde(default)]
    pub price: String,
}

impl Document {
    pub fn new(page_content: impl Into<String>, metadata: ProductMetadata) -> Self {
        Self {
            page_content: page_content.into(),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_document_deserializes_with_partial_metadata() {
        let raw = r#"{"page_content": "Great phone", "metadata": {"product_title": "iPhone 15 Plus"}}"#;
        let doc: Document = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.page_content, "Great phone");
        assert_eq!(doc.metadata.product_title, "iPhone 15 Plus");
        assert_eq!(doc.metadata.rating, None);
        assert!(doc.metadata.price.is_empty());
    }

    #[test]
    fn test_document_deserializes_without_metadata() {
        let raw = r#"{"page_content": "ok"}"#;
        let doc: Document = serde_json::from_str(raw).unwrap();
        assert_eq!(doc.metadata, ProductMetadata::default());
    }
}
