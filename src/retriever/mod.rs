//! Retrieval layer
//!
//! Wraps vector search behind one query-to-documents operation:
//! - Similarity or maximal-marginal-relevance selection
//! - Optional LLM relevance filtering of the result set

pub mod compression;
pub mod engine;
pub mod mmr;

pub use compression::RelevanceFilter;
pub use engine::Retriever;
