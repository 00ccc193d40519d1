//! Lazily-built retrieval engine
//!
//! `load` constructs the search pipeline exactly once per instance:
//! embedding client, vector store client, and the optional relevance
//! filter. `query` runs the configured search mode and returns documents.

use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info};

use crate::config::{ApiKeys, AppConfig, SearchMode};
use crate::errors::Result;
use crate::models::{EmbeddingClient, ModelLoader};
use crate::retriever::compression::RelevanceFilter;
use crate::retriever::mmr;
use crate::store::VectorStore;
use crate::types::Document;

/// Query-to-documents retriever over the product-review collection
pub struct Retriever {
    config: AppConfig,
    keys: ApiKeys,
    pipeline: OnceCell<Arc<SearchPipeline>>,
}

struct SearchPipeline {
    store: VectorStore,
    embedder: EmbeddingClient,
    filter: Option<RelevanceFilter>,
    top_k: usize,
    fetch_k: usize,
    lambda: f32,
    search_mode: SearchMode,
}

impl Retriever {
    pub fn new(config: &AppConfig, keys: &ApiKeys) -> Self {
        Self {
            config: config.clone(),
            keys: keys.clone(),
            pipeline: OnceCell::new(),
        }
    }

    /// Build the pipeline if it is not built yet. Idempotent.
    pub async fn load(&self) -> Result<()> {
        self.pipeline().await?;
        Ok(())
    }

    /// Retrieve documents for a query using the configured search mode
    pub async fn query(&self, text: &str) -> Result<Vec<Document>> {
        let pipeline = self.pipeline().await?;
        pipeline.query(text).await
    }

    async fn pipeline(&self) -> Result<&Arc<SearchPipeline>> {
        self.pipeline
            .get_or_try_init(|| async { self.build_pipeline().map(Arc::new) })
            .await
    }

    fn build_pipeline(&self) -> Result<SearchPipeline> {
        let loader = ModelLoader::new(&self.config, &self.keys);
        let embedder = loader.load_embedder()?;

        let store = VectorStore::connect(
            &self.config.vector_store.url,
            self.keys.get("QDRANT_API_KEY"),
            &self.config.vector_store.collection,
        )?;

        let filter = if self.config.retriever.compress {
            let chat = loader.load_chat()?;
            Some(RelevanceFilter::new(Arc::new(chat)))
        } else {
            None
        };

        info!(
            collection = %self.config.vector_store.collection,
            mode = ?self.config.retriever.search_mode,
            compress = self.config.retriever.compress,
            "Retriever loaded"
        );

        Ok(SearchPipeline {
            store,
            embedder,
            filter,
            top_k: self.config.retriever.top_k,
            fetch_k: self.config.retriever.fetch_k,
            lambda: self.config.retriever.lambda,
            search_mode: self.config.retriever.search_mode,
        })
    }

    #[cfg(test)]
    async fn pipeline_ptr(&self) -> Result<*const SearchPipeline> {
        Ok(Arc::as_ptr(self.pipeline().await?))
    }
}

impl SearchPipeline {
    async fn query(&self, text: &str) -> Result<Vec<Document>> {
        let query_vector = self.embedder.embed(text).await?;

        let documents = match self.search_mode {
            SearchMode::Similarity => self
                .store
                .search(query_vector, self.top_k, false)
                .await?
                .into_iter()
                .map(|scored| scored.document)
                .collect(),
            SearchMode::Mmr => {
                let candidates = self
                    .store
                    .search(query_vector.clone(), self.fetch_k, true)
                    .await?;
                mmr::mmr_select(&query_vector, &candidates, self.top_k, self.lambda)
            }
        };

        debug!(count = documents.len(), "Vector search complete");

        match &self.filter {
            Some(filter) => Ok(filter.filter(text, documents).await),
            None => Ok(documents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_is_idempotent() {
        let retriever = Retriever::new(&AppConfig::default(), &ApiKeys::default());

        retriever.load().await.unwrap();
        let first = retriever.pipeline_ptr().await.unwrap();

        retriever.load().await.unwrap();
        let second = retriever.pipeline_ptr().await.unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_load_fails_on_missing_provider_key() {
        let mut config = AppConfig::default();
        config.embedding.provider = "openai".to_string();

        let retriever = Retriever::new(&config, &ApiKeys::default());
        let err = retriever.load().await.unwrap_err();
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[tokio::test]
    async fn test_load_fails_on_unknown_provider() {
        let mut config = AppConfig::default();
        config.embedding.provider = "astra".to_string();

        let retriever = Retriever::new(&config, &ApiKeys::default());
        assert!(retriever.load().await.is_err());
    }
}
