use std::sync::Arc;

use crate::error::ProviderError;
use crate::llm::embeddings::Embedder;
use crate::models::DateRange;
use crate::search::vector::{VectorIndex, VectorMatch, VectorQuery};

/// Embeds query text and runs it against one namespace of the vector index.
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, namespace: impl Into<String>) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
        }
    }

    /// Matches in the order the index returns them; no client-side re-ranking.
    pub async fn retrieve(
        &self,
        text: &str,
        limit: usize,
        date_range: Option<DateRange>,
    ) -> Result<Vec<VectorMatch>, ProviderError> {
        let vector = self.embedder.embed_one(text).await?;
        self.index
            .query(VectorQuery {
                vector: &vector,
                top_k: limit,
                namespace: &self.namespace,
                date_range,
            })
            .await
    }
}
