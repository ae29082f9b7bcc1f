pub mod format;
pub mod pinecone;
pub mod retriever;
pub mod vector;

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::Config;
use pinecone::PineconeIndex;
use vector::{LocalIndex, VectorIndex};

/// Open the configured vector index: Pinecone when a host is set, otherwise
/// the local JSON-backed index under the data directory.
pub fn connect_index(config: &Config, client: reqwest::Client) -> Result<Arc<dyn VectorIndex>> {
    match &config.index.host {
        Some(host) => {
            let api_key = config
                .index
                .api_key
                .as_deref()
                .context("PINECONE_API_KEY is required when PINECONE_INDEX_HOST is set")?;
            tracing::info!("Vector index: pinecone ({host}), namespace {}", config.index.namespace);
            Ok(Arc::new(PineconeIndex::new(client, host, api_key)))
        }
        None => {
            let dir = config.vector_dir();
            tracing::info!(
                "Vector index: local ({}), namespace {}",
                dir.display(),
                config.index.namespace
            );
            Ok(Arc::new(LocalIndex::open_or_create(&dir)?))
        }
    }
}
