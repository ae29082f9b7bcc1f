use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::SharedCache;
use crate::config::Config;
use crate::error::SearchError;
use crate::llm::chat::{ChatModel, HttpChatModel};
use crate::llm::embeddings::{Embedder, HttpEmbedder};
use crate::llm::query_expand::QueryEnhancer;
use crate::llm::summarize::Summarizer;
use crate::models::{SearchQuery, SearchResponse};
use crate::search::format::format_matches;
use crate::search::retriever::Retriever;
use crate::search::vector::VectorIndex;

/// The search pipeline: enhance → retrieve → format → summarize.
///
/// Built once at startup with every external client injected, then shared
/// across requests.
pub struct SearchService {
    enhancer: QueryEnhancer,
    retriever: Retriever,
    summarizer: Summarizer,
    region: String,
    max_limit: usize,
}

impl SearchService {
    pub fn new(
        chat: Arc<dyn ChatModel>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        cache: SharedCache,
        config: &Config,
    ) -> Self {
        Self {
            enhancer: QueryEnhancer::new(chat.clone(), cache.clone()),
            retriever: Retriever::new(embedder, index, config.index.namespace.clone()),
            summarizer: Summarizer::new(chat, cache),
            region: config.region.clone(),
            max_limit: config.max_limit,
        }
    }

    /// Wire up the HTTP-backed providers described by `config`.
    pub async fn from_config(config: &Config) -> anyhow::Result<Self> {
        let llm_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()?;
        let index_client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.index.timeout_secs))
            .build()?;

        let chat: Arc<dyn ChatModel> = Arc::new(HttpChatModel::new(llm_client.clone(), config.llm.clone()));
        let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(llm_client, config.llm.clone()));
        let index = crate::search::connect_index(config, index_client)?;
        let cache = SharedCache::from_config(&config.cache).await;

        Ok(Self::new(chat, embedder, index, cache, config))
    }

    pub async fn search(&self, query: &SearchQuery) -> Result<SearchResponse, SearchError> {
        self.search_on(query, Utc::now().date_naive()).await
    }

    /// Run the pipeline with an explicit "today" for the summary context.
    pub async fn search_on(&self, query: &SearchQuery, today: NaiveDate) -> Result<SearchResponse, SearchError> {
        let started = Instant::now();

        // Cache keys use the trimmed text, so queries differing only in
        // surrounding whitespace share entries
        let text = query.query.trim();
        if text.is_empty() {
            return Err(SearchError::InvalidQuery("query is required".to_string()));
        }
        if query.limit == 0 {
            return Err(SearchError::InvalidQuery("limit must be positive".to_string()));
        }
        let limit = query.limit.min(self.max_limit);

        // ── Step 1: Query enhancement ────────────────────────────
        let date_range = query.date_range();
        let enhanced = self.enhancer.enhance(text, &self.region).await;
        tracing::debug!("Enhanced query ({}): {}", enhanced.source(), enhanced.text());

        // ── Step 2: Vector search ────────────────────────────────
        let matches = self
            .retriever
            .retrieve(enhanced.text(), limit, date_range)
            .await?;

        // ── Step 3: Format results ───────────────────────────────
        let results = format_matches(&matches);

        // ── Step 4: Summarize ────────────────────────────────────
        let summary = self.summarizer.summarize(text, date_range, &results, today).await;

        let processing_time = started.elapsed().as_secs_f64();
        tracing::info!(
            "Search \"{text}\": {} results in {processing_time:.3}s (enhancement: {}, summary: {})",
            results.len(),
            enhanced.source(),
            summary.source()
        );

        Ok(SearchResponse {
            total_results: results.len(),
            results,
            processing_time,
            summary: summary.into_text(),
        })
    }
}
