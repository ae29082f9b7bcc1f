use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server bind address
    pub bind_addr: String,
    /// Origins allowed to call the API from a browser
    pub allowed_origins: Vec<String>,
    /// Upper bound applied to a request's `limit`
    pub max_limit: usize,
    /// Locality handed to the query enhancer
    pub region: String,
    /// Cache configuration
    pub cache: CacheConfig,
    /// LLM provider configuration
    pub llm: LlmConfig,
    /// Vector index configuration
    pub index: IndexConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL. If None, an in-process cache is used.
    pub redis_url: Option<String>,
    /// TTL applied to enhanced queries and summaries
    pub ttl_secs: u64,
    /// Upper bound on a single cache round trip, in milliseconds
    pub op_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" or "ollama"
    pub provider: String,
    /// Base URL for the LLM API
    pub base_url: String,
    /// Model name for enhancement and summaries
    pub chat_model: String,
    /// Model name for embeddings. Must match the model used at ingestion time.
    pub embedding_model: String,
    /// API key (only needed for cloud providers)
    pub api_key: Option<String>,
    /// Embedding vector dimension
    pub embedding_dim: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Configuration for the vector index. When `host` is set the Pinecone data
/// plane is used; otherwise vectors live in a local JSON-backed index under
/// `data_dir`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Pinecone index host, e.g. "council-transcripts-abc123.svc.pinecone.io"
    pub host: Option<String>,
    pub api_key: Option<String>,
    /// Partition queried and written (one per city)
    pub namespace: String,
    /// Where the local index persists its vectors
    pub data_dir: PathBuf,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8000".to_string(),
            allowed_origins: vec!["http://localhost:3000".to_string()],
            max_limit: 50,
            region: "Seattle".to_string(),
            cache: CacheConfig::default(),
            llm: LlmConfig::default(),
            index: IndexConfig::default(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            ttl_secs: 3600,
            op_timeout_ms: 500,
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com".to_string(),
            chat_model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            api_key: None,
            embedding_dim: 384,
            timeout_secs: 30,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            host: None,
            api_key: None,
            namespace: "seattle".to_string(),
            data_dir: PathBuf::from("./data"),
            timeout_secs: 15,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary variable lookup, starting from defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup("COUNCIL_SEARCH_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(origins) = lookup("COUNCIL_SEARCH_ALLOWED_ORIGINS") {
            config.allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }
        if let Some(v) = lookup("COUNCIL_SEARCH_MAX_LIMIT").and_then(|v| v.parse().ok()) {
            config.max_limit = v;
        }
        if let Some(region) = lookup("SEARCH_REGION") {
            config.region = region;
        }

        // Cache
        if let Some(url) = lookup("REDIS_URL") {
            config.cache.redis_url = Some(url);
        }
        if let Some(v) = lookup("CACHE_TTL_SECS").and_then(|v| v.parse().ok()) {
            config.cache.ttl_secs = v;
        }
        if let Some(v) = lookup("CACHE_TIMEOUT_MS").and_then(|v| v.parse().ok()) {
            config.cache.op_timeout_ms = v;
        }

        // LLM
        if let Some(provider) = lookup("LLM_PROVIDER") {
            config.llm.provider = provider;
        }
        if let Some(url) = lookup("LLM_BASE_URL") {
            config.llm.base_url = url;
        }
        if let Some(model) = lookup("LLM_CHAT_MODEL") {
            config.llm.chat_model = model;
        }
        if let Some(model) = lookup("LLM_EMBEDDING_MODEL") {
            config.llm.embedding_model = model;
        }
        // LLM_API_KEY wins over the provider-specific variable
        if let Some(key) = lookup("LLM_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            config.llm.api_key = Some(key);
        }
        if let Some(d) = lookup("LLM_EMBEDDING_DIM").and_then(|v| v.parse().ok()) {
            config.llm.embedding_dim = d;
        }
        if let Some(v) = lookup("LLM_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.llm.timeout_secs = v;
        }

        // Vector index
        if let Some(host) = lookup("PINECONE_INDEX_HOST") {
            config.index.host = Some(host);
        }
        if let Some(key) = lookup("PINECONE_API_KEY") {
            config.index.api_key = Some(key);
        }
        if let Some(ns) = lookup("PINECONE_NAMESPACE") {
            config.index.namespace = ns;
        }
        if let Some(dir) = lookup("COUNCIL_SEARCH_DATA_DIR") {
            config.index.data_dir = PathBuf::from(dir);
        }
        if let Some(v) = lookup("PINECONE_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.index.timeout_secs = v;
        }

        config
    }

    pub fn vector_dir(&self) -> PathBuf {
        self.index.data_dir.join("vectors")
    }
}
