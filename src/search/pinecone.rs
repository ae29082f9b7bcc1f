//! Pinecone data-plane client (`/query` and `/vectors/upsert`).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{ensure_success, ProviderError};
use crate::models::DateRange;
use crate::search::vector::{VectorIndex, VectorMatch, VectorQuery, VectorRecord, SESSION_EPOCH_KEY};

const API_VERSION: &str = "2024-07";

pub struct PineconeIndex {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl PineconeIndex {
    /// `host` may be given with or without a scheme; https is assumed.
    pub fn new(client: reqwest::Client, host: &str, api_key: &str) -> Self {
        let host = host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("https://{host}")
        };
        Self {
            client,
            base_url,
            api_key: api_key.to_string(),
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        self.client
            .post(format!("{}{path}", self.base_url))
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    namespace: &'a str,
    include_metadata: bool,
    include_values: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<VectorMatch>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    namespace: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    upserted_count: usize,
}

/// Metadata filter selecting records whose session time falls in `range`.
fn date_filter(range: &DateRange) -> Option<serde_json::Value> {
    let mut bounds = serde_json::Map::new();
    if let Some(start) = range.start {
        bounds.insert("$gte".to_string(), json!(start));
    }
    if let Some(end) = range.end {
        bounds.insert("$lte".to_string(), json!(end));
    }
    if bounds.is_empty() {
        return None;
    }
    let mut filter = serde_json::Map::new();
    filter.insert(SESSION_EPOCH_KEY.to_string(), serde_json::Value::Object(bounds));
    Some(serde_json::Value::Object(filter))
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<VectorMatch>, ProviderError> {
        let req = QueryRequest {
            vector: query.vector,
            top_k: query.top_k,
            namespace: query.namespace,
            include_metadata: true,
            include_values: false,
            filter: query.date_range.as_ref().and_then(date_filter),
        };

        let resp = self.post("/query").json(&req).send().await?;
        let body: QueryResponse = ensure_success(resp).await?.json().await?;
        Ok(body.matches)
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize, ProviderError> {
        if records.is_empty() {
            return Ok(0);
        }
        let req = UpsertRequest {
            vectors: records,
            namespace,
        };

        let resp = self.post("/vectors/upsert").json(&req).send().await?;
        let body: UpsertResponse = ensure_success(resp).await?.json().await?;
        Ok(body.upserted_count)
    }
}
