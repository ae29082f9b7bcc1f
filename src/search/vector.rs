use anyhow::{Context, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::error::ProviderError;
use crate::models::DateRange;

/// Metadata stored alongside each vector.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// Metadata field holding the session time as unix seconds, used for date filtering.
pub const SESSION_EPOCH_KEY: &str = "session_epoch";

/// A vector and its metadata, as written by ingestion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Metadata,
}

/// A nearest-neighbour hit.
#[derive(Debug, Clone, Deserialize)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Metadata,
}

#[derive(Debug, Clone, Copy)]
pub struct VectorQuery<'a> {
    pub vector: &'a [f32],
    pub top_k: usize,
    pub namespace: &'a str,
    pub date_range: Option<DateRange>,
}

/// Namespaced nearest-neighbour index.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Top-K matches by descending similarity, metadata included.
    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<VectorMatch>, ProviderError>;

    /// Insert or replace records by id. Returns the number written.
    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize, ProviderError>;
}

// ─── Local index ─────────────────────────────────────────

type Namespaces = HashMap<String, BTreeMap<String, VectorRecord>>;

/// In-memory cosine-similarity index with optional JSON persistence.
/// Stands in for the managed index in local runs and tests.
pub struct LocalIndex {
    namespaces: RwLock<Namespaces>,
    persist_path: Option<std::path::PathBuf>,
}

impl Default for LocalIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl LocalIndex {
    /// Ephemeral index that is never written to disk.
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
            persist_path: None,
        }
    }

    pub fn open_or_create(vector_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(vector_dir)
            .with_context(|| format!("Failed to create {}", vector_dir.display()))?;
        let persist_path = vector_dir.join("vectors.json");

        let namespaces = if persist_path.exists() {
            let data = std::fs::read_to_string(&persist_path)
                .context("Failed to read vector store")?;
            serde_json::from_str(&data).context("Corrupt vector store")?
        } else {
            HashMap::new()
        };

        Ok(Self {
            namespaces: RwLock::new(namespaces),
            persist_path: Some(persist_path),
        })
    }

    pub fn len(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .get(namespace)
            .map_or(0, |records| records.len())
    }

    pub fn is_empty(&self, namespace: &str) -> bool {
        self.len(namespace) == 0
    }

    fn persist(&self, namespaces: &Namespaces) -> Result<(), ProviderError> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let data = serde_json::to_string(namespaces)
            .map_err(|e| ProviderError::Transport(format!("serialize vector store: {e}")))?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, data)
            .and_then(|()| std::fs::rename(&tmp_path, path))
            .map_err(|e| ProviderError::Transport(format!("write vector store: {e}")))
    }
}

#[async_trait]
impl VectorIndex for LocalIndex {
    async fn query(&self, query: VectorQuery<'_>) -> Result<Vec<VectorMatch>, ProviderError> {
        let namespaces = self.namespaces.read();
        let Some(records) = namespaces.get(query.namespace) else {
            return Ok(Vec::new());
        };

        let mut scored: Vec<(f32, &VectorRecord)> = records
            .values()
            .filter(|r| match query.date_range {
                Some(range) => r
                    .metadata
                    .get(SESSION_EPOCH_KEY)
                    .and_then(|v| v.as_i64())
                    .is_some_and(|epoch| range.contains(epoch)),
                None => true,
            })
            .map(|r| (cosine_similarity(query.vector, &r.values), r))
            .collect();

        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(query.top_k);

        Ok(scored
            .into_iter()
            .map(|(score, r)| VectorMatch {
                id: r.id.clone(),
                score,
                metadata: r.metadata.clone(),
            })
            .collect())
    }

    async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize, ProviderError> {
        let mut namespaces = self.namespaces.write();
        let entries = namespaces.entry(namespace.to_string()).or_default();
        let previous: Vec<(String, Option<VectorRecord>)> = records
            .iter()
            .map(|r| (r.id.clone(), entries.insert(r.id.clone(), r.clone())))
            .collect();

        if let Err(e) = self.persist(&namespaces) {
            // Roll back so memory matches what is on disk
            let entries = namespaces.entry(namespace.to_string()).or_default();
            for (id, prior) in previous.into_iter().rev() {
                match prior {
                    Some(record) => entries.insert(id, record),
                    None => entries.remove(&id),
                };
            }
            return Err(e);
        }
        Ok(records.len())
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom == 0.0 {
        0.0
    } else {
        dot / denom
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(id: &str, values: Vec<f32>, epoch: i64) -> VectorRecord {
        let mut metadata = Metadata::new();
        metadata.insert("text".to_string(), json!(format!("chunk {id}")));
        metadata.insert(SESSION_EPOCH_KEY.to_string(), json!(epoch));
        VectorRecord {
            id: id.to_string(),
            values,
            metadata,
        }
    }

    fn query<'a>(vector: &'a [f32], top_k: usize) -> VectorQuery<'a> {
        VectorQuery {
            vector,
            top_k,
            namespace: "seattle",
            date_range: None,
        }
    }

    #[test]
    fn test_cosine_identical_and_orthogonal() {
        assert!((cosine_similarity(&[1.0, 2.0], &[1.0, 2.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_degenerate_inputs() {
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn test_query_orders_by_similarity() {
        let index = LocalIndex::new();
        index
            .upsert(
                "seattle",
                &[
                    record("a", vec![0.1, 0.9], 0),
                    record("b", vec![0.9, 0.1], 0),
                    record("c", vec![0.5, 0.5], 0),
                ],
            )
            .await
            .unwrap();

        let hits = index.query(query(&[1.0, 0.0], 2)).await.unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "b");
        assert_eq!(hits[1].id, "c");
        assert!(hits[0].score >= hits[1].score);
        assert_eq!(hits[0].metadata["text"], "chunk b");
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let index = LocalIndex::new();
        index
            .upsert("portland", &[record("a", vec![1.0, 0.0], 0)])
            .await
            .unwrap();

        assert!(index.query(query(&[1.0, 0.0], 5)).await.unwrap().is_empty());
        assert_eq!(index.len("portland"), 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let index = LocalIndex::new();
        index
            .upsert("seattle", &[record("t1-0", vec![1.0, 0.0], 0)])
            .await
            .unwrap();
        index
            .upsert("seattle", &[record("t1-0", vec![0.0, 1.0], 0)])
            .await
            .unwrap();

        assert_eq!(index.len("seattle"), 1);
        let hits = index.query(query(&[0.0, 1.0], 5)).await.unwrap();
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn test_date_range_filters_records() {
        let index = LocalIndex::new();
        index
            .upsert(
                "seattle",
                &[
                    record("old", vec![1.0, 0.0], 1_000),
                    record("new", vec![1.0, 0.0], 5_000),
                ],
            )
            .await
            .unwrap();

        let mut q = query(&[1.0, 0.0], 5);
        q.date_range = Some(DateRange {
            start: Some(2_000),
            end: None,
        });
        let hits = index.query(q).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "new");
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_index_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let vector_dir = dir.path().join("vectors");
        let index = LocalIndex::open_or_create(&vector_dir).unwrap();
        index
            .upsert("seattle", &[record("a", vec![1.0, 0.0], 0)])
            .await
            .unwrap();

        std::fs::remove_dir_all(&vector_dir).unwrap();
        let err = index
            .upsert("seattle", &[record("b", vec![0.0, 1.0], 0)])
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Transport(_)));
        assert_eq!(index.len("seattle"), 1);
        let hits = index.query(query(&[0.0, 1.0], 5)).await.unwrap();
        assert_eq!(hits[0].id, "a");
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let index = LocalIndex::open_or_create(dir.path()).unwrap();
            index
                .upsert("seattle", &[record("a", vec![1.0, 0.0], 0)])
                .await
                .unwrap();
        }

        let reopened = LocalIndex::open_or_create(dir.path()).unwrap();
        assert_eq!(reopened.len("seattle"), 1);
        assert!(!dir.path().join("vectors.json.tmp").exists());
    }
}
