//! Ingestion batch job: transcripts are chunked, embedded and upserted into
//! the vector index under one namespace.
//!
//! Vector ids are `<transcript_id>-<chunk_index>`, so re-running over the
//! same transcripts overwrites records instead of duplicating them.

pub mod source;

use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use crate::chunking::{chunk_transcript, MetadataPolicy, TranscriptChunk, DEFAULT_CHUNK_SIZE};
use crate::error::ProviderError;
use crate::llm::embeddings::Embedder;
use crate::models::QueryDate;
use crate::search::vector::{Metadata, VectorIndex, VectorRecord, SESSION_EPOCH_KEY};
use source::{SourcedTranscript, TranscriptSource};

/// Records per upsert call.
pub const UPSERT_BATCH_SIZE: usize = 100;

/// Failure of a single transcript. The run logs it and moves on.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("transcript {id}: {reason}")]
    Reference { id: String, reason: String },

    #[error("embedding failed: {0}")]
    Embedding(#[source] ProviderError),

    #[error("upsert failed: {0}")]
    Upsert(#[source] ProviderError),
}

/// Outcome of an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub transcripts_indexed: usize,
    pub transcripts_failed: usize,
    /// Chunks produced by the chunker, including dry runs
    pub chunks_produced: usize,
    /// Records the index acknowledged writing; zero on a dry run
    pub chunks_upserted: usize,
}

/// Per-transcript counts.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IndexedTranscript {
    pub chunks: usize,
    pub upserted: usize,
}

pub struct Ingestor {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
    chunk_size: usize,
    policy: MetadataPolicy,
    dry_run: bool,
}

impl Ingestor {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>, namespace: impl Into<String>) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            policy: MetadataPolicy::default(),
            dry_run: false,
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_policy(mut self, policy: MetadataPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Chunk only; nothing is embedded or written.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Ingest up to `limit` transcripts from `source`, sequentially.
    pub async fn run(&self, source: &dyn TranscriptSource, limit: Option<usize>) -> anyhow::Result<IngestReport> {
        let mut ids = source.list()?;
        if let Some(limit) = limit {
            ids.truncate(limit);
        }
        tracing::info!(
            "Ingesting {} transcripts into namespace {}{}",
            ids.len(),
            self.namespace,
            if self.dry_run { " (dry run)" } else { "" }
        );

        let mut report = IngestReport::default();
        for id in &ids {
            let outcome = match source.load(id) {
                Ok(sourced) => self.index_transcript(&sourced).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(indexed) => {
                    tracing::info!("Indexed {id}: {} chunks, {} upserted", indexed.chunks, indexed.upserted);
                    report.transcripts_indexed += 1;
                    report.chunks_produced += indexed.chunks;
                    report.chunks_upserted += indexed.upserted;
                }
                Err(e) => {
                    tracing::error!("Skipping transcript {id}: {e}");
                    report.transcripts_failed += 1;
                }
            }
        }

        tracing::info!(
            "Ingestion complete: {} indexed, {} failed, {} chunks, {} upserted",
            report.transcripts_indexed,
            report.transcripts_failed,
            report.chunks_produced,
            report.chunks_upserted
        );
        Ok(report)
    }

    /// Chunk, embed and upsert one transcript.
    pub async fn index_transcript(&self, sourced: &SourcedTranscript) -> Result<IndexedTranscript, IngestError> {
        let chunks = chunk_transcript(&sourced.transcript, self.chunk_size, self.policy);
        if self.dry_run || chunks.is_empty() {
            return Ok(IndexedTranscript {
                chunks: chunks.len(),
                upserted: 0,
            });
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed(&texts).await.map_err(IngestError::Embedding)?;

        let records = build_records(&sourced.id, &chunks, vectors);
        let mut written = 0;
        for batch in records.chunks(UPSERT_BATCH_SIZE) {
            written += self
                .index
                .upsert(&self.namespace, batch)
                .await
                .map_err(IngestError::Upsert)?;
        }
        Ok(IndexedTranscript {
            chunks: chunks.len(),
            upserted: written,
        })
    }
}

/// Pair chunks with their embeddings as index records.
pub fn build_records(transcript_id: &str, chunks: &[TranscriptChunk], vectors: Vec<Vec<f32>>) -> Vec<VectorRecord> {
    chunks
        .iter()
        .zip(vectors)
        .enumerate()
        .map(|(i, (chunk, values))| VectorRecord {
            id: format!("{transcript_id}-{i}"),
            values,
            metadata: chunk_metadata(chunk),
        })
        .collect()
}

fn chunk_metadata(chunk: &TranscriptChunk) -> Metadata {
    let meta = &chunk.metadata;
    let mut out = Metadata::new();
    out.insert("text".to_string(), json!(chunk.text));
    out.insert("speaker".to_string(), json!(meta.speaker));
    out.insert("start_time".to_string(), json!(meta.start_time));
    out.insert("end_time".to_string(), json!(meta.end_time));
    out.insert("confidence".to_string(), json!(meta.confidence));
    out.insert("generator".to_string(), json!(meta.generator));

    if let Some(session_date) = &meta.session_date {
        out.insert("session_date".to_string(), json!(session_date));
        match QueryDate::parse(session_date) {
            Some(date) => {
                out.insert(SESSION_EPOCH_KEY.to_string(), json!(date.timestamp()));
            }
            None => tracing::warn!("Unparseable session date {session_date:?}; record excluded from date filters"),
        }
    }

    for (key, value) in &meta.annotations {
        out.insert(key.clone(), Value::String(value.clone()));
    }
    out
}
