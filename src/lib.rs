//! # council-search
//!
//! Semantic search over city council meeting transcripts. A query is
//! expanded by a language model, matched against embedded transcript chunks
//! in a vector index, and answered with a short synthesized summary.
//!
//! ## Architecture
//!
//! Each request runs one sequential chain of awaited calls:
//!
//! ```text
//!                  ┌─────────────┐
//!                  │ SearchQuery │
//!                  └──────┬──────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  Query Enhancement  │  cache: enhanced_query:<q>
//!              │  (LLM, few-shot)    │  failure → original query
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  Embed + Top-K      │  failure → request fails
//!              │  (vector index)     │
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  Format Results     │  malformed match → skipped
//!              └──────────┬──────────┘
//!                         ▼
//!              ┌─────────────────────┐
//!              │  Summarize          │  cache: summary:<q>
//!              │  (LLM, recency)     │  failure → fixed message
//!              └──────────┬──────────┘
//!                         ▼
//!                 ┌────────────────┐
//!                 │ SearchResponse │
//!                 └────────────────┘
//! ```
//!
//! Offline, the `council-ingest` binary chunks transcripts, embeds the chunks
//! and upserts them into the same index.
//!
//! ## Module Overview
//!
//! - [`config`] - Environment-based configuration for server, cache, LLM and index
//! - [`models`] - Request/response types and date-range handling
//! - [`transcript`] - Council transcript model with structured annotations
//! - [`chunking`] - Sentence-preserving transcript chunking
//! - [`cache`] - Fail-open TTL cache over Redis or an in-process map
//! - [`llm::chat`] - Chat completion via Ollama or OpenAI-compatible APIs
//! - [`llm::embeddings`] - Batch embedding generation
//! - [`llm::query_expand`] - Few-shot query enhancement
//! - [`llm::summarize`] - Recency-biased result summaries
//! - [`search::vector`] - Vector index trait and the local cosine index
//! - [`search::pinecone`] - Pinecone data-plane client
//! - [`search::retriever`] - Query embedding and top-K lookup
//! - [`search::format`] - Match metadata to `SearchResult`
//! - [`service`] - The search pipeline
//! - [`ingest`] - Transcript ingestion batch job
//! - [`api`] - Axum HTTP handlers
//! - [`state`] - Shared application state

pub mod api;
pub mod cache;
pub mod chunking;
pub mod config;
pub mod error;
pub mod ingest;
pub mod llm;
pub mod models;
pub mod search;
pub mod service;
pub mod state;
pub mod transcript;
