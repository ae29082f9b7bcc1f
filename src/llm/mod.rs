//! Language-model backed stages: chat completions, embeddings, query
//! enhancement and result summaries.

pub mod chat;
pub mod embeddings;
pub mod query_expand;
pub mod summarize;

use crate::error::ProviderError;

/// Text produced by a cached, model-backed stage, tagged with where it came
/// from.
#[derive(Debug)]
pub enum Generated {
    /// Served from the cache without calling the model.
    Cached(String),
    /// Produced by the model on this call (and written to the cache).
    Fresh(String),
    /// Fixed text returned without consulting the cache or the model.
    Fixed(String),
    /// The model call failed; `text` is the fallback chosen by the caller.
    Degraded { text: String, reason: ProviderError },
}

impl Generated {
    pub fn text(&self) -> &str {
        match self {
            Generated::Cached(text)
            | Generated::Fresh(text)
            | Generated::Fixed(text)
            | Generated::Degraded { text, .. } => text,
        }
    }

    pub fn into_text(self) -> String {
        match self {
            Generated::Cached(text)
            | Generated::Fresh(text)
            | Generated::Fixed(text)
            | Generated::Degraded { text, .. } => text,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Generated::Degraded { .. })
    }

    /// Short label for logs.
    pub fn source(&self) -> &'static str {
        match self {
            Generated::Cached(_) => "cache",
            Generated::Fresh(_) => "model",
            Generated::Fixed(_) => "fixed",
            Generated::Degraded { .. } => "fallback",
        }
    }
}
