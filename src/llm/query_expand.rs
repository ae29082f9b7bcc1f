use std::sync::Arc;

use crate::cache::{enhanced_query_key, SharedCache};
use crate::error::ProviderError;
use crate::llm::chat::ChatModel;
use crate::llm::Generated;

/// Few-shot prompt for query enhancement. `{region}` is replaced with the
/// locality whose council is being searched.
const SYSTEM_PROMPT: &str = "You expand search queries for a semantic search engine over \
{region} City Council meeting transcripts. Rewrite the user's query as one natural-language \
sentence that keeps the original intent and adds related terms, synonyms, program names and \
council vocabulary likely to appear in spoken testimony and deliberation. Do not answer the \
query. Respond with the expanded query only.\n\n\
Query: bikes\n\
Expanded: bicycle infrastructure, protected bike lanes, cycling safety, bike share programs, \
Vision Zero traffic safety, and the bicycle master plan\n\n\
Query: homelessness\n\
Expanded: homelessness response, unsheltered residents, encampment removals, tiny house \
villages, shelter beds, permanent supportive housing, and the regional homelessness authority\n\n\
Query: police budget\n\
Expanded: police department budget, public safety funding, officer staffing levels, overtime \
spending, community safety alternatives, and budget amendments for the police department";

fn system_prompt(region: &str) -> String {
    SYSTEM_PROMPT.replace("{region}", region)
}

/// Expands short user queries into richer natural-language queries.
pub struct QueryEnhancer {
    model: Arc<dyn ChatModel>,
    cache: SharedCache,
}

impl QueryEnhancer {
    pub fn new(model: Arc<dyn ChatModel>, cache: SharedCache) -> Self {
        Self { model, cache }
    }

    /// Cached enhancement; model failures are returned to the caller.
    pub async fn try_enhance(&self, query: &str, region: &str) -> Result<Generated, ProviderError> {
        let key = enhanced_query_key(query);
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(Generated::Cached(cached));
        }

        let completion = self.model.complete(&system_prompt(region), query).await?;
        let enhanced = clean_enhancement(&completion)
            .ok_or_else(|| ProviderError::Malformed(format!("unusable enhancement: {completion}")))?;

        self.cache.put(&key, &enhanced).await;
        Ok(Generated::Fresh(enhanced))
    }

    /// Enhancement that never fails: on any model error the original query is
    /// returned unchanged.
    pub async fn enhance(&self, query: &str, region: &str) -> Generated {
        match self.try_enhance(query, region).await {
            Ok(generated) => generated,
            Err(reason) => {
                tracing::warn!("Query enhancement failed, using original query: {reason}");
                Generated::Degraded {
                    text: query.to_string(),
                    reason,
                }
            }
        }
    }
}

/// Strip the echoed label and wrapping quotes models sometimes add around
/// the expansion. Returns None when nothing usable remains.
fn clean_enhancement(content: &str) -> Option<String> {
    let mut text = content.trim();
    for label in ["Expanded:", "Expanded query:", "Enhanced query:"] {
        if let Some(rest) = text.strip_prefix(label) {
            text = rest.trim();
        }
    }
    let text = text.trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();

    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
