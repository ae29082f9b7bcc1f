use chrono::NaiveDate;
use std::fmt::Write;
use std::sync::Arc;

use crate::cache::{summary_key, SharedCache};
use crate::error::ProviderError;
use crate::llm::chat::ChatModel;
use crate::llm::Generated;
use crate::models::{DateRange, SearchResult};

pub const NO_RESULTS_SUMMARY: &str = "No relevant results were found for this query.";
pub const FAILED_SUMMARY: &str =
    "Summary generation failed. Please review the results individually.";

/// Per-result cap on transcript text sent to the model.
const MAX_CONTEXT_CHARS: usize = 1_000;

const SYSTEM_PROMPT: &str = "You summarize excerpts from city council meeting transcripts for \
residents. Using only the excerpts provided, answer the user's search in 2-3 sentences and \
about 50 words. Favor the most recent meetings when excerpts disagree or describe a policy \
changing over time, and mention meeting dates where they help. Do not invent details that are \
not in the excerpts.";

/// Synthesizes the top results into a short answer for the original query.
pub struct Summarizer {
    model: Arc<dyn ChatModel>,
    cache: SharedCache,
}

impl Summarizer {
    pub fn new(model: Arc<dyn ChatModel>, cache: SharedCache) -> Self {
        Self { model, cache }
    }

    /// Cached summary keyed by the original query and its date range; model
    /// failures are returned to the caller. `today` grounds relative
    /// questions such as "most recent".
    pub async fn try_summarize(
        &self,
        query: &str,
        date_range: Option<DateRange>,
        results: &[SearchResult],
        today: NaiveDate,
    ) -> Result<Generated, ProviderError> {
        if results.is_empty() {
            return Ok(Generated::Fixed(NO_RESULTS_SUMMARY.to_string()));
        }

        let key = summary_key(query, date_range.as_ref());
        if let Some(cached) = self.cache.get(&key).await {
            return Ok(Generated::Cached(cached));
        }

        let user = format!(
            "{}---\nSearch: {query}",
            build_context_block(results, today)
        );
        let summary = self.model.complete(SYSTEM_PROMPT, &user).await?;

        self.cache.put(&key, &summary).await;
        Ok(Generated::Fresh(summary))
    }

    /// Summary that never fails: model errors yield [`FAILED_SUMMARY`].
    pub async fn summarize(
        &self,
        query: &str,
        date_range: Option<DateRange>,
        results: &[SearchResult],
        today: NaiveDate,
    ) -> Generated {
        match self.try_summarize(query, date_range, results, today).await {
            Ok(generated) => generated,
            Err(reason) => {
                tracing::warn!("Summary generation failed: {reason}");
                Generated::Degraded {
                    text: FAILED_SUMMARY.to_string(),
                    reason,
                }
            }
        }
    }
}

fn build_context_block(results: &[SearchResult], today: NaiveDate) -> String {
    let mut ctx = format!("Today's date: {}\n\nTranscript excerpts:\n\n", today.format("%Y-%m-%d"));

    for (i, r) in results.iter().enumerate() {
        let _ = write!(
            ctx,
            "[{}] {} ({})\n{}\n\n",
            i + 1,
            r.meeting_title,
            r.meeting_date,
            truncate_to_char_boundary(&r.text, MAX_CONTEXT_CHARS)
        );
    }

    ctx
}

fn truncate_to_char_boundary(s: &str, max_len: usize) -> &str {
    if s.len() <= max_len {
        return s;
    }
    let mut end = max_len;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}
