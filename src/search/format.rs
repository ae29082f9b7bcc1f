//! Mapping of raw index matches into [`SearchResult`]s.
//!
//! A match missing any required metadata key is skipped with a warning, so
//! one malformed record never fails the whole request.

use serde_json::Value;
use thiserror::Error;

use crate::models::SearchResult;
use crate::search::vector::VectorMatch;

#[derive(Debug, Error, PartialEq)]
pub enum FormatError {
    #[error("match {id} is missing metadata key `{key}`")]
    MissingKey { id: String, key: &'static str },
}

fn field(m: &VectorMatch, key: &'static str) -> Result<String, FormatError> {
    match m.metadata.get(key) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Null) | None => Err(FormatError::MissingKey {
            id: m.id.clone(),
            key,
        }),
        Some(other) => Ok(other.to_string()),
    }
}

pub fn format_match(m: &VectorMatch) -> Result<SearchResult, FormatError> {
    Ok(SearchResult {
        event_id: field(m, "annotation_event_id")?,
        text: field(m, "text")?,
        meeting_date: field(m, "session_date")?,
        meeting_title: field(m, "annotation_meeting_name")?,
        speaker: field(m, "speaker")?,
        relevance_score: m.score,
        start_time: field(m, "start_time")?,
        end_time: field(m, "end_time")?,
    })
}

/// Format matches in index order, dropping malformed ones.
pub fn format_matches(matches: &[VectorMatch]) -> Vec<SearchResult> {
    matches
        .iter()
        .filter_map(|m| match format_match(m) {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::warn!("Skipping search result: {e}");
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::vector::Metadata;
    use serde_json::json;

    fn full_match(id: &str, score: f32) -> VectorMatch {
        let metadata: Metadata = serde_json::from_value(json!({
            "annotation_event_id": "evt-42",
            "annotation_meeting_name": "Transportation Committee",
            "text": "The protected bike lane pilot on 4th Avenue",
            "session_date": "2023-04-01T09:30:00",
            "speaker": "Councilmember X",
            "start_time": "00:12:03",
            "end_time": "00:12:41",
            "confidence": 0.93
        }))
        .unwrap();
        VectorMatch {
            id: id.to_string(),
            score,
            metadata,
        }
    }

    #[test]
    fn test_format_complete_match() {
        let result = format_match(&full_match("t1-0", 0.87)).unwrap();
        assert_eq!(result.event_id, "evt-42");
        assert_eq!(result.meeting_title, "Transportation Committee");
        assert_eq!(result.meeting_date, "2023-04-01T09:30:00");
        assert_eq!(result.speaker, "Councilmember X");
        assert_eq!(result.start_time, "00:12:03");
        assert_eq!(result.end_time, "00:12:41");
        assert!((result.relevance_score - 0.87).abs() < 1e-6);
    }

    #[test]
    fn test_missing_key_is_reported() {
        let mut m = full_match("t1-3", 0.5);
        m.metadata.remove("speaker");
        assert_eq!(
            format_match(&m).unwrap_err(),
            FormatError::MissingKey {
                id: "t1-3".to_string(),
                key: "speaker"
            }
        );
    }

    #[test]
    fn test_null_counts_as_missing() {
        let mut m = full_match("t1-3", 0.5);
        m.metadata.insert("annotation_event_id".to_string(), Value::Null);
        assert!(format_match(&m).is_err());
    }

    #[test]
    fn test_numeric_metadata_is_stringified() {
        let mut m = full_match("t1-0", 0.5);
        m.metadata.insert("start_time".to_string(), json!(723.5));
        assert_eq!(format_match(&m).unwrap().start_time, "723.5");
    }

    #[test]
    fn test_format_matches_skips_malformed_and_keeps_order() {
        let mut broken = full_match("t2-0", 0.8);
        broken.metadata.remove("text");
        let matches = vec![full_match("t1-0", 0.9), broken, full_match("t3-0", 0.7)];

        let results = format_matches(&matches);
        assert_eq!(results.len(), 2);
        assert!(results[0].relevance_score > results[1].relevance_score);
    }
}
