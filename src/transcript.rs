//! Council transcript model as produced by the meeting-processing pipeline
//! (one JSON document per session transcript).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    #[serde(default)]
    pub generator: String,
    #[serde(default)]
    pub confidence: f32,
    /// ISO-8601 session start, e.g. "2023-04-01T09:30:00-07:00"
    #[serde(default)]
    pub session_datetime: Option<String>,
    #[serde(default)]
    pub created_datetime: Option<String>,
    pub sentences: Vec<Sentence>,
    #[serde(default)]
    pub annotations: Option<TranscriptAnnotations>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sentence {
    #[serde(default)]
    pub index: usize,
    #[serde(default)]
    pub confidence: f32,
    /// Offset in seconds from the start of the recording
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    #[serde(default)]
    pub speaker_index: Option<u32>,
    #[serde(default)]
    pub speaker_name: Option<String>,
    #[serde(default)]
    pub annotations: Option<SentenceAnnotations>,
}

impl Sentence {
    /// Display name: the attributed name, else the diarization index, else "Unknown".
    pub fn speaker(&self) -> String {
        match (&self.speaker_name, self.speaker_index) {
            (Some(name), _) if !name.trim().is_empty() => name.trim().to_string(),
            (_, Some(index)) => format!("Speaker {index}"),
            _ => "Unknown".to_string(),
        }
    }
}

/// Transcript-level annotations. `event_id` and `meeting_name` are joined in
/// from the session's event and body records at ingestion time.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TranscriptAnnotations {
    #[serde(default)]
    pub event_id: Option<String>,
    #[serde(default)]
    pub meeting_name: Option<String>,
    #[serde(default)]
    pub event_minutes_item: Option<String>,
}

impl TranscriptAnnotations {
    /// Present fields as `annotation_<field>` metadata entries.
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        prefixed([
            ("event_id", &self.event_id),
            ("meeting_name", &self.meeting_name),
            ("event_minutes_item", &self.event_minutes_item),
        ])
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SentenceAnnotations {
    #[serde(default)]
    pub topic: Option<String>,
    #[serde(default)]
    pub section_name: Option<String>,
}

impl SentenceAnnotations {
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        prefixed([("topic", &self.topic), ("section_name", &self.section_name)])
    }
}

fn prefixed<'a, const N: usize>(fields: [(&str, &'a Option<String>); N]) -> BTreeMap<String, String> {
    fields
        .into_iter()
        .filter_map(|(key, value)| value.as_ref().map(|v| (format!("annotation_{key}"), v.clone())))
        .collect()
}

/// Format a recording offset as HH:MM:SS.
pub fn format_offset(seconds: f64) -> String {
    let total = seconds.max(0.0) as u64;
    let hours = total / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;
    format!("{hours:02}:{minutes:02}:{secs:02}")
}
