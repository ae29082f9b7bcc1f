//! Transcript chunking: sentences are packed into chunks up to a character
//! budget without ever splitting a sentence.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::transcript::{format_offset, Sentence, Transcript};

/// Default character budget per chunk.
pub const DEFAULT_CHUNK_SIZE: usize = 500;

/// Which sentences a chunk's metadata is taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum MetadataPolicy {
    /// Speaker, confidence and annotations of the first sentence; time span
    /// from the first sentence's start to the last sentence's end.
    #[default]
    Span,
    /// Everything from the sentence that closed the chunk: the first
    /// sentence of the next chunk, or the transcript's final sentence for the
    /// trailing chunk. Matches records indexed by the legacy ingester.
    ClosingSentence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub speaker: String,
    pub start_time: String,
    pub end_time: String,
    pub confidence: f32,
    pub session_date: Option<String>,
    pub generator: String,
    /// `annotation_<field>` entries from the transcript and sentence annotations
    pub annotations: BTreeMap<String, String>,
}

/// Output of the chunking process.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptChunk {
    pub text: String,
    pub metadata: ChunkMetadata,
}

/// Chunk a transcript. A chunk accumulates sentences until adding the next
/// one would push its character count past `chunk_size`; a sentence longer
/// than the budget becomes a chunk on its own. Lengths are counted in chars
/// and exclude the joining spaces.
pub fn chunk_transcript(
    transcript: &Transcript,
    chunk_size: usize,
    policy: MetadataPolicy,
) -> Vec<TranscriptChunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<&Sentence> = Vec::new();
    let mut current_len = 0usize;

    for sentence in &transcript.sentences {
        let len = sentence.text.chars().count();
        if !current.is_empty() && current_len + len > chunk_size {
            chunks.push(build_chunk(transcript, &current, sentence, policy));
            current.clear();
            current_len = 0;
        }
        current.push(sentence);
        current_len += len;
    }

    if let Some(&last) = current.last() {
        chunks.push(build_chunk(transcript, &current, last, policy));
    }

    chunks
}

fn build_chunk(
    transcript: &Transcript,
    sentences: &[&Sentence],
    closing: &Sentence,
    policy: MetadataPolicy,
) -> TranscriptChunk {
    let text = sentences
        .iter()
        .map(|s| s.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    // Callers never pass an empty slice
    let first = sentences[0];
    let last = sentences[sentences.len() - 1];

    let (source, start, end) = match policy {
        MetadataPolicy::Span => (first, first.start_time, last.end_time),
        MetadataPolicy::ClosingSentence => (closing, closing.start_time, closing.end_time),
    };

    let mut annotations = transcript
        .annotations
        .as_ref()
        .map(|a| a.to_metadata())
        .unwrap_or_default();
    if let Some(sentence_annotations) = &source.annotations {
        annotations.extend(sentence_annotations.to_metadata());
    }

    TranscriptChunk {
        text,
        metadata: ChunkMetadata {
            speaker: source.speaker(),
            start_time: format_offset(start),
            end_time: format_offset(end),
            confidence: source.confidence,
            session_date: transcript.session_datetime.clone(),
            generator: transcript.generator.clone(),
            annotations,
        },
    }
}
