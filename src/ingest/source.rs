//! Where transcripts come from.
//!
//! The directory source reads an export of the document store: one
//! `<id>.json` transcript per session, optionally next to an
//! `<id>.event.json` sidecar with the session's event and body references.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::ingest::IngestError;
use crate::transcript::{Transcript, TranscriptAnnotations};

const SIDECAR_SUFFIX: &str = ".event.json";

/// A transcript with its references resolved.
#[derive(Debug, Clone)]
pub struct SourcedTranscript {
    /// Stable id; vector ids are derived from it
    pub id: String,
    pub transcript: Transcript,
}

pub trait TranscriptSource {
    /// Ids of every transcript available, in a stable order.
    fn list(&self) -> anyhow::Result<Vec<String>>;

    /// Load one transcript and resolve its event and body references.
    fn load(&self, id: &str) -> Result<SourcedTranscript, IngestError>;
}

/// Session references joined from the event and body records.
#[derive(Debug, Deserialize)]
struct EventRef {
    event_id: String,
    body_name: String,
    #[serde(default)]
    session_datetime: Option<String>,
}

pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn transcript_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    fn sidecar_path(&self, id: &str) -> PathBuf {
        self.root.join(format!("{id}{SIDECAR_SUFFIX}"))
    }
}

impl TranscriptSource for DirectorySource {
    fn list(&self) -> anyhow::Result<Vec<String>> {
        if !self.root.is_dir() {
            anyhow::bail!("Transcript directory not found: {}", self.root.display());
        }

        let mut ids: Vec<String> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| transcript_id(e.path()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    fn load(&self, id: &str) -> Result<SourcedTranscript, IngestError> {
        let mut transcript: Transcript = read_json(&self.transcript_path(id))?;

        let sidecar = self.sidecar_path(id);
        if sidecar.exists() {
            let event: EventRef = read_json(&sidecar)?;
            let annotations = transcript.annotations.get_or_insert_with(TranscriptAnnotations::default);
            annotations.event_id = Some(event.event_id);
            annotations.meeting_name = Some(event.body_name);
            if event.session_datetime.is_some() {
                transcript.session_datetime = event.session_datetime;
            }
        }

        check_references(id, &transcript)?;

        Ok(SourcedTranscript {
            id: id.to_string(),
            transcript,
        })
    }
}

/// `<id>.json` files that are not sidecars.
fn transcript_id(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    if name.ends_with(SIDECAR_SUFFIX) {
        return None;
    }
    name.strip_suffix(".json")
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, IngestError> {
    let data = std::fs::read_to_string(path).map_err(|source| IngestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| IngestError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Search results need an event id, a meeting name and a session date.
fn check_references(id: &str, transcript: &Transcript) -> Result<(), IngestError> {
    let missing = |what: &str| IngestError::Reference {
        id: id.to_string(),
        reason: format!("no {what}"),
    };
    let annotations = transcript.annotations.as_ref().ok_or_else(|| missing("event reference"))?;
    if annotations.event_id.as_deref().is_none_or(str::is_empty) {
        return Err(missing("event id"));
    }
    if annotations.meeting_name.as_deref().is_none_or(str::is_empty) {
        return Err(missing("body name"));
    }
    if transcript.session_datetime.is_none() {
        return Err(missing("session datetime"));
    }
    Ok(())
}
