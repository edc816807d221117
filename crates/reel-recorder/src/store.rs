//! JSON persistence for finished recordings.
//!
//! One recording becomes one file, `{session_id}_{timestamp}.json`, under
//! the configured recordings directory. The session id is validated
//! against the UUID grammar before any path is built from it, which is
//! the traversal defense for every operation here. Writes go through a
//! dot-prefixed temp file and a rename, so a crash mid-write never leaves
//! a half-written recording under the final name. Both directions are
//! size-capped: an oversized document is refused before a single byte is
//! written, and files are measured before they are read.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reel_types::{is_valid_session_id, RecorderConfig, RecorderError};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::event::RecordedEvent;

/// The persisted form of one finished session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recording {
    pub session_id: String,
    pub url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub events: Vec<RecordedEvent>,
    pub metadata: RecordingMetadata,
}

/// Bookkeeping block stored alongside the events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub saved_at: DateTime<Utc>,
    pub event_count: usize,
}

/// One entry in a recording listing. Carries no event payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub session_id: String,
    pub url: Option<String>,
    pub start_time: DateTime<Utc>,
    pub event_count: usize,
    pub file_path: String,
}

/// File-backed store for recordings.
pub struct RecordingStore {
    recordings_dir: PathBuf,
    max_save_bytes: u64,
    max_load_bytes: u64,
}

impl RecordingStore {
    /// Opens the store, creating the recordings directory if needed.
    pub fn new(config: &RecorderConfig) -> Result<Self, RecorderError> {
        std::fs::create_dir_all(&config.recordings_dir).map_err(|e| {
            RecorderError::resource(
                "create recordings directory",
                format!("{}: {e}", config.recordings_dir.display()),
            )
        })?;
        Ok(Self {
            recordings_dir: config.recordings_dir.clone(),
            max_save_bytes: config.max_save_bytes,
            max_load_bytes: config.max_load_bytes,
        })
    }

    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    /// Serializes and writes a recording, returning the final path.
    ///
    /// Fails with a capacity error, writing nothing, if the serialized
    /// document exceeds the save ceiling.
    pub fn save(&self, recording: &Recording) -> Result<PathBuf, RecorderError> {
        validate_id(&recording.session_id)?;

        let bytes = serde_json::to_vec_pretty(recording).map_err(|e| {
            RecorderError::resource("serialize recording", e.to_string())
        })?;
        if bytes.len() as u64 > self.max_save_bytes {
            return Err(RecorderError::Capacity {
                limit: self.max_save_bytes,
                detail: format!(
                    "recording {} serializes to {} bytes",
                    recording.session_id,
                    bytes.len()
                ),
            });
        }

        let filename = recording_filename(&recording.session_id, &recording.metadata.saved_at);
        let target = self.recordings_dir.join(&filename);

        // Atomic write: tmp file then rename.
        let tmp_path = self.recordings_dir.join(format!(".{filename}.tmp"));
        std::fs::write(&tmp_path, &bytes).map_err(|e| {
            RecorderError::resource("write recording", format!("{}: {e}", tmp_path.display()))
        })?;
        std::fs::rename(&tmp_path, &target).map_err(|e| {
            RecorderError::resource("write recording", format!("{}: {e}", target.display()))
        })?;

        debug!(
            session_id = %recording.session_id,
            path = %target.display(),
            bytes = bytes.len(),
            "recording saved"
        );
        Ok(target)
    }

    /// Loads a recording by session id, returning the document and the
    /// path it came from.
    pub fn load(&self, session_id: &str) -> Result<(Recording, PathBuf), RecorderError> {
        validate_id(session_id)?;

        let path = self
            .find_file(session_id)?
            .ok_or_else(|| RecorderError::NotFound {
                session_id: session_id.to_owned(),
            })?;

        // Measure before reading so a corrupted or adversarial file cannot
        // exhaust memory.
        let size = std::fs::metadata(&path)
            .map_err(|e| {
                RecorderError::resource("read recording", format!("{}: {e}", path.display()))
            })?
            .len();
        if size > self.max_load_bytes {
            return Err(RecorderError::Capacity {
                limit: self.max_load_bytes,
                detail: format!("recording file {} is {size} bytes", path.display()),
            });
        }

        let bytes = std::fs::read(&path).map_err(|e| {
            RecorderError::resource("read recording", format!("{}: {e}", path.display()))
        })?;
        let recording: Recording = serde_json::from_slice(&bytes).map_err(|e| {
            RecorderError::resource(
                "parse recording",
                format!("{}: invalid recording document: {e}", path.display()),
            )
        })?;
        Ok((recording, path))
    }

    /// Lists stored recordings, newest first. Unreadable or oversized
    /// files are skipped with a warning rather than failing the listing.
    pub fn list(&self) -> Result<Vec<RecordingSummary>, RecorderError> {
        let entries = std::fs::read_dir(&self.recordings_dir).map_err(|e| {
            RecorderError::resource(
                "list recordings",
                format!("{}: {e}", self.recordings_dir.display()),
            )
        })?;

        let mut summaries = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                RecorderError::resource("list recordings", e.to_string())
            })?;
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if !path.is_file() || name.starts_with('.') || !name.ends_with(".json") {
                continue;
            }

            match self.read_summary(&path) {
                Ok(summary) => summaries.push(summary),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable recording");
                }
            }
        }

        summaries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(summaries)
    }

    /// Deletes every file stored for a session id. Returns whether any
    /// file existed.
    pub fn delete(&self, session_id: &str) -> Result<bool, RecorderError> {
        validate_id(session_id)?;

        let mut deleted = false;
        while let Some(path) = self.find_file(session_id)? {
            std::fs::remove_file(&path).map_err(|e| {
                RecorderError::resource("delete recording", format!("{}: {e}", path.display()))
            })?;
            debug!(session_id, path = %path.display(), "recording deleted");
            deleted = true;
        }
        Ok(deleted)
    }

    /// Finds the newest file for a session id, if any.
    fn find_file(&self, session_id: &str) -> Result<Option<PathBuf>, RecorderError> {
        let entries = std::fs::read_dir(&self.recordings_dir).map_err(|e| {
            RecorderError::resource(
                "list recordings",
                format!("{}: {e}", self.recordings_dir.display()),
            )
        })?;

        let mut newest: Option<PathBuf> = None;
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if file_matches(name, session_id) && path.is_file() {
                // Timestamped names sort chronologically.
                if newest.as_deref().map_or(true, |n| path > *n) {
                    newest = Some(path);
                }
            }
        }
        Ok(newest)
    }

    fn read_summary(&self, path: &Path) -> Result<RecordingSummary, RecorderError> {
        let size = std::fs::metadata(path)
            .map_err(|e| RecorderError::resource("read recording", e.to_string()))?
            .len();
        if size > self.max_load_bytes {
            return Err(RecorderError::Capacity {
                limit: self.max_load_bytes,
                detail: format!("recording file {} is {size} bytes", path.display()),
            });
        }
        let bytes = std::fs::read(path)
            .map_err(|e| RecorderError::resource("read recording", e.to_string()))?;
        let recording: Recording = serde_json::from_slice(&bytes)
            .map_err(|e| RecorderError::resource("parse recording", e.to_string()))?;
        Ok(RecordingSummary {
            session_id: recording.session_id,
            url: recording.url,
            start_time: recording.start_time,
            event_count: recording.metadata.event_count,
            file_path: path.display().to_string(),
        })
    }
}

/// The traversal gate: ids must match the UUID grammar before any path
/// is constructed from them.
fn validate_id(session_id: &str) -> Result<(), RecorderError> {
    if !is_valid_session_id(session_id) {
        return Err(RecorderError::validation(format!(
            "invalid session id {session_id:?}: expected UUID format"
        )));
    }
    Ok(())
}

fn recording_filename(session_id: &str, saved_at: &DateTime<Utc>) -> String {
    format!("{session_id}_{}.json", saved_at.format("%Y%m%d_%H%M%S"))
}

fn file_matches(name: &str, session_id: &str) -> bool {
    !name.starts_with('.')
        && name.ends_with(".json")
        && name.len() > session_id.len()
        && name.as_bytes()[session_id.len()] == b'_'
        && name.starts_with(session_id)
}
