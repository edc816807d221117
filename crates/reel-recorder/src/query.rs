//! Filtered retrieval over a finished recording.
//!
//! A [`FilterSpec`] with no fields set is deliberately answered with
//! metadata only (counts per event kind, never payloads), so a caller can
//! never receive an unbounded event dump by accident. Any set field
//! switches the reply to a filtered, paginated slice. All criteria are
//! AND-combined; `None` fields are ignored.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use reel_types::RecorderError;
use serde::{Deserialize, Serialize};

use crate::event::RecordedEvent;
use crate::store::Recording;

/// Caller-supplied criteria narrowing a query over a session's events.
///
/// All fields optional. No fields set means "describe the recording" --
/// the reply carries counts, not events.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct FilterSpec {
    /// Only events of these kinds. Unknown kinds simply match nothing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_types: Option<Vec<String>>,
    /// Maximum number of events to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
    /// Number of matching events to skip (for pagination).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// Only events at or after this ISO-8601 instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_timestamp: Option<String>,
    /// Only events strictly before this ISO-8601 instant.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to_timestamp: Option<String>,
}

impl FilterSpec {
    /// True when no criterion is set, which selects the metadata-only
    /// reply rather than "match everything".
    pub fn is_empty(&self) -> bool {
        self.event_types.is_none()
            && self.limit.is_none()
            && self.offset.is_none()
            && self.from_timestamp.is_none()
            && self.to_timestamp.is_none()
    }
}

/// Metadata-only reply: shape of the recording, no payloads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    pub session_id: String,
    pub file_path: String,
    pub total_event_count: usize,
    pub counts_by_event_type: BTreeMap<String, usize>,
}

/// Filtered, paginated slice of events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventSlice {
    pub session_id: String,
    /// How many events matched the criteria before pagination.
    pub matched_count: usize,
    /// How many events the recording holds in total.
    pub total_count: usize,
    /// Echo of the criteria that produced this slice.
    pub filters_applied: FilterSpec,
    pub events: Vec<RecordedEvent>,
}

/// Reply to a recording query.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryReply {
    Metadata(Metadata),
    Events(EventSlice),
}

/// Counts events per kind in a deterministic order.
pub fn counts_by_type(events: &[RecordedEvent]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for event in events {
        *counts.entry(event.kind.clone()).or_default() += 1;
    }
    counts
}

/// Answers a [`FilterSpec`] against a loaded recording.
///
/// Malformed timestamp bounds are a validation error; an unknown event
/// kind is not (it matches zero events).
pub fn query(
    recording: &Recording,
    file_path: &Path,
    spec: &FilterSpec,
) -> Result<QueryReply, RecorderError> {
    if spec.is_empty() {
        return Ok(QueryReply::Metadata(Metadata {
            session_id: recording.session_id.clone(),
            file_path: file_path.display().to_string(),
            total_event_count: recording.events.len(),
            counts_by_event_type: counts_by_type(&recording.events),
        }));
    }

    let from = spec
        .from_timestamp
        .as_deref()
        .map(parse_bound("from_timestamp"))
        .transpose()?;
    let to = spec
        .to_timestamp
        .as_deref()
        .map(parse_bound("to_timestamp"))
        .transpose()?;

    let matching: Vec<&RecordedEvent> = recording
        .events
        .iter()
        .filter(|event| matches(event, spec.event_types.as_deref(), from, to))
        .collect();
    let matched_count = matching.len();

    let offset = spec.offset.unwrap_or(0);
    let events: Vec<RecordedEvent> = matching
        .into_iter()
        .skip(offset)
        .take(spec.limit.unwrap_or(usize::MAX))
        .cloned()
        .collect();

    Ok(QueryReply::Events(EventSlice {
        session_id: recording.session_id.clone(),
        matched_count,
        total_count: recording.events.len(),
        filters_applied: spec.clone(),
        events,
    }))
}

fn matches(
    event: &RecordedEvent,
    kinds: Option<&[String]>,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> bool {
    if let Some(kinds) = kinds {
        if !kinds.iter().any(|kind| kind == &event.kind) {
            return false;
        }
    }
    // Inclusive lower bound, exclusive upper bound.
    if let Some(from) = from {
        if event.timestamp < from {
            return false;
        }
    }
    if let Some(to) = to {
        if event.timestamp >= to {
            return false;
        }
    }
    true
}

fn parse_bound(field: &'static str) -> impl Fn(&str) -> Result<DateTime<Utc>, RecorderError> {
    move |raw| {
        DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                RecorderError::validation(format!("invalid {field} {raw:?}: {e}"))
            })
    }
}
