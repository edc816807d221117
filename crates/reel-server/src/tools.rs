//! The four recording tools exposed to agents.
//!
//! Each tool wraps one [`Recorder`] operation. Arguments arrive as loose
//! JSON from the transport and are deserialized here; malformed arguments
//! surface as validation errors so the agent sees the same taxonomy the
//! engine uses everywhere else.

use std::sync::Arc;

use anyhow::Result;
use serde::Deserialize;
use serde_json::{json, Value};

use reel_recorder::{FilterSpec, Recorder};
use reel_types::RecorderError;

/// A tool an agent can invoke over the MCP transport.
///
/// Implementations are `Send + Sync` so the registry can hand out
/// `Arc<dyn ToolDefinition>` across tasks.
#[async_trait::async_trait]
pub trait ToolDefinition: Send + Sync {
    /// Unique name (alphanumeric + underscores, max 64 chars).
    fn name(&self) -> &str;

    /// Short description shown in tool listings.
    fn description(&self) -> &str;

    /// JSON Schema describing the valid input for [`Self::execute`].
    fn input_schema(&self) -> Value;

    /// Run the tool. Domain failures travel as [`RecorderError`] inside
    /// the `anyhow` chain so the transport can report the error kind.
    async fn execute(&self, input: Value) -> Result<Value>;
}

/// All recording tools over a shared engine, ready for registration.
pub fn recording_tools(recorder: Arc<Recorder>) -> Vec<Box<dyn ToolDefinition>> {
    vec![
        Box::new(StartRecordingTool::new(recorder.clone())),
        Box::new(StopRecordingTool::new(recorder.clone())),
        Box::new(GetRecordingTool::new(recorder.clone())),
        Box::new(AnalyzeRecordingTool::new(recorder)),
    ]
}

fn parse_args<T: serde::de::DeserializeOwned>(input: Value) -> Result<T> {
    serde_json::from_value(input).map_err(|e| {
        RecorderError::Validation {
            reason: format!("invalid arguments: {e}"),
        }
        .into()
    })
}

// ---------------------------------------------------------------------------
// start_recording
// ---------------------------------------------------------------------------

pub struct StartRecordingTool {
    recorder: Arc<Recorder>,
}

impl StartRecordingTool {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

#[derive(Deserialize)]
struct StartArgs {
    url: Option<String>,
    #[serde(default)]
    sensitive_selectors: Vec<String>,
}

#[async_trait::async_trait]
impl ToolDefinition for StartRecordingTool {
    fn name(&self) -> &str {
        "start_recording"
    }

    fn description(&self) -> &str {
        "Start recording browser interactions. Launches Chrome and records clicks, \
         DOM mutations, console logs, and JS errors until stop_recording is called."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {
                    "type": "string",
                    "description": "Optional URL to navigate to on start (http, https, data or about)",
                },
                "sensitive_selectors": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Additional sensitive-field matchers of the form tag[attr*=value], masked on top of the built-in password/secret/token set",
                },
            },
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: StartArgs = parse_args(input)?;
        let session_id = self
            .recorder
            .start_recording(args.url.as_deref(), &args.sensitive_selectors)
            .await?;
        Ok(json!({
            "session_id": session_id,
            "status": "recording",
            "url": args.url,
        }))
    }
}

// ---------------------------------------------------------------------------
// stop_recording
// ---------------------------------------------------------------------------

pub struct StopRecordingTool {
    recorder: Arc<Recorder>,
}

impl StopRecordingTool {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

#[derive(Deserialize)]
struct SessionArgs {
    session_id: String,
}

#[async_trait::async_trait]
impl ToolDefinition for StopRecordingTool {
    fn name(&self) -> &str {
        "stop_recording"
    }

    fn description(&self) -> &str {
        "Stop a recording session, close its browser and save the events to a JSON file."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session ID from start_recording",
                },
            },
            "required": ["session_id"],
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: SessionArgs = parse_args(input)?;
        let outcome = self.recorder.stop_recording(&args.session_id).await?;
        Ok(json!({
            "session_id": args.session_id,
            "status": "stopped",
            "file_path": outcome.file_path,
            "event_count": outcome.event_count,
            "truncated": outcome.truncated,
        }))
    }
}

// ---------------------------------------------------------------------------
// get_recording
// ---------------------------------------------------------------------------

pub struct GetRecordingTool {
    recorder: Arc<Recorder>,
}

impl GetRecordingTool {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

#[derive(Deserialize)]
struct GetArgs {
    session_id: String,
    #[serde(flatten)]
    filters: FilterSpec,
}

#[async_trait::async_trait]
impl ToolDefinition for GetRecordingTool {
    fn name(&self) -> &str {
        "get_recording"
    }

    fn description(&self) -> &str {
        "Get a stored recording by session ID. Without filters this returns metadata \
         only; set event_types, limit, offset or a timestamp window to page through events."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session ID to retrieve",
                },
                "event_types": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Only include events of these kinds (unknown kinds match nothing)",
                },
                "limit": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Maximum number of events to return",
                },
                "offset": {
                    "type": "integer",
                    "minimum": 0,
                    "description": "Events to skip before the limit applies",
                },
                "from_timestamp": {
                    "type": "string",
                    "description": "RFC 3339 lower bound (inclusive)",
                },
                "to_timestamp": {
                    "type": "string",
                    "description": "RFC 3339 upper bound (exclusive)",
                },
            },
            "required": ["session_id"],
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: GetArgs = parse_args(input)?;
        let reply = self
            .recorder
            .get_recording(&args.session_id, &args.filters)
            .await?;
        Ok(serde_json::to_value(reply)?)
    }
}

// ---------------------------------------------------------------------------
// analyze_recording
// ---------------------------------------------------------------------------

pub struct AnalyzeRecordingTool {
    recorder: Arc<Recorder>,
}

impl AnalyzeRecordingTool {
    pub fn new(recorder: Arc<Recorder>) -> Self {
        Self { recorder }
    }
}

#[async_trait::async_trait]
impl ToolDefinition for AnalyzeRecordingTool {
    fn name(&self) -> &str {
        "analyze_recording"
    }

    fn description(&self) -> &str {
        "Summarize a stored recording: totals per event kind, console logs, JS errors, \
         DOM mutations, clicks and masked events."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "session_id": {
                    "type": "string",
                    "description": "Session ID to analyze",
                },
            },
            "required": ["session_id"],
        })
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: SessionArgs = parse_args(input)?;
        let summary = self.recorder.analyze_recording(&args.session_id).await?;
        Ok(serde_json::to_value(summary)?)
    }
}
