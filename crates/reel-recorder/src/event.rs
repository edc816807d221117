//! Recorded events and the normalization of raw browser notifications.
//!
//! Every protocol callback that survives recording becomes a [`RecordedEvent`]:
//! an open string kind, a capture timestamp, and a kind-specific JSON payload.
//! Normalization is pure so it can be tested without a browser.

use chrono::{DateTime, Utc};
use reel_browser::CdpNotification;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Well-known event kinds. The kind field is an open string: consumers that
/// filter by kind compare strings, and unknown kinds flow through untouched.
pub mod kind {
    pub const CLICK: &str = "click";
    pub const CONSOLE_LOG: &str = "console_log";
    pub const JS_ERROR: &str = "js_error";
    pub const DOCUMENT_UPDATED: &str = "document_updated";
    pub const DOM_SET_CHILD_NODES: &str = "dom_set_child_nodes";
    pub const DOM_ATTRIBUTE_MODIFIED: &str = "dom_attribute_modified";
    pub const DOM_CHARACTER_DATA_MODIFIED: &str = "dom_character_data_modified";
}

/// A single captured interaction event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Open string tag identifying the event kind.
    #[serde(rename = "type")]
    pub kind: String,
    /// Capture time, assigned when the raw notification is normalized.
    pub timestamp: DateTime<Utc>,
    /// Kind-specific payload.
    pub data: Value,
    /// Set when the masking filter redacted part of the payload. Absent from
    /// the serialized form for untouched events.
    #[serde(default, skip_serializing_if = "is_false")]
    pub masked: bool,
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

impl RecordedEvent {
    /// Builds an event with a fresh capture timestamp.
    pub fn new(kind: impl Into<String>, data: Value) -> Self {
        Self {
            kind: kind.into(),
            timestamp: Utc::now(),
            data,
            masked: false,
        }
    }
}

/// Converts a raw protocol notification into a recorded event.
///
/// Returns `None` for notifications that carry no recordable payload:
/// unknown methods, bindings other than the click binding, and click
/// payloads that fail to parse.
pub fn normalize(notification: &CdpNotification) -> Option<RecordedEvent> {
    let params = &notification.params;
    match notification.method.as_str() {
        "Runtime.consoleAPICalled" => Some(RecordedEvent::new(
            kind::CONSOLE_LOG,
            console_payload(params),
        )),
        "Runtime.exceptionThrown" => Some(RecordedEvent::new(
            kind::JS_ERROR,
            exception_payload(params),
        )),
        "Runtime.bindingCalled" => click_from_binding(params),
        "DOM.documentUpdated" => Some(RecordedEvent::new(kind::DOCUMENT_UPDATED, json!({}))),
        "DOM.setChildNodes" => Some(RecordedEvent::new(
            kind::DOM_SET_CHILD_NODES,
            json!({
                "parent_id": params.get("parentId").cloned().unwrap_or(Value::Null),
                "nodes": params.get("nodes").cloned().unwrap_or_else(|| json!([])),
            }),
        )),
        "DOM.attributeModified" => Some(RecordedEvent::new(
            kind::DOM_ATTRIBUTE_MODIFIED,
            json!({
                "node_id": params.get("nodeId").cloned().unwrap_or(Value::Null),
                "name": params.get("name").cloned().unwrap_or(Value::Null),
                "value": params.get("value").cloned().unwrap_or(Value::Null),
            }),
        )),
        "DOM.characterDataModified" => Some(RecordedEvent::new(
            kind::DOM_CHARACTER_DATA_MODIFIED,
            json!({
                "node_id": params.get("nodeId").cloned().unwrap_or(Value::Null),
                "character_data": params.get("characterData").cloned().unwrap_or(Value::Null),
            }),
        )),
        _ => None,
    }
}

fn console_payload(params: &Value) -> Value {
    let level = params
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("log")
        .to_owned();
    let args: Vec<String> = params
        .get("args")
        .and_then(Value::as_array)
        .map(|args| args.iter().map(stringify_remote_object).collect())
        .unwrap_or_default();
    let frame = params
        .get("stackTrace")
        .and_then(|st| st.get("callFrames"))
        .and_then(Value::as_array)
        .and_then(|frames| frames.first());
    let location = json!({
        "url": frame.and_then(|f| f.get("url")).and_then(Value::as_str).unwrap_or(""),
        "lineNumber": frame.and_then(|f| f.get("lineNumber")).and_then(Value::as_u64).unwrap_or(0),
    });
    json!({
        "level": level,
        "args": args,
        "location": location,
    })
}

/// Renders a protocol remote object as display text. Primitive values print
/// as themselves; everything else falls back to the protocol description.
fn stringify_remote_object(obj: &Value) -> String {
    if let Some(value) = obj.get("value") {
        return match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
    }
    if let Some(unserializable) = obj.get("unserializableValue").and_then(Value::as_str) {
        return unserializable.to_owned();
    }
    if let Some(description) = obj.get("description").and_then(Value::as_str) {
        return description.to_owned();
    }
    obj.get("type")
        .and_then(Value::as_str)
        .map(|t| format!("[{t}]"))
        .unwrap_or_else(|| "[object]".to_owned())
}

fn exception_payload(params: &Value) -> Value {
    let details = params.get("exceptionDetails").unwrap_or(&Value::Null);
    let message = details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(Value::as_str)
        .or_else(|| details.get("text").and_then(Value::as_str))
        .unwrap_or("unknown error")
        .to_owned();
    let stack = details
        .get("stackTrace")
        .map(render_stack)
        .unwrap_or_default();
    json!({
        "message": message,
        "stack": stack,
    })
}

fn render_stack(stack_trace: &Value) -> String {
    let frames = match stack_trace.get("callFrames").and_then(Value::as_array) {
        Some(frames) => frames,
        None => return String::new(),
    };
    let lines: Vec<String> = frames
        .iter()
        .map(|frame| {
            let function = frame
                .get("functionName")
                .and_then(Value::as_str)
                .filter(|name| !name.is_empty())
                .unwrap_or("<anonymous>");
            let url = frame.get("url").and_then(Value::as_str).unwrap_or("");
            let line = frame.get("lineNumber").and_then(Value::as_u64).unwrap_or(0);
            let column = frame
                .get("columnNumber")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            format!("    at {function} ({url}:{line}:{column})")
        })
        .collect();
    lines.join("\n")
}

/// The click binding delivers its payload as a JSON string. A payload that
/// fails to parse is dropped rather than recorded as garbage.
fn click_from_binding(params: &Value) -> Option<RecordedEvent> {
    let name = params.get("name").and_then(Value::as_str)?;
    if name != reel_browser::CLICK_BINDING {
        return None;
    }
    let payload = params.get("payload").and_then(Value::as_str)?;
    let data: Value = serde_json::from_str(payload).ok()?;
    Some(RecordedEvent::new(kind::CLICK, data))
}
