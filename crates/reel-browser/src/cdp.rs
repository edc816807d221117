//! Low-level Chrome DevTools Protocol client.
//!
//! Speaks JSON-RPC 2.0 over the DevTools WebSocket of a page target.
//! Commands get auto-incrementing ids and their responses are correlated
//! back to the caller; everything else on the wire is an asynchronous
//! notification (console calls, exceptions, DOM mutations, binding calls)
//! and is forwarded untouched to the notification channel handed out at
//! connect time. The recording engine owns that channel; this module never
//! interprets notification payloads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::BrowserError;

/// Default per-command response deadline.
const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;
type WsSource = SplitStream<WebSocketStream<MaybeTlsStream<TcpStream>>>;

/// One asynchronous notification pushed by the browser.
///
/// Raw protocol shape; normalization into recorded events happens in the
/// recording engine.
#[derive(Debug, Clone)]
pub struct CdpNotification {
    /// Notification method name (e.g. "Runtime.consoleAPICalled").
    pub method: String,
    /// Method-specific parameters.
    pub params: Value,
}

/// Receiving half of the notification stream for one page connection.
pub type NotificationReceiver = mpsc::UnboundedReceiver<CdpNotification>;

/// Response to one command, correlated by id.
#[derive(Debug)]
struct CdpResponse {
    result: Option<Value>,
    error: Option<CdpWireError>,
}

/// Error object inside a CDP response.
#[derive(Debug, Clone, serde::Deserialize)]
struct CdpWireError {
    code: i64,
    message: String,
}

/// DevTools WebSocket client for a single page target.
///
/// All methods take `&self`; the client can be shared behind an `Arc` by
/// whatever owns the page. Dropping the client closes the write half; the
/// background reader exits when the socket goes away.
pub struct CdpClient {
    next_id: AtomicU64,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>,
    writer: Mutex<WsSink>,
    _reader_handle: tokio::task::JoinHandle<()>,
}

impl CdpClient {
    /// Connect to a DevTools page WebSocket endpoint.
    ///
    /// Returns the command client plus the notification stream for this
    /// connection. The stream yields `None` once the socket closes.
    pub async fn connect(ws_url: &str) -> Result<(Self, NotificationReceiver), BrowserError> {
        tracing::debug!(url = ws_url, "connecting to DevTools WebSocket");

        let (ws_stream, _) = tokio_tungstenite::connect_async(ws_url)
            .await
            .map_err(|e| BrowserError::ConnectionFailed {
                url: ws_url.to_string(),
                reason: e.to_string(),
            })?;

        let (writer, reader) = ws_stream.split();

        let pending: Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>> =
            Arc::new(Mutex::new(HashMap::new()));
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();

        let pending_for_reader = Arc::clone(&pending);
        let reader_handle = tokio::spawn(async move {
            read_loop(reader, pending_for_reader, notify_tx).await;
        });

        tracing::info!(url = ws_url, "DevTools connection established");

        Ok((
            Self {
                next_id: AtomicU64::new(1),
                pending,
                writer: Mutex::new(writer),
                _reader_handle: reader_handle,
            },
            notify_rx,
        ))
    }

    /// Send a command and wait for its response with the default deadline.
    pub async fn send_command(&self, method: &str, params: Value) -> Result<Value, BrowserError> {
        self.send_command_with_timeout(method, params, COMMAND_TIMEOUT)
            .await
    }

    /// Send a command and wait for its response with a custom deadline.
    pub async fn send_command_with_timeout(
        &self,
        method: &str,
        params: Value,
        timeout: Duration,
    ) -> Result<Value, BrowserError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let json = command_json(id, method, &params).to_string();

        tracing::debug!(id = id, method = method, "sending CDP command");

        // Register the pending slot before sending so a fast response
        // cannot race the insert.
        let (tx, rx) = oneshot::channel();
        {
            let mut pending = self.pending.lock().await;
            pending.insert(id, tx);
        }

        {
            let mut writer = self.writer.lock().await;
            if let Err(e) = writer.send(Message::Text(json)).await {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                return Err(BrowserError::Protocol {
                    detail: format!("failed to send WebSocket message: {e}"),
                });
            }
        }

        let response = match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                return Err(BrowserError::Protocol {
                    detail: "response channel closed unexpectedly".to_string(),
                })
            }
            Err(_) => {
                let mut pending = self.pending.lock().await;
                pending.remove(&id);
                return Err(BrowserError::Timeout {
                    method: method.to_string(),
                    duration: timeout,
                });
            }
        };

        if let Some(err) = response.error {
            return Err(BrowserError::CdpError {
                method: method.to_string(),
                code: err.code,
                message: err.message,
            });
        }

        Ok(response.result.unwrap_or(Value::Null))
    }

    /// Enable a CDP domain (e.g. "Page", "DOM", "Runtime").
    ///
    /// Domains emit no notifications until explicitly enabled.
    pub async fn enable_domain(&self, domain: &str) -> Result<(), BrowserError> {
        let method = format!("{domain}.enable");
        self.send_command(&method, serde_json::json!({})).await?;
        Ok(())
    }
}

/// Background task: read WebSocket frames, correlate responses, forward
/// notifications. Exits when the socket closes or errors.
async fn read_loop(
    mut reader: WsSource,
    pending: Arc<Mutex<HashMap<u64, oneshot::Sender<CdpResponse>>>>,
    notify_tx: mpsc::UnboundedSender<CdpNotification>,
) {
    while let Some(msg_result) = reader.next().await {
        let msg = match msg_result {
            Ok(msg) => msg,
            Err(e) => {
                tracing::warn!(error = %e, "WebSocket read error, stopping reader");
                break;
            }
        };

        let text = match msg {
            Message::Text(t) => t,
            Message::Binary(b) => match String::from_utf8(b) {
                Ok(s) => s,
                Err(_) => continue,
            },
            Message::Close(_) => {
                tracing::debug!("WebSocket closed by browser");
                break;
            }
            _ => continue,
        };

        let json: Value = match serde_json::from_str(&text) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "unparseable CDP frame, skipping");
                continue;
            }
        };

        if let Some((id, response)) = parse_response(&json) {
            let mut pending_guard = pending.lock().await;
            match pending_guard.remove(&id) {
                Some(tx) => {
                    let _ = tx.send(response);
                }
                None => tracing::debug!(id = id, "response for unknown command id"),
            }
        } else if let Some(notification) = parse_notification(&json) {
            // A full channel cannot happen (unbounded); a closed one means
            // the recorder is gone and the frame is uninteresting.
            let _ = notify_tx.send(notification);
        }
    }

    // The connection is gone: fail every in-flight command instead of
    // leaving callers waiting out their timeout.
    let mut pending_guard = pending.lock().await;
    for (_, tx) in pending_guard.drain() {
        let _ = tx.send(CdpResponse {
            result: None,
            error: Some(CdpWireError {
                code: -1,
                message: "WebSocket connection closed".to_string(),
            }),
        });
    }
}

/// Build the JSON-RPC frame for one command.
fn command_json(id: u64, method: &str, params: &Value) -> Value {
    serde_json::json!({
        "id": id,
        "method": method,
        "params": params,
    })
}

/// Parse a frame as a command response. Responses carry an `id`.
fn parse_response(json: &Value) -> Option<(u64, CdpResponse)> {
    let id = json.get("id")?.as_u64()?;
    Some((
        id,
        CdpResponse {
            result: json.get("result").cloned(),
            error: json
                .get("error")
                .and_then(|e| serde_json::from_value(e.clone()).ok()),
        },
    ))
}

/// Parse a frame as a notification. Notifications carry a `method` and no
/// `id`.
fn parse_notification(json: &Value) -> Option<CdpNotification> {
    if json.get("id").is_some() {
        return None;
    }
    let method = json.get("method")?.as_str()?.to_string();
    let params = json.get("params").cloned().unwrap_or(Value::Null);
    Some(CdpNotification { method, params })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_json_shape() {
        let msg = command_json(
            42,
            "Page.navigate",
            &serde_json::json!({"url": "https://example.com"}),
        );
        assert_eq!(msg["id"], 42);
        assert_eq!(msg["method"], "Page.navigate");
        assert_eq!(msg["params"]["url"], "https://example.com");
    }

    #[test]
    fn parse_response_success() {
        let json = serde_json::json!({
            "id": 1,
            "result": { "frameId": "abc123" }
        });
        let (id, resp) = parse_response(&json).unwrap();
        assert_eq!(id, 1);
        assert!(resp.error.is_none());
        assert_eq!(resp.result.unwrap()["frameId"], "abc123");
    }

    #[test]
    fn parse_response_error() {
        let json = serde_json::json!({
            "id": 2,
            "error": { "code": -32602, "message": "Invalid params" }
        });
        let (_, resp) = parse_response(&json).unwrap();
        assert!(resp.result.is_none());
        let err = resp.error.unwrap();
        assert_eq!(err.code, -32602);
        assert_eq!(err.message, "Invalid params");
    }

    #[test]
    fn parse_response_requires_id() {
        let json = serde_json::json!({
            "method": "Page.loadEventFired",
            "params": {}
        });
        assert!(parse_response(&json).is_none());
    }

    #[test]
    fn parse_notification_valid() {
        let json = serde_json::json!({
            "method": "DOM.attributeModified",
            "params": { "nodeId": 7, "name": "value", "value": "hunter2" }
        });
        let n = parse_notification(&json).unwrap();
        assert_eq!(n.method, "DOM.attributeModified");
        assert_eq!(n.params["nodeId"], 7);
    }

    #[test]
    fn parse_notification_rejects_responses() {
        let json = serde_json::json!({
            "id": 1,
            "method": "Page.navigate",
            "result": {}
        });
        assert!(parse_notification(&json).is_none());
    }

    #[test]
    fn parse_notification_defaults_missing_params_to_null() {
        let json = serde_json::json!({ "method": "DOM.documentUpdated" });
        let n = parse_notification(&json).unwrap();
        assert_eq!(n.params, Value::Null);
    }

    #[test]
    fn wire_error_deserializes_without_data() {
        let err: CdpWireError =
            serde_json::from_str(r#"{"code": -32601, "message": "Method not found"}"#).unwrap();
        assert_eq!(err.code, -32601);
        assert_eq!(err.message, "Method not found");
    }
}
