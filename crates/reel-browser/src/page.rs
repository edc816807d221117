//! Page-level capability handed to the recording engine.
//!
//! [`BrowserCapability`] is the seam between the engine and a real browser:
//! the engine drives navigation, script injection, and DOM tracking through
//! it, and receives raw notifications through the channel bundled in
//! [`AttachedPage`]. Tests substitute a scripted implementation; production
//! uses [`ChromeLauncher`], which spawns Chrome and wires up the DevTools
//! connection.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::cdp::{CdpClient, NotificationReceiver};
use crate::chrome::{ChromeProcess, LaunchOptions};
use crate::error::BrowserError;

/// Name of the CDP binding the click tracker reports through. Registered
/// once per target; bindings survive navigations even though injected
/// scripts do not.
pub const CLICK_BINDING: &str = "recordClick";

/// What the recording engine needs from a live page.
#[async_trait]
pub trait BrowserCapability: Send + Sync {
    /// Navigate the page. The target has already passed the scheme gate.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;

    /// Evaluate JavaScript in the page, returning its value.
    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError>;

    /// (Re)request the document so DOM mutation notifications flow. Chrome
    /// only notifies about nodes the client has been told about, and the
    /// node table resets on navigation.
    async fn track_dom(&self) -> Result<(), BrowserError>;

    /// Tear the page down: close the connection and reap the browser.
    /// Idempotent and best effort; failures are logged by the
    /// implementation, never returned.
    async fn close(&self);
}

/// A connected page plus its notification stream, ready for recording.
pub struct AttachedPage {
    /// Command-side capability.
    pub capability: Box<dyn BrowserCapability>,
    /// Raw notification stream for the connection.
    pub notifications: NotificationReceiver,
}

/// Produces attached pages. The engine depends on this trait so tests can
/// inject scripted browsers; [`ChromeLauncher`] is the production
/// implementation.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &LaunchOptions) -> Result<AttachedPage, BrowserError>;
}

/// Launches a managed Chrome and attaches to its page target.
#[derive(Debug, Default)]
pub struct ChromeLauncher;

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self, options: &LaunchOptions) -> Result<AttachedPage, BrowserError> {
        let chrome = ChromeProcess::launch(options).await?;

        // From here on the child is running: every failure path must reap
        // it before surfacing the error.
        let (client, notifications) = match CdpClient::connect(chrome.page_ws_url()).await {
            Ok(pair) => pair,
            Err(e) => {
                chrome.shutdown().await;
                return Err(e);
            }
        };

        if let Err(e) = prepare_recording_target(&client).await {
            chrome.shutdown().await;
            return Err(e);
        }

        let page = PageSession {
            client,
            chrome: Mutex::new(Some(chrome)),
        };
        Ok(AttachedPage {
            capability: Box::new(page),
            notifications,
        })
    }
}

/// Enable the domains a recording needs and register the click binding.
async fn prepare_recording_target(client: &CdpClient) -> Result<(), BrowserError> {
    client.enable_domain("Page").await?;
    client.enable_domain("DOM").await?;
    client.enable_domain("Runtime").await?;
    client
        .send_command(
            "Runtime.addBinding",
            serde_json::json!({ "name": CLICK_BINDING }),
        )
        .await?;
    // Prime the DOM node table so mutation notifications start flowing.
    client
        .send_command("DOM.getDocument", serde_json::json!({ "depth": -1 }))
        .await?;
    Ok(())
}

/// Real page capability backed by a managed Chrome.
struct PageSession {
    client: CdpClient,
    /// Taken on the first `close`; later calls find it gone.
    chrome: Mutex<Option<ChromeProcess>>,
}

#[async_trait]
impl BrowserCapability for PageSession {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        let result = self
            .client
            .send_command("Page.navigate", serde_json::json!({ "url": url }))
            .await?;
        if let Some(reason) = navigation_error(&result) {
            return Err(BrowserError::NavigationFailed { reason });
        }
        Ok(())
    }

    async fn evaluate(&self, expression: &str) -> Result<Value, BrowserError> {
        let result = self
            .client
            .send_command(
                "Runtime.evaluate",
                serde_json::json!({
                    "expression": expression,
                    "returnByValue": true,
                    "awaitPromise": true,
                }),
            )
            .await?;

        if let Some(details) = result.get("exceptionDetails") {
            return Err(BrowserError::JsException {
                message: exception_message(details),
            });
        }

        Ok(result
            .get("result")
            .and_then(|r| r.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn track_dom(&self) -> Result<(), BrowserError> {
        self.client
            .send_command("DOM.getDocument", serde_json::json!({ "depth": -1 }))
            .await?;
        Ok(())
    }

    async fn close(&self) {
        // Reaping Chrome tears the DevTools socket down with it; the
        // client's reader task exits when the connection drops.
        if let Some(chrome) = self.chrome.lock().await.take() {
            chrome.shutdown().await;
        }
    }
}

/// Extract the `errorText` a failed `Page.navigate` reports, if any.
fn navigation_error(result: &Value) -> Option<String> {
    result
        .get("errorText")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Human-readable message from `exceptionDetails` of `Runtime.evaluate`.
fn exception_message(details: &Value) -> String {
    details
        .get("exception")
        .and_then(|e| e.get("description"))
        .and_then(|d| d.as_str())
        .or_else(|| details.get("text").and_then(|t| t.as_str()))
        .unwrap_or("unknown exception")
        .to_string()
}
