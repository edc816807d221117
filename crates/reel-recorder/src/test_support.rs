//! Scripted browser for exercising the engine without a real Chrome.
//!
//! Tests drive notifications in by hand and observe every command the
//! engine issued against the page.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::mpsc;

use reel_browser::{
    AttachedPage, BrowserCapability, BrowserError, BrowserLauncher, CdpNotification,
    LaunchOptions, CLICK_BINDING,
};

/// Observable state shared by a scripted launcher and its pages.
#[derive(Default)]
pub struct ScriptedState {
    pub launches: AtomicUsize,
    pub navigations: Mutex<Vec<String>>,
    pub evaluations: AtomicUsize,
    pub dom_tracks: AtomicUsize,
    pub closed: AtomicBool,
    pub fail_launch: AtomicBool,
    pub fail_navigate: AtomicBool,
    pub fail_evaluate: AtomicBool,
    notifier: Mutex<Option<mpsc::UnboundedSender<CdpNotification>>>,
}

/// A launcher whose pages record commands instead of running a browser.
pub struct ScriptedBrowser {
    pub state: Arc<ScriptedState>,
}

impl ScriptedBrowser {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Arc::new(ScriptedState::default()),
        })
    }

    /// Feeds a notification into the page's stream, as if the browser had
    /// emitted it. Dropped silently once ingestion has shut down.
    pub fn notify(&self, notification: CdpNotification) {
        let notifier = self.state.notifier.lock().unwrap();
        match notifier.as_ref() {
            Some(tx) => {
                let _ = tx.send(notification);
            }
            None => panic!("notify called before launch"),
        }
    }
}

#[async_trait]
impl BrowserLauncher for ScriptedBrowser {
    async fn launch(&self, _options: &LaunchOptions) -> Result<AttachedPage, BrowserError> {
        if self.state.fail_launch.load(Ordering::SeqCst) {
            return Err(BrowserError::LaunchFailed {
                reason: "scripted launch failure".into(),
            });
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::unbounded_channel();
        *self.state.notifier.lock().unwrap() = Some(tx);
        Ok(AttachedPage {
            capability: Box::new(ScriptedPage {
                state: self.state.clone(),
            }),
            notifications: rx,
        })
    }
}

struct ScriptedPage {
    state: Arc<ScriptedState>,
}

#[async_trait]
impl BrowserCapability for ScriptedPage {
    async fn navigate(&self, url: &str) -> Result<(), BrowserError> {
        if self.state.fail_navigate.load(Ordering::SeqCst) {
            return Err(BrowserError::NavigationFailed {
                reason: "scripted navigation failure".into(),
            });
        }
        self.state.navigations.lock().unwrap().push(url.to_string());
        Ok(())
    }

    async fn evaluate(&self, _expression: &str) -> Result<Value, BrowserError> {
        self.state.evaluations.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_evaluate.load(Ordering::SeqCst) {
            return Err(BrowserError::JsException {
                message: "scripted evaluation failure".into(),
            });
        }
        Ok(Value::Null)
    }

    async fn track_dom(&self) -> Result<(), BrowserError> {
        self.state.dom_tracks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.state.closed.store(true, Ordering::SeqCst);
    }
}

pub fn console_notification(text: &str) -> CdpNotification {
    CdpNotification {
        method: "Runtime.consoleAPICalled".into(),
        params: json!({
            "type": "log",
            "args": [{ "type": "string", "value": text }],
        }),
    }
}

pub fn js_error_notification(description: &str) -> CdpNotification {
    CdpNotification {
        method: "Runtime.exceptionThrown".into(),
        params: json!({
            "exceptionDetails": {
                "text": "Uncaught",
                "exception": { "description": description },
            },
        }),
    }
}

/// A click reported through the page binding, with the given tag and
/// attributes.
pub fn click_notification_with(tag: &str, attributes: Value) -> CdpNotification {
    let payload = json!({
        "tagName": tag,
        "id": null,
        "attributes": attributes,
        "coordinates": { "x": 10, "y": 20, "pageX": 10, "pageY": 20 },
        "url": "https://example.com/",
    });
    CdpNotification {
        method: "Runtime.bindingCalled".into(),
        params: json!({
            "name": CLICK_BINDING,
            "payload": payload.to_string(),
        }),
    }
}

pub fn click_notification(tag: &str) -> CdpNotification {
    click_notification_with(tag, json!({}))
}

pub fn attribute_notification(node_id: u64, name: &str, value: &str) -> CdpNotification {
    CdpNotification {
        method: "DOM.attributeModified".into(),
        params: json!({ "nodeId": node_id, "name": name, "value": value }),
    }
}

pub fn document_updated_notification() -> CdpNotification {
    CdpNotification {
        method: "DOM.documentUpdated".into(),
        params: json!({}),
    }
}

/// Polls `cond` until it holds, panicking after a couple of seconds. The
/// pipeline ingests asynchronously, so tests wait instead of asserting
/// immediately after a notify.
pub async fn wait_for<F, Fut>(what: &str, mut cond: F)
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    for _ in 0..200 {
        if cond().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("timed out waiting for {what}");
}
