//! Error types for the reel-browser crate.

use std::time::Duration;

use thiserror::Error;

use reel_types::RecorderError;

/// Errors that can occur while launching or driving the browser.
#[derive(Debug, Error)]
pub enum BrowserError {
    /// The navigation target was rejected before any process was spawned.
    #[error("navigation target rejected: {url} (scheme '{scheme}' not allowed)")]
    DisallowedTarget { url: String, scheme: String },

    /// No usable Chrome/Chromium binary could be started.
    #[error("browser launch failed: {reason}")]
    LaunchFailed { reason: String },

    /// The DevTools endpoint never became reachable after launch.
    #[error("no DevTools page target appeared within {duration:?}")]
    AttachTimeout { duration: Duration },

    /// Failed to establish the DevTools WebSocket connection.
    #[error("failed to connect to DevTools at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    /// A CDP command returned an error response.
    #[error("CDP command '{method}' failed with code {code}: {message}")]
    CdpError {
        method: String,
        code: i64,
        message: String,
    },

    /// A CDP command timed out waiting for a response.
    #[error("CDP command '{method}' timed out after {duration:?}")]
    Timeout { method: String, duration: Duration },

    /// A protocol-level error (serialization, unexpected message format).
    #[error("CDP protocol error: {detail}")]
    Protocol { detail: String },

    /// Navigation was accepted by the scheme gate but failed in the browser.
    #[error("navigation failed: {reason}")]
    NavigationFailed { reason: String },

    /// Injected JavaScript threw an exception.
    #[error("JavaScript exception: {message}")]
    JsException { message: String },
}

/// Map browser failures onto the engine-wide taxonomy.
///
/// A rejected navigation target is a validation failure (nothing was
/// launched); everything else is a resource failure carrying the operation
/// that triggered it.
impl From<BrowserError> for RecorderError {
    fn from(err: BrowserError) -> Self {
        match &err {
            BrowserError::DisallowedTarget { .. } => RecorderError::Validation {
                reason: err.to_string(),
            },
            BrowserError::LaunchFailed { .. } => {
                RecorderError::resource("browser launch", err.to_string())
            }
            BrowserError::AttachTimeout { .. } | BrowserError::ConnectionFailed { .. } => {
                RecorderError::resource("browser attach", err.to_string())
            }
            BrowserError::NavigationFailed { .. } => {
                RecorderError::resource("navigation", err.to_string())
            }
            BrowserError::JsException { .. } => {
                RecorderError::resource("script injection", err.to_string())
            }
            BrowserError::CdpError { method, .. } | BrowserError::Timeout { method, .. } => {
                RecorderError::resource(format!("CDP {method}"), err.to_string())
            }
            BrowserError::Protocol { .. } => {
                RecorderError::resource("CDP transport", err.to_string())
            }
        }
    }
}
