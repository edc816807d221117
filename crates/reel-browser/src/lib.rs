//! Chrome process management and DevTools plumbing for Reel.
//!
//! This crate is the "browser capability" the recording engine drives: it
//! launches a managed Chrome with an ephemeral DevTools port, connects to
//! the page target's WebSocket, and exposes commands plus the raw
//! notification stream. It deliberately knows nothing about recorded
//! events -- normalization and masking live in `reel-recorder`.
//!
//! Modules:
//! - [`navigation`] -- fail-closed scheme gate for navigation targets.
//! - [`chrome`] -- process spawn, DevTools endpoint discovery, teardown.
//! - [`cdp`] -- JSON-RPC command/response correlation and notifications.
//! - [`page`] -- the [`BrowserCapability`] seam handed to the engine.

pub mod cdp;
pub mod chrome;
pub mod error;
pub mod navigation;
pub mod page;

pub use cdp::{CdpClient, CdpNotification, NotificationReceiver};
pub use chrome::{ChromeProcess, LaunchOptions};
pub use error::BrowserError;
pub use navigation::{validate_navigation_target, ALLOWED_SCHEMES};
pub use page::{
    AttachedPage, BrowserCapability, BrowserLauncher, ChromeLauncher, CLICK_BINDING,
};
