//! Reel records live browser sessions over the Chrome DevTools Protocol:
//! clicks, DOM mutations, console output, and JS exceptions flow into an
//! ordered, masked, size-bounded event log that can be persisted and queried.
//!
//! This meta-crate re-exports the workspace members under short names; see
//! the individual crates for the actual machinery:
//!
//! - [`types`] -- errors, session identifiers, configuration.
//! - [`browser`] -- Chrome process management and the CDP client.
//! - [`recorder`] -- the recording engine: pipeline, masking, lifecycle,
//!   registry, query, persistence.
//! - [`server`] -- MCP tool surface and the `reel` CLI.

pub use reel_browser as browser;
pub use reel_recorder as recorder;
pub use reel_server as server;
pub use reel_types as types;
