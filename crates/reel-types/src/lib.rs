//! Core types shared across all Reel crates.
//!
//! Defines the error taxonomy, the strongly-typed session identifier, and
//! the runtime configuration used by the browser capability, the recording
//! engine, and the tool surface.

pub mod config;
pub mod error;
pub mod ids;

pub use config::{
    RecorderConfig, DEFAULT_LAUNCH_TIMEOUT_SECS, DEFAULT_MAX_EVENTS, DEFAULT_MAX_LOAD_BYTES,
    DEFAULT_MAX_SAVE_BYTES,
};
pub use error::RecorderError;
pub use ids::{is_valid_session_id, SessionId};
