//! Error types shared across all Reel crates.

/// Errors surfaced by the recording engine.
///
/// Every public operation resolves to one of four kinds. The string returned
/// by [`kind`](RecorderError::kind) is part of the external contract (it is
/// what callers branch on) and must stay stable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecorderError {
    /// Input rejected before any resource was touched: a disallowed URL
    /// scheme, a malformed session id, a malformed timestamp, or an
    /// unparseable sensitive-field selector.
    #[error("validation failed: {reason}")]
    Validation { reason: String },

    /// A design limit was hit: the per-session event ceiling while
    /// recording, or a file-size ceiling while persisting. Data up to the
    /// limit is preserved and reported, never silently dropped.
    #[error("capacity exceeded: {detail} (limit {limit})")]
    Capacity { limit: u64, detail: String },

    /// An external resource failed: browser launch or attach, CDP
    /// transport, file I/O. Carries the operation that triggered it.
    #[error("{operation} failed: {reason}")]
    Resource { operation: String, reason: String },

    /// No stored or active recording under the given session id.
    #[error("recording not found: {session_id}")]
    NotFound { session_id: String },
}

impl RecorderError {
    /// Shorthand for a [`Validation`](RecorderError::Validation) error.
    pub fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`Resource`](RecorderError::Resource) error.
    pub fn resource(operation: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Resource {
            operation: operation.into(),
            reason: reason.into(),
        }
    }

    /// Stable machine-readable kind string for this error.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Capacity { .. } => "capacity",
            Self::Resource { .. } => "resource",
            Self::NotFound { .. } => "not_found",
        }
    }
}
