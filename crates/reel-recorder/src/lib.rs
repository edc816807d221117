//! The Reel recording engine.
//!
//! Everything between the browser capability and the transport lives
//! here: notifications are normalized into events, masked, appended to a
//! per-session log, and persisted as JSON files that the query and
//! analysis paths read back.
//!
//! Modules:
//! - [`event`] -- CDP notifications normalized into the uniform event shape.
//! - [`masking`] -- sensitive-field masking applied before events reach the log.
//! - [`pipeline`] -- the per-session ingestion task and bounded event log.
//! - [`session`] -- lifecycle of one recording, launch through persisted file.
//! - [`registry`] -- map of sessions awaiting collection.
//! - [`store`] -- validated, size-capped recording files on disk.
//! - [`query`] -- filtered reads over persisted recordings.
//! - [`analyze`] -- aggregate summaries of persisted recordings.
//! - [`recorder`] -- the facade the server and CLI drive.

pub mod analyze;
pub mod event;
pub mod masking;
pub mod pipeline;
pub mod query;
pub mod recorder;
pub mod registry;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use analyze::{analyze, AnalysisSummary};
pub use event::{kind, RecordedEvent};
pub use masking::{MaskingFilter, SensitiveMatcher, MASKED_VALUE};
pub use pipeline::{EventLog, EventObserver, EventPipeline};
pub use query::{EventSlice, FilterSpec, Metadata, QueryReply};
pub use recorder::Recorder;
pub use registry::SessionRegistry;
pub use session::{RecordingSession, StopOutcome};
pub use store::{Recording, RecordingMetadata, RecordingStore, RecordingSummary};
