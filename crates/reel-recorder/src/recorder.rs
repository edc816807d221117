//! The recording engine's public face.
//!
//! A [`Recorder`] owns the configuration, the session registry and the
//! file-backed store, and exposes the operations the server and CLI call:
//! start and stop recordings against live browsers, and query, analyze,
//! list or delete persisted ones.

use std::sync::Arc;

use tracing::info;

use reel_browser::{BrowserLauncher, ChromeLauncher};
use reel_types::{is_valid_session_id, RecorderConfig, RecorderError, SessionId};

use crate::analyze::{analyze, AnalysisSummary};
use crate::query::{self, FilterSpec, QueryReply};
use crate::registry::SessionRegistry;
use crate::session::{RecordingSession, StopOutcome};
use crate::store::{RecordingStore, RecordingSummary};

/// Records browser sessions and serves their persisted artifacts.
pub struct Recorder {
    config: RecorderConfig,
    launcher: Arc<dyn BrowserLauncher>,
    registry: SessionRegistry,
    store: Arc<RecordingStore>,
}

impl Recorder {
    /// Builds a recorder over the given launcher. Creates the recordings
    /// directory if it does not exist yet.
    pub fn new(
        config: RecorderConfig,
        launcher: Arc<dyn BrowserLauncher>,
    ) -> Result<Self, RecorderError> {
        let store = Arc::new(RecordingStore::new(&config)?);
        Ok(Self {
            config,
            launcher,
            registry: SessionRegistry::new(),
            store,
        })
    }

    /// Builds a recorder that launches a managed Chrome.
    pub fn with_chrome(config: RecorderConfig) -> Result<Self, RecorderError> {
        Self::new(config, Arc::new(ChromeLauncher))
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    /// Launches a browser, optionally navigates it, and starts capturing
    /// events. Returns the id of the new session.
    ///
    /// The URL scheme and the sensitive selectors are validated before
    /// anything is launched.
    pub async fn start_recording(
        &self,
        url: Option<&str>,
        sensitive_selectors: &[String],
    ) -> Result<SessionId, RecorderError> {
        let session = RecordingSession::begin(
            self.launcher.as_ref(),
            &self.config,
            self.store.clone(),
            url,
            sensitive_selectors,
        )
        .await?;
        let id = session.id().clone();
        self.registry.insert(session).await;
        Ok(id)
    }

    /// Stops a session, persists its recording and returns what was
    /// written. The session leaves the registry whether or not
    /// persistence succeeded; the browser is always released.
    ///
    /// A session the event ceiling already stopped is collected here: the
    /// outcome comes back with `truncated` set and the file was written
    /// when the ceiling was hit.
    pub async fn stop_recording(&self, session_id: &str) -> Result<StopOutcome, RecorderError> {
        validate_session_id(session_id)?;
        let session = self
            .registry
            .get(session_id)
            .await
            .ok_or_else(|| RecorderError::NotFound {
                session_id: session_id.to_string(),
            })?;

        let result = session.stop().await;
        self.registry.remove(session_id).await;
        result
    }

    /// Loads a persisted recording and applies the filter. An empty
    /// filter returns metadata only; any filter returns matching events.
    ///
    /// Only stopped sessions are visible here; a session still recording
    /// is not found until it has been stopped and persisted.
    pub async fn get_recording(
        &self,
        session_id: &str,
        filters: &FilterSpec,
    ) -> Result<QueryReply, RecorderError> {
        let (recording, path) = self.store.load(session_id)?;
        query::query(&recording, &path, filters)
    }

    /// Loads a persisted recording and aggregates it into a summary.
    pub async fn analyze_recording(
        &self,
        session_id: &str,
    ) -> Result<AnalysisSummary, RecorderError> {
        let (recording, _path) = self.store.load(session_id)?;
        Ok(analyze(&recording.events))
    }

    /// Lists persisted recordings, newest first.
    pub async fn list_recordings(&self) -> Result<Vec<RecordingSummary>, RecorderError> {
        self.store.list()
    }

    /// Deletes every persisted file for the session.
    pub async fn delete_recording(&self, session_id: &str) -> Result<(), RecorderError> {
        if self.store.delete(session_id)? {
            info!(session_id, "recording deleted");
            Ok(())
        } else {
            Err(RecorderError::NotFound {
                session_id: session_id.to_string(),
            })
        }
    }

    /// Ids of sessions not yet collected by a stop request.
    pub async fn active_sessions(&self) -> Vec<String> {
        self.registry.active_ids().await
    }
}

fn validate_session_id(session_id: &str) -> Result<(), RecorderError> {
    if is_valid_session_id(session_id) {
        Ok(())
    } else {
        Err(RecorderError::Validation {
            reason: format!("invalid session id '{session_id}', expected UUID format"),
        })
    }
}
