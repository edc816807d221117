//! Process-wide map of live recording sessions.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::session::RecordingSession;

/// Thread-safe registry of sessions a stop request has not collected yet.
///
/// A session forced to stop by the event ceiling stays registered so the
/// eventual stop request can retrieve its outcome. The registry has its
/// own lock; it is never held while a session is being started or torn
/// down, only around map operations.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RwLock<HashMap<String, Arc<RecordingSession>>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Add a session under its own id.
    pub async fn insert(&self, session: Arc<RecordingSession>) {
        let id = session.id().as_str().to_string();
        let mut sessions = self.inner.write().await;
        sessions.insert(id, session);
    }

    /// Look up a session by id, returning `None` if not registered.
    pub async fn get(&self, session_id: &str) -> Option<Arc<RecordingSession>> {
        let sessions = self.inner.read().await;
        sessions.get(session_id).cloned()
    }

    /// Drop a session from the registry, returning it if it was present.
    pub async fn remove(&self, session_id: &str) -> Option<Arc<RecordingSession>> {
        let mut sessions = self.inner.write().await;
        sessions.remove(session_id)
    }

    /// Number of registered sessions.
    pub async fn active_count(&self) -> usize {
        let sessions = self.inner.read().await;
        sessions.len()
    }

    /// Ids of all registered sessions, in stable order.
    pub async fn active_ids(&self) -> Vec<String> {
        let sessions = self.inner.read().await;
        let mut ids: Vec<String> = sessions.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
