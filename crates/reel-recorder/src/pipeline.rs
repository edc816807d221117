//! Concurrent event-ingestion pipeline.
//!
//! [`EventPipeline`] drains the raw notification stream of one attached
//! page on a background task. Each notification is normalized and masked
//! before the log lock is taken, appended under the lock, and then handed
//! to an optional observer outside the critical section. The log is
//! bounded: reaching the event ceiling halts ingestion and raises a
//! capacity signal instead of silently dropping events.
//!
//! Shutdown is a barrier. Once requested, no new notifications are
//! accepted, but everything already queued is drained into the log before
//! the task exits, so a stop never races an in-flight append.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reel_browser::{CdpNotification, NotificationReceiver};
use tokio::sync::{oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::event::{normalize, RecordedEvent};
use crate::masking::MaskingFilter;

/// Callback invoked after each successful append, outside the log lock.
/// Best effort: observers cannot influence whether the append happened.
pub type EventObserver = Arc<dyn Fn(&RecordedEvent) + Send + Sync>;

/// Bounded, append-only event log shared between the pipeline task and
/// the owning session. The mutex scope is one session; concurrently
/// recording sessions never contend on each other's log.
pub struct EventLog {
    events: Mutex<Vec<RecordedEvent>>,
    max_events: usize,
    truncated: AtomicBool,
}

impl EventLog {
    pub fn new(max_events: usize) -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            max_events,
            truncated: AtomicBool::new(false),
        }
    }

    /// Appends one event. Returns `false` without storing anything once
    /// the ceiling is reached, and remembers that truncation happened.
    async fn append(&self, event: RecordedEvent) -> bool {
        let mut events = self.events.lock().await;
        if events.len() >= self.max_events {
            self.truncated.store(true, Ordering::Relaxed);
            return false;
        }
        events.push(event);
        true
    }

    pub async fn len(&self) -> usize {
        self.events.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.events.lock().await.is_empty()
    }

    /// Copies the current contents in append order.
    pub async fn snapshot(&self) -> Vec<RecordedEvent> {
        self.events.lock().await.clone()
    }

    /// Moves the contents out, leaving the log empty. Used once at
    /// session finalization, after the pipeline has shut down.
    pub async fn take(&self) -> Vec<RecordedEvent> {
        std::mem::take(&mut *self.events.lock().await)
    }

    /// Whether an append was ever refused because the ceiling was hit.
    pub fn truncated(&self) -> bool {
        self.truncated.load(Ordering::Relaxed)
    }

    pub fn max_events(&self) -> usize {
        self.max_events
    }
}

/// Background ingestion task plus the handles to control it.
pub struct EventPipeline {
    shutdown_tx: oneshot::Sender<()>,
    handle: JoinHandle<()>,
    capacity_rx: watch::Receiver<bool>,
}

impl EventPipeline {
    /// Spawns the ingestion task over a page's notification stream.
    pub fn start(
        notifications: NotificationReceiver,
        filter: Arc<MaskingFilter>,
        log: Arc<EventLog>,
        observer: Option<EventObserver>,
    ) -> Self {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (capacity_tx, capacity_rx) = watch::channel(false);
        let handle = tokio::spawn(ingest_task(
            notifications,
            filter,
            log,
            observer,
            shutdown_rx,
            capacity_tx,
        ));
        debug!("event pipeline started");
        Self {
            shutdown_tx,
            handle,
            capacity_rx,
        }
    }

    /// Receiver that flips to `true` when the event ceiling halts
    /// ingestion. The session watches this to force a stop.
    pub fn capacity_signal(&self) -> watch::Receiver<bool> {
        self.capacity_rx.clone()
    }

    /// Stops ingestion after draining queued notifications into the log.
    /// Returns once the background task has fully exited; the log is
    /// final afterwards.
    pub async fn shutdown(self) {
        // The task may have already exited on capacity or stream close;
        // a dead receiver is fine.
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.handle.await {
            error!(error = %e, "event pipeline task failed during shutdown");
        }
    }
}

async fn ingest_task(
    mut notifications: NotificationReceiver,
    filter: Arc<MaskingFilter>,
    log: Arc<EventLog>,
    observer: Option<EventObserver>,
    mut shutdown_rx: oneshot::Receiver<()>,
    capacity_tx: watch::Sender<bool>,
) {
    loop {
        tokio::select! {
            // The stop barrier wins over new input; queued notifications
            // still drain below.
            biased;

            _ = &mut shutdown_rx => {
                drain_queued(&mut notifications, &filter, &log, observer.as_ref()).await;
                debug!("event pipeline shut down after drain");
                return;
            }
            maybe = notifications.recv() => {
                match maybe {
                    Some(notification) => {
                        if !ingest_one(notification, &filter, &log, observer.as_ref()).await {
                            warn!(
                                limit = log.max_events(),
                                "event ceiling reached, halting ingestion"
                            );
                            let _ = capacity_tx.send(true);
                            return;
                        }
                    }
                    None => {
                        debug!("notification stream closed, event pipeline exiting");
                        return;
                    }
                }
            }
        }
    }
}

/// Drains everything already queued when shutdown was requested.
async fn drain_queued(
    notifications: &mut NotificationReceiver,
    filter: &MaskingFilter,
    log: &EventLog,
    observer: Option<&EventObserver>,
) {
    // Closing first makes the barrier explicit: senders can no longer
    // enqueue, and try_recv observes only what was in flight.
    notifications.close();
    while let Ok(notification) = notifications.try_recv() {
        if !ingest_one(notification, filter, log, observer).await {
            warn!(
                limit = log.max_events(),
                "event ceiling reached while draining, remaining notifications discarded"
            );
            return;
        }
    }
}

/// Normalize, mask, append, notify. Returns `false` when the ceiling
/// refused the append.
async fn ingest_one(
    notification: CdpNotification,
    filter: &MaskingFilter,
    log: &EventLog,
    observer: Option<&EventObserver>,
) -> bool {
    // Normalization and masking stay outside the log lock.
    let mut event = match normalize(&notification) {
        Some(event) => event,
        None => return true,
    };
    filter.apply(&mut event);

    let for_observer = observer.map(|_| event.clone());
    if !log.append(event).await {
        return false;
    }
    if let (Some(observer), Some(event)) = (observer, for_observer) {
        observer(&event);
    }
    true
}
