//! One recording session from browser launch to persisted file.
//!
//! A [`RecordingSession`] owns the page capability, the event pipeline and
//! the in-memory log for a single browser. Stopping is funneled through one
//! lock so that an explicit stop request and the forced stop on a full log
//! cannot tear the same browser down twice.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, warn};

use reel_browser::{
    validate_navigation_target, AttachedPage, BrowserCapability, BrowserLauncher, LaunchOptions,
};
use reel_types::{RecorderConfig, RecorderError, SessionId};

use crate::event::{kind, RecordedEvent};
use crate::masking::MaskingFilter;
use crate::pipeline::{EventLog, EventObserver, EventPipeline};
use crate::store::{Recording, RecordingMetadata, RecordingStore};

/// How long to wait after a `document_updated` notification before
/// re-injecting the click tracker. The notification fires at the start of a
/// navigation, before the new document is ready to run scripts.
const REINJECT_SETTLE: Duration = Duration::from_millis(500);

/// Script injected into every document to report clicks through the
/// `recordClick` binding. Re-applied after navigations; the guard flag makes
/// a duplicate injection into the same document a no-op.
const CLICK_TRACKER_JS: &str = r#"
(function() {
    if (window.__clickTrackerInstalled) {
        return;
    }
    window.__clickTrackerInstalled = true;

    function getXPath(element) {
        if (element.id !== '') {
            return '//*[@id="' + element.id + '"]';
        }
        if (element === document.body) {
            return '/html/body';
        }

        let ix = 0;
        const siblings = element.parentNode ? element.parentNode.childNodes : [];
        for (let i = 0; i < siblings.length; i++) {
            const sibling = siblings[i];
            if (sibling === element) {
                const parentPath = element.parentNode ? getXPath(element.parentNode) : '';
                return parentPath + '/' + element.tagName.toLowerCase() + '[' + (ix + 1) + ']';
            }
            if (sibling.nodeType === 1 && sibling.tagName === element.tagName) {
                ix++;
            }
        }
        return '';
    }

    function getCSSSelector(element) {
        if (element.id) {
            return '#' + element.id;
        }

        let path = [];
        while (element && element.nodeType === Node.ELEMENT_NODE) {
            let selector = element.nodeName.toLowerCase();
            if (element.className) {
                const classes = element.className.trim().split(/\s+/).filter(c => c);
                if (classes.length > 0) {
                    selector += '.' + classes.join('.');
                }
            }
            path.unshift(selector);
            element = element.parentNode;
        }
        return path.join(' > ');
    }

    function getAttributes(element) {
        const attrs = {};
        for (let i = 0; i < element.attributes.length; i++) {
            const attr = element.attributes[i];
            attrs[attr.name] = attr.value;
        }
        return attrs;
    }

    document.addEventListener('click', function(event) {
        const element = event.target;

        const clickData = {
            tagName: element.tagName,
            id: element.id || null,
            className: element.className || null,
            classList: element.classList ? Array.from(element.classList) : [],
            attributes: getAttributes(element),
            textContent: element.textContent ? element.textContent.trim().substring(0, 200) : null,
            innerHTML: element.innerHTML ? element.innerHTML.substring(0, 500) : null,
            xpath: getXPath(element),
            cssSelector: getCSSSelector(element),
            href: element.href || null,
            src: element.src || null,
            coordinates: {
                x: event.clientX,
                y: event.clientY,
                pageX: event.pageX,
                pageY: event.pageY
            },
            viewport: {
                width: window.innerWidth,
                height: window.innerHeight
            },
            url: window.location.href
        };

        window.recordClick(JSON.stringify(clickData));
    }, true);
})();
"#;

/// What a finished session left behind.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StopOutcome {
    /// Path the recording was written to.
    pub file_path: std::path::PathBuf,
    /// Number of events persisted.
    pub event_count: usize,
    /// Whether the event ceiling cut the recording short.
    pub truncated: bool,
}

/// Lifecycle phase, guarded by the session's phase lock.
enum Phase {
    /// Browser attached, pipeline ingesting.
    Recording {
        capability: Arc<dyn BrowserCapability>,
        pipeline: EventPipeline,
    },
    /// Teardown in flight. Only ever observed as the placeholder while the
    /// phase lock is held by the stopping task.
    Stopping,
    /// Teardown finished; the outcome is replayed to later stop calls.
    Stopped(StopOutcome),
    /// Teardown or persistence failed after the browser was released.
    Failed(String),
}

/// A live (or finished) recording for one browser page.
pub struct RecordingSession {
    id: SessionId,
    url: Option<String>,
    start_time: DateTime<Utc>,
    log: Arc<EventLog>,
    filter: Arc<MaskingFilter>,
    store: Arc<RecordingStore>,
    phase: Mutex<Phase>,
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("id", &self.id)
            .field("url", &self.url)
            .field("start_time", &self.start_time)
            .finish_non_exhaustive()
    }
}

impl RecordingSession {
    /// Validates inputs, launches a browser and starts ingesting events.
    ///
    /// The navigation target and the sensitive selectors are checked before
    /// any process is spawned, so a validation failure never leaks a
    /// browser. A navigation failure after launch tears the browser down
    /// before the error propagates; a failed script injection only costs
    /// click events and is logged instead.
    pub(crate) async fn begin(
        launcher: &dyn BrowserLauncher,
        config: &RecorderConfig,
        store: Arc<RecordingStore>,
        url: Option<&str>,
        sensitive_selectors: &[String],
    ) -> Result<Arc<Self>, RecorderError> {
        if let Some(target) = url {
            validate_navigation_target(target)?;
        }
        let filter = Arc::new(MaskingFilter::new(sensitive_selectors)?);

        let options = LaunchOptions {
            headless: config.headless,
            browser_binary: config.browser_binary.clone(),
            extra_args: config.extra_browser_args.clone(),
            attach_timeout: config.launch_timeout(),
        };
        let AttachedPage {
            capability,
            notifications,
        } = launcher.launch(&options).await?;
        let capability: Arc<dyn BrowserCapability> = Arc::from(capability);

        if let Err(err) = capability.evaluate(CLICK_TRACKER_JS).await {
            warn!(error = %err, "click tracker injection failed; clicks will not be recorded");
        }

        if let Some(target) = url {
            if let Err(err) = capability.navigate(target).await {
                capability.close().await;
                return Err(err.into());
            }
            if let Err(err) = capability.track_dom().await {
                debug!(error = %err, "DOM tracking request failed after navigation");
            }
        }

        let id = SessionId::generate();
        let start_time = Utc::now();
        let log = Arc::new(EventLog::new(config.max_events));

        // Re-inject the click tracker once the new document has settled.
        // The injected guard flag dies with the old document, so rapid
        // navigations at worst schedule redundant no-op evaluations.
        let observer: EventObserver = {
            let capability = capability.clone();
            Arc::new(move |event: &RecordedEvent| {
                if event.kind == kind::DOCUMENT_UPDATED {
                    tokio::spawn(reinject_tracker(capability.clone()));
                }
            })
        };

        let pipeline = EventPipeline::start(notifications, filter.clone(), log.clone(), Some(observer));
        let capacity = pipeline.capacity_signal();

        let session = Arc::new(Self {
            id,
            url: url.map(str::to_owned),
            start_time,
            log,
            filter,
            store,
            phase: Mutex::new(Phase::Recording {
                capability,
                pipeline,
            }),
        });
        spawn_capacity_monitor(session.clone(), capacity);

        info!(
            session_id = %session.id,
            url = url.unwrap_or("about:blank"),
            max_events = config.max_events,
            "recording session started"
        );
        Ok(session)
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Events ingested so far (final count once stopped).
    pub async fn event_count(&self) -> usize {
        self.log.len().await
    }

    /// Whether the session is still ingesting events.
    pub async fn is_active(&self) -> bool {
        matches!(*self.phase.lock().await, Phase::Recording { .. })
    }

    /// Stops the session: drains the pipeline, releases the browser and
    /// persists the recording.
    ///
    /// Safe to call more than once; later calls (including the racing
    /// forced stop on a full log) replay the first call's outcome. The
    /// browser is released even when persistence fails.
    pub async fn stop(&self) -> Result<StopOutcome, RecorderError> {
        let mut phase = self.phase.lock().await;
        match std::mem::replace(&mut *phase, Phase::Stopping) {
            Phase::Recording {
                capability,
                pipeline,
            } => {
                let result = self.finalize(capability, pipeline).await;
                *phase = match &result {
                    Ok(outcome) => Phase::Stopped(outcome.clone()),
                    Err(err) => Phase::Failed(err.to_string()),
                };
                result
            }
            Phase::Stopped(outcome) => {
                let replay = outcome.clone();
                *phase = Phase::Stopped(outcome);
                Ok(replay)
            }
            Phase::Failed(reason) => {
                let err = RecorderError::resource("stop recording", reason.clone());
                *phase = Phase::Failed(reason);
                Err(err)
            }
            // The lock is held for the whole teardown, so a caller can
            // never observe the placeholder.
            Phase::Stopping => Err(RecorderError::resource(
                "stop recording",
                "stop already in progress",
            )),
        }
    }

    async fn finalize(
        &self,
        capability: Arc<dyn BrowserCapability>,
        pipeline: EventPipeline,
    ) -> Result<StopOutcome, RecorderError> {
        debug!(session_id = %self.id, "stopping recording session");

        // Drain queued notifications so the log is final, then stamp the
        // end time and release the browser before touching the disk.
        pipeline.shutdown().await;
        let end_time = Utc::now();
        capability.close().await;

        let events = self.log.take().await;
        let truncated = self.log.truncated();
        let event_count = events.len();

        let recording = Recording {
            session_id: self.id.to_string(),
            url: self.url.clone(),
            start_time: self.start_time,
            end_time,
            events,
            metadata: RecordingMetadata {
                saved_at: Utc::now(),
                event_count,
            },
        };
        let file_path = self.store.save(&recording)?;

        info!(
            session_id = %self.id,
            events = event_count,
            truncated,
            masked = self.filter.masked_total(),
            path = %file_path.display(),
            "recording stopped"
        );
        Ok(StopOutcome {
            file_path,
            event_count,
            truncated,
        })
    }
}

/// Re-applies the click tracker and DOM tracking after a navigation.
async fn reinject_tracker(capability: Arc<dyn BrowserCapability>) {
    tokio::time::sleep(REINJECT_SETTLE).await;
    if let Err(err) = capability.evaluate(CLICK_TRACKER_JS).await {
        warn!(error = %err, "click tracker re-injection failed");
        return;
    }
    if let Err(err) = capability.track_dom().await {
        debug!(error = %err, "DOM tracking request failed after re-injection");
    }
    debug!("click tracker re-injected after navigation");
}

/// Forces a stop when the pipeline reports a full log. Exits quietly when
/// the pipeline shuts down without hitting the ceiling.
fn spawn_capacity_monitor(session: Arc<RecordingSession>, mut capacity: watch::Receiver<bool>) {
    tokio::spawn(async move {
        if capacity.wait_for(|reached| *reached).await.is_err() {
            return;
        }
        warn!(
            session_id = %session.id,
            limit = session.log.max_events(),
            "event ceiling reached, stopping session"
        );
        if let Err(err) = session.stop().await {
            error!(session_id = %session.id, error = %err, "forced stop after event ceiling failed");
        }
    });
}
