//! Managed Chrome process for recording sessions.
//!
//! Each session launches its own Chrome with an ephemeral DevTools port and
//! a throwaway profile directory, then waits for a page target to appear on
//! the DevTools HTTP endpoint. The child is spawned with `kill_on_drop` so a
//! session that dies mid-launch can never leak a browser process.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::process::{Child, Command};

use crate::error::BrowserError;

/// How the browser gets launched for one session.
#[derive(Debug, Clone)]
pub struct LaunchOptions {
    /// Launch without a visible window.
    pub headless: bool,
    /// Explicit binary path; overrides discovery when set.
    pub browser_binary: Option<String>,
    /// Extra arguments appended to the command line.
    pub extra_args: Vec<String>,
    /// Deadline for the DevTools page target to appear.
    pub attach_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self {
            headless: false,
            browser_binary: None,
            extra_args: Vec::new(),
            attach_timeout: Duration::from_secs(15),
        }
    }
}

/// A running Chrome owned by one recording session.
pub struct ChromeProcess {
    child: Child,
    page_ws_url: String,
    user_data_dir: PathBuf,
    port: u16,
}

impl ChromeProcess {
    /// Launch Chrome and wait until a DevTools page target is reachable.
    ///
    /// On any failure after the process started, the child is killed and the
    /// profile directory removed before the error is returned.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, BrowserError> {
        let port = pick_ephemeral_port()?;
        let user_data_dir = std::env::temp_dir().join(format!("reel-profile-{port}"));
        tokio::fs::create_dir_all(&user_data_dir)
            .await
            .map_err(|e| BrowserError::LaunchFailed {
                reason: format!("failed to create profile dir: {e}"),
            })?;

        let args = build_launch_args(port, &user_data_dir, options.headless, &options.extra_args);

        let mut last_error = String::from("no candidates available");
        let mut child = None;
        for candidate in binary_candidates(options.browser_binary.as_deref()) {
            match try_spawn(&candidate, &args) {
                Ok(proc) => {
                    tracing::info!(binary = %candidate, port = port, "Chrome launched");
                    child = Some(proc);
                    break;
                }
                Err(e) => last_error = format!("{candidate}: {e}"),
            }
        }
        let Some(child) = child else {
            return Err(BrowserError::LaunchFailed { reason: last_error });
        };

        let mut chrome = Self {
            child,
            page_ws_url: String::new(),
            user_data_dir,
            port,
        };

        match wait_for_page_target(port, options.attach_timeout).await {
            Ok(ws_url) => {
                chrome.page_ws_url = ws_url;
                Ok(chrome)
            }
            Err(e) => {
                chrome.shutdown().await;
                Err(e)
            }
        }
    }

    /// DevTools WebSocket URL of the page target.
    pub fn page_ws_url(&self) -> &str {
        &self.page_ws_url
    }

    /// The ephemeral DevTools port this instance listens on.
    pub fn debug_port(&self) -> u16 {
        self.port
    }

    /// Kill the browser and remove its profile directory.
    ///
    /// Best effort: failures are logged, never surfaced, so teardown cannot
    /// shadow the result of the stop that triggered it.
    pub async fn shutdown(mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::warn!(error = %e, "failed to kill Chrome child");
        }
        if let Err(e) = tokio::fs::remove_dir_all(&self.user_data_dir).await {
            tracing::debug!(error = %e, dir = %self.user_data_dir.display(),
                "failed to remove profile dir");
        }
    }
}

/// Bind port 0 to let the OS hand out a free port for DevTools.
fn pick_ephemeral_port() -> Result<u16, BrowserError> {
    let listener = std::net::TcpListener::bind(("127.0.0.1", 0)).map_err(|e| {
        BrowserError::LaunchFailed {
            reason: format!("port bind failed: {e}"),
        }
    })?;
    let port = listener
        .local_addr()
        .map_err(|e| BrowserError::LaunchFailed {
            reason: format!("port lookup failed: {e}"),
        })?
        .port();
    Ok(port)
}

/// Well-known Chrome and Chromium install locations, tried after any
/// explicit configuration.
const INSTALL_PATHS: &[&str] = &[
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
];

/// Bare command names resolved through `PATH`, tried last.
const PATH_NAMES: &[&str] = &["google-chrome", "chromium", "chrome"];

/// Spawn one candidate binary with stdio detached and kill-on-drop set.
fn try_spawn(binary: &str, args: &[String]) -> std::io::Result<Child> {
    let mut cmd = Command::new(binary);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true);
    cmd.spawn()
}

/// Chrome binaries to try, in preference order: explicit configuration, the
/// `REEL_BROWSER_BIN` environment variable, well-known install paths, then
/// bare command names resolved through `PATH`.
pub fn binary_candidates(configured: Option<&str>) -> Vec<String> {
    configured
        .map(str::to_string)
        .into_iter()
        .chain(std::env::var("REEL_BROWSER_BIN").ok())
        .filter(|path| !path.trim().is_empty())
        .chain(
            INSTALL_PATHS
                .iter()
                .chain(PATH_NAMES)
                .map(|s| s.to_string()),
        )
        .collect()
}

/// Command-line arguments for a recording-session Chrome.
pub fn build_launch_args(
    port: u16,
    user_data_dir: &Path,
    headless: bool,
    extra: &[String],
) -> Vec<String> {
    let mut args = vec![
        format!("--remote-debugging-port={port}"),
        "--remote-debugging-address=127.0.0.1".to_string(),
        format!("--user-data-dir={}", user_data_dir.display()),
        "--no-first-run".to_string(),
        "--no-default-browser-check".to_string(),
    ];
    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    for arg in extra {
        if !arg.trim().is_empty() {
            args.push(arg.to_string());
        }
    }
    args
}

/// Poll the DevTools HTTP endpoint until a page target shows up.
async fn wait_for_page_target(port: u16, timeout: Duration) -> Result<String, BrowserError> {
    let deadline = tokio::time::Instant::now() + timeout;
    let list_url = format!("http://127.0.0.1:{port}/json/list");

    loop {
        if tokio::time::Instant::now() >= deadline {
            return Err(BrowserError::AttachTimeout { duration: timeout });
        }
        if let Ok(resp) = reqwest::get(&list_url).await {
            if let Ok(targets) = resp.json::<Vec<Value>>().await {
                if let Some(ws_url) = page_ws_from_targets(&targets) {
                    return Ok(ws_url);
                }
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
}

/// Pick the first `page`-type target's WebSocket URL from a `/json/list`
/// payload. Extension and service-worker targets are skipped.
fn page_ws_from_targets(targets: &[Value]) -> Option<String> {
    targets
        .iter()
        .find(|t| t.get("type").and_then(|v| v.as_str()) == Some("page"))
        .and_then(|t| t.get("webSocketDebuggerUrl"))
        .and_then(|v| v.as_str())
        .map(str::to_string)
}
