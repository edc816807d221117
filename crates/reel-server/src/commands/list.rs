//! List persisted recordings.

use anyhow::{Context, Result};

use reel_recorder::Recorder;
use reel_types::RecorderConfig;

/// Entry point: create a tokio runtime and print the recording index.
pub fn run(config: RecorderConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    rt.block_on(list(config))
}

async fn list(config: RecorderConfig) -> Result<()> {
    let recorder = Recorder::with_chrome(config)?;
    let summaries = recorder.list_recordings().await?;

    if summaries.is_empty() {
        println!(
            "No recordings in {}",
            recorder.config().recordings_dir.display()
        );
        return Ok(());
    }

    for summary in summaries {
        println!(
            "{}  {}  {:>6} events  {}",
            summary.session_id,
            summary.start_time.format("%Y-%m-%d %H:%M:%S"),
            summary.event_count,
            summary.url.as_deref().unwrap_or("-"),
        );
    }
    Ok(())
}
