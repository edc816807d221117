//! Delete a persisted recording.

use anyhow::{Context, Result};

use reel_recorder::Recorder;
use reel_types::RecorderConfig;

/// Entry point: create a tokio runtime and delete one recording by id.
pub fn run(config: RecorderConfig, session_id: &str) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    rt.block_on(async {
        let recorder = Recorder::with_chrome(config)?;
        recorder.delete_recording(session_id).await?;
        println!("Deleted recording {session_id}");
        Ok(())
    })
}
