//! Record one session interactively from the terminal.

use anyhow::{Context, Result};
use tokio::io::AsyncBufReadExt;

use reel_recorder::Recorder;
use reel_types::RecorderConfig;

/// Entry point: create a tokio runtime and run the interactive session.
pub fn run(config: RecorderConfig, url: Option<&str>, mask: &[String]) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    rt.block_on(record(config, url, mask))
}

/// Start a session, capture until ENTER is pressed, then stop it and
/// report where the recording landed.
async fn record(config: RecorderConfig, url: Option<&str>, mask: &[String]) -> Result<()> {
    let recorder = Recorder::with_chrome(config)?;
    let session_id = recorder.start_recording(url, mask).await?;

    println!("Recording session {session_id}");
    println!("Interact with the page, then press ENTER to stop.");

    // Async stdin keeps the capture pipeline running while we wait.
    let mut stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut line = String::new();
    stdin
        .read_line(&mut line)
        .await
        .context("failed to read from stdin")?;

    let outcome = recorder.stop_recording(session_id.as_str()).await?;
    println!(
        "Saved {} events to {}",
        outcome.event_count,
        outcome.file_path.display()
    );
    if outcome.truncated {
        println!("The event ceiling was reached; capture stopped early.");
    }
    Ok(())
}
