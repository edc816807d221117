//! Serve the recording tools over MCP on stdio.

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use reel_recorder::Recorder;
use reel_server::{recording_tools, McpServer, ToolRegistry};
use reel_types::RecorderConfig;

/// Entry point: create a tokio runtime and run the stdio server.
pub fn run(config: RecorderConfig) -> Result<()> {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;
    rt.block_on(serve(config))
}

/// Build a recorder, register the recording tools, and answer JSON-RPC
/// requests on stdin/stdout until EOF.
async fn serve(config: RecorderConfig) -> Result<()> {
    let recorder = Arc::new(Recorder::with_chrome(config)?);

    let registry = ToolRegistry::new();
    for tool in recording_tools(recorder) {
        registry.register(tool)?;
    }
    info!(tools = registry.tool_count(), "serving MCP on stdio");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    McpServer::new(registry).run(stdin, tokio::io::stdout()).await
}
