//! MCP tool surface for the Reel recording engine.
//!
//! This crate turns the recorder's operations into tools an agent can
//! invoke over the Model Context Protocol:
//!
//! - [`ToolDefinition`] -- the trait every tool implements
//! - [`ToolRegistry`] -- thread-safe tool storage and lookup
//! - [`recording_tools`] -- the four recording tools over a shared recorder
//! - [`McpServer`] -- JSON-RPC 2.0 loop over stdin/stdout
//!
//! The `reel` binary in this crate wires the server to real stdio and adds
//! `record`, `list`, and `delete` commands for local use.

pub mod mcp;
pub mod registry;
pub mod tools;

pub use mcp::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, McpServer};
pub use registry::{validate_input_schema, validate_tool_name, ToolInfo, ToolRegistry};
pub use tools::{recording_tools, ToolDefinition};
