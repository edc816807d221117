//! Name-to-definition map for the MCP tool surface.
//!
//! The recording tools register once at startup; the server loop resolves
//! each `tools/call` against this map. Definitions are held as
//! `Arc<dyn ToolDefinition>` so a resolved tool keeps running after the
//! guard is gone.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::tools::ToolDefinition;

/// Maximum allowed length for a tool name.
const MAX_TOOL_NAME_LEN: usize = 64;

/// Summary of a registered tool, serialized in the shape `tools/list`
/// puts on the wire.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolInfo {
    fn describe(tool: &dyn ToolDefinition) -> Self {
        Self {
            name: tool.name().to_string(),
            description: tool.description().to_string(),
            input_schema: tool.input_schema(),
        }
    }
}

/// A tool name is non-empty, ASCII alphanumeric plus underscores, and at
/// most [`MAX_TOOL_NAME_LEN`] bytes.
pub fn validate_tool_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("tool name must not be empty");
    }
    if name.len() > MAX_TOOL_NAME_LEN {
        bail!("tool name exceeds maximum length of {MAX_TOOL_NAME_LEN} characters: {name}");
    }
    if name.bytes().any(|b| !b.is_ascii_alphanumeric() && b != b'_') {
        bail!("tool name must contain only alphanumeric characters and underscores: {name}");
    }
    Ok(())
}

/// An input schema is a JSON object carrying a `"type"` field.
pub fn validate_input_schema(schema: &serde_json::Value) -> Result<()> {
    match schema.as_object() {
        None => bail!("input schema must be a JSON object"),
        Some(obj) if !obj.contains_key("type") => {
            bail!("input schema must contain a \"type\" field")
        }
        Some(_) => Ok(()),
    }
}

/// Registered tools, keyed and therefore listed in name order.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<BTreeMap<String, Arc<dyn ToolDefinition>>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Arc<dyn ToolDefinition>>> {
        self.tools.read().expect("registry lock poisoned")
    }

    /// Register a tool, rejecting duplicates, bad names and bad schemas.
    pub fn register(&self, tool: Box<dyn ToolDefinition>) -> Result<()> {
        validate_tool_name(tool.name())?;
        validate_input_schema(&tool.input_schema())?;

        let mut map = self
            .tools
            .write()
            .map_err(|e| anyhow::anyhow!("registry lock poisoned: {e}"))?;
        match map.entry(tool.name().to_string()) {
            Entry::Occupied(slot) => bail!("tool already registered: {}", slot.key()),
            Entry::Vacant(slot) => {
                slot.insert(Arc::from(tool));
                Ok(())
            }
        }
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn ToolDefinition>> {
        self.read().get(name).cloned()
    }

    /// Describe every registered tool, in name order.
    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.read()
            .values()
            .map(|tool| ToolInfo::describe(tool.as_ref()))
            .collect()
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.read().len()
    }
}
