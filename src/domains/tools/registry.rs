//! Tool Registry - central registration and dispatch for all tools.
//!
//! This module provides:
//! - A registry of all available tools
//! - HTTP dispatch for tool calls (when http feature is enabled)
//! - Tool metadata for listing

use std::sync::Arc;
#[cfg(feature = "http")]
use tracing::warn;

use rmcp::model::Tool;

use crate::core::security::CredentialVerifier;
use crate::core::workspace::Workspace;

use super::definitions::{AuthStatusTool, FileInfoTool, FilesGetTool};

/// Tool registry - holds the shared dependencies every tool call needs.
pub struct ToolRegistry {
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    workspace: Arc<Workspace>,
    #[cfg_attr(not(feature = "http"), allow(dead_code))]
    credentials: Arc<CredentialVerifier>,
}

impl ToolRegistry {
    /// Create a new tool registry.
    pub fn new(workspace: Arc<Workspace>, credentials: Arc<CredentialVerifier>) -> Self {
        Self {
            workspace,
            credentials,
        }
    }

    /// Get all tool names.
    pub fn tool_names(&self) -> Vec<&'static str> {
        vec![
            AuthStatusTool::NAME,
            FileInfoTool::NAME,
            FilesGetTool::NAME,
        ]
    }

    /// Get all tools as Tool models (metadata).
    pub fn get_all_tools() -> Vec<Tool> {
        vec![
            AuthStatusTool::to_tool(),
            FileInfoTool::to_tool(),
            FilesGetTool::to_tool(),
        ]
    }

    /// Dispatch an HTTP tool call to the appropriate handler.
    #[cfg(feature = "http")]
    pub fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        match name {
            AuthStatusTool::NAME => AuthStatusTool::http_handler(arguments, self.credentials.clone()),
            FileInfoTool::NAME => FileInfoTool::http_handler(arguments, self.workspace.clone()),
            FilesGetTool::NAME => FilesGetTool::http_handler(arguments, self.workspace.clone()),
            _ => {
                warn!("Unknown tool requested: {}", name);
                Err(super::ToolError::not_found(name).to_string())
            }
        }
    }
}
