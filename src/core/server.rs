//! MCP Server implementation and lifecycle management.
//!
//! This module contains the main server handler that implements the MCP
//! protocol by delegating to the tools domain.
//!
//! ## Tool Architecture
//!
//! Tools are defined in `domains/tools/definitions/` with one file per tool.
//! Each tool defines:
//! - Parameters struct (for rmcp)
//! - `execute()` method (core logic)
//! - `http_handler()` method (called via ToolRegistry for HTTP transport)
//!
//! The ToolRouter is built dynamically in `domains/tools/router.rs`.

use rmcp::{ServerHandler, handler::server::tool::ToolRouter, model::*, tool_handler};
use std::sync::Arc;

use super::config::Config;
use super::security::CredentialVerifier;
use super::transport::TransportService;
use super::workspace::Workspace;
use crate::domains::tools::build_tool_router;

#[cfg(feature = "http")]
use crate::domains::tools::ToolRegistry;

const INSTRUCTIONS: &str = "Retrieves files from a guarded workspace. Paths outside the \
     base directory, symlinks escaping it, and sensitive files (keys, credentials, .env) \
     are never served.";

/// The main MCP server handler.
///
/// Owns the immutable process configuration and the two security
/// components built from it. Cloning is cheap; every clone shares them.
#[derive(Clone)]
pub struct McpServer {
    /// Server configuration.
    config: Arc<Config>,

    /// Base directory, path mapping and path guard.
    workspace: Arc<Workspace>,

    /// Reference credentials.
    credentials: Arc<CredentialVerifier>,

    /// Tool router for handling tool calls.
    tool_router: ToolRouter<Self>,
}

impl McpServer {
    /// Create a new MCP server with the given configuration.
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);
        let workspace = Arc::new(Workspace::from_config(&config));
        let credentials = Arc::new(CredentialVerifier::from_config(&config.auth));

        Self {
            tool_router: build_tool_router::<Self>(workspace.clone(), credentials.clone()),
            config,
            workspace,
            credentials,
        }
    }

    /// Get the server name.
    pub fn name(&self) -> &str {
        &self.config.server.name
    }

    /// Get the server version.
    pub fn version(&self) -> &str {
        &self.config.server.version
    }

    /// Get the server configuration.
    pub fn config(&self) -> &Arc<Config> {
        &self.config
    }

    pub fn workspace(&self) -> &Arc<Workspace> {
        &self.workspace
    }

    pub fn credentials(&self) -> &Arc<CredentialVerifier> {
        &self.credentials
    }

    pub fn instructions() -> &'static str {
        INSTRUCTIONS
    }

    /// Serve clients on the configured transport until it shuts down.
    ///
    /// Fails if the transport cannot start, e.g. when its address is taken.
    pub async fn run(self) -> super::error::Result<()> {
        let transport = TransportService::new(self.config.transport.clone());
        transport.run(self).await?;
        Ok(())
    }

    // ========================================================================
    // HTTP Transport Support Methods
    // ========================================================================

    /// List all available tools (for HTTP transport).
    pub fn list_tools(&self) -> Vec<serde_json::Value> {
        self.tool_router
            .list_all()
            .into_iter()
            .map(|t| {
                serde_json::json!({
                    "name": t.name,
                    "description": t.description,
                    "inputSchema": t.input_schema
                })
            })
            .collect()
    }

    /// Call a tool by name (for HTTP transport).
    #[cfg(feature = "http")]
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
    ) -> Result<serde_json::Value, String> {
        let registry = ToolRegistry::new(self.workspace.clone(), self.credentials.clone());
        registry.call_tool(name, arguments)
    }
}

/// ServerHandler implementation with tool_handler macro for automatic tool routing.
#[tool_handler]
impl ServerHandler for McpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(INSTRUCTIONS.to_string()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
