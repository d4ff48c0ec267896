//! Tool Router - builds the rmcp ToolRouter from the tool definitions.
//!
//! This module builds the ToolRouter for STDIO/TCP transport by delegating
//! to the tool definitions themselves. Each tool knows how to create its own route.

use std::sync::Arc;

use rmcp::handler::server::tool::ToolRouter;

use crate::core::security::CredentialVerifier;
use crate::core::workspace::Workspace;

use super::definitions::{AuthStatusTool, FileInfoTool, FilesGetTool};

/// Build the tool router with all registered tools.
pub fn build_tool_router<S>(
    workspace: Arc<Workspace>,
    credentials: Arc<CredentialVerifier>,
) -> ToolRouter<S>
where
    S: Send + Sync + 'static,
{
    ToolRouter::new()
        .with_route(AuthStatusTool::create_route(credentials))
        .with_route(FileInfoTool::create_route(workspace.clone()))
        .with_route(FilesGetTool::create_route(workspace))
}
