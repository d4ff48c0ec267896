//! File metadata tool definition.
//!
//! Reports existence, type, size, timestamps and permission bits for one
//! workspace path. A denied path yields the same all-default record as any
//! other denial, so callers cannot tell "missing" from "forbidden".

use chrono::{DateTime, Utc};
use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs::{self, Metadata};
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, instrument, warn};

use crate::core::workspace::Workspace;

/// Message returned for every denied path.
pub const ACCESS_DENIED_MESSAGE: &str = "Access denied - path outside allowed directory or blocked";

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the file info tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FileInfoParams {
    /// Path to inspect, relative to the workspace or absolute inside it.
    pub path: String,
}

/// Fixed-shape metadata record. Timestamps are seconds since the Unix epoch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, JsonSchema)]
pub struct FileInfo {
    pub input_path: String,
    pub abs_path: String,
    pub exists: bool,
    pub is_dir: bool,
    pub is_file: bool,
    pub is_link: bool,
    pub size: u64,
    pub modified: f64,
    pub created: f64,
    pub permissions: u32,
    pub dir_path: String,
    pub file_name: String,
    pub file_ext: String,
    pub message: String,
}

impl FileInfo {
    fn denied(input_path: &str) -> Self {
        Self {
            input_path: input_path.to_string(),
            message: ACCESS_DENIED_MESSAGE.to_string(),
            ..Default::default()
        }
    }
}

// ============================================================================
// Tool Definition
// ============================================================================

/// File info tool - discloses metadata only for admissible paths.
pub struct FileInfoTool;

impl FileInfoTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "file_info";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Get metadata for a workspace path: existence, type, size, modification and creation times, permission bits, and path parts.";

    /// Build the metadata record for `input_path`.
    pub fn file_info(input_path: &str, workspace: &Workspace) -> FileInfo {
        let abs_path = workspace.resolve_request_path(input_path);

        let resolved = match workspace.guard().check(&abs_path) {
            Ok(resolved) => resolved,
            Err(e) => {
                warn!("File info denied for {}: {}", input_path, e);
                return FileInfo::denied(input_path);
            }
        };

        Self::describe(input_path, &abs_path, &resolved)
    }

    /// Fill the record for an admitted path. Everything except `is_link`
    /// comes from `resolved`, the target the guard approved.
    fn describe(input_path: &str, abs_path: &Path, resolved: &Path) -> FileInfo {
        let mut record = FileInfo {
            input_path: input_path.to_string(),
            abs_path: abs_path.to_string_lossy().into_owned(),
            dir_path: abs_path
                .parent()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_name: abs_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            file_ext: extension_of(abs_path),
            ..Default::default()
        };

        // Stat the resolved target so a symlink swapped after the check
        // cannot redirect it. The target may also vanish in between.
        let meta = match fs::metadata(resolved) {
            Ok(meta) => meta,
            Err(_) => {
                record.message = format!("File {} not found.", input_path);
                return record;
            }
        };

        record.exists = true;
        record.is_dir = meta.is_dir();
        record.is_file = meta.is_file();
        record.is_link = fs::symlink_metadata(abs_path)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        record.size = meta.len();
        record.modified = epoch_secs(meta.modified());
        record.created = created_secs(&meta);
        record.permissions = permission_bits(&meta);

        record
    }

    /// Execute the tool logic (for STDIO/TCP transport via rmcp).
    #[instrument(skip_all, fields(path = %params.path))]
    pub fn execute(params: &FileInfoParams, workspace: &Workspace) -> CallToolResult {
        info!("File info tool called for path: {}", params.path);

        let record = Self::file_info(&params.path, workspace);
        let summary = summarize(&record);

        match serde_json::to_value(&record) {
            Ok(structured) => CallToolResult {
                content: vec![Content::text(summary)],
                structured_content: Some(structured),
                is_error: Some(false),
                meta: None,
            },
            Err(e) => {
                warn!("Failed to serialize structured content: {}", e);
                CallToolResult::success(vec![Content::text(summary)])
            }
        }
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        workspace: Arc<Workspace>,
    ) -> Result<serde_json::Value, String> {
        let path = arguments
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| "Missing or invalid 'path' parameter".to_string())?
            .to_string();

        let result = Self::execute(&FileInfoParams { path }, &workspace);

        let mut response = serde_json::json!({
            "content": result.content,
            "isError": result.is_error.unwrap_or(false)
        });
        if let (Some(structured), Some(obj)) = (result.structured_content, response.as_object_mut())
        {
            obj.insert("structuredContent".to_string(), structured);
        }

        Ok(response)
    }

    /// Create a Tool model for this tool (metadata).
    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<FileInfoParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    /// Create a ToolRoute for STDIO/TCP transport.
    pub fn create_route<S>(workspace: Arc<Workspace>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let workspace = workspace.clone();
            async move {
                let params: FileInfoParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &workspace))
            }
            .boxed()
        })
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Extension with its leading dot, or empty. Dotfiles have no extension.
fn extension_of(path: &Path) -> String {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default()
}

fn epoch_secs(time: std::io::Result<SystemTime>) -> f64 {
    time.ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}

/// Birth time where the platform records it, otherwise the inode change time.
fn created_secs(meta: &Metadata) -> f64 {
    meta.created()
        .map(|created| epoch_secs(Ok(created)))
        .unwrap_or_else(|_| change_time_secs(meta))
}

#[cfg(unix)]
fn change_time_secs(meta: &Metadata) -> f64 {
    use std::os::unix::fs::MetadataExt;
    meta.ctime() as f64 + meta.ctime_nsec() as f64 / 1e9
}

#[cfg(not(unix))]
fn change_time_secs(_meta: &Metadata) -> f64 {
    0.0
}

#[cfg(unix)]
fn permission_bits(meta: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    meta.permissions().mode()
}

#[cfg(not(unix))]
fn permission_bits(meta: &Metadata) -> u32 {
    if meta.permissions().readonly() { 0o444 } else { 0o666 }
}

fn format_timestamp(secs: f64) -> String {
    DateTime::<Utc>::from_timestamp(secs.trunc() as i64, (secs.fract() * 1e9) as u32)
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| "unknown".to_string())
}

fn summarize(record: &FileInfo) -> String {
    if !record.exists {
        return record.message.clone();
    }

    let kind = if record.is_dir {
        "directory"
    } else if record.is_file {
        "file"
    } else {
        "other"
    };
    let link = if record.is_link { ", symlink" } else { "" };

    format!(
        "{} ({}{}, {} bytes, mode {:o}, modified {})",
        record.abs_path,
        kind,
        link,
        record.size,
        record.permissions,
        format_timestamp(record.modified)
    )
}

// ============================================================================
// Tests
// ============================================================================
