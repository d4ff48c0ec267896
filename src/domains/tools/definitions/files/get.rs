//! File retrieval tool definition.
//!
//! Reads a batch of files from the workspace and returns their contents
//! base64-encoded, keyed by base name. Entries that are denied, missing,
//! directories, or unreadable are skipped; the rest of the batch still
//! succeeds.

use base64::Engine;
use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::core::workspace::{Workspace, display_name};
use crate::domains::tools::ToolError;

// ============================================================================
// Tool Parameters
// ============================================================================

/// Parameters for the file retrieval tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct FilesGetParams {
    /// Paths to retrieve. Relative paths are taken from the workspace base
    /// directory; `/a0/...` paths are mapped onto it.
    pub paths: Vec<String>,
}

/// Structured output for a retrieval batch.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FilesGetResult {
    /// Base64 file contents keyed by file base name.
    pub files: BTreeMap<String, String>,
    pub count: usize,
}

// ============================================================================
// Tool Definition
// ============================================================================

/// File retrieval tool.
pub struct FilesGetTool;

impl FilesGetTool {
    /// Tool name as registered in MCP.
    pub const NAME: &'static str = "files_get";

    /// Tool description shown to clients.
    pub const DESCRIPTION: &'static str = "Retrieve one or more files from the workspace. Returns base64 contents keyed by file name. Paths outside the workspace, sensitive files, directories and missing files are skipped.";

    /// Read every admissible regular file in `paths`.
    ///
    /// Keys are base names, so two admitted paths with the same base name
    /// collide and the later one wins.
    pub fn retrieve(paths: &[String], workspace: &Workspace) -> BTreeMap<String, Vec<u8>> {
        let mut files = BTreeMap::new();

        for requested in paths {
            let path = workspace.resolve_request_path(requested);
            let name = display_name(&path);

            // Read through the resolved path so a symlink swapped after the
            // check cannot redirect the read.
            let resolved = match workspace.guard().check(&path) {
                Ok(resolved) => resolved,
                Err(e) => {
                    warn!(
                        "Access denied - path outside allowed directory or blocked: {} ({})",
                        requested, e
                    );
                    continue;
                }
            };

            match fs::metadata(&resolved) {
                Ok(meta) if meta.is_dir() => {
                    warn!("Cannot read directory: {}", requested);
                    continue;
                }
                Ok(meta) if !meta.is_file() => {
                    warn!("Not a regular file: {}", requested);
                    continue;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("File not found: {} ({})", requested, e);
                    continue;
                }
            }

            match fs::read(&resolved) {
                Ok(bytes) => {
                    info!("Retrieved file: {} ({} bytes)", name, bytes.len());
                    if files.insert(name.clone(), bytes).is_some() {
                        warn!("Duplicate file name '{}', keeping the later entry", name);
                    }
                }
                Err(e) => {
                    warn!("Failed to read file {}: {}", requested, e);
                }
            }
        }

        files
    }

    /// Execute the tool logic (for STDIO/TCP transport via rmcp).
    #[instrument(skip_all, fields(count = params.paths.len()))]
    pub fn execute(params: &FilesGetParams, workspace: &Workspace) -> CallToolResult {
        info!("Files get tool called for {} paths", params.paths.len());

        if params.paths.is_empty() {
            let err = ToolError::invalid_arguments("paths array is required");
            return CallToolResult::error(vec![Content::text(err.to_string())]);
        }

        let files = Self::retrieve(&params.paths, workspace);
        info!("Files retrieved: {}", files.len());

        let summary = if files.is_empty() {
            format!("Retrieved 0 of {} files", params.paths.len())
        } else {
            format!(
                "Retrieved {} of {} files: {}",
                files.len(),
                params.paths.len(),
                files.keys().cloned().collect::<Vec<_>>().join(", ")
            )
        };

        let encoder = base64::engine::general_purpose::STANDARD;
        let structured_data = FilesGetResult {
            count: files.len(),
            files: files
                .into_iter()
                .map(|(name, bytes)| (name, encoder.encode(bytes)))
                .collect(),
        };

        match serde_json::to_value(&structured_data) {
            Ok(structured) => CallToolResult {
                content: vec![Content::text(summary)],
                structured_content: Some(structured),
                is_error: Some(false),
                meta: None,
            },
            Err(e) => {
                let err = ToolError::internal(format!("Failed to serialize result: {}", e));
                warn!("{}", err);
                CallToolResult::error(vec![Content::text(err.to_string())])
            }
        }
    }

    /// HTTP handler for this tool (for HTTP transport).
    #[cfg(feature = "http")]
    pub fn http_handler(
        arguments: serde_json::Value,
        workspace: Arc<Workspace>,
    ) -> Result<serde_json::Value, String> {
        let paths = arguments
            .get("paths")
            .ok_or_else(|| "paths array is required".to_string())?
            .as_array()
            .ok_or_else(|| "paths must be an array".to_string())?
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect();

        let params = FilesGetParams { paths };
        let result = Self::execute(&params, &workspace);

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
            input_schema: cached_schema_for_type::<FilesGetParams>(),
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
                let params: FilesGetParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &workspace))
            }
            .boxed()
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;
    use std::path::Path;
    use tempfile::TempDir;

    fn workspace(base: &Path) -> Workspace {
        let mut config = Config::default();
        config.security.base_dir = base.to_path_buf();
        Workspace::from_config(&config)
    }

    fn paths(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_skipped() {
        use std::os::unix::fs::symlink;

        let base = TempDir::new().unwrap();
        let outside = TempDir::new().unwrap();
        let secret = outside.path().join("users.db");
        fs::write(base.path().join("report.txt"), b"report body").unwrap();
        fs::write(&secret, b"root:x:0:0").unwrap();
        symlink(&secret, base.path().join("escape")).unwrap();

        let files = FilesGetTool::retrieve(&paths(&["report.txt", "escape"]), &workspace(base.path()));

        assert_eq!(files.len(), 1);
        assert_eq!(files.get("report.txt").unwrap(), b"report body");
        assert!(!files.contains_key("escape"));
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_to_system_file_skipped() {
        use std::os::unix::fs::symlink;

        let base = TempDir::new().unwrap();
        fs::write(base.path().join("report.txt"), b"report body").unwrap();
        symlink("/etc/passwd", base.path().join("escape")).unwrap();

        let files = FilesGetTool::retrieve(&paths(&["report.txt", "escape"]), &workspace(base.path()));

        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["report.txt"]);
    }

    #[test]
    fn test_directories_blocked_and_missing_skipped() {
        let base = TempDir::new().unwrap();
        fs::create_dir(base.path().join("docs")).unwrap();
        fs::write(base.path().join(".env"), "TOKEN=1").unwrap();
        fs::write(base.path().join("notes.md"), "# notes").unwrap();

        let files = FilesGetTool::retrieve(
            &paths(&["docs", ".env", "missing.txt", "notes.md", "/etc/hostname"]),
            &workspace(base.path()),
        );

        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["notes.md"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_entry_does_not_abort_batch() {
        use std::os::unix::fs::PermissionsExt;

        let base = TempDir::new().unwrap();
        let locked = base.path().join("locked.txt");
        fs::write(&locked, "private").unwrap();
        fs::write(base.path().join("open.txt"), "public").unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits do not stop root.
        if fs::read(&locked).is_ok() {
            return;
        }

        let files = FilesGetTool::retrieve(
            &paths(&["locked.txt", "open.txt"]),
            &workspace(base.path()),
        );

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o600)).unwrap();
        assert_eq!(files.keys().collect::<Vec<_>>(), vec!["open.txt"]);
        assert_eq!(files.get("open.txt").unwrap(), b"public");
    }

    #[test]
    fn test_traversal_skipped() {
        let base = TempDir::new().unwrap();
        let inner = base.path().join("inner");
        fs::create_dir(&inner).unwrap();
        fs::write(base.path().join("outer.txt"), "outer").unwrap();

        let files = FilesGetTool::retrieve(&paths(&["../outer.txt"]), &workspace(&inner));
        assert!(files.is_empty());
    }

    #[test]
    fn test_duplicate_base_names_later_wins() {
        let base = TempDir::new().unwrap();
        fs::create_dir(base.path().join("a")).unwrap();
        fs::create_dir(base.path().join("b")).unwrap();
        fs::write(base.path().join("a/note.txt"), "first").unwrap();
        fs::write(base.path().join("b/note.txt"), "second").unwrap();

        let files =
            FilesGetTool::retrieve(&paths(&["a/note.txt", "b/note.txt"]), &workspace(base.path()));

        assert_eq!(files.len(), 1);
        assert_eq!(files.get("note.txt").unwrap(), b"second");
    }

    #[test]
    fn test_internal_upload_path_mapped() {
        let base = TempDir::new().unwrap();
        let uploads = base.path().join("tmp/uploads");
        fs::create_dir_all(&uploads).unwrap();
        fs::write(uploads.join("photo.png"), [0x89, b'P', b'N', b'G']).unwrap();

        let files = FilesGetTool::retrieve(
            &paths(&["/a0/tmp/uploads/photo.png"]),
            &workspace(base.path()),
        );

        assert_eq!(files.get("photo.png").unwrap(), &vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_execute_encodes_base64() {
        let base = TempDir::new().unwrap();
        fs::write(base.path().join("report.txt"), "hello").unwrap();

        let params = FilesGetParams {
            paths: paths(&["report.txt"]),
        };
        let result = FilesGetTool::execute(&params, &workspace(base.path()));
        assert_eq!(result.is_error, Some(false));

        let structured = result.structured_content.unwrap();
        assert_eq!(structured["files"]["report.txt"], "aGVsbG8=");
        assert_eq!(structured["count"], 1);
    }

    #[test]
    fn test_execute_empty_paths_is_error() {
        let base = TempDir::new().unwrap();
        let params = FilesGetParams { paths: vec![] };

        let result = FilesGetTool::execute(&params, &workspace(base.path()));
        assert!(result.is_error.unwrap_or(false));
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_handler_rejects_non_array() {
        let base = TempDir::new().unwrap();
        let ws = Arc::new(workspace(base.path()));

        let missing = FilesGetTool::http_handler(serde_json::json!({}), ws.clone());
        assert_eq!(missing.unwrap_err(), "paths array is required");

        let not_array =
            FilesGetTool::http_handler(serde_json::json!({ "paths": "report.txt" }), ws);
        assert_eq!(not_array.unwrap_err(), "paths must be an array");
    }
}
