//! Request path normalization.
//!
//! Clients address files three ways: by their in-container location under
//! the internal root (`/a0/...`), by an upload path under that root, or by a
//! plain relative or absolute path. [`Workspace`] turns each form into an
//! absolute filesystem path and hands it to the [`PathGuard`]. Normalization
//! is purely lexical; the guard does the real resolution.

use std::path::{Component, Path, PathBuf};

use crate::core::config::Config;
use crate::core::security::PathGuard;

/// Base directory plus the rules for mapping request paths onto it.
#[derive(Debug, Clone)]
pub struct Workspace {
    base_dir: PathBuf,
    internal_root: String,
    uploads_dir: PathBuf,
    guard: PathGuard,
}

impl Workspace {
    pub fn new(
        base_dir: impl Into<PathBuf>,
        internal_root: impl Into<String>,
        uploads_dir: impl Into<PathBuf>,
        guard: PathGuard,
    ) -> Self {
        Self {
            base_dir: base_dir.into(),
            internal_root: internal_root.into(),
            uploads_dir: uploads_dir.into(),
            guard,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.security.base_dir,
            &config.workspace.internal_root,
            &config.workspace.uploads_dir,
            PathGuard::from_config(&config.security),
        )
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Map a client-supplied path to the absolute path to validate.
    pub fn resolve_request_path(&self, requested: &str) -> PathBuf {
        if !self.internal_root.is_empty() {
            if let Some(rest) = requested.strip_prefix(&self.uploads_prefix()) {
                // Uploads are flat: only the file name survives.
                let name = Path::new(rest).file_name().map(PathBuf::from).unwrap_or_default();
                return normalize_lexically(&self.base_dir.join(&self.uploads_dir).join(name));
            }

            if let Some(rest) = requested.strip_prefix(&self.internal_prefix()) {
                return normalize_lexically(&self.base_dir.join(rest));
            }
        }

        let normalized = normalize_lexically(Path::new(requested));
        if normalized.is_absolute() {
            normalized
        } else {
            normalize_lexically(&self.base_dir.join(normalized))
        }
    }

    /// `<internal_root>/`, whether or not the root was configured with a
    /// trailing slash.
    fn internal_prefix(&self) -> String {
        format!("{}/", self.internal_root.trim_end_matches('/'))
    }

    /// `<internal_root><uploads_dir>/`, e.g. `/a0/tmp/uploads/`.
    fn uploads_prefix(&self) -> String {
        let uploads = self.uploads_dir.to_string_lossy();
        format!("{}{}/", self.internal_prefix(), uploads.trim_matches('/'))
    }
}

/// Collapse `.` and `..` without touching the filesystem.
///
/// `..` at the root stays at the root; leading `..` on a relative path is
/// kept. An empty result becomes `.`.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }
    parts.iter().collect()
}

/// Base name used as the result key for a retrieved file.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::security::DEFAULT_BLOCKED_PATTERNS;

    fn workspace() -> Workspace {
        Workspace::new(
            "/srv/base",
            "/a0/",
            "tmp/uploads",
            PathGuard::new("/srv/base", DEFAULT_BLOCKED_PATTERNS),
        )
    }

    #[test]
    fn test_normalize_lexically() {
        assert_eq!(normalize_lexically(Path::new("a/./b/../c")), PathBuf::from("a/c"));
        assert_eq!(normalize_lexically(Path::new("/../etc")), PathBuf::from("/etc"));
        assert_eq!(normalize_lexically(Path::new("../x")), PathBuf::from("../x"));
        assert_eq!(normalize_lexically(Path::new("a/..")), PathBuf::from("."));
        assert_eq!(normalize_lexically(Path::new("/a//b/")), PathBuf::from("/a/b"));
    }

    #[test]
    fn test_relative_path_joined_to_base() {
        assert_eq!(
            workspace().resolve_request_path("docs/report.txt"),
            PathBuf::from("/srv/base/docs/report.txt")
        );
    }

    #[test]
    fn test_relative_traversal_kept_for_guard() {
        assert_eq!(
            workspace().resolve_request_path("../other/file"),
            PathBuf::from("/srv/other/file")
        );
    }

    #[test]
    fn test_absolute_path_kept() {
        assert_eq!(
            workspace().resolve_request_path("/etc/passwd"),
            PathBuf::from("/etc/passwd")
        );
    }

    #[test]
    fn test_internal_root_mapped_onto_base() {
        assert_eq!(
            workspace().resolve_request_path("/a0/work/notes.md"),
            PathBuf::from("/srv/base/work/notes.md")
        );
    }

    #[test]
    fn test_upload_path_flattened() {
        assert_eq!(
            workspace().resolve_request_path("/a0/tmp/uploads/nested/photo.png"),
            PathBuf::from("/srv/base/tmp/uploads/photo.png")
        );
    }

    #[test]
    fn test_empty_internal_root_disables_mapping() {
        let ws = Workspace::new(
            "/srv/base",
            "",
            "tmp/uploads",
            PathGuard::new("/srv/base", DEFAULT_BLOCKED_PATTERNS),
        );
        assert_eq!(
            ws.resolve_request_path("/a0/work/notes.md"),
            PathBuf::from("/a0/work/notes.md")
        );
    }

    #[test]
    fn test_internal_root_without_trailing_slash() {
        let ws = Workspace::new(
            "/srv/base",
            "/a0",
            "tmp/uploads",
            PathGuard::new("/srv/base", DEFAULT_BLOCKED_PATTERNS),
        );

        assert_eq!(
            ws.resolve_request_path("/a0/work.txt"),
            PathBuf::from("/srv/base/work.txt")
        );
        assert_eq!(
            ws.resolve_request_path("/a0/tmp/uploads/photo.png"),
            PathBuf::from("/srv/base/tmp/uploads/photo.png")
        );
        // A sibling that merely shares the prefix is not the internal root.
        assert_eq!(
            ws.resolve_request_path("/a0xyz/work.txt"),
            PathBuf::from("/a0xyz/work.txt")
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name(Path::new("/srv/base/report.txt")), "report.txt");
        assert_eq!(display_name(Path::new("/")), "/");
    }
}
