use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::config::SecurityConfig;

/// Sensitive path fragments that are never served, matched case-insensitively
/// anywhere in the resolved path.
pub const DEFAULT_BLOCKED_PATTERNS: &[&str] = &[
    ".env",
    "secrets.env",
    ".git",
    ".ssh",
    "id_rsa",
    "id_ed25519",
    "credentials",
    "password",
    ".pem",
    ".key",
    "shadow",
    "passwd",
];

/// Reasons a candidate path is denied.
///
/// These exist for diagnostics only. Callers outside this module see a plain
/// admit/deny decision so the reason never reaches an untrusted client.
#[derive(Debug, thiserror::Error)]
pub enum PathSecurityError {
    #[error("Cannot resolve path '{path}': {error}")]
    CannotResolve { path: PathBuf, error: io::Error },

    #[error("Base directory '{path}' cannot be resolved: {error}")]
    BaseUnresolvable { path: PathBuf, error: io::Error },

    #[error("Path '{path}' is outside base directory '{base}'")]
    OutsideBaseDirectory { path: PathBuf, base: PathBuf },

    #[error("Path '{path}' matches blocked pattern '{pattern}'")]
    Blocked { path: PathBuf, pattern: String },
}

/// Decides whether a caller-supplied path may be read.
///
/// Built once from [`SecurityConfig`] and never mutated. Every decision
/// resolves both the candidate and the base directory against the live
/// filesystem, so a symlink swapped in after startup is still caught.
#[derive(Debug, Clone)]
pub struct PathGuard {
    base_dir: PathBuf,
    blocked_patterns: Vec<String>,
}

impl PathGuard {
    /// Create a guard rooted at `base_dir`. Patterns are lower-cased here so
    /// that matching against the lower-cased path is case-insensitive.
    pub fn new<I, S>(base_dir: impl Into<PathBuf>, blocked_patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            base_dir: base_dir.into(),
            blocked_patterns: blocked_patterns
                .into_iter()
                .map(|p| p.as_ref().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    /// Create a guard from the security section of the configuration.
    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(&config.base_dir, &config.blocked_patterns)
    }

    /// The configured (unresolved) base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn blocked_patterns(&self) -> &[String] {
        &self.blocked_patterns
    }

    /// Returns `true` only if `candidate` resolves inside the base directory
    /// and matches no blocked pattern. Never panics; any failure is a denial.
    pub fn is_admissible(&self, candidate: &Path) -> bool {
        match self.check(candidate) {
            Ok(_) => true,
            Err(e) => {
                debug!("Path denied: {}", e);
                false
            }
        }
    }

    /// Validates `candidate` and returns its resolved form.
    ///
    /// The order of checks matters:
    /// 1. Canonicalize the candidate (follows symlinks, collapses `.`/`..`)
    /// 2. Canonicalize the base directory; failure denies everything
    /// 3. Require whole-component containment in the base
    /// 4. Reject any blocked pattern found in the lower-cased resolved path
    pub fn check(&self, candidate: &Path) -> Result<PathBuf, PathSecurityError> {
        let resolved = candidate
            .canonicalize()
            .map_err(|e| PathSecurityError::CannotResolve {
                path: candidate.to_path_buf(),
                error: e,
            })?;

        let base = self
            .base_dir
            .canonicalize()
            .map_err(|e| PathSecurityError::BaseUnresolvable {
                path: self.base_dir.clone(),
                error: e,
            })?;

        if !is_within_base(&resolved, &base) {
            return Err(PathSecurityError::OutsideBaseDirectory {
                path: resolved,
                base,
            });
        }

        if let Some(pattern) = find_blocked_pattern(&resolved, &self.blocked_patterns) {
            return Err(PathSecurityError::Blocked {
                pattern: pattern.to_string(),
                path: resolved,
            });
        }

        Ok(resolved)
    }
}

/// Stateless form of [`PathGuard::is_admissible`].
pub fn is_path_admissible<S: AsRef<str>>(
    candidate: &Path,
    base_dir: &Path,
    blocked_patterns: &[S],
) -> bool {
    PathGuard::new(base_dir, blocked_patterns).is_admissible(candidate)
}

/// Component-wise containment: `/data` contains `/data/x` but not `/data-x`.
fn is_within_base(path: &Path, base: &Path) -> bool {
    path == base || path.starts_with(base)
}

fn find_blocked_pattern<'a>(path: &Path, patterns: &'a [String]) -> Option<&'a str> {
    let lowered = path.to_string_lossy().to_lowercase();
    patterns
        .iter()
        .find(|pattern| lowered.contains(pattern.as_str()))
        .map(String::as_str)
}
