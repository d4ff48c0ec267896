//! Configuration management for the server.
//!
//! This module provides a centralized configuration structure that can be
//! populated from environment variables (optionally via a `.env` file) or
//! defaults. The resulting [`Config`] is built once at startup and shared
//! read-only for the lifetime of the process.

use super::transport::TransportConfig;
use crate::core::security::DEFAULT_BLOCKED_PATTERNS;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{info, warn};

/// Main configuration structure for the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Server identification and metadata.
    pub server: ServerConfig,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Transport configuration.
    pub transport: TransportConfig,

    /// Reference credentials for login.
    pub auth: AuthConfig,

    /// Base directory and blocked patterns for file access.
    pub security: SecurityConfig,

    /// Mapping of internal request paths onto the base directory.
    pub workspace: WorkspaceConfig,
}

/// Server identification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// The name of the server as reported to clients.
    pub name: String,

    /// The version of the server.
    pub version: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "trace").
    pub level: String,

    /// Whether to include timestamps in log output.
    pub with_timestamps: bool,
}

/// Reference credentials.
///
/// `login` unset (or empty) means login is not required. `password` unset is
/// compared as the empty string, it never means "any password".
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct AuthConfig {
    pub login: Option<String>,
    pub password: Option<String>,
}

/// Custom Debug implementation to redact secrets from logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("login", &self.login)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl AuthConfig {
    pub fn is_login_required(&self) -> bool {
        self.login.as_deref().is_some_and(|l| !l.is_empty())
    }
}

/// Configuration for path admission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    /// Root directory for every file access. If it cannot be resolved at
    /// request time, every request is denied.
    pub base_dir: PathBuf,

    /// Case-insensitive substrings that deny a path wherever they appear.
    pub blocked_patterns: Vec<String>,
}

/// Configuration for request path normalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkspaceConfig {
    /// Prefix under which clients address files by their in-container
    /// location (e.g. `/a0/`). Rewritten onto the base directory.
    pub internal_root: String,

    /// Upload directory, relative to the base directory.
    pub uploads_dir: String,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            base_dir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            blocked_patterns: DEFAULT_BLOCKED_PATTERNS
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            internal_root: "/a0/".to_string(),
            uploads_dir: "tmp/uploads".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                name: "secure-files-mcp-server".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                with_timestamps: true,
            },
            transport: TransportConfig::default(),
            auth: AuthConfig::default(),
            security: SecurityConfig::default(),
            workspace: WorkspaceConfig::default(),
        }
    }
}

impl Config {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Server settings use the `MCP_` prefix (`MCP_SERVER_NAME`,
    /// `MCP_LOG_LEVEL`, `MCP_BASE_DIR`, ...). Credentials use `AUTH_LOGIN`
    /// and `AUTH_PASSWORD`.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self::default();

        if let Ok(name) = std::env::var("MCP_SERVER_NAME") {
            config.server.name = name;
        }

        if let Ok(level) = std::env::var("MCP_LOG_LEVEL") {
            config.logging.level = level;
        }

        // Load transport configuration from environment
        config.transport = TransportConfig::from_env();

        if let Ok(base_dir) = std::env::var("MCP_BASE_DIR") {
            config.security.base_dir = PathBuf::from(base_dir);
        }
        info!("Base directory: {:?}", config.security.base_dir);

        if let Ok(patterns) = std::env::var("MCP_BLOCKED_PATTERNS") {
            config.security.blocked_patterns = parse_patterns(&patterns);
            info!(
                "Blocked patterns overridden ({} entries)",
                config.security.blocked_patterns.len()
            );
        }
        if config.security.blocked_patterns.is_empty() {
            warn!("No blocked patterns configured - sensitive files are only protected by the base directory");
        }

        if let Ok(root) = std::env::var("MCP_INTERNAL_ROOT") {
            config.workspace.internal_root = root;
        }

        config.auth.login = std::env::var("AUTH_LOGIN").ok().filter(|l| !l.is_empty());
        config.auth.password = std::env::var("AUTH_PASSWORD").ok();
        if config.auth.is_login_required() {
            info!("Login required for HTTP clients");
        } else {
            warn!("AUTH_LOGIN not set - login is not required");
        }

        config
    }
}

/// Split a comma-separated pattern list, dropping blanks.
fn parse_patterns(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Mutex to ensure env var tests run serially
    static ENV_TEST_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn test_auth_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("AUTH_LOGIN", "admin");
            std::env::set_var("AUTH_PASSWORD", "secret");
        }
        let config = Config::from_env();
        assert_eq!(config.auth.login.as_deref(), Some("admin"));
        assert_eq!(config.auth.password.as_deref(), Some("secret"));
        assert!(config.auth.is_login_required());
        unsafe {
            std::env::remove_var("AUTH_LOGIN");
            std::env::remove_var("AUTH_PASSWORD");
        }
    }

    #[test]
    fn test_empty_login_means_not_required() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("AUTH_LOGIN", "");
        }
        let config = Config::from_env();
        assert!(config.auth.login.is_none());
        assert!(!config.auth.is_login_required());
        unsafe {
            std::env::remove_var("AUTH_LOGIN");
        }
    }

    #[test]
    fn test_security_from_env() {
        let _lock = ENV_TEST_LOCK.lock().unwrap();
        unsafe {
            std::env::set_var("MCP_BASE_DIR", "/srv/workspace");
            std::env::set_var("MCP_BLOCKED_PATTERNS", " .env, Secret ,,");
        }
        let config = Config::from_env();
        assert_eq!(config.security.base_dir, PathBuf::from("/srv/workspace"));
        assert_eq!(config.security.blocked_patterns, vec![".env", "secret"]);
        unsafe {
            std::env::remove_var("MCP_BASE_DIR");
            std::env::remove_var("MCP_BLOCKED_PATTERNS");
        }
    }

    #[test]
    fn test_default_blocked_patterns() {
        let config = Config::default();
        assert_eq!(
            config.security.blocked_patterns.len(),
            DEFAULT_BLOCKED_PATTERNS.len()
        );
        assert!(config.security.blocked_patterns.contains(&"id_rsa".to_string()));
        assert_eq!(config.workspace.internal_root, "/a0/");
    }

    #[test]
    fn test_auth_redacted_in_debug() {
        let auth = AuthConfig {
            login: Some("admin".to_string()),
            password: Some("super_secret_password".to_string()),
        };
        let debug_str = format!("{:?}", auth);
        assert!(debug_str.contains("REDACTED"));
        assert!(!debug_str.contains("super_secret_password"));
    }
}
