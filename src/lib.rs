//! Secure Files MCP Server Library
//!
//! An MCP server that lets a remote caller retrieve files from a constrained
//! workspace and log in with static credentials.
//!
//! # Architecture
//!
//! - **core**: configuration, error handling, the server, transports, and
//!   the two security primitives every tool depends on:
//!   - [`core::security::PathGuard`] decides whether a path may be read
//!   - [`core::security::CredentialVerifier`] checks credentials in constant
//!     time and derives the session token
//! - **domains**: the tools clients call (`files_get`, `file_info`,
//!   `auth_status`)
//!
//! # Example
//!
//! ```rust,no_run
//! use secure_files_mcp_server::core::{Config, PathGuard};
//! use std::path::Path;
//!
//! let config = Config::from_env();
//! let guard = PathGuard::from_config(&config.security);
//! let allowed = guard.is_admissible(Path::new("/srv/workspace/report.txt"));
//! ```

pub mod core;
pub mod domains;

// Re-export commonly used types for convenience
pub use core::{Config, Error, McpServer, Result};
