//! Core module containing shared infrastructure components.
//!
//! This module provides the foundational building blocks for the server,
//! including error handling, configuration, path and credential security,
//! request path normalization, server lifecycle management, and transport
//! layer abstractions.

pub mod config;
pub mod error;
pub mod security;
pub mod server;
pub mod transport;
pub mod workspace;

pub use config::Config;
pub use error::{Error, Result};
pub use security::{CredentialVerifier, PathGuard, PathSecurityError, SessionHash};
pub use server::McpServer;
pub use transport::{TransportConfig, TransportService};
pub use workspace::Workspace;
