//! Tool definitions module.
//!
//! This module exports all available tool definitions.
//! Each tool is defined in its own file for better maintainability.

pub mod auth;
pub mod files;

pub use auth::AuthStatusTool;
pub use files::{FileInfoTool, FilesGetTool};
