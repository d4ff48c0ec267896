//! Error types and handling for the server.
//!
//! Path denials and credential mismatches are not represented here: those
//! are ordinary `false` outcomes, not errors. Tool failures are reported to
//! the client as error content and never leave the tool.

use thiserror::Error;

/// A specialized Result type for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end the server run.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport-level failures (bind, serve).
    #[error("Transport error: {0}")]
    Transport(#[from] crate::core::transport::TransportError),
}
