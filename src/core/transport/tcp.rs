//! TCP transport implementation.
//!
//! Raw TCP socket transport with JSON-RPC messages (line-delimited).
//!
//! No login is enforced here: like STDIO, TCP is meant for a trusted local
//! client. Use the HTTP transport to expose the server to remote callers.

use rmcp::ServiceExt;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{Instrument, info, info_span, warn};

use super::{TransportError, TransportResult, config::TcpConfig};
use crate::core::McpServer;

const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// TCP transport handler.
pub struct TcpTransport {
    config: TcpConfig,
}

impl TcpTransport {
    /// Create a new TCP transport with the given config.
    pub fn new(config: TcpConfig) -> Self {
        Self { config }
    }

    /// Get the bind address.
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.host, self.config.port)
    }

    /// Accept clients until the process is stopped. Each connection gets
    /// its own MCP session sharing the same workspace and guard.
    pub async fn run(self, server: McpServer) -> TransportResult<()> {
        let addr = self.address();

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TransportError::bind(&addr, e))?;

        info!(
            "Ready - listening on {} (JSON-RPC over TCP), serving {}",
            addr,
            server.workspace().base_dir().display()
        );

        loop {
            let (stream, peer_addr) = match listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    warn!("Failed to accept connection: {}", e);
                    // Back off so a persistent accept error does not spin.
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                warn!("Failed to set TCP_NODELAY for {}: {}", peer_addr, e);
            }

            let span = info_span!("tcp_client", peer = %peer_addr);
            tokio::spawn(Self::handle_connection(server.clone(), stream).instrument(span));
        }
    }

    async fn handle_connection(server: McpServer, stream: TcpStream) {
        info!("Client connected");

        let service = match server.serve(stream).await {
            Ok(s) => s,
            Err(e) => {
                warn!("Failed to initialize MCP session: {}", e);
                return;
            }
        };

        match service.waiting().await {
            Ok(_) => info!("Client disconnected"),
            Err(e) => warn!("Session ended with error: {}", e),
        }
    }
}
