//! Connection-layer seam.

use async_trait::async_trait;

use crate::events::DisconnectReason;
use crate::result::AppResult;
use crate::types::ConnectionId;

/// The transport that owns live connections (WebSocket, SockJS, ...).
///
/// SessionHub never parses wire frames; it only asks the transport to push
/// a payload to a connection or to close one.
#[async_trait]
pub trait ConnectionTransport: Send + Sync + std::fmt::Debug + 'static {
    /// Push a payload to a single connection.
    async fn deliver(&self, connection_id: ConnectionId, payload: String) -> AppResult<()>;

    /// Close a connection. Closing an unknown or already closed connection
    /// is not an error.
    async fn close(&self, connection_id: ConnectionId, reason: DisconnectReason) -> AppResult<()>;
}
