//! In-process connection transport.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::mpsc;
use tracing::debug;

use sessionhub_core::error::AppError;
use sessionhub_core::events::DisconnectReason;
use sessionhub_core::result::AppResult;
use sessionhub_core::traits::ConnectionTransport;
use sessionhub_core::types::{ConnectionId, SessionId};

use super::handle::{ConnectionHandle, ConnectionInfo};

/// Transport for clients attached inside this process.
///
/// Each attached client reads frames from the receiver returned by
/// [`attach`](Self::attach). The transport owns the only sender, so closing
/// a connection ends the client's stream once queued frames are drained.
#[derive(Debug)]
pub struct LocalTransport {
    /// Connection ID → handle
    connections: DashMap<ConnectionId, Arc<ConnectionHandle>>,
    /// Per-connection outbound buffer
    buffer_size: usize,
}

impl LocalTransport {
    /// Creates an empty transport.
    pub fn new(buffer_size: usize) -> Self {
        Self {
            connections: DashMap::new(),
            buffer_size: buffer_size.max(1),
        }
    }

    /// Opens a connection for `session_id` and returns its id and frame stream.
    ///
    /// This only allocates the transport side; the caller still registers the
    /// connection with the registry.
    pub fn attach(&self, session_id: SessionId) -> (ConnectionId, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(self.buffer_size);
        let handle = Arc::new(ConnectionHandle::new(session_id, tx));
        let id = handle.id;
        self.connections.insert(id, handle);
        debug!(connection_id = %id, session_id = %session_id, "Connection attached");
        (id, rx)
    }

    /// Drops a connection the client side already closed.
    pub fn detach(&self, connection_id: &ConnectionId) -> bool {
        match self.connections.remove(connection_id) {
            Some((_, handle)) => {
                handle.mark_dead();
                true
            }
            None => false,
        }
    }

    /// Snapshot of one connection.
    pub fn info(&self, connection_id: &ConnectionId) -> Option<ConnectionInfo> {
        self.connections.get(connection_id).map(|h| h.info())
    }

    /// Number of attached connections.
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[async_trait]
impl ConnectionTransport for LocalTransport {
    async fn deliver(&self, connection_id: ConnectionId, payload: String) -> AppResult<()> {
        let handle = self
            .connections
            .get(&connection_id)
            .map(|h| h.value().clone())
            .ok_or_else(|| AppError::not_found(format!("Connection {connection_id} not found")))?;

        if handle.send(payload) {
            Ok(())
        } else {
            Err(AppError::internal(format!(
                "Connection {connection_id} rejected the frame"
            )))
        }
    }

    async fn close(&self, connection_id: ConnectionId, reason: DisconnectReason) -> AppResult<()> {
        if let Some((_, handle)) = self.connections.remove(&connection_id) {
            handle.mark_dead();
            debug!(
                connection_id = %connection_id,
                session_id = %handle.session_id,
                reason = reason.as_str(),
                "Connection closed"
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_close_ends_stream_after_queued_frames() {
        let transport = LocalTransport::new(4);
        let (id, mut rx) = transport.attach(SessionId::new());

        transport.deliver(id, "bye".to_string()).await.unwrap();
        transport.close(id, DisconnectReason::Expired).await.unwrap();

        assert_eq!(rx.recv().await.as_deref(), Some("bye"));
        assert_eq!(rx.recv().await, None);
        assert_eq!(transport.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_close_unknown_is_ok() {
        let transport = LocalTransport::new(4);
        assert!(
            transport
                .close(ConnectionId::new(), DisconnectReason::Closed)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_deliver_unknown_is_not_found() {
        let transport = LocalTransport::new(4);
        let err = transport
            .deliver(ConnectionId::new(), "x".to_string())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
