pub mod actor;
pub mod handler;
pub mod protocol;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::monitoring::delivery::{DeliveryError, PeerTransport};

/// Type alias for the sender half of a WebSocket connection's channel.
/// Other parts of the system can clone this to push messages to a specific client.
pub type ConnectionSender = mpsc::UnboundedSender<axum::extract::ws::Message>;

/// Live socket table: every open WebSocket session, keyed by connection ID.
/// This tracks transport-level liveness only; the durable registry tracks
/// which connections have subscribed to a monitoring scope.
pub type SocketTable = Arc<DashMap<String, ConnectionSender>>;

/// Create a new empty socket table.
pub fn new_socket_table() -> SocketTable {
    Arc::new(DashMap::new())
}

/// Production peer transport: posts to a connection's writer channel.
/// A missing or closed channel means the session is gone.
pub struct SocketTransport {
    sockets: SocketTable,
}

impl SocketTransport {
    pub fn new(sockets: SocketTable) -> Self {
        Self { sockets }
    }
}

impl PeerTransport for SocketTransport {
    fn post(&self, connection_id: &str, payload: &str) -> Result<(), DeliveryError> {
        let sender = self
            .sockets
            .get(connection_id)
            .ok_or(DeliveryError::Gone)?;
        sender
            .send(axum::extract::ws::Message::Text(payload.to_owned().into()))
            .map_err(|_| DeliveryError::Gone)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_to_unknown_connection_is_gone() {
        let transport = SocketTransport::new(new_socket_table());
        assert!(matches!(
            transport.post("conn-1", "{}"),
            Err(DeliveryError::Gone)
        ));
    }

    #[test]
    fn post_to_closed_channel_is_gone() {
        let sockets = new_socket_table();
        let (tx, rx) = mpsc::unbounded_channel();
        sockets.insert("conn-1".to_string(), tx);
        drop(rx);

        let transport = SocketTransport::new(sockets);
        assert!(matches!(
            transport.post("conn-1", "{}"),
            Err(DeliveryError::Gone)
        ));
    }

    #[test]
    fn post_to_live_channel_delivers_text() {
        let sockets = new_socket_table();
        let (tx, mut rx) = mpsc::unbounded_channel();
        sockets.insert("conn-1".to_string(), tx);

        let transport = SocketTransport::new(sockets);
        transport.post("conn-1", "{\"type\":\"x\"}").unwrap();

        match rx.try_recv().unwrap() {
            axum::extract::ws::Message::Text(text) => {
                assert_eq!(text.as_str(), "{\"type\":\"x\"}");
            }
            other => panic!("Expected text frame, got {:?}", other),
        }
    }
}
