//! Per-peer delivery: push one JSON event to one connection by ID.
//!
//! The transport is abstracted behind `PeerTransport` so the broadcaster can
//! be exercised against recording/failing transports in tests. The only
//! classification the rest of the system cares about is gone-vs-transient:
//! a gone peer is reactively pruned from the registry, a transient failure
//! leaves the registration alone so a later send can succeed.

use std::sync::Arc;

use thiserror::Error;

use super::event::MonitoringEvent;
use super::registry::ConnectionRegistry;

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The transport reports the connection no longer exists.
    #[error("connection no longer exists")]
    Gone,
    /// The peer may still be alive; a future send can retry naturally.
    #[error("transient delivery failure: {0}")]
    Transient(String),
}

/// "Post bytes to a named connection" primitive, with a distinguishable
/// gone status. The production implementation is the live socket table
/// (`ws::SocketTransport`).
pub trait PeerTransport: Send + Sync {
    fn post(&self, connection_id: &str, payload: &str) -> Result<(), DeliveryError>;
}

/// Serializes monitoring events and hands them to the transport.
/// No retries here — retry policy belongs to the caller.
#[derive(Clone)]
pub struct DeliveryClient {
    transport: Arc<dyn PeerTransport>,
    registry: ConnectionRegistry,
}

impl DeliveryClient {
    pub fn new(transport: Arc<dyn PeerTransport>, registry: ConnectionRegistry) -> Self {
        Self {
            transport,
            registry,
        }
    }

    /// Push one event to one connection. Returns whether delivery succeeded.
    /// A gone peer is unregistered as a side effect.
    pub async fn send(&self, connection_id: &str, event: &MonitoringEvent) -> bool {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(
                    connection_id = %connection_id,
                    event = event.kind(),
                    error = %e,
                    "Failed to serialize monitoring event"
                );
                return false;
            }
        };

        match self.transport.post(connection_id, &payload) {
            Ok(()) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    event = event.kind(),
                    "Event delivered"
                );
                true
            }
            Err(DeliveryError::Gone) => {
                tracing::info!(
                    connection_id = %connection_id,
                    event = event.kind(),
                    "Peer gone, removing stale registration"
                );
                self.registry.unregister(connection_id).await;
                false
            }
            Err(DeliveryError::Transient(reason)) => {
                tracing::warn!(
                    connection_id = %connection_id,
                    event = event.kind(),
                    reason = %reason,
                    "Transient delivery failure, keeping registration"
                );
                false
            }
        }
    }
}
