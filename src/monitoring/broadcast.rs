//! Scope-wide event fan-out.
//!
//! Best-effort, at-most-once per subscriber: all sends for a scope are
//! issued concurrently and joined, the success count is returned, and
//! individual failures are never re-raised. Dashboards reconcile from
//! subsequent events, so a partial broadcast is an acceptable outcome.

use futures_util::future::join_all;

use super::delivery::DeliveryClient;
use super::event::MonitoringEvent;
use super::registry::ConnectionRegistry;

#[derive(Clone)]
pub struct Broadcaster {
    registry: ConnectionRegistry,
    delivery: DeliveryClient,
}

impl Broadcaster {
    pub fn new(registry: ConnectionRegistry, delivery: DeliveryClient) -> Self {
        Self { registry, delivery }
    }

    /// Deliver one event to every connection registered for the scope.
    /// Returns the number of successful deliveries.
    pub async fn broadcast(&self, scope_id: &str, event: &MonitoringEvent) -> usize {
        let connections = self.registry.list_by_scope(scope_id).await;

        if connections.is_empty() {
            // Expected steady state before any dashboard subscribes.
            tracing::info!(
                scope_id = %scope_id,
                event = event.kind(),
                "No subscribers for broadcast"
            );
            return 0;
        }

        let total = connections.len();
        let sends = connections
            .iter()
            .map(|connection| self.delivery.send(&connection.connection_id, event));
        let delivered = join_all(sends)
            .await
            .into_iter()
            .filter(|delivered| *delivered)
            .count();

        if delivered < total {
            tracing::warn!(
                scope_id = %scope_id,
                event = event.kind(),
                delivered = delivered,
                total = total,
                "Partial broadcast"
            );
        } else {
            tracing::info!(
                scope_id = %scope_id,
                event = event.kind(),
                delivered = delivered,
                "Broadcast complete"
            );
        }

        delivered
    }
}
