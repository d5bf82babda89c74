use crate::monitoring::broadcast::Broadcaster;
use crate::monitoring::registry::ConnectionRegistry;
use crate::ws::SocketTable;

/// Shared application state passed to all handlers via axum State extractor.
/// Constructed once at process start in main.rs (or a test harness) and
/// injected — no module-level singletons.
#[derive(Clone)]
pub struct AppState {
    /// Live WebSocket sessions, keyed by connection ID
    pub sockets: SocketTable,
    /// Durable scope -> connection registry (SQLite-backed)
    pub registry: ConnectionRegistry,
    /// Scope-wide event fan-out
    pub broadcaster: Broadcaster,
}
