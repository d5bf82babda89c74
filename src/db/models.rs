/// Database row types.
/// These correspond 1:1 to the SQLite schema defined in migrations.rs.

/// One registered monitoring connection in the monitoring_connections table.
/// A row exists only for sockets that have subscribed to a scope; sockets
/// that connected but never subscribed live solely in the in-memory table.
#[derive(Debug, Clone)]
pub struct MonitoringConnection {
    /// Opaque ID assigned by the server at upgrade time, unique per session.
    pub connection_id: String,
    /// The study/research this connection is watching.
    pub scope_id: String,
    /// RFC 3339 timestamp of registration.
    pub connected_at: String,
    /// RFC 3339 timestamp of the last inbound message from this connection.
    pub last_activity: String,
    /// Unix seconds after which the row is presumed dead and may be purged.
    pub expires_at: i64,
}
