use rusqlite_migration::{Migrations, M};

/// Define all schema migrations.
/// Uses SQLite user_version pragma for tracking — no migration table needed.
pub fn migrations() -> Migrations<'static> {
    Migrations::new(vec![M::up(
        "-- Migration 1: monitoring connection registry

CREATE TABLE monitoring_connections (
    connection_id TEXT PRIMARY KEY,
    scope_id TEXT NOT NULL,
    connected_at TEXT NOT NULL,
    last_activity TEXT NOT NULL,
    expires_at INTEGER NOT NULL
);

CREATE INDEX idx_monitoring_connections_scope ON monitoring_connections(scope_id);
CREATE INDEX idx_monitoring_connections_expiry ON monitoring_connections(expires_at);
",
    )])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_valid() {
        assert!(migrations().validate().is_ok());
    }
}
