//! Durable connection registry: (scope_id) -> {connection_id} associations.
//!
//! Backed by SQLite with a TTL column. Write failures are logged and
//! swallowed — the live socket is the source of truth for whether a session
//! is open, so a failed registry write must never take down connect or
//! disconnect handling. Reads fail open to an empty list.

use chrono::Utc;
use rusqlite::params;
use thiserror::Error;

use crate::db::models::MonitoringConnection;
use crate::db::DbPool;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("database lock poisoned")]
    LockPoisoned,
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("blocking task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Registry of dashboard connections per monitoring scope.
/// Cheap to clone — shares the underlying connection pool.
#[derive(Clone)]
pub struct ConnectionRegistry {
    db: DbPool,
    ttl_secs: i64,
}

impl ConnectionRegistry {
    pub fn new(db: DbPool, ttl_secs: i64) -> Self {
        Self { db, ttl_secs }
    }

    /// Idempotently upsert a connection record with a fresh TTL.
    /// Re-registering the same pair is not an error; `connected_at` is
    /// preserved across re-registration.
    pub async fn register(&self, connection_id: &str, scope_id: &str) {
        let db = self.db.clone();
        let cid = connection_id.to_string();
        let sid = scope_id.to_string();
        let ttl = self.ttl_secs;

        let result = tokio::task::spawn_blocking(move || -> Result<(), RegistryError> {
            let conn = db.lock().map_err(|_| RegistryError::LockPoisoned)?;
            let now = Utc::now();
            conn.execute(
                "INSERT INTO monitoring_connections
                     (connection_id, scope_id, connected_at, last_activity, expires_at)
                 VALUES (?1, ?2, ?3, ?3, ?4)
                 ON CONFLICT(connection_id) DO UPDATE SET
                     scope_id = excluded.scope_id,
                     last_activity = excluded.last_activity,
                     expires_at = excluded.expires_at",
                params![cid, sid, now.to_rfc3339(), now.timestamp() + ttl],
            )?;
            Ok(())
        })
        .await;

        match flatten(result) {
            Ok(()) => tracing::debug!(
                connection_id = %connection_id,
                scope_id = %scope_id,
                "Connection registered"
            ),
            Err(e) => tracing::error!(
                connection_id = %connection_id,
                scope_id = %scope_id,
                error = %e,
                "Failed to register connection"
            ),
        }
    }

    /// Delete any record for this connection. No-op if never registered.
    pub async fn unregister(&self, connection_id: &str) {
        let db = self.db.clone();
        let cid = connection_id.to_string();

        let result = tokio::task::spawn_blocking(move || -> Result<usize, RegistryError> {
            let conn = db.lock().map_err(|_| RegistryError::LockPoisoned)?;
            let deleted = conn.execute(
                "DELETE FROM monitoring_connections WHERE connection_id = ?1",
                params![cid],
            )?;
            Ok(deleted)
        })
        .await;

        match flatten(result) {
            Ok(deleted) => tracing::debug!(
                connection_id = %connection_id,
                deleted = deleted,
                "Connection unregistered"
            ),
            Err(e) => tracing::error!(
                connection_id = %connection_id,
                error = %e,
                "Failed to unregister connection"
            ),
        }
    }

    /// Every currently-registered, unexpired connection for the scope.
    /// Store failures yield an empty list — better to skip a broadcast
    /// than crash it.
    pub async fn list_by_scope(&self, scope_id: &str) -> Vec<MonitoringConnection> {
        let db = self.db.clone();
        let sid = scope_id.to_string();

        let result = tokio::task::spawn_blocking(
            move || -> Result<Vec<MonitoringConnection>, RegistryError> {
                let conn = db.lock().map_err(|_| RegistryError::LockPoisoned)?;
                let mut stmt = conn.prepare(
                    "SELECT connection_id, scope_id, connected_at, last_activity, expires_at
                     FROM monitoring_connections
                     WHERE scope_id = ?1 AND expires_at > ?2",
                )?;
                let rows = stmt
                    .query_map(params![sid, Utc::now().timestamp()], |row| {
                        Ok(MonitoringConnection {
                            connection_id: row.get(0)?,
                            scope_id: row.get(1)?,
                            connected_at: row.get(2)?,
                            last_activity: row.get(3)?,
                            expires_at: row.get(4)?,
                        })
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            },
        )
        .await;

        match flatten(result) {
            Ok(rows) => rows,
            Err(e) => {
                tracing::error!(
                    scope_id = %scope_id,
                    error = %e,
                    "Failed to list connections for scope"
                );
                Vec::new()
            }
        }
    }

    /// Refresh last_activity/expires_at for an existing connection.
    /// No-op if the connection is not registered.
    pub async fn touch(&self, connection_id: &str) {
        let db = self.db.clone();
        let cid = connection_id.to_string();
        let ttl = self.ttl_secs;

        let result = tokio::task::spawn_blocking(move || -> Result<(), RegistryError> {
            let conn = db.lock().map_err(|_| RegistryError::LockPoisoned)?;
            let now = Utc::now();
            conn.execute(
                "UPDATE monitoring_connections
                 SET last_activity = ?2, expires_at = ?3
                 WHERE connection_id = ?1",
                params![cid, now.to_rfc3339(), now.timestamp() + ttl],
            )?;
            Ok(())
        })
        .await;

        if let Err(e) = flatten(result) {
            tracing::error!(
                connection_id = %connection_id,
                error = %e,
                "Failed to refresh connection activity"
            );
        }
    }

    /// Delete all records whose TTL has elapsed. Returns the purge count.
    /// Called periodically by the registry sweeper.
    pub async fn purge_expired(&self) -> Result<usize, RegistryError> {
        let db = self.db.clone();

        let result = tokio::task::spawn_blocking(move || -> Result<usize, RegistryError> {
            let conn = db.lock().map_err(|_| RegistryError::LockPoisoned)?;
            let deleted = conn.execute(
                "DELETE FROM monitoring_connections WHERE expires_at <= ?1",
                params![Utc::now().timestamp()],
            )?;
            Ok(deleted)
        })
        .await;

        flatten(result)
    }
}

fn flatten<T>(
    result: Result<Result<T, RegistryError>, tokio::task::JoinError>,
) -> Result<T, RegistryError> {
    result.map_err(RegistryError::from)?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_test_db;

    fn registry_with_ttl(ttl_secs: i64) -> ConnectionRegistry {
        ConnectionRegistry::new(init_test_db(), ttl_secs)
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let registry = registry_with_ttl(3600);

        registry.register("conn-1", "study-1").await;
        registry.register("conn-1", "study-1").await;

        let connections = registry.list_by_scope("study-1").await;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].connection_id, "conn-1");
    }

    #[tokio::test]
    async fn register_moves_connection_between_scopes() {
        let registry = registry_with_ttl(3600);

        registry.register("conn-1", "study-1").await;
        registry.register("conn-1", "study-2").await;

        assert!(registry.list_by_scope("study-1").await.is_empty());
        assert_eq!(registry.list_by_scope("study-2").await.len(), 1);
    }

    #[tokio::test]
    async fn unregister_removes_connection() {
        let registry = registry_with_ttl(3600);

        registry.register("conn-1", "study-1").await;
        registry.register("conn-2", "study-1").await;
        registry.unregister("conn-1").await;

        let connections = registry.list_by_scope("study-1").await;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].connection_id, "conn-2");
    }

    #[tokio::test]
    async fn unregister_unknown_connection_is_noop() {
        let registry = registry_with_ttl(3600);
        registry.unregister("never-registered").await;
        assert!(registry.list_by_scope("study-1").await.is_empty());
    }

    #[tokio::test]
    async fn list_by_scope_empty_when_no_subscribers() {
        let registry = registry_with_ttl(3600);
        assert!(registry.list_by_scope("study-1").await.is_empty());
    }

    #[tokio::test]
    async fn expired_connections_are_invisible() {
        // Negative TTL: every registration is born expired.
        let registry = registry_with_ttl(-10);

        registry.register("conn-1", "study-1").await;

        assert!(registry.list_by_scope("study-1").await.is_empty());
    }

    #[tokio::test]
    async fn purge_expired_deletes_only_expired_rows() {
        let db = init_test_db();
        let expired = ConnectionRegistry::new(db.clone(), -10);
        let live = ConnectionRegistry::new(db, 3600);

        expired.register("conn-dead", "study-1").await;
        live.register("conn-live", "study-1").await;

        let purged = live.purge_expired().await.expect("purge");
        assert_eq!(purged, 1);

        let connections = live.list_by_scope("study-1").await;
        assert_eq!(connections.len(), 1);
        assert_eq!(connections[0].connection_id, "conn-live");
    }

    #[tokio::test]
    async fn touch_extends_expiry() {
        let db = init_test_db();
        // Born expired, then touched by a registry with a real TTL.
        let expired = ConnectionRegistry::new(db.clone(), -10);
        let live = ConnectionRegistry::new(db, 3600);

        expired.register("conn-1", "study-1").await;
        assert!(live.list_by_scope("study-1").await.is_empty());

        live.touch("conn-1").await;
        assert_eq!(live.list_by_scope("study-1").await.len(), 1);
    }

    #[tokio::test]
    async fn touch_unknown_connection_is_noop() {
        let registry = registry_with_ttl(3600);
        registry.touch("never-registered").await;
        assert!(registry.list_by_scope("study-1").await.is_empty());
    }
}
