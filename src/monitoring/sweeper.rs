//! Background sweep of expired connection registrations.
//!
//! The registry is TTL-based; rows whose `expires_at` has passed are
//! already invisible to `list_by_scope`, this task just reclaims them.

use super::registry::ConnectionRegistry;

/// Spawn a background task that periodically purges expired registrations.
/// Logs the purge count each cycle.
pub fn spawn_registry_sweeper(registry: ConnectionRegistry, interval_secs: u64) {
    let interval = std::time::Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;

            match registry.purge_expired().await {
                Ok(count) if count > 0 => {
                    tracing::info!("Registry sweep: purged {} expired connections", count);
                }
                Ok(_) => {
                    tracing::debug!("Registry sweep: no expired connections");
                }
                Err(e) => {
                    tracing::error!("Registry sweep error: {}", e);
                }
            }
        }
    });
}
