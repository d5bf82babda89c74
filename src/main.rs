mod config;
mod db;
mod monitoring;
mod routes;
mod state;
mod ws;

use std::sync::Arc;
use tokio::net::TcpListener;

use config::{generate_config_template, Config};
use monitoring::broadcast::Broadcaster;
use monitoring::delivery::DeliveryClient;
use monitoring::registry::ConnectionRegistry;
use monitoring::sweeper::spawn_registry_sweeper;
use ws::SocketTransport;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    if config.json_logs {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "studywatch_server=info".parse().unwrap()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .pretty()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "studywatch_server=info".parse().unwrap()),
            )
            .init();
    }

    tracing::info!("studywatch server v{} starting", env!("CARGO_PKG_VERSION"));

    // Initialize SQLite database
    let db = db::init_db(&config.data_dir)?;

    // Wire the monitoring subsystem: one instance of each per process,
    // injected into handlers through AppState.
    let sockets = ws::new_socket_table();
    let registry = ConnectionRegistry::new(db, config.connection_ttl_secs);
    let transport = Arc::new(SocketTransport::new(sockets.clone()));
    let delivery = DeliveryClient::new(transport, registry.clone());
    let broadcaster = Broadcaster::new(registry.clone(), delivery);

    // Reclaim registrations whose TTL lapsed without a disconnect
    spawn_registry_sweeper(registry.clone(), config.sweep_interval_secs);

    let app_state = state::AppState {
        sockets,
        registry,
        broadcaster,
    };

    // Build router
    let app = routes::build_router(app_state);

    // Bind and serve
    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
