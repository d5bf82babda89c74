use axum::{
    extract::{Path, State},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;
use crate::ws::handler as ws_handler;
use crate::ws::protocol::{self, ClientMessage};

/// Build the full axum Router.
pub fn build_router(state: AppState) -> Router {
    // WebSocket endpoint for dashboards and participant sessions
    let ws_routes = Router::new().route("/ws", axum::routing::get(ws_handler::ws_upgrade));

    // HTTP ingest: backend services report participant progress without
    // holding a socket of their own.
    let monitoring_routes = Router::new()
        .route(
            "/api/monitoring/events",
            axum::routing::post(ingest_event),
        )
        .route(
            "/api/monitoring/{scope_id}/subscribers",
            axum::routing::get(list_subscribers),
        );

    // Health check
    let health = Router::new().route("/health", axum::routing::get(health_check));

    Router::new()
        .merge(ws_routes)
        .merge(monitoring_routes)
        .merge(health)
        .with_state(state)
}

/// POST /api/monitoring/events — Accepts the same tagged `{type, data}`
/// messages as the WebSocket endpoint and broadcasts them to subscribed
/// dashboards. Unknown types are acknowledged with zero deliveries; this
/// endpoint never errors on message content.
async fn ingest_event(
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> Json<serde_json::Value> {
    let kind = body
        .get("type")
        .and_then(|t| t.as_str())
        .unwrap_or("<missing>")
        .to_string();

    let message = match serde_json::from_value::<ClientMessage>(body) {
        Ok(message) => message,
        Err(e) => {
            tracing::warn!(
                message_type = %kind,
                error = %e,
                "Unrecognized monitoring event via HTTP, ignoring"
            );
            return Json(json!({ "delivered": 0 }));
        }
    };

    match protocol::event_from_message(message, Utc::now().to_rfc3339()) {
        Some(event) => {
            let delivered = state.broadcaster.broadcast(event.scope_id(), &event).await;
            Json(json!({ "delivered": delivered }))
        }
        None => {
            // Subscribing requires a live socket; there is nothing to
            // register an HTTP caller under.
            tracing::warn!(
                message_type = %kind,
                "Subscribe message over HTTP ingest, ignoring"
            );
            Json(json!({ "delivered": 0 }))
        }
    }
}

/// GET /api/monitoring/{scope_id}/subscribers — Operator visibility into
/// which dashboard connections are watching a scope.
async fn list_subscribers(
    State(state): State<AppState>,
    Path(scope_id): Path<String>,
) -> Json<serde_json::Value> {
    let connections = state.registry.list_by_scope(&scope_id).await;
    let connection_ids: Vec<&str> = connections
        .iter()
        .map(|c| c.connection_id.as_str())
        .collect();

    Json(json!({
        "scopeId": scope_id,
        "count": connection_ids.len(),
        "connectionIds": connection_ids,
    }))
}

/// Basic health check endpoint
async fn health_check() -> &'static str {
    "ok"
}
