use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};

use crate::state::AppState;
use crate::ws::actor;

/// GET /ws
/// WebSocket upgrade endpoint. Peer authentication, if any, happens
/// upstream of this server; every upgrade gets an actor.
pub async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_upgraded(socket, state))
}

/// Handle an upgraded WebSocket connection by spawning the actor.
async fn handle_upgraded(socket: WebSocket, state: AppState) {
    actor::run_connection(socket, state).await;
}
