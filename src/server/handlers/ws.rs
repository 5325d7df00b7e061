//! WebSocket upgrade. The session token comes from the `Authorization`
//! header or, on this route only, the `token` query parameter.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::response::Response;

use super::super::AppState;
use crate::auth::SocketUser;
use crate::realtime::run_session;

pub async fn upgrade(
    State(state): State<AppState>,
    SocketUser(user): SocketUser,
    ws: WebSocketUpgrade,
) -> Response {
    tracing::debug!("WebSocket upgrade for user {}", user.id);
    let ctx = state.ctx.clone();
    ws.on_upgrade(move |socket| run_session(socket, user, ctx))
}
