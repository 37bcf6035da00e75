use std::sync::Arc;

use axum::extract::ws::{Message as WsMessage, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::info;

use crate::app::AppState;
use crate::ws::query::{self, ConnectQuery};

/// Axum handler — upgrades HTTP to WebSocket at `GET /ws`.
pub async fn ws_handler(
    Query(params): Query<ConnectQuery>,
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, params, state))
}

/// Per-connection task, alive for the lifetime of the session. Rejects the
/// socket with close code 1008 if the presented token doesn't verify;
/// otherwise registers with the hub, replays history, and relays frames in
/// both directions until either side closes.
async fn handle_connection(mut socket: WebSocket, params: ConnectQuery, state: Arc<AppState>) {
    let Some((room, user)) = query::resolve(params, state.verifier.as_ref()) else {
        let _ = socket
            .send(WsMessage::Close(Some(axum::extract::ws::CloseFrame {
                code: 1008,
                reason: "invalid token".into(),
            })))
            .await;
        return;
    };

    info!(room = %room, user = %user.id, "ws connection accepted");
    let connected = state.hub.connect(room.clone(), user.clone()).await;
    let (mut tx, mut rx) = socket.split();
    let mut outgoing = connected.outgoing;

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(WsMessage::Text(text))) => {
                        state.hub.handle_inbound(&room, &user, &text).await;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
            payload = outgoing.recv() => {
                match payload {
                    Some(payload) => {
                        if tx.send(WsMessage::Text(payload.into())).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    state.hub.disconnect(&room, &user).await;
    info!(room = %room, user = %user.id, "ws connection closed");
}
