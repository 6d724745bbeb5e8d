// WebSocket stream of pet snapshots and presentation effects.

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use serde::Deserialize;
use tokio::sync::broadcast::error::RecvError;

use crate::engine::server::{Broadcast, MessageKind};
use crate::metrics;

use super::AppState;

/// What a client asked to receive. Renderers usually only want effects;
/// dashboards only want snapshots.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stream {
    #[default]
    All,
    Snapshots,
    Effects,
}

impl Stream {
    /// The stop notice always goes through.
    pub fn wants(self, kind: MessageKind) -> bool {
        match (self, kind) {
            (_, MessageKind::Stopped) | (Stream::All, _) => true,
            (Stream::Snapshots, MessageKind::Snapshot) => true,
            (Stream::Effects, MessageKind::Effects) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct WsParams {
    #[serde(default)]
    pub stream: Stream,
}

/// `GET /ws/pet?stream=all|snapshots|effects`
pub async fn ws_pet(
    ws: WebSocketUpgrade,
    Query(params): Query<WsParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, params.stream))
}

async fn handle_ws(mut socket: WebSocket, state: AppState, stream: Stream) {
    metrics::CONNECTED_WEBSOCKETS.inc();
    tracing::debug!(?stream, "pet stream opened");
    forward(&mut socket, &state, stream).await;
    metrics::CONNECTED_WEBSOCKETS.dec();
}

async fn send_text(socket: &mut WebSocket, json: String) -> bool {
    if socket.send(Message::Text(json.into())).await.is_err() {
        return false;
    }
    metrics::WEBSOCKET_MESSAGES_SENT_TOTAL.inc();
    true
}

async fn forward(socket: &mut WebSocket, state: &AppState, stream: Stream) {
    let mut rx = state.pet_server.subscribe();

    if stream.wants(MessageKind::Snapshot) {
        if let Some(json) = state.pet_server.latest_json() {
            if !send_text(socket, json).await {
                return;
            }
        }
    }

    loop {
        tokio::select! {
            result = rx.recv() => match result {
                Ok(Broadcast { kind, json }) => {
                    if !stream.wants(kind) {
                        continue;
                    }
                    if !send_text(socket, json).await {
                        break;
                    }
                    if kind == MessageKind::Stopped {
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(n)) => {
                    // Snapshots are full state, so the next one catches the client up
                    tracing::warn!(skipped = n, ?stream, "pet stream lagged");
                }
            },
            result = socket.recv() => match result {
                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                _ => {}
            },
        }
    }
}
