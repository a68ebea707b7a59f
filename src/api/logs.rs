//! WebSocket stream of live log entries

use axum::{
    Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing::get,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;

use crate::events::LogBus;

/// Build log stream router
pub fn router(bus: LogBus) -> Router {
    Router::new()
        .route("/ws/logs", get(ws_upgrade))
        .with_state(bus)
}

async fn ws_upgrade(State(bus): State<LogBus>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, bus))
}

async fn handle_socket(socket: WebSocket, bus: LogBus) {
    let (mut sender, mut receiver) = socket.split();
    let mut rx = bus.subscribe();

    tracing::debug!("log WebSocket connected");

    let mut forward_task = tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(entry) => {
                    if let Ok(text) = serde_json::to_string(&entry)
                        && sender.send(Message::Text(text.into())).await.is_err()
                    {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "log stream lagged");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    // Only close frames matter from the client
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => recv_task.abort(),
        _ = &mut recv_task => forward_task.abort(),
    }

    tracing::debug!("log WebSocket disconnected");
}
