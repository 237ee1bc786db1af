use axum::{
    Router,
    extract::{
        Query, State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::IntoResponse,
    routing,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use crate::core::{app_error::AppError, app_state::AppState, auth};

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws/staff", routing::get(staff_channel))
}

#[derive(Deserialize)]
struct ChannelAuth {
    /// Staff bearer token; browsers cannot set headers on WebSocket upgrades.
    token: String,
}

/// Authenticated staff notification channel. The connection joins the room
/// keyed by the staff id and receives every event targeted at it while the
/// socket stays open.
async fn staff_channel(
    ws: WebSocketUpgrade,
    Query(query): Query<ChannelAuth>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let staff_id = auth::decode_staff_token(&query.token)?;
    Ok(ws.on_upgrade(move |socket| handle_connection(socket, staff_id, state)))
}

async fn handle_connection(socket: WebSocket, staff_id: i32, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (conn_id, mut events) = state.hub.join(staff_id);
    tracing::info!("Staff {} connected to the notification channel", staff_id);

    let forward = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if sink.send(Message::Text(event.into())).await.is_err() {
                break;
            }
        }
    });

    // Inbound traffic is only keepalive; the read loop exists to notice the
    // disconnect.
    while let Some(Ok(message)) = stream.next().await {
        if let Message::Close(_) = message {
            break;
        }
    }

    state.hub.leave(staff_id, conn_id);
    forward.abort();
    tracing::info!("Staff {} disconnected", staff_id);

    state
        .hub
        .broadcast("user-disconnect", &serde_json::json!({ "staffId": staff_id }));
}
