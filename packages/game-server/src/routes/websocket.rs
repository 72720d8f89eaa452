use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::HeaderMap,
    response::Response,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::unbounded_channel;
use tracing::{debug, error, info};

use crate::{
    actions, error::ApiError, middleware::auth::bearer_token, realtime::events::ServerEvent,
    realtime::hub::user_room, state::AppState,
};
use shared::services::auth_service::AuthServiceTrait;

pub fn routes() -> Router<AppState> {
    Router::new().route("/ws", get(upgrade))
}

#[derive(Debug, Deserialize)]
pub struct ConnectParams {
    pub token: Option<String>,
}

/// Browsers cannot set headers on a WebSocket handshake, so the token may
/// also arrive as `?token=`.
async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<ConnectParams>,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    let token = bearer_token(&headers)
        .map(str::to_string)
        .or(params.token)
        .ok_or(ApiError::Unauthorized)?;
    let user_id = state.auth_service.extract_user_id_from_token(&token)?;

    Ok(ws.on_upgrade(move |socket| serve_socket(socket, state, user_id)))
}

async fn serve_socket(socket: WebSocket, state: AppState, user_id: String) {
    let (mut sink, mut stream) = socket.split();
    let (sender, mut outbound) = unbounded_channel::<ServerEvent>();
    let connection = state.hub.register(&user_id, sender);
    state.hub.join(connection, &user_room(&user_id));
    info!("{} opened for user {}", connection, user_id);
    state.hub.send_to(
        connection,
        ServerEvent::Connected {
            user_id: user_id.clone(),
        },
    );

    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("Failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Frames from one connection are handled in arrival order.
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                actions::handle_text(&state, connection, &user_id, text.as_str()).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("{} read error: {}", connection, e);
                break;
            }
        }
    }

    actions::disconnect::handle(&state, connection);
    writer.abort();
}
