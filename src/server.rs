//! HTTP 라우터와 WebSocket 세션 게이트웨이

use crate::clock::Clock;
use crate::handlers;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::registry::RemoveOutcome;
use crate::state::AppState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Path, State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// 라우터 구성
pub fn router(state: Arc<AppState>) -> Router {
    // CORS 설정
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_handler))
        .route("/rooms/:room_id", get(room_handler).delete(delete_room_handler))
        .route("/ws/:room_id", get(ws_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "server": env!("CARGO_PKG_NAME"),
        "rooms": state.registry.room_count(),
        "timestamp": state.clock.now(),
    }))
}

async fn room_handler(
    Path(room_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> Response {
    match state.registry.lock_existing(&room_id).await {
        Some(room) => Json(room.snapshot(state.clock.now())).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn delete_room_handler(
    Path(room_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> StatusCode {
    match state.registry.remove_room(&room_id).await {
        RemoveOutcome::Removed => StatusCode::NO_CONTENT,
        RemoveOutcome::NotFound => StatusCode::NOT_FOUND,
        RemoveOutcome::Occupied(_) => StatusCode::CONFLICT,
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(room_id): Path<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, room_id, state))
}

async fn handle_socket(socket: WebSocket, room_id: String, state: Arc<AppState>) {
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // 첫 메시지는 사용자 이름
    let first_frame = match ws_receiver.next().await {
        Some(Ok(Message::Text(text))) => Some(text),
        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
            tracing::debug!(room_id = %room_id, "Socket closed before join");
            return;
        }
        Some(Ok(_)) => None,
    };
    let user_name =
        handlers::resolve_user_name(first_frame.as_deref(), &state.config.timer.default_user_name);

    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    let participant_id = handlers::handle_join(&state, &room_id, &user_name, tx).await;

    // 송신 태스크 (소켓 쓰기는 방 잠금 밖에서)
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            match serde_json::to_string(&msg) {
                Ok(json) => {
                    if ws_sender.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => tracing::error!(error = %e, "Failed to encode server message"),
            }
        }
    });

    // 수신 처리
    while let Some(result) = ws_receiver.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => {
                    handlers::handle_client_message(&state, &room_id, participant_id, msg).await;
                }
                Err(e) => {
                    tracing::debug!(room_id = %room_id, error = %e, "Ignoring malformed message");
                }
            },
            Ok(Message::Close(_)) => break,
            Err(_) => break,
            _ => {}
        }
    }

    // 연결 해제
    handlers::handle_disconnect(&state, &room_id, participant_id).await;
    send_task.abort();
}
