//! 연결 핸들러

use crate::clock::Clock;
use crate::protocol::{JoinRequest, ServerMessage};
use crate::room::{ParticipantId, PeerSender};
use crate::state::AppState;

/// 첫 메시지에서 표시 이름 추출 (없거나 비어 있으면 기본값)
pub fn resolve_user_name(first_frame: Option<&str>, default_name: &str) -> String {
    first_frame
        .and_then(|text| serde_json::from_str::<JoinRequest>(text).ok())
        .and_then(|req| req.user_name)
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| default_name.to_string())
}

/// 방 참여 처리: 등록, 입장 알림, 현재 상태 전송, 목록 갱신
pub async fn handle_join(
    state: &AppState,
    room_id: &str,
    user_name: &str,
    sender: PeerSender,
) -> ParticipantId {
    let now = state.clock.now();
    let mut room = state.registry.lock(room_id, now).await;

    let participant = room.join(user_name, sender, now);
    room.broadcast(ServerMessage::user_joined(user_name), Some(participant.id));
    room.send_current_state(participant.id, now);
    let users = room.user_list_event();
    room.broadcast(users, None);

    participant.id
}

/// 연결 해제 처리
pub async fn handle_disconnect(state: &AppState, room_id: &str, participant_id: ParticipantId) {
    if let Some(mut room) = state.registry.lock_existing(room_id).await {
        if !room.depart(participant_id) {
            tracing::debug!(room_id = %room_id, participant_id = %participant_id, "Participant already removed");
        }
    }
    tracing::info!(room_id = %room_id, participant_id = %participant_id, "Connection closed");
}
