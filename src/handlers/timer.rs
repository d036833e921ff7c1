//! 타이머 명령 핸들러

use crate::clock::Clock;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::{Mode, ParticipantId, Settings};
use crate::state::AppState;

/// 클라이언트 명령 처리. 한 명령 = 하나의 방 잠금 구간
pub async fn handle_client_message(
    state: &AppState,
    room_id: &str,
    participant_id: ParticipantId,
    msg: ClientMessage,
) {
    let Some(mut room) = state.registry.lock_existing(room_id).await else {
        tracing::warn!(room_id = %room_id, "Command for unknown room");
        return;
    };
    let now = state.clock.now();

    // 전달 실패로 이미 정리된 연결의 명령은 무시
    let Some(participant) = room.participant(participant_id) else {
        tracing::debug!(room_id = %room_id, participant_id = %participant_id, "Command from departed participant");
        return;
    };
    tracing::debug!(
        room_id = %room_id,
        user_name = %participant.display_name,
        command = ?msg,
        "Command received"
    );

    match msg {
        ClientMessage::StartTimer => match room.start(now) {
            Ok(Some(event)) => room.broadcast(event, None),
            Ok(None) => tracing::debug!(room_id = %room_id, "Timer already running"),
            Err(e) => {
                tracing::warn!(room_id = %room_id, error = %e, "Refusing to start timer");
                room.reply(participant_id, ServerMessage::error(e.code(), e.to_string()));
            }
        },
        ClientMessage::StopTimer => {
            if let Some(event) = room.stop(now) {
                room.broadcast(event, None);
            }
        }
        ClientMessage::ResetTimer { mode } => {
            let mode = Mode::parse_or_work(mode.as_deref());
            let event = room.reset(mode);
            room.broadcast(event, None);
        }
        ClientMessage::UpdateSettings {
            work_duration,
            short_break,
            long_break,
        } => {
            let defaults = state.config.timer.defaults;
            let settings = Settings::new(
                work_duration.unwrap_or(defaults.work_duration),
                short_break.unwrap_or(defaults.short_break_duration),
                long_break.unwrap_or(defaults.long_break_duration),
            );
            match settings {
                Ok(settings) => {
                    let event = room.update_settings(settings);
                    room.broadcast(event, None);
                }
                Err(e) => {
                    tracing::warn!(room_id = %room_id, error = %e, "Rejected settings update");
                    room.reply(participant_id, ServerMessage::error(e.code(), e.to_string()));
                }
            }
        }
        ClientMessage::TimerCompleted => {
            if let Some(event) = room.finish_and_reward(now, state.config.timer.scoring) {
                room.broadcast(event, None);
                let users = room.user_list_event();
                room.broadcast(users, None);
            }
        }
    }
}
