//! 세션 완료 시 공정 보상 계산

use crate::clock::{seconds_between, Timestamp};
use crate::protocol::ServerMessage;
use crate::room::{Mode, Room};

/// 보상 정책
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoringPolicy {
    /// 휴식 모드 완료에도 보상을 줄지 여부
    pub reward_break_sessions: bool,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            reward_break_sessions: true,
        }
    }
}

impl ScoringPolicy {
    pub fn rewards(&self, mode: Mode) -> bool {
        mode == Mode::Work || self.reward_break_sessions
    }
}

/// 참가자 1명의 획득 시간: 실제 참여 시간, 모드 길이로 상한
pub fn earned_seconds(session_start: Timestamp, now: Timestamp, max_duration: u64) -> u64 {
    seconds_between(session_start, now).min(max_duration)
}

impl Room {
    /// 자연 완료 처리. 실행 중이 아니면 no-op (중복/지연 완료 신호 방어)
    pub fn finish_and_reward(
        &mut self,
        now: Timestamp,
        policy: ScoringPolicy,
    ) -> Option<ServerMessage> {
        if !self.timer.is_running() {
            tracing::debug!(room_id = %self.id, "Ignoring completion for idle timer");
            return None;
        }

        let mode = self.timer.mode();
        let max_duration = self.settings.duration_for(mode);
        let credit = policy.rewards(mode);

        for participant in &mut self.participants {
            if let Some(start) = participant.current_session_start.take() {
                if credit {
                    let earned = earned_seconds(start, now, max_duration);
                    participant.total_seconds = participant.total_seconds.saturating_add(earned);
                    tracing::debug!(
                        room_id = %self.id,
                        participant_id = %participant.id,
                        earned,
                        total = participant.total_seconds,
                        "Credited focus time"
                    );
                }
            }
        }

        self.timer.halt(0);
        self.sort_for_display();

        tracing::info!(room_id = %self.id, mode = %mode, credited = credit, "Session finished");

        Some(ServerMessage::TimerFinished { mode })
    }
}
