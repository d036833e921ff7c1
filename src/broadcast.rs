//! 방 단위 이벤트 전달 (broadcast / unicast)
//!
//! 전달은 각 연결의 송신 메일박스에 넣는 것으로 끝나며 대기하지 않는다.
//! 실제 소켓 쓰기는 연결별 송신 태스크가 방 잠금 밖에서 수행한다.
//! 메일박스가 닫힌 연결은 끊긴 것으로 보고 같은 잠금 구간 안에서 정리한다.

use crate::clock::Timestamp;
use crate::error::DeliveryError;
use crate::protocol::ServerMessage;
use crate::room::{ParticipantId, Room};
use std::collections::VecDeque;

impl Room {
    /// 한 참가자에게 전송
    pub fn send_to(&self, id: ParticipantId, message: ServerMessage) -> Result<(), DeliveryError> {
        let delivered = self
            .connections
            .get(&id)
            .map(|sender| sender.send(message).is_ok())
            .unwrap_or(false);
        if delivered {
            Ok(())
        } else {
            Err(DeliveryError {
                participant_id: id.to_string(),
            })
        }
    }

    /// 한 참가자에게 응답. 실패하면 연결 해제로 처리
    pub fn reply(&mut self, id: ParticipantId, message: ServerMessage) {
        if let Err(e) = self.send_to(id, message) {
            tracing::warn!(room_id = %self.id, error = %e, "Unicast delivery failed");
            self.prune(vec![id]);
        }
    }

    /// 새 참가자에게 현재 시각 기준 타이머 상태 전송
    pub fn send_current_state(&mut self, id: ParticipantId, now: Timestamp) {
        let state = self.timer_state_event(now);
        self.reply(id, state);
    }

    /// 방 전체에 전송 (`exclude` 제외). 전달 실패한 연결은 제거되고
    /// 남은 참가자에게 퇴장/목록 이벤트가 이어서 전달된다.
    pub fn broadcast(&mut self, message: ServerMessage, exclude: Option<ParticipantId>) {
        let failed = self.fan_out(&message, exclude);
        self.prune(failed);
    }

    /// 참가자 퇴장 처리 후 남은 인원에게 알림
    pub fn depart(&mut self, id: ParticipantId) -> bool {
        self.prune(vec![id])
    }

    fn fan_out(&self, message: &ServerMessage, exclude: Option<ParticipantId>) -> Vec<ParticipantId> {
        let mut failed = Vec::new();
        for (peer_id, sender) in &self.connections {
            if Some(*peer_id) == exclude {
                continue;
            }
            if sender.send(message.clone()).is_err() {
                tracing::warn!(room_id = %self.id, participant_id = %peer_id, "Broadcast delivery failed");
                failed.push(*peer_id);
            }
        }
        failed
    }

    /// 끊긴 연결 정리. 알림 전송 중 또 실패하면 큐에 추가해 반복한다.
    fn prune(&mut self, initial: Vec<ParticipantId>) -> bool {
        let mut pending: VecDeque<ParticipantId> = initial.into();
        let mut removed_any = false;

        while let Some(id) = pending.pop_front() {
            let Some(participant) = self.leave(id) else {
                continue;
            };
            removed_any = true;

            let notices = [
                ServerMessage::user_left(&participant.display_name),
                self.user_list_event(),
            ];
            for notice in notices {
                for failed in self.fan_out(&notice, None) {
                    if !pending.contains(&failed) {
                        pending.push_back(failed);
                    }
                }
            }
        }
        removed_any
    }
}
