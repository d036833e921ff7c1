//! 타이머 상태 전이 (start / stop / reset / update_settings)
//!
//! 모든 전이는 방 잠금 안에서 호출되며, 브로드캐스트할 이벤트를 반환한다.
//! 이미 실행 중인 start, 정지 상태의 stop 은 `None` 을 반환하는 no-op 이다.

use crate::clock::{seconds_between, Timestamp};
use crate::error::TimerError;
use crate::protocol::ServerMessage;
use crate::room::{Mode, Room, Settings};
use chrono::TimeDelta;

/// `now + remaining` 계산 (범위를 벗어나면 에러)
pub fn target_after(now: Timestamp, remaining_seconds: u64) -> Result<Timestamp, TimerError> {
    i64::try_from(remaining_seconds)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|delta| now.checked_add_signed(delta))
        .ok_or(TimerError::TargetOutOfRange { remaining_seconds })
}

impl Room {
    /// 타이머 시작
    pub fn start(&mut self, now: Timestamp) -> Result<Option<ServerMessage>, TimerError> {
        if self.timer.is_running() {
            return Ok(None);
        }

        let remaining = match self.timer.target_timestamp() {
            Some(stale) => seconds_between(now, stale),
            None => self.timer.remaining_seconds(),
        };
        let target = target_after(now, remaining)?;

        // 실행 전환 시점이 모든 참가자의 공통 기준점
        for participant in &mut self.participants {
            participant.current_session_start = Some(now);
        }
        self.timer.run_until(target, remaining);

        tracing::info!(
            room_id = %self.id,
            mode = %self.timer.mode(),
            remaining_seconds = remaining,
            "Timer started"
        );

        Ok(Some(ServerMessage::TimerStarted {
            remaining_seconds: remaining,
            target_timestamp: target,
            is_running: true,
            mode: self.timer.mode(),
        }))
    }

    /// 타이머 일시정지 (보상 없음)
    pub fn stop(&mut self, now: Timestamp) -> Option<ServerMessage> {
        if !self.timer.is_running() {
            return None;
        }

        let remaining = self.timer.live_remaining(now);
        self.clear_sessions();
        self.timer.halt(remaining);

        tracing::info!(room_id = %self.id, remaining_seconds = remaining, "Timer stopped");

        Some(ServerMessage::TimerStopped {
            remaining_seconds: remaining,
            is_running: false,
            mode: self.timer.mode(),
        })
    }

    /// 주어진 모드로 초기화 (항상 허용, 보상 없음)
    pub fn reset(&mut self, mode: Mode) -> ServerMessage {
        let duration = self.settings.duration_for(mode);
        self.clear_sessions();
        self.timer.halt(duration);
        self.timer.set_mode(mode);

        tracing::info!(room_id = %self.id, mode = %mode, "Timer reset");

        ServerMessage::TimerReset {
            remaining_seconds: duration,
            is_running: false,
            mode,
        }
    }

    /// 설정 교체. 정지 상태면 현재 모드의 남은 시간을 즉시 재계산한다.
    pub fn update_settings(&mut self, settings: Settings) -> ServerMessage {
        self.settings = settings;
        if !self.timer.is_running() {
            let duration = settings.duration_for(self.timer.mode());
            self.timer.set_remaining(duration);
        }

        tracing::info!(
            room_id = %self.id,
            work = settings.work_duration,
            short_break = settings.short_break_duration,
            long_break = settings.long_break_duration,
            "Settings updated"
        );

        ServerMessage::SettingsUpdated {
            settings,
            remaining_seconds: self.timer.remaining_seconds(),
            mode: self.timer.mode(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::ParticipantId;
    use chrono::{TimeZone, Utc};
    use tokio::sync::mpsc;

    fn t0() -> Timestamp {
        Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap()
    }

    fn at(seconds: i64) -> Timestamp {
        t0() + TimeDelta::seconds(seconds)
    }

    fn room_with(names: &[&str]) -> (Room, Vec<ParticipantId>) {
        let mut room = Room::new("r1".into(), Settings::default(), t0());
        let ids = names
            .iter()
            .map(|name| {
                let (tx, _) = mpsc::unbounded_channel();
                room.join(name, tx, t0()).id
            })
            .collect();
        (room, ids)
    }

    fn assert_target_iff_running(room: &Room) {
        assert_eq!(
            room.timer.target_timestamp().is_some(),
            room.timer.is_running()
        );
    }

    #[test]
    fn start_sets_target_and_baselines_sessions() {
        let (mut room, ids) = room_with(&["alice", "bob"]);

        let event = room.start(at(10)).unwrap().unwrap();

        assert_eq!(
            event,
            ServerMessage::TimerStarted {
                remaining_seconds: 1500,
                target_timestamp: at(1510),
                is_running: true,
                mode: Mode::Work,
            }
        );
        for id in ids {
            assert_eq!(
                room.participant(id).unwrap().current_session_start,
                Some(at(10))
            );
        }
        assert_target_iff_running(&room);
    }

    #[test]
    fn start_twice_is_idempotent() {
        let (mut room, ids) = room_with(&["alice"]);
        room.start(at(0)).unwrap();
        let timer_before = room.timer.clone();

        assert_eq!(room.start(at(100)).unwrap(), None);
        assert_eq!(room.timer, timer_before);
        assert_eq!(
            room.participant(ids[0]).unwrap().current_session_start,
            Some(at(0))
        );
    }

    #[test]
    fn stop_freezes_clock_derived_remaining() {
        let (mut room, ids) = room_with(&["alice"]);
        room.start(at(0)).unwrap();

        let event = room.stop(at(600)).unwrap();

        assert_eq!(
            event,
            ServerMessage::TimerStopped {
                remaining_seconds: 900,
                is_running: false,
                mode: Mode::Work,
            }
        );
        assert_eq!(room.participant(ids[0]).unwrap().current_session_start, None);
        assert_eq!(room.participant(ids[0]).unwrap().total_seconds, 0);
        assert_target_iff_running(&room);
    }

    #[test]
    fn restart_after_stop_targets_remaining_from_now() {
        let (mut room, _) = room_with(&["alice"]);
        room.start(at(0)).unwrap();
        room.stop(at(600));

        let event = room.start(at(1000)).unwrap().unwrap();

        match event {
            ServerMessage::TimerStarted {
                remaining_seconds,
                target_timestamp,
                ..
            } => {
                assert_eq!(remaining_seconds, 900);
                assert_eq!(target_timestamp, at(1900));
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn stop_when_stopped_is_noop() {
        let (mut room, _) = room_with(&["alice"]);
        assert_eq!(room.stop(at(5)), None);
        assert_eq!(room.timer.remaining_seconds(), 1500);
    }

    #[test]
    fn stop_after_expiry_clamps_to_zero() {
        let (mut room, _) = room_with(&[]);
        room.start(at(0)).unwrap();
        room.stop(at(4000));
        assert_eq!(room.timer.remaining_seconds(), 0);
    }

    #[test]
    fn reset_during_running_session_stops_without_reward() {
        let (mut room, ids) = room_with(&["alice"]);
        room.start(at(0)).unwrap();

        let event = room.reset(Mode::ShortBreak);

        assert_eq!(
            event,
            ServerMessage::TimerReset {
                remaining_seconds: 300,
                is_running: false,
                mode: Mode::ShortBreak,
            }
        );
        let alice = room.participant(ids[0]).unwrap();
        assert_eq!(alice.total_seconds, 0);
        assert_eq!(alice.current_session_start, None);
        assert_target_iff_running(&room);
    }

    #[test]
    fn update_settings_while_stopped_rederives_remaining() {
        let (mut room, _) = room_with(&["alice"]);

        let event = room.update_settings(Settings::new(1200, 300, 900).unwrap());

        match event {
            ServerMessage::SettingsUpdated {
                remaining_seconds,
                mode,
                ..
            } => {
                assert_eq!(remaining_seconds, 1200);
                assert_eq!(mode, Mode::Work);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn update_settings_while_running_leaves_countdown_alone() {
        let (mut room, _) = room_with(&["alice"]);
        room.start(at(0)).unwrap();

        room.update_settings(Settings::new(60, 60, 60).unwrap());

        assert!(room.timer.is_running());
        assert_eq!(room.timer.target_timestamp(), Some(at(1500)));
        assert_eq!(room.timer.live_remaining(at(100)), 1400);
    }

    #[test]
    fn start_with_unrepresentable_duration_is_refused() {
        let (mut room, ids) = room_with(&["alice"]);
        room.update_settings(Settings::new(u64::MAX, 300, 900).unwrap());

        let err = room.start(at(0)).unwrap_err();

        assert_eq!(
            err,
            TimerError::TargetOutOfRange {
                remaining_seconds: u64::MAX
            }
        );
        assert!(!room.timer.is_running());
        assert_eq!(room.participant(ids[0]).unwrap().current_session_start, None);
        assert_target_iff_running(&room);
    }
}
