//! 방 데이터 모델 (타이머, 설정, 참가자)

use crate::clock::{seconds_between, Timestamp};
use crate::error::{ModeParseError, SettingsError};
use crate::protocol::{RoomSnapshot, ServerMessage, UserEntry};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use tokio::sync::mpsc::UnboundedSender;
use uuid::Uuid;

/// 참가자 연결의 송신 메일박스
pub type PeerSender = UnboundedSender<ServerMessage>;

pub const DEFAULT_WORK_DURATION: u64 = 25 * 60;
pub const DEFAULT_SHORT_BREAK: u64 = 5 * 60;
pub const DEFAULT_LONG_BREAK: u64 = 15 * 60;

/// 타이머 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    #[default]
    Work,
    ShortBreak,
    LongBreak,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Work => "work",
            Mode::ShortBreak => "short_break",
            Mode::LongBreak => "long_break",
        }
    }

    /// 알 수 없거나 비어 있는 값은 work 로 처리
    pub fn parse_or_work(raw: Option<&str>) -> Mode {
        match raw.map(str::parse::<Mode>) {
            Some(Ok(mode)) => mode,
            Some(Err(e)) => {
                tracing::debug!(error = %e, "Falling back to work mode");
                Mode::Work
            }
            None => Mode::Work,
        }
    }
}

impl FromStr for Mode {
    type Err = ModeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Mode::Work),
            "short_break" => Ok(Mode::ShortBreak),
            "long_break" => Ok(Mode::LongBreak),
            other => Err(ModeParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 방별 모드 길이 설정 (초)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    pub work_duration: u64,
    #[serde(rename = "short_break")]
    pub short_break_duration: u64,
    #[serde(rename = "long_break")]
    pub long_break_duration: u64,
}

impl Settings {
    pub fn new(work: u64, short_break: u64, long_break: u64) -> Result<Self, SettingsError> {
        if work == 0 {
            return Err(SettingsError::NonPositive {
                field: "work_duration",
            });
        }
        if short_break == 0 {
            return Err(SettingsError::NonPositive {
                field: "short_break",
            });
        }
        if long_break == 0 {
            return Err(SettingsError::NonPositive {
                field: "long_break",
            });
        }
        Ok(Self {
            work_duration: work,
            short_break_duration: short_break,
            long_break_duration: long_break,
        })
    }

    pub fn duration_for(&self, mode: Mode) -> u64 {
        match mode {
            Mode::Work => self.work_duration,
            Mode::ShortBreak => self.short_break_duration,
            Mode::LongBreak => self.long_break_duration,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            work_duration: DEFAULT_WORK_DURATION,
            short_break_duration: DEFAULT_SHORT_BREAK,
            long_break_duration: DEFAULT_LONG_BREAK,
        }
    }
}

/// 방 타이머 상태
///
/// `target_timestamp` 는 실행 중일 때만 존재한다. 실행 중의
/// `remaining_seconds` 는 마지막 스냅샷일 뿐이며 실제 값은
/// [`TimerState::live_remaining`] 으로 계산한다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimerState {
    remaining_seconds: u64,
    is_running: bool,
    target_timestamp: Option<Timestamp>,
    mode: Mode,
}

impl TimerState {
    pub fn stopped(mode: Mode, remaining_seconds: u64) -> Self {
        Self {
            remaining_seconds,
            is_running: false,
            target_timestamp: None,
            mode,
        }
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_seconds
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    pub fn target_timestamp(&self) -> Option<Timestamp> {
        self.target_timestamp
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// 현재 시각 기준 남은 시간
    pub fn live_remaining(&self, now: Timestamp) -> u64 {
        match (self.is_running, self.target_timestamp) {
            (true, Some(target)) => seconds_between(now, target),
            // 대상 시각을 읽을 수 없으면 마지막 스냅샷 사용
            _ => self.remaining_seconds,
        }
    }

    pub(crate) fn run_until(&mut self, target: Timestamp, remaining_seconds: u64) {
        self.remaining_seconds = remaining_seconds;
        self.target_timestamp = Some(target);
        self.is_running = true;
    }

    pub(crate) fn halt(&mut self, remaining_seconds: u64) {
        self.remaining_seconds = remaining_seconds;
        self.target_timestamp = None;
        self.is_running = false;
    }

    pub(crate) fn set_remaining(&mut self, remaining_seconds: u64) {
        self.remaining_seconds = remaining_seconds;
    }

    pub(crate) fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
    }
}

/// 연결마다 새로 발급되는 참가자 ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ParticipantId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 방 참가자
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Participant {
    pub display_name: String,
    pub id: ParticipantId,
    pub joined_at: Timestamp,
    pub total_seconds: u64,
    pub current_session_start: Option<Timestamp>,
    /// 참가 순서 (동점 정렬 기준)
    pub(crate) join_seq: u64,
}

impl Participant {
    fn entry(&self) -> UserEntry {
        UserEntry {
            name: self.display_name.clone(),
            id: self.id,
            total_seconds: self.total_seconds,
        }
    }
}

/// 방 정보
pub struct Room {
    pub id: String,
    pub timer: TimerState,
    pub settings: Settings,
    pub created_at: Timestamp,
    pub(crate) participants: Vec<Participant>,
    pub(crate) connections: HashMap<ParticipantId, PeerSender>,
    pub(crate) next_seq: u64,
}

impl Room {
    pub fn new(id: String, settings: Settings, now: Timestamp) -> Self {
        Self {
            id,
            timer: TimerState::stopped(Mode::Work, settings.work_duration),
            settings,
            created_at: now,
            participants: Vec::new(),
            connections: HashMap::new(),
            next_seq: 0,
        }
    }

    pub fn participants(&self) -> &[Participant] {
        &self.participants
    }

    /// 연결 ID 로 참가자 조회 (이름은 중복될 수 있음)
    pub fn participant(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.id == id)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// 점수 내림차순, 동점은 참가 순서
    pub(crate) fn sort_for_display(&mut self) {
        self.participants
            .sort_by_key(|p| (Reverse(p.total_seconds), p.join_seq));
    }

    pub fn user_list(&self) -> Vec<UserEntry> {
        let mut ranked: Vec<&Participant> = self.participants.iter().collect();
        ranked.sort_by_key(|p| (Reverse(p.total_seconds), p.join_seq));
        ranked.into_iter().map(Participant::entry).collect()
    }

    pub fn user_list_event(&self) -> ServerMessage {
        ServerMessage::UserListUpdate {
            users: self.user_list(),
        }
    }

    pub fn timer_state_event(&self, now: Timestamp) -> ServerMessage {
        ServerMessage::TimerState {
            remaining_seconds: self.timer.live_remaining(now),
            is_running: self.timer.is_running(),
            target_timestamp: self.timer.target_timestamp(),
            mode: self.timer.mode(),
            settings: self.settings,
        }
    }

    pub fn snapshot(&self, now: Timestamp) -> RoomSnapshot {
        RoomSnapshot {
            room_id: self.id.clone(),
            remaining_seconds: self.timer.live_remaining(now),
            is_running: self.timer.is_running(),
            target_timestamp: self.timer.target_timestamp(),
            mode: self.timer.mode(),
            settings: self.settings,
            users: self.user_list(),
        }
    }

    pub(crate) fn clear_sessions(&mut self) {
        for participant in &mut self.participants {
            participant.current_session_start = None;
        }
    }
}
