//! 클라이언트-서버 메시지 프로토콜 정의

use crate::clock::Timestamp;
use crate::room::{Mode, ParticipantId, Settings};
use serde::{Deserialize, Serialize};

/// 연결 직후 첫 메시지 (표시 이름)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JoinRequest {
    #[serde(default)]
    pub user_name: Option<String>,
}

/// 클라이언트 → 서버 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    StartTimer,
    StopTimer,
    ResetTimer {
        #[serde(default)]
        mode: Option<String>,
    },
    UpdateSettings {
        #[serde(default)]
        work_duration: Option<u64>,
        #[serde(default)]
        short_break: Option<u64>,
        #[serde(default)]
        long_break: Option<u64>,
    },
    TimerCompleted,
}

/// 서버 → 클라이언트 메시지
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    // Presence
    UserJoined {
        user_name: String,
        message: String,
    },
    UserLeft {
        user_name: String,
        message: String,
    },
    UserListUpdate {
        users: Vec<UserEntry>,
    },

    // Timer
    TimerState {
        remaining_seconds: u64,
        is_running: bool,
        target_timestamp: Option<Timestamp>,
        mode: Mode,
        settings: Settings,
    },
    TimerStarted {
        remaining_seconds: u64,
        target_timestamp: Timestamp,
        is_running: bool,
        mode: Mode,
    },
    TimerStopped {
        remaining_seconds: u64,
        is_running: bool,
        mode: Mode,
    },
    TimerReset {
        remaining_seconds: u64,
        is_running: bool,
        mode: Mode,
    },
    SettingsUpdated {
        settings: Settings,
        remaining_seconds: u64,
        mode: Mode,
    },
    TimerFinished {
        mode: Mode,
    },

    Error {
        code: String,
        message: String,
    },
}

impl ServerMessage {
    pub fn user_joined(user_name: &str) -> Self {
        ServerMessage::UserJoined {
            user_name: user_name.to_string(),
            message: format!("{} joined the room", user_name),
        }
    }

    pub fn user_left(user_name: &str) -> Self {
        ServerMessage::UserLeft {
            user_name: user_name.to_string(),
            message: format!("{} left the room", user_name),
        }
    }

    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// 사용자 목록 항목
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub name: String,
    pub id: ParticipantId,
    pub total_seconds: u64,
}

/// HTTP 조회용 방 스냅샷
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomSnapshot {
    pub room_id: String,
    pub remaining_seconds: u64,
    pub is_running: bool,
    pub target_timestamp: Option<Timestamp>,
    pub mode: Mode,
    pub settings: Settings,
    pub users: Vec<UserEntry>,
}
