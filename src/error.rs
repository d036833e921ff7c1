//! 에러 타입 정의

use thiserror::Error;

/// 타이머 전이 실패
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimerError {
    #[error("target timestamp out of range: now + {remaining_seconds}s")]
    TargetOutOfRange { remaining_seconds: u64 },
}

impl TimerError {
    pub fn code(&self) -> &'static str {
        match self {
            TimerError::TargetOutOfRange { .. } => "timer_out_of_range",
        }
    }
}

/// 설정 값 검증 실패
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("{field} must be a positive number of seconds")]
    NonPositive { field: &'static str },
}

impl SettingsError {
    pub fn code(&self) -> &'static str {
        "invalid_settings"
    }
}

/// 알 수 없는 모드 문자열
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown timer mode: {0}")]
pub struct ModeParseError(pub String);

/// 참가자 메일박스로의 전달 실패 (수신 측 종료)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mailbox closed for participant {participant_id}")]
pub struct DeliveryError {
    pub participant_id: String,
}
