//! 시간 소스 (UTC 단일 기준)

use chrono::{DateTime, Utc};

/// 서버 전체에서 사용하는 유일한 시각 타입
pub type Timestamp = DateTime<Utc>;

/// 현재 시각 공급자
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// 실제 시스템 시계
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }
}

/// 두 시각 사이의 경과 초 (음수면 0, 초 미만 버림)
pub fn seconds_between(from: Timestamp, to: Timestamp) -> u64 {
    u64::try_from((to - from).num_seconds()).unwrap_or(0)
}

#[cfg(test)]
pub use manual::ManualClock;
