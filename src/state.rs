//! 애플리케이션 상태 관리

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::registry::RoomRegistry;
use std::sync::Arc;

/// 전역 애플리케이션 상태
pub struct AppState {
    /// 방 정보 (room_id -> Room)
    pub registry: RoomRegistry,
    /// 시간 소스 (UTC)
    pub clock: Arc<dyn Clock>,
    /// 설정
    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Config, clock: Arc<dyn Clock>) -> Self {
        Self {
            registry: RoomRegistry::new(config.timer.defaults),
            clock,
            config: Arc::new(config),
        }
    }
}
