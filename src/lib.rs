//! 공유 뽀모도로 타이머 서버
//!
//! 방 단위로 카운트다운 타이머를 동기화하고, 세션이 끝날 때 참가자별
//! 실제 참여 시간을 공정하게 적립한다.

pub mod broadcast;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod protocol;
pub mod registry;
pub mod room;
pub mod scoring;
pub mod server;
pub mod state;
pub mod timer;
