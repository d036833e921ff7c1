//! 핸들러 모듈

pub mod connection;
pub mod timer;

pub use connection::*;
pub use timer::*;
