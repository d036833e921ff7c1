//! 환경 변수 기반 설정 관리

use crate::room::{Settings, DEFAULT_LONG_BREAK, DEFAULT_SHORT_BREAK, DEFAULT_WORK_DURATION};
use crate::scoring::ScoringPolicy;
use std::env;
use std::str::FromStr;

/// 서버 설정
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub log_level: String,
    pub timer: TimerConfig,
}

/// 타이머/보상 기본값
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// 새 방에 적용되는 기본 길이 (update_settings 누락 필드에도 사용)
    pub defaults: Settings,
    pub default_user_name: String,
    pub scoring: ScoringPolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8000,
            host: "0.0.0.0".to_string(),
            log_level: "info".to_string(),
            timer: TimerConfig {
                defaults: Settings::default(),
                default_user_name: "Anonymous".to_string(),
                scoring: ScoringPolicy::default(),
            },
        }
    }
}

impl Config {
    /// 환경 변수에서 설정 로드
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Settings::new(
            positive(&lookup, "WORK_DURATION", DEFAULT_WORK_DURATION),
            positive(&lookup, "SHORT_BREAK_DURATION", DEFAULT_SHORT_BREAK),
            positive(&lookup, "LONG_BREAK_DURATION", DEFAULT_LONG_BREAK),
        )
        .unwrap_or_default();

        Self {
            port: parsed(&lookup, "PORT", 8000),
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            timer: TimerConfig {
                defaults,
                default_user_name: lookup("DEFAULT_USER_NAME")
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "Anonymous".to_string()),
                scoring: ScoringPolicy {
                    reward_break_sessions: flag(&lookup, "REWARD_BREAK_SESSIONS", true),
                },
            },
        }
    }
}

fn parsed<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    lookup(key)
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}

/// true/false, 1/0, yes/no, on/off (대소문자 무시). 그 외는 기본값
fn flag(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: bool) -> bool {
    match lookup(key).map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1" | "yes" | "on") => true,
        Some("false" | "0" | "no" | "off") => false,
        _ => default,
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> u64 {
    match parsed(lookup, key, default) {
        0 => default,
        v => v,
    }
}
