//! 엔진 설정 — 호스트가 전달하는 문자열 맵에서 생성되는 런타임 설정
//!
//! 설정 *파일* 로딩은 임베딩 애플리케이션의 몫입니다. 이 모듈은 이미
//! 로드된 `string → string` 맵을 해석하고 검증하는 역할만 맡습니다.

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 인식되는 설정 키
pub const KEY_MODE: &str = "mode";
pub const KEY_POLICIES: &str = "policies";
pub const KEY_CHANNEL_CAPACITY: &str = "channel_capacity";
pub const KEY_WORKERS: &str = "workers";
pub const KEY_ANCESTRY_CAPACITY: &str = "ancestry_capacity";

/// 정책 엔진 동작 모드
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineMode {
    /// 규칙 평가 및 알림 생성 (기본값)
    #[default]
    Alert,
    /// 전역 필터만 적용, 규칙 평가 생략
    Filter,
    /// 모든 레코드를 무변경 통과
    Bypass,
}

impl FromStr for EngineMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alert" => Ok(Self::Alert),
            "filter" => Ok(Self::Filter),
            "bypass" => Ok(Self::Bypass),
            other => Err(ConfigError::InvalidValue {
                field: KEY_MODE.to_owned(),
                reason: format!("unknown mode '{other}', expected alert|filter|bypass"),
            }),
        }
    }
}

/// 엔진 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 동작 모드
    pub mode: EngineMode,
    /// 정책 디렉토리 경로 (bypass 모드에서만 생략 가능)
    pub policies: Option<PathBuf>,
    /// 스테이지 간 채널 용량
    pub channel_capacity: usize,
    /// 인터프리터 워커 수 (2 이상이면 출력 순서 비보장)
    pub workers: usize,
    /// 조상 캐시 최대 엔트리 수
    pub ancestry_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: EngineMode::Alert,
            policies: None,
            channel_capacity: 1024,
            workers: 1,
            ancestry_capacity: 65_536,
        }
    }
}

impl EngineConfig {
    /// 호스트가 전달한 설정 맵에서 설정을 생성합니다.
    ///
    /// 인식되지 않는 키는 경고 로그 후 무시합니다 (전방 호환).
    pub fn from_map(conf: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (key, value) in conf {
            match key.as_str() {
                KEY_MODE => config.mode = value.parse()?,
                KEY_POLICIES => config.policies = Some(PathBuf::from(value)),
                KEY_CHANNEL_CAPACITY => {
                    config.channel_capacity = parse_usize(KEY_CHANNEL_CAPACITY, value)?;
                }
                KEY_WORKERS => config.workers = parse_usize(KEY_WORKERS, value)?,
                KEY_ANCESTRY_CAPACITY => {
                    config.ancestry_capacity = parse_usize(KEY_ANCESTRY_CAPACITY, value)?;
                }
                other => {
                    tracing::warn!(key = other, "ignoring unknown config key");
                }
            }
        }

        config.validate()?;
        Ok(config)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: KEY_CHANNEL_CAPACITY.to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: KEY_WORKERS.to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.ancestry_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: KEY_ANCESTRY_CAPACITY.to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }
        if self.mode != EngineMode::Bypass && self.policies.is_none() {
            return Err(ConfigError::InvalidValue {
                field: KEY_POLICIES.to_owned(),
                reason: format!("required in {:?} mode", self.mode),
            });
        }
        Ok(())
    }
}

fn parse_usize(field: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: format!("'{value}' is not a positive integer"),
    })
}
