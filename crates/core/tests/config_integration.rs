//! 엔진 설정 통합 테스트
//!
//! - 호스트 설정 맵 전체 해석 테스트
//! - 모드별 필수 키 검증 테스트
//! - 직렬화 라운드트립 테스트

use std::collections::HashMap;
use std::path::PathBuf;

use flowgate_core::config::{EngineConfig, EngineMode};
use flowgate_core::error::ConfigError;

fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn full_map_parses_successfully() {
    let config = EngineConfig::from_map(&map(&[
        ("mode", "alert"),
        ("policies", "/etc/flowgate/policies"),
        ("channel_capacity", "2048"),
        ("workers", "2"),
        ("ancestry_capacity", "32768"),
    ]))
    .expect("full map should parse");

    assert_eq!(config.mode, EngineMode::Alert);
    assert_eq!(config.policies, Some(PathBuf::from("/etc/flowgate/policies")));
    assert_eq!(config.channel_capacity, 2048);
    assert_eq!(config.workers, 2);
    assert_eq!(config.ancestry_capacity, 32768);
}

#[test]
fn minimal_alert_map_uses_defaults() {
    let config = EngineConfig::from_map(&map(&[("policies", "/tmp/policies")]))
        .expect("policies alone should suffice in default mode");

    assert_eq!(config.mode, EngineMode::Alert);
    assert_eq!(config.channel_capacity, 1024);
    assert_eq!(config.workers, 1);
}

#[test]
fn empty_map_fails_without_policies() {
    let result = EngineConfig::from_map(&HashMap::new());
    assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
}

#[test]
fn filter_mode_requires_policies() {
    let result = EngineConfig::from_map(&map(&[("mode", "filter")]));
    assert!(result.is_err());

    let config = EngineConfig::from_map(&map(&[
        ("mode", "filter"),
        ("policies", "/tmp/policies"),
    ]))
    .expect("filter mode with policies should parse");
    assert_eq!(config.mode, EngineMode::Filter);
}

#[test]
fn mode_parsing_is_case_insensitive() {
    let config = EngineConfig::from_map(&map(&[("mode", "ByPass")])).expect("should parse");
    assert_eq!(config.mode, EngineMode::Bypass);
}

#[test]
fn serialize_roundtrip_preserves_values() {
    let original = EngineConfig::from_map(&map(&[
        ("mode", "filter"),
        ("policies", "/etc/flowgate/policies"),
        ("workers", "3"),
    ]))
    .expect("should parse");

    let json = serde_json::to_string(&original).expect("should serialize");
    let parsed: EngineConfig = serde_json::from_str(&json).expect("should reparse");
    parsed.validate().expect("reparsed should validate");

    assert_eq!(parsed.mode, EngineMode::Filter);
    assert_eq!(parsed.workers, 3);
    assert_eq!(parsed.policies, original.policies);
}
