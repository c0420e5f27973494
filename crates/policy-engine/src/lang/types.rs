//! 정책 객체 타입
//!
//! YAML 정책 문서에서 수집되는 리스트 / 매크로 / 규칙 / 필터 정의와
//! 우선순위, 액션 열거형을 정의합니다.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// 규칙 우선순위 — syslog 계열 8단계
///
/// `low` / `medium` / `high` 별칭은 각각 warning / error / critical로
/// 매핑됩니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Emergency,
    Alert,
    Critical,
    Error,
    Warning,
    Notice,
    #[default]
    Informational,
    Debug,
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "emergency" => Ok(Self::Emergency),
            "alert" => Ok(Self::Alert),
            "critical" | "high" => Ok(Self::Critical),
            "error" | "medium" => Ok(Self::Error),
            "warning" | "low" => Ok(Self::Warning),
            "notice" => Ok(Self::Notice),
            "informational" | "info" => Ok(Self::Informational),
            "debug" => Ok(Self::Debug),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Emergency => "emergency",
            Self::Alert => "alert",
            Self::Critical => "critical",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Informational => "informational",
            Self::Debug => "debug",
        };
        write!(f, "{name}")
    }
}

/// 규칙 매칭 시 수행되는 액션
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// 레코드를 알림으로 표시하고 규칙 메타데이터를 부착
    Alert,
    /// 규칙 태그만 병합 (알림 표시 없음)
    Tag,
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "alert" => Ok(Self::Alert),
            "tag" => Ok(Self::Tag),
            other => Err(format!("unknown action '{other}'")),
        }
    }
}

/// 리스트 정의 — 리터럴 또는 다른 리스트 이름의 모음
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListDef {
    pub name: String,
    /// 리터럴 문자열/숫자 또는 중첩 리스트 이름
    pub items: Vec<String>,
}

/// 매크로 정의 — 이름 붙은 재사용 조건식
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroDef {
    pub name: String,
    pub condition: String,
}

/// 필터 정의 — 규칙 평가 전에 적용되는 전역 조건
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDef {
    pub name: String,
    pub condition: String,
}

/// 규칙 정의
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleDef {
    pub name: String,
    #[serde(default)]
    pub desc: String,
    pub condition: String,
    /// 매칭 시 수행할 액션 집합 (비어 있으면 보강 없는 통과)
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub tags: Vec<String>,
    /// 레코드 타입 프리필터 (비어 있으면 전체 타입)
    #[serde(default)]
    pub prefilter: Vec<String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// 디렉토리에서 수집된 정책 객체 집합
///
/// 선언 순서가 보존됩니다. 규칙은 선언 순서대로 평가됩니다.
#[derive(Debug, Clone, Default)]
pub struct PolicySet {
    pub lists: Vec<ListDef>,
    pub macros: Vec<MacroDef>,
    pub rules: Vec<RuleDef>,
    pub filters: Vec<FilterDef>,
}

impl PolicySet {
    pub fn list(&self, name: &str) -> Option<&ListDef> {
        self.lists.iter().find(|l| l.name == name)
    }

    pub fn macro_def(&self, name: &str) -> Option<&MacroDef> {
        self.macros.iter().find(|m| m.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
            && self.macros.is_empty()
            && self.rules.is_empty()
            && self.filters.is_empty()
    }
}
