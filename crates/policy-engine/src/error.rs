//! 정책 엔진 에러 타입
//!
//! 파싱/컴파일 에러는 시작 시점에 치명적이며, 문제가 된 규칙/매크로
//! 이름과 소스 파일을 담아 호출자에게 반환됩니다. 런타임 에러는 레코드
//! 단위로 비치명적으로 처리됩니다 (경고 후 0 값 대체).

use flowgate_core::error::{ConfigError, FlowgateError, PipelineError};

/// 정책 엔진 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    /// 정책 디렉토리 관련 설정 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// YAML 문서 파싱 실패
    #[error("yaml parse error: {file}: {reason}")]
    Yaml { file: String, reason: String },

    /// 인식되는 종류 키(list/macro/rule/filter)가 없는 노드
    #[error("unknown policy node in {file}: keys [{keys}]")]
    UnknownNode { file: String, keys: String },

    /// 필수 필드 누락
    #[error("missing field '{field}' in {kind} '{name}' ({file})")]
    MissingField {
        file: String,
        kind: &'static str,
        name: String,
        field: &'static str,
    },

    /// 같은 종류 내 이름 중복
    #[error("duplicate {kind} name '{name}' ({file})")]
    DuplicateName {
        kind: &'static str,
        name: String,
        file: String,
    },

    /// 정의되지 않은 리스트/매크로 참조
    #[error("undefined {kind} '{name}' referenced by '{referenced_by}'")]
    UndefinedReference {
        kind: &'static str,
        name: String,
        referenced_by: String,
    },

    /// 매크로 순환 참조
    #[error("macro cycle detected: {path}")]
    MacroCycle { path: String },

    /// `exists`에 사용된 알 수 없는 속성
    #[error("unknown attribute '{attr}' in '{rule}'")]
    UnknownAttribute { rule: String, attr: String },

    /// 스칼라 자리에 사용된 리스트
    #[error("list '{list}' used where a scalar is required in '{rule}'")]
    ListAsScalar { rule: String, list: String },

    /// 연산자와 속성 타입 불일치
    #[error("operator '{op}' not applicable to attribute '{attr}' in '{rule}'")]
    TypeMismatch {
        rule: String,
        attr: String,
        op: String,
    },

    /// 속성 타입으로 해석할 수 없는 리터럴
    #[error("bad literal '{literal}' for attribute '{attr}' in '{rule}'")]
    BadLiteral {
        rule: String,
        attr: String,
        literal: String,
    },

    /// 조건식 문법 오류
    #[error("syntax error in '{rule}': {reason}")]
    Syntax { rule: String, reason: String },

    /// 병리적으로 깊은 조건식
    #[error("condition of '{rule}' exceeds depth limit ({depth})")]
    ExpressionTooDeep { rule: String, depth: usize },
}

impl From<PolicyError> for FlowgateError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::Config(e) => FlowgateError::Config(e),
            other => FlowgateError::Pipeline(PipelineError::InitFailed(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn macro_cycle_names_the_path() {
        let err = PolicyError::MacroCycle {
            path: "a -> b -> a".to_owned(),
        };
        assert!(err.to_string().contains("a -> b -> a"));
    }

    #[test]
    fn config_error_stays_config_after_conversion() {
        let err: FlowgateError = PolicyError::Config(ConfigError::EmptyPolicyDir {
            path: "/tmp/p".to_owned(),
        })
        .into();
        assert!(matches!(err, FlowgateError::Config(_)));
    }

    #[test]
    fn compile_error_converts_to_pipeline_error() {
        let err: FlowgateError = PolicyError::UndefinedReference {
            kind: "list",
            name: "pkg_bins".to_owned(),
            referenced_by: "rule_x".to_owned(),
        }
        .into();
        assert!(matches!(err, FlowgateError::Pipeline(_)));
    }
}
