//! 에러 타입 — 도메인별 에러 정의

/// flowgate 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum FlowgateError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 파이프라인 처리 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
///
/// 정책 디렉토리 문제는 시작 시점에 판별되는 설정 에러로 분류합니다.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 정책 디렉토리를 찾을 수 없음
    #[error("policies directory not found: {path}")]
    PoliciesNotFound { path: String },

    /// 정책 디렉토리에 .yaml 파일이 없음
    #[error("no .yaml policy files in directory: {path}")]
    EmptyPolicyDir { path: String },

    /// 정책 파일을 읽을 수 없음
    #[error("unreadable policy file: {path}: {reason}")]
    Unreadable { path: String, reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 파이프라인 처리 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 전송 실패 (수신측이 먼저 닫힘)
    #[error("channel send failed: {0}")]
    ChannelSend(String),

    /// 파이프라인 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// 스테이지 태스크 join 실패
    #[error("stage join failed: {0}")]
    Join(String),
}
