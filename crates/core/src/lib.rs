#![doc = include_str!("../README.md")]

pub mod config;
pub mod error;
pub mod flags;
pub mod raw;
pub mod record;
pub mod schema;
pub mod table;

// --- 주요 타입 re-export ---
// 각 모듈의 핵심 타입을 크레이트 루트에서 바로 사용할 수 있도록 합니다.

// 에러
pub use error::{ConfigError, FlowgateError, PipelineError};

// 설정
pub use config::{EngineConfig, EngineMode};

// 스키마
pub use schema::{IntSlot, RecordKind, Source, StrSlot};

// 레코드
pub use record::{FlatRecord, Oid};

// 계층형 입력
pub use raw::{
    Container, ContainerType, EventPayload, FileEntity, FileEvent, FileFlow, Header, NetworkFlow,
    Process, ProcessEvent, RawRecord,
};

// 프로세스 테이블
pub use table::{ProcessSnapshot, ProcessStore, ProcessTable};
