//! 정책 언어 — 문서 로더와 조건식 렉서/파서
//!
//! - [`types`]: 리스트/매크로/규칙/필터 정의
//! - [`loader`]: YAML 정책 디렉토리 수집
//! - [`lexer`] / [`parser`]: 조건식 토큰화 및 AST 구성

pub mod lexer;
pub mod loader;
pub mod parser;
pub mod types;
