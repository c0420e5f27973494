//! 컴파일된 표현식 트리
//!
//! 리프는 컴파일 시점에 바인딩된 속성 매퍼와 타입 있는 피연산자 목록을
//! 가집니다. 명시적 리스트 피연산자의 의미: 동등/순서 비교와 멤버십은
//! "원소 중 하나라도 만족", 부등(`!=`)은 "모든 원소와 다름"입니다.
//! 빈 리스트 멤버십은 항상 거짓입니다.

use flowgate_core::record::FlatRecord;

use crate::cache::AncestryCache;
use crate::mapper::{trim_bounding_quotes, Mapper, Value};

/// 숫자 비교 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

/// 문자열 비교 연산자
///
/// `PMatch`는 리스트 원소 중 하나가 좌변의 부분 문자열이면 참입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrOp {
    Eq,
    Neq,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    PMatch,
}

/// 컴파일된 표현식 노드
#[derive(Debug, Clone)]
pub enum Expr {
    Const(bool),
    Not(Box<Expr>),
    And(Vec<Expr>),
    Or(Vec<Expr>),
    /// 값이 타입의 0 값이 아니면 참
    Exists(Mapper),
    IntCmp {
        mapper: Mapper,
        op: IntOp,
        rhs: Vec<i64>,
    },
    StrCmp {
        mapper: Mapper,
        op: StrOp,
        rhs: Vec<String>,
    },
    BoolCmp {
        mapper: Mapper,
        /// `!=`이면 true
        negated: bool,
        rhs: Vec<bool>,
    },
}

impl Expr {
    /// 레코드에 대해 표현식을 평가합니다. 부작용이 없습니다.
    pub fn eval(&self, r: &FlatRecord, cache: &AncestryCache) -> bool {
        match self {
            Self::Const(b) => *b,
            Self::Not(inner) => !inner.eval(r, cache),
            Self::And(terms) => terms.iter().all(|t| t.eval(r, cache)),
            Self::Or(terms) => terms.iter().any(|t| t.eval(r, cache)),
            Self::Exists(mapper) => match mapper.eval(r, cache) {
                Value::Int(v) => v != 0,
                Value::Str(v) => !v.is_empty(),
                Value::Bool(v) => v,
            },
            Self::IntCmp { mapper, op, rhs } => {
                let lhs = coerce_int(mapper.eval(r, cache));
                match op {
                    IntOp::Eq => rhs.iter().any(|v| lhs == *v),
                    IntOp::Neq => rhs.iter().all(|v| lhs != *v),
                    IntOp::Lt => rhs.iter().any(|v| lhs < *v),
                    IntOp::Le => rhs.iter().any(|v| lhs <= *v),
                    IntOp::Gt => rhs.iter().any(|v| lhs > *v),
                    IntOp::Ge => rhs.iter().any(|v| lhs >= *v),
                }
            }
            Self::StrCmp { mapper, op, rhs } => {
                let lhs = coerce_str(mapper.eval(r, cache));
                match op {
                    StrOp::Eq => rhs.iter().any(|v| lhs == *v),
                    StrOp::Neq => rhs.iter().all(|v| lhs != *v),
                    StrOp::Contains | StrOp::PMatch => rhs.iter().any(|v| lhs.contains(v)),
                    StrOp::IContains => {
                        // 피연산자는 컴파일 시점에 소문자화되어 있습니다
                        let lhs = lhs.to_lowercase();
                        rhs.iter().any(|v| lhs.contains(v))
                    }
                    StrOp::StartsWith => rhs.iter().any(|v| lhs.starts_with(v)),
                    StrOp::EndsWith => rhs.iter().any(|v| lhs.ends_with(v)),
                }
            }
            Self::BoolCmp {
                mapper,
                negated,
                rhs,
            } => {
                let lhs = coerce_bool(mapper.eval(r, cache));
                let any = rhs.iter().any(|v| lhs == *v);
                if *negated {
                    !any
                } else {
                    any
                }
            }
        }
    }

    /// 트리 깊이 — 컴파일 시 병리적 입력 거부에 사용
    pub fn depth(&self) -> usize {
        match self {
            Self::Const(_) | Self::Exists(_) | Self::IntCmp { .. } | Self::StrCmp { .. }
            | Self::BoolCmp { .. } => 1,
            Self::Not(inner) => 1 + inner.depth(),
            Self::And(terms) | Self::Or(terms) => {
                1 + terms.iter().map(Expr::depth).max().unwrap_or(0)
            }
        }
    }
}

/// 숫자 문맥의 값 강제 변환
fn coerce_int(v: Value) -> i64 {
    match v {
        Value::Int(i) => i,
        Value::Str(s) => trim_bounding_quotes(&s).parse().unwrap_or(0),
        Value::Bool(b) => i64::from(b),
    }
}

/// 문자열 문맥의 값 강제 변환
fn coerce_str(v: Value) -> String {
    match v {
        Value::Str(s) => trim_bounding_quotes(&s).to_owned(),
        Value::Int(i) => i.to_string(),
        Value::Bool(b) => b.to_string(),
    }
}

/// 불리언 문맥의 값 강제 변환
fn coerce_bool(v: Value) -> bool {
    match v {
        Value::Bool(b) => b,
        Value::Int(i) => i != 0,
        Value::Str(s) => s == "true",
    }
}
