//! 정책 컴파일러 — 수집된 정책 집합을 평가 가능한 형태로 변환
//!
//! 1. 매크로 참조 그래프의 순환을 탐지합니다 (경로를 에러에 담아 보고).
//! 2. 조건 토큰 열에서 매크로 이름을 본문으로 치환하여 고정점까지
//!    확장합니다. 선언 순서와 무관하게 전방 참조가 허용됩니다.
//! 3. 조건을 AST로 파싱하고, 각 속성을 매퍼에 바인딩하면서 피연산자를
//!    속성 타입에 맞게 강제 변환합니다.
//!
//! 컴파일은 전체 성공 또는 전체 실패입니다. 규칙 하나의 오류가 규칙
//! 집합 일부만 무효화하지 않습니다.

use std::collections::{HashMap, HashSet};

use crate::error::PolicyError;
use crate::expr::{Expr, IntOp, StrOp};
use crate::lang::lexer::{tokenize, Token};
use crate::lang::parser::{parse, Ast, CmpOp, Lit, Operand, ParseError};
use crate::lang::types::{Action, PolicySet, Priority};
use crate::mapper::{self, trim_bounding_quotes, ValueKind};

/// 컴파일된 표현식 트리 깊이 한도
const MAX_EXPR_DEPTH: usize = 512;

/// 유효한 prefilter 레코드 타입 심볼
const RECORD_TYPE_SYMBOLS: &[&str] = &["P", "F", "C", "H", "PE", "FE", "FF", "NF", "?"];

/// 컴파일된 규칙
#[derive(Debug, Clone)]
pub struct CompiledRule {
    pub name: String,
    pub desc: String,
    pub expr: Expr,
    pub actions: Vec<Action>,
    pub priority: Priority,
    pub tags: Vec<String>,
    /// 비어 있지 않으면 여기 없는 레코드 타입은 평가를 건너뜁니다
    pub prefilter: Vec<String>,
    pub enabled: bool,
}

/// 컴파일된 전역 필터
#[derive(Debug, Clone)]
pub struct CompiledFilter {
    pub name: String,
    pub expr: Expr,
}

/// 컴파일 결과 — 생성 후 불변이며 워커 간 자유롭게 공유됩니다
#[derive(Debug, Clone, Default)]
pub struct CompiledPolicy {
    pub rules: Vec<CompiledRule>,
    pub filters: Vec<CompiledFilter>,
}

/// 정책 집합을 컴파일합니다.
pub fn compile(set: &PolicySet) -> Result<CompiledPolicy, PolicyError> {
    // 매크로 본문 토큰화
    let mut macro_tokens: HashMap<&str, Vec<Token>> = HashMap::new();
    for m in &set.macros {
        let tokens = tokenize(&m.condition).map_err(|reason| PolicyError::Syntax {
            rule: m.name.clone(),
            reason,
        })?;
        macro_tokens.insert(m.name.as_str(), tokens);
    }

    detect_macro_cycle(set, &macro_tokens)?;

    let mut policy = CompiledPolicy::default();

    for f in &set.filters {
        let expr = compile_condition(&f.condition, &f.name, set, &macro_tokens)?;
        policy.filters.push(CompiledFilter {
            name: f.name.clone(),
            expr,
        });
    }

    for r in &set.rules {
        let expr = compile_condition(&r.condition, &r.name, set, &macro_tokens)?;
        for tag in &r.prefilter {
            if !RECORD_TYPE_SYMBOLS.contains(&tag.as_str()) {
                tracing::warn!(rule = %r.name, tag, "unknown record type in prefilter");
            }
        }
        policy.rules.push(CompiledRule {
            name: r.name.clone(),
            desc: r.desc.clone(),
            expr,
            actions: r.actions.clone(),
            priority: r.priority,
            tags: r.tags.clone(),
            prefilter: r.prefilter.clone(),
            enabled: r.enabled,
        });
    }

    tracing::info!(
        rules = policy.rules.len(),
        filters = policy.filters.len(),
        "compiled policy set"
    );

    Ok(policy)
}

/// 조건 문자열 하나를 컴파일합니다.
fn compile_condition(
    condition: &str,
    owner: &str,
    set: &PolicySet,
    macro_tokens: &HashMap<&str, Vec<Token>>,
) -> Result<Expr, PolicyError> {
    let tokens = tokenize(condition).map_err(|reason| PolicyError::Syntax {
        rule: owner.to_owned(),
        reason,
    })?;
    let tokens = expand_macros(tokens, macro_tokens, owner)?;
    let ast = parse(&tokens).map_err(|e| match e {
        ParseError::BareIdent(name) => PolicyError::UndefinedReference {
            kind: "macro",
            name,
            referenced_by: owner.to_owned(),
        },
        ParseError::Message(reason) => PolicyError::Syntax {
            rule: owner.to_owned(),
            reason,
        },
    })?;
    let expr = bind(&ast, owner, set)?;
    let depth = expr.depth();
    if depth > MAX_EXPR_DEPTH {
        return Err(PolicyError::ExpressionTooDeep {
            rule: owner.to_owned(),
            depth,
        });
    }
    Ok(expr)
}

/// 매크로 이름을 본문으로 고정점까지 치환합니다.
///
/// 치환된 본문은 괄호로 감싸 우선순위를 보존합니다. 순환은 사전에
/// 거부되므로 패스 수는 매크로 DAG 깊이로 유계입니다.
fn expand_macros(
    mut tokens: Vec<Token>,
    macro_tokens: &HashMap<&str, Vec<Token>>,
    owner: &str,
) -> Result<Vec<Token>, PolicyError> {
    let max_passes = macro_tokens.len() + 1;
    for _ in 0..=max_passes {
        let mut out = Vec::with_capacity(tokens.len());
        let mut changed = false;
        for tok in tokens {
            match &tok {
                Token::Ident(word) => {
                    if let Some(body) = macro_tokens.get(word.as_str()) {
                        out.push(Token::LParen);
                        out.extend(body.iter().cloned());
                        out.push(Token::RParen);
                        changed = true;
                    } else {
                        out.push(tok);
                    }
                }
                _ => out.push(tok),
            }
        }
        tokens = out;
        if !changed {
            return Ok(tokens);
        }
    }
    // 순환 탐지를 통과했다면 도달할 수 없습니다
    Err(PolicyError::MacroCycle {
        path: format!("unbounded macro expansion in '{owner}'"),
    })
}

/// 매크로 참조 그래프의 순환을 DFS로 탐지합니다.
fn detect_macro_cycle(
    set: &PolicySet,
    macro_tokens: &HashMap<&str, Vec<Token>>,
) -> Result<(), PolicyError> {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Unvisited,
        OnStack,
        Done,
    }

    fn visit(
        name: &str,
        macro_tokens: &HashMap<&str, Vec<Token>>,
        states: &mut HashMap<String, State>,
        path: &mut Vec<String>,
    ) -> Result<(), PolicyError> {
        states.insert(name.to_owned(), State::OnStack);
        path.push(name.to_owned());

        if let Some(tokens) = macro_tokens.get(name) {
            for tok in tokens {
                let Token::Ident(word) = tok else { continue };
                if !macro_tokens.contains_key(word.as_str()) {
                    continue;
                }
                match states.get(word.as_str()).copied().unwrap_or(State::Unvisited) {
                    State::OnStack => {
                        let start = path.iter().position(|p| p == word).unwrap_or(0);
                        let mut cycle = path[start..].to_vec();
                        cycle.push(word.clone());
                        return Err(PolicyError::MacroCycle {
                            path: cycle.join(" -> "),
                        });
                    }
                    State::Unvisited => visit(word, macro_tokens, states, path)?,
                    State::Done => {}
                }
            }
        }

        path.pop();
        states.insert(name.to_owned(), State::Done);
        Ok(())
    }

    let mut states: HashMap<String, State> = HashMap::new();
    let mut path = Vec::new();
    for m in &set.macros {
        if states.get(m.name.as_str()).copied().unwrap_or(State::Unvisited) == State::Unvisited {
            visit(&m.name, macro_tokens, &mut states, &mut path)?;
        }
    }
    Ok(())
}

/// AST를 매퍼에 바인딩하여 컴파일된 표현식을 만듭니다.
fn bind(ast: &Ast, owner: &str, set: &PolicySet) -> Result<Expr, PolicyError> {
    match ast {
        Ast::Or(terms) => Ok(Expr::Or(
            terms
                .iter()
                .map(|t| bind(t, owner, set))
                .collect::<Result<_, _>>()?,
        )),
        Ast::And(terms) => Ok(Expr::And(
            terms
                .iter()
                .map(|t| bind(t, owner, set))
                .collect::<Result<_, _>>()?,
        )),
        Ast::Not(inner) => Ok(Expr::Not(Box::new(bind(inner, owner, set)?))),
        Ast::Exists(attr) => match mapper::lookup(attr) {
            Some(m) => Ok(Expr::Exists(m.clone())),
            None => Err(PolicyError::UnknownAttribute {
                rule: owner.to_owned(),
                attr: attr.clone(),
            }),
        },
        Ast::Cmp { attr, op, operand } => bind_cmp(attr, *op, operand, owner, set),
    }
}

fn bind_cmp(
    attr: &str,
    op: CmpOp,
    operand: &Operand,
    owner: &str,
    set: &PolicySet,
) -> Result<Expr, PolicyError> {
    let mapper = mapper::lookup(attr)
        .cloned()
        .unwrap_or_else(|| mapper::identity(attr));
    let items = resolve_operand(op, operand, owner, set)?;

    match mapper.kind() {
        ValueKind::Int => {
            let int_op = match op {
                CmpOp::Eq | CmpOp::In => IntOp::Eq,
                CmpOp::Neq => IntOp::Neq,
                CmpOp::Lt => IntOp::Lt,
                CmpOp::Le => IntOp::Le,
                CmpOp::Gt => IntOp::Gt,
                CmpOp::Ge => IntOp::Ge,
                CmpOp::Contains
                | CmpOp::IContains
                | CmpOp::StartsWith
                | CmpOp::EndsWith
                | CmpOp::PMatch => {
                    return Err(PolicyError::TypeMismatch {
                        rule: owner.to_owned(),
                        attr: attr.to_owned(),
                        op: op.to_string(),
                    })
                }
            };
            let mut rhs = Vec::with_capacity(items.len());
            for item in &items {
                let text = trim_bounding_quotes(&item.text);
                let value = text.parse::<i64>().map_err(|_| PolicyError::BadLiteral {
                    rule: owner.to_owned(),
                    attr: attr.to_owned(),
                    literal: item.text.clone(),
                })?;
                rhs.push(value);
            }
            Ok(Expr::IntCmp {
                mapper,
                op: int_op,
                rhs,
            })
        }
        ValueKind::Bool => {
            let negated = match op {
                CmpOp::Eq | CmpOp::In => false,
                CmpOp::Neq => true,
                _ => {
                    return Err(PolicyError::TypeMismatch {
                        rule: owner.to_owned(),
                        attr: attr.to_owned(),
                        op: op.to_string(),
                    })
                }
            };
            let mut rhs = Vec::with_capacity(items.len());
            for item in &items {
                let value = match trim_bounding_quotes(&item.text).to_lowercase().as_str() {
                    "true" => true,
                    "false" => false,
                    _ => {
                        return Err(PolicyError::BadLiteral {
                            rule: owner.to_owned(),
                            attr: attr.to_owned(),
                            literal: item.text.clone(),
                        })
                    }
                };
                rhs.push(value);
            }
            Ok(Expr::BoolCmp {
                mapper,
                negated,
                rhs,
            })
        }
        ValueKind::Str => {
            let str_op = match op {
                CmpOp::Eq | CmpOp::In => StrOp::Eq,
                CmpOp::Neq => StrOp::Neq,
                CmpOp::Contains => StrOp::Contains,
                CmpOp::IContains => StrOp::IContains,
                CmpOp::StartsWith => StrOp::StartsWith,
                CmpOp::EndsWith => StrOp::EndsWith,
                CmpOp::PMatch => StrOp::PMatch,
                CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
                    return Err(PolicyError::TypeMismatch {
                        rule: owner.to_owned(),
                        attr: attr.to_owned(),
                        op: op.to_string(),
                    })
                }
            };
            let rhs = items
                .iter()
                .map(|item| {
                    let text = trim_bounding_quotes(&item.text);
                    if str_op == StrOp::IContains {
                        text.to_lowercase()
                    } else {
                        text.to_owned()
                    }
                })
                .collect();
            Ok(Expr::StrCmp {
                mapper,
                op: str_op,
                rhs,
            })
        }
    }
}

/// 피연산자를 리터럴 목록으로 해석합니다.
///
/// - `in`/`pmatch`의 bareword 스칼라는 리스트 이름이어야 합니다.
/// - 그 밖의 연산자에서 리스트 이름이 스칼라로 쓰이면 에러입니다.
/// - 그룹/리스트 리터럴의 bareword 원소 중 리스트 이름은 재귀적으로
///   확장됩니다 (따옴표 원소는 항상 리터럴).
fn resolve_operand(
    op: CmpOp,
    operand: &Operand,
    owner: &str,
    set: &PolicySet,
) -> Result<Vec<Lit>, PolicyError> {
    let membership = matches!(op, CmpOp::In | CmpOp::PMatch);
    match operand {
        Operand::Scalar(lit) => {
            if !lit.quoted && set.list(&lit.text).is_some() {
                if membership {
                    return Ok(expand_list(&lit.text, set));
                }
                return Err(PolicyError::ListAsScalar {
                    rule: owner.to_owned(),
                    list: lit.text.clone(),
                });
            }
            if membership && !lit.quoted {
                return Err(PolicyError::UndefinedReference {
                    kind: "list",
                    name: lit.text.clone(),
                    referenced_by: owner.to_owned(),
                });
            }
            Ok(vec![lit.clone()])
        }
        Operand::Group(items) => {
            let mut out = Vec::new();
            for item in items {
                if !item.quoted && set.list(&item.text).is_some() {
                    out.extend(expand_list(&item.text, set));
                } else {
                    out.push(item.clone());
                }
            }
            Ok(out)
        }
        Operand::ListLit(items) => Ok(items.clone()),
    }
}

/// 리스트를 재귀적으로 평탄화합니다. 중첩 리스트 이름은 확장되고,
/// 이미 방문한 리스트는 건너뜁니다 (자기 중첩 안전).
fn expand_list(name: &str, set: &PolicySet) -> Vec<Lit> {
    fn walk(name: &str, set: &PolicySet, visited: &mut HashSet<String>, out: &mut Vec<Lit>) {
        if !visited.insert(name.to_owned()) {
            return;
        }
        let Some(list) = set.list(name) else { return };
        for item in &list.items {
            if set.list(item).is_some() {
                walk(item, set, visited, out);
            } else {
                out.push(Lit::bare(item.clone()));
            }
        }
    }

    let mut out = Vec::new();
    let mut visited = HashSet::new();
    walk(name, set, &mut visited, &mut out);
    out
}
