//! 조건식 파서 — 토큰 열을 AST로 변환하는 재귀 하강 파서
//!
//! 우선순위 (높음 → 낮음): `not`, 비교/멤버십, `and`, `or`.
//! 괄호는 우선순위를 재정의합니다. 매크로는 파싱 전에 토큰 수준에서
//! 치환되므로 이 파서에는 나타나지 않습니다.

use std::fmt;

use super::lexer::Token;

/// 비교/멤버십 연산자
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    PMatch,
}

impl fmt::Display for CmpOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Eq => "=",
            Self::Neq => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "in",
            Self::Contains => "contains",
            Self::IContains => "icontains",
            Self::StartsWith => "startswith",
            Self::EndsWith => "endswith",
            Self::PMatch => "pmatch",
        };
        write!(f, "{name}")
    }
}

/// 피연산자 리터럴 — 따옴표 여부를 보존합니다
///
/// bareword는 리스트 이름일 수 있지만 따옴표 리터럴은 항상 문자열입니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lit {
    pub text: String,
    pub quoted: bool,
}

impl Lit {
    pub fn bare(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            quoted: true,
        }
    }
}

/// 비교 연산의 우변
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// 단일 리터럴 또는 리스트 이름
    Scalar(Lit),
    /// `(a, b, c)` — 이름 그룹 (리스트 이름은 컴파일 시 확장)
    Group(Vec<Lit>),
    /// `[a, b, c]` — 명시적 리터럴 리스트
    ListLit(Vec<Lit>),
}

/// 조건식 AST
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ast {
    Or(Vec<Ast>),
    And(Vec<Ast>),
    Not(Box<Ast>),
    Exists(String),
    Cmp {
        attr: String,
        op: CmpOp,
        operand: Operand,
    },
}

/// 파싱 에러
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// 연산자가 따라오지 않는 단독 식별자 — 미정의 매크로일 가능성이 높음
    BareIdent(String),
    /// 그 밖의 문법 오류
    Message(String),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BareIdent(name) => write!(f, "bare identifier '{name}' (undefined macro?)"),
            Self::Message(msg) => write!(f, "{msg}"),
        }
    }
}

/// 괄호/부정 중첩 한도 — 병리적 입력의 파서 재귀 방지
const MAX_NESTING: usize = 512;

/// 토큰 열을 AST로 파싱합니다.
pub fn parse(tokens: &[Token]) -> Result<Ast, ParseError> {
    let mut p = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let ast = p.parse_or()?;
    if let Some(tok) = p.peek() {
        return Err(ParseError::Message(format!(
            "unexpected trailing token '{tok}'"
        )));
    }
    Ok(ast)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<&'a Token> {
        let tok = self.tokens.get(self.pos);
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn peek_keyword(&self) -> Option<&'a str> {
        match self.peek() {
            Some(Token::Ident(word)) => Some(word.as_str()),
            _ => None,
        }
    }

    fn parse_or(&mut self) -> Result<Ast, ParseError> {
        let mut terms = vec![self.parse_and()?];
        while self.peek_keyword() == Some("or") {
            self.next();
            terms.push(self.parse_and()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().expect("nonempty")
        } else {
            Ast::Or(terms)
        })
    }

    fn parse_and(&mut self) -> Result<Ast, ParseError> {
        let mut terms = vec![self.parse_not()?];
        while self.peek_keyword() == Some("and") {
            self.next();
            terms.push(self.parse_not()?);
        }
        Ok(if terms.len() == 1 {
            terms.pop().expect("nonempty")
        } else {
            Ast::And(terms)
        })
    }

    fn enter(&mut self) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            return Err(ParseError::Message(format!(
                "nesting exceeds limit of {MAX_NESTING}"
            )));
        }
        Ok(())
    }

    fn parse_not(&mut self) -> Result<Ast, ParseError> {
        if self.peek_keyword() == Some("not") {
            self.next();
            self.enter()?;
            let inner = self.parse_not()?;
            self.depth -= 1;
            return Ok(Ast::Not(Box::new(inner)));
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Ast, ParseError> {
        match self.next() {
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(ParseError::Message("expected ')'".to_owned())),
                }
            }
            Some(Token::Ident(word)) if word == "exists" => match self.next() {
                Some(Token::Ident(attr)) => Ok(Ast::Exists(attr.clone())),
                _ => Err(ParseError::Message(
                    "expected attribute after 'exists'".to_owned(),
                )),
            },
            Some(Token::Ident(attr)) => self.parse_cmp(attr.clone()),
            Some(tok) => Err(ParseError::Message(format!("unexpected token '{tok}'"))),
            None => Err(ParseError::Message("unexpected end of condition".to_owned())),
        }
    }

    fn parse_cmp(&mut self, attr: String) -> Result<Ast, ParseError> {
        let op = match self.peek() {
            Some(Token::Eq) => CmpOp::Eq,
            Some(Token::Neq) => CmpOp::Neq,
            Some(Token::Lt) => CmpOp::Lt,
            Some(Token::Le) => CmpOp::Le,
            Some(Token::Gt) => CmpOp::Gt,
            Some(Token::Ge) => CmpOp::Ge,
            Some(Token::Ident(word)) => match word.as_str() {
                "in" => CmpOp::In,
                "contains" => CmpOp::Contains,
                "icontains" => CmpOp::IContains,
                "startswith" => CmpOp::StartsWith,
                "endswith" => CmpOp::EndsWith,
                "pmatch" => CmpOp::PMatch,
                _ => return Err(ParseError::BareIdent(attr)),
            },
            _ => return Err(ParseError::BareIdent(attr)),
        };
        self.next();
        let operand = self.parse_operand()?;
        Ok(Ast::Cmp { attr, op, operand })
    }

    fn parse_operand(&mut self) -> Result<Operand, ParseError> {
        match self.next() {
            Some(Token::Ident(word)) => Ok(Operand::Scalar(Lit::bare(word.clone()))),
            Some(Token::Quoted(text)) => Ok(Operand::Scalar(Lit::quoted(text.clone()))),
            Some(Token::LParen) => Ok(Operand::Group(self.parse_items(Token::RParen)?)),
            Some(Token::LBracket) => Ok(Operand::ListLit(self.parse_items(Token::RBracket)?)),
            Some(tok) => Err(ParseError::Message(format!(
                "unexpected operand token '{tok}'"
            ))),
            None => Err(ParseError::Message("missing operand".to_owned())),
        }
    }

    fn parse_items(&mut self, close: Token) -> Result<Vec<Lit>, ParseError> {
        let mut items = Vec::new();
        loop {
            match self.next() {
                Some(Token::Ident(word)) => items.push(Lit::bare(word.clone())),
                Some(Token::Quoted(text)) => items.push(Lit::quoted(text.clone())),
                Some(tok) if *tok == close && items.is_empty() => return Ok(items),
                Some(tok) => {
                    return Err(ParseError::Message(format!(
                        "expected list item, found '{tok}'"
                    )))
                }
                None => return Err(ParseError::Message("unterminated list".to_owned())),
            }
            match self.next() {
                Some(Token::Comma) => {}
                Some(tok) if *tok == close => return Ok(items),
                Some(tok) => {
                    return Err(ParseError::Message(format!(
                        "expected ',' or closing bracket, found '{tok}'"
                    )))
                }
                None => return Err(ParseError::Message("unterminated list".to_owned())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lang::lexer::tokenize;

    fn parse_str(input: &str) -> Result<Ast, ParseError> {
        parse(&tokenize(input).expect("lexes"))
    }

    #[test]
    fn parses_simple_comparison() {
        let ast = parse_str("sf.proc.name = apt").unwrap();
        assert_eq!(
            ast,
            Ast::Cmp {
                attr: "sf.proc.name".to_owned(),
                op: CmpOp::Eq,
                operand: Operand::Scalar(Lit::bare("apt")),
            }
        );
    }

    #[test]
    fn precedence_not_cmp_and_or() {
        // a = 1 or b = 2 and not c = 3  →  Or(a=1, And(b=2, Not(c=3)))
        let ast = parse_str("a = 1 or b = 2 and not c = 3").unwrap();
        match ast {
            Ast::Or(terms) => {
                assert_eq!(terms.len(), 2);
                match &terms[1] {
                    Ast::And(inner) => {
                        assert_eq!(inner.len(), 2);
                        assert!(matches!(inner[1], Ast::Not(_)));
                    }
                    other => panic!("expected And, got {other:?}"),
                }
            }
            other => panic!("expected Or, got {other:?}"),
        }
    }

    #[test]
    fn parentheses_override_precedence() {
        let ast = parse_str("(a = 1 or b = 2) and c = 3").unwrap();
        match ast {
            Ast::And(terms) => {
                assert!(matches!(terms[0], Ast::Or(_)));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn parses_membership_group() {
        let ast = parse_str("sf.proc.exe in (pkg_bins, /bin/sh)").unwrap();
        match ast {
            Ast::Cmp {
                op: CmpOp::In,
                operand: Operand::Group(items),
                ..
            } => {
                assert_eq!(items, vec![Lit::bare("pkg_bins"), Lit::bare("/bin/sh")]);
            }
            other => panic!("expected In cmp, got {other:?}"),
        }
    }

    #[test]
    fn parses_list_literal() {
        let ast = parse_str("sf.net.dport in [80, 443]").unwrap();
        match ast {
            Ast::Cmp {
                operand: Operand::ListLit(items),
                ..
            } => assert_eq!(items.len(), 2),
            other => panic!("expected ListLit, got {other:?}"),
        }
    }

    #[test]
    fn parses_exists() {
        let ast = parse_str("exists sf.file.path").unwrap();
        assert_eq!(ast, Ast::Exists("sf.file.path".to_owned()));
    }

    #[test]
    fn parses_double_negation() {
        let ast = parse_str("not not a = 1").unwrap();
        match ast {
            Ast::Not(inner) => assert!(matches!(*inner, Ast::Not(_))),
            other => panic!("expected Not, got {other:?}"),
        }
    }

    #[test]
    fn quoted_operand_keeps_quote_flag() {
        let ast = parse_str("sf.proc.name = 'pkg_bins'").unwrap();
        match ast {
            Ast::Cmp {
                operand: Operand::Scalar(lit),
                ..
            } => assert!(lit.quoted),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn bare_ident_reports_possible_macro() {
        let err = parse_str("never_true and a = 1").unwrap_err();
        assert_eq!(err, ParseError::BareIdent("never_true".to_owned()));
    }

    #[test]
    fn trailing_tokens_are_rejected() {
        assert!(parse_str("a = 1 b = 2").is_err());
    }

    #[test]
    fn empty_group_is_allowed() {
        // 빈 리스트로 확장되는 `in ()`은 항상 거짓으로 평가됩니다
        let ast = parse_str("sf.proc.name in ()").unwrap();
        match ast {
            Ast::Cmp {
                operand: Operand::Group(items),
                ..
            } => assert!(items.is_empty()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn missing_operand_is_an_error() {
        assert!(parse_str("sf.proc.name =").is_err());
        assert!(parse_str("sf.proc.name contains").is_err());
    }
}
