//! 조건식 렉서
//!
//! 정책 조건 문자열을 토큰 열로 분해합니다. 따옴표(작은/큰)는 문자열
//! 리터럴을 감싸며 토큰화 단계에서 벗겨집니다. 키워드(and, or, not,
//! in, exists, contains 등)는 파서가 식별자 토큰에서 판별합니다.

use std::fmt;

/// 조건식 토큰
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// 식별자 또는 bareword 리터럴 (속성 이름, 숫자, 경로 등)
    Ident(String),
    /// 따옴표로 감싼 문자열 리터럴 (따옴표 제거됨)
    Quoted(String),
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(s) => write!(f, "{s}"),
            Self::Quoted(s) => write!(f, "\"{s}\""),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::LBracket => write!(f, "["),
            Self::RBracket => write!(f, "]"),
            Self::Comma => write!(f, ","),
            Self::Eq => write!(f, "="),
            Self::Neq => write!(f, "!="),
            Self::Lt => write!(f, "<"),
            Self::Le => write!(f, "<="),
            Self::Gt => write!(f, ">"),
            Self::Ge => write!(f, ">="),
        }
    }
}

/// bareword를 끝내는 문자
fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '[' | ']' | ',' | '=' | '<' | '>' | '!' | '\'' | '"')
}

/// 조건 문자열을 토큰 열로 변환합니다.
pub fn tokenize(input: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        match c {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::LParen),
            ')' => tokens.push(Token::RParen),
            '[' => tokens.push(Token::LBracket),
            ']' => tokens.push(Token::RBracket),
            ',' => tokens.push(Token::Comma),
            '=' => tokens.push(Token::Eq),
            '!' => match chars.peek() {
                Some((_, '=')) => {
                    chars.next();
                    tokens.push(Token::Neq);
                }
                _ => return Err(format!("unexpected '!' at offset {pos}")),
            },
            '<' => match chars.peek() {
                Some((_, '=')) => {
                    chars.next();
                    tokens.push(Token::Le);
                }
                _ => tokens.push(Token::Lt),
            },
            '>' => match chars.peek() {
                Some((_, '=')) => {
                    chars.next();
                    tokens.push(Token::Ge);
                }
                _ => tokens.push(Token::Gt),
            },
            quote @ ('\'' | '"') => {
                let mut text = String::new();
                let mut closed = false;
                for (_, qc) in chars.by_ref() {
                    if qc == quote {
                        closed = true;
                        break;
                    }
                    text.push(qc);
                }
                if !closed {
                    return Err(format!("unterminated string starting at offset {pos}"));
                }
                tokens.push(Token::Quoted(text));
            }
            _ => {
                let mut word = String::new();
                word.push(c);
                while let Some((_, nc)) = chars.peek() {
                    if is_delimiter(*nc) {
                        break;
                    }
                    word.push(*nc);
                    chars.next();
                }
                tokens.push(Token::Ident(word));
            }
        }
    }

    Ok(tokens)
}
