use std::fmt;

use crate::ast::Operator;

/// Operator literals in match priority. At every position the first literal
/// that matches wins, so two-character operators shadow their one-character
/// prefixes and the underscore-wrapped keywords consume their underscores.
const OPERATORS: &[(&str, Operator)] = &[
    ("!=", Operator::Neq),
    (">=", Operator::Gte),
    ("<=", Operator::Lte),
    ("=", Operator::Eq),
    (">", Operator::Gt),
    ("<", Operator::Lt),
    ("_LIKE_", Operator::Like),
    ("_AND_", Operator::And),
    ("LIKE", Operator::Like),
    ("AND", Operator::And),
];

/// Token types produced by the `where` lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Raw text between two operators: a key or a value.
    Text(String),
    /// An operator literal.
    Op(Operator),
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Text(s) => write!(f, "{s:?}"),
            Token::Op(op) => write!(f, "{op}"),
        }
    }
}

/// Position in the source string, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Split a `where` string into a flat `text, op, text, op, ..., text` list.
///
/// Scans left to right and never fails: operator literals are recognised
/// anywhere, including inside words (`BRAND` contains `AND`), and whatever
/// lies between them is kept verbatim. The result always has odd length.
pub fn tokenize(input: &str) -> Vec<SpannedToken> {
    let mut tokens = Vec::new();
    let mut text_start = 0;
    let mut pos = 0;

    while pos < input.len() {
        let rest = &input[pos..];
        if let Some((literal, op)) = OPERATORS.iter().find(|(lit, _)| rest.starts_with(lit)) {
            tokens.push(SpannedToken {
                token: Token::Text(input[text_start..pos].to_string()),
                span: Span {
                    start: text_start,
                    end: pos,
                },
            });
            tokens.push(SpannedToken {
                token: Token::Op(*op),
                span: Span {
                    start: pos,
                    end: pos + literal.len(),
                },
            });
            pos += literal.len();
            text_start = pos;
        } else {
            pos += rest.chars().next().map_or(1, char::len_utf8);
        }
    }

    tokens.push(SpannedToken {
        token: Token::Text(input[text_start..].to_string()),
        span: Span {
            start: text_start,
            end: input.len(),
        },
    });

    tokens
}
