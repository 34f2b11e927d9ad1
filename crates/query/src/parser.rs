use crate::ast::{Clause, Operator, SortKey};
use crate::lexer::{tokenize, SpannedToken, Token};

/// Parser error types. None of these reach a client: a malformed `where`
/// string makes the filter step a no-op.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("expected AND at token {position}, found {found}")]
    ExpectedAnd { position: usize, found: String },
    #[error("expected a comparison operator at token {position}, found {found}")]
    ExpectedComparison { position: usize, found: String },
    #[error("clause {0} has an empty key")]
    EmptyKey(usize),
    #[error("clause {0} has an empty value")]
    EmptyValue(usize),
    #[error("unexpected end of input after {0} tokens")]
    UnexpectedEof(usize),
}

/// Parse a `where` string into its clause list.
///
/// The token list must look like `key OP value (AND key OP value)*`: every
/// 4th token (positions 3, 7, 11, ...) is `AND`, the slot between key and
/// value holds a comparison operator, and no key or value is blank.
pub fn parse_where(input: &str) -> Result<Vec<Clause>, ParseError> {
    let tokens = tokenize(input);
    check_separators(&tokens)?;
    let mut parser = Parser::new(tokens);
    parser.parse_clauses()
}

/// Every position `i % 4 == 3` must be the `AND` separator.
fn check_separators(tokens: &[SpannedToken]) -> Result<(), ParseError> {
    for (position, t) in tokens.iter().enumerate().skip(3).step_by(4) {
        if t.token != Token::Op(Operator::And) {
            return Err(ParseError::ExpectedAnd {
                position,
                found: t.token.to_string(),
            });
        }
    }
    Ok(())
}

/// Parse an `orderby` string: comma-separated paths, `-` prefix for
/// descending. `+` never survives sanitizing, so `+a` sorts ascending.
pub fn parse_order(input: &str) -> Vec<SortKey> {
    sanitize(input)
        .split(',')
        .filter_map(|field| {
            let field = field.trim();
            let (path, ascending) = match field.strip_prefix('-') {
                Some(rest) => (rest, false),
                None => (field, true),
            };
            (!path.is_empty()).then(|| SortKey {
                path: path.to_string(),
                ascending,
            })
        })
        .collect()
}

/// Parse `limit` / `offset`. Anything other than plain digits is ignored.
pub fn parse_count(input: Option<&str>) -> Option<usize> {
    let raw = input?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

/// Keep only `A-Z a-z 0-9 _ - , .`.
pub fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | ',' | '.'))
        .collect()
}

struct Parser {
    tokens: Vec<SpannedToken>,
    pos: usize,
}

impl Parser {
    fn new(tokens: Vec<SpannedToken>) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|t| t.token.clone());
        self.pos += 1;
        token
    }

    fn parse_clauses(&mut self) -> Result<Vec<Clause>, ParseError> {
        let mut clauses = vec![self.parse_clause(0)?];
        while self.peek().is_some() {
            // Separator position was validated up front.
            self.advance();
            let index = clauses.len();
            clauses.push(self.parse_clause(index)?);
        }
        Ok(clauses)
    }

    fn parse_clause(&mut self, index: usize) -> Result<Clause, ParseError> {
        let key = sanitize(&self.expect_text()?);
        if key.is_empty() {
            return Err(ParseError::EmptyKey(index));
        }

        let position = self.pos;
        let op = match self.advance() {
            Some(Token::Op(op)) if op.is_comparison() => op,
            Some(other) => {
                return Err(ParseError::ExpectedComparison {
                    position,
                    found: other.to_string(),
                })
            }
            None => return Err(ParseError::UnexpectedEof(self.tokens.len())),
        };

        let value = self.expect_text()?.trim().to_string();
        if value.is_empty() {
            return Err(ParseError::EmptyValue(index));
        }

        Ok(Clause { key, op, value })
    }

    fn expect_text(&mut self) -> Result<String, ParseError> {
        let position = self.pos;
        match self.advance() {
            Some(Token::Text(s)) => Ok(s),
            Some(other) => Err(ParseError::ExpectedComparison {
                position,
                found: other.to_string(),
            }),
            None => Err(ParseError::UnexpectedEof(self.tokens.len())),
        }
    }
}
