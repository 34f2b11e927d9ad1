use std::fmt;

use serde::{Deserialize, Serialize};

/// Operators recognised in a `where` string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Neq,  // !=
    Gte,  // >=
    Lte,  // <=
    Eq,   // =
    Gt,   // >
    Lt,   // <
    Like, // LIKE
    And,  // AND
}

impl Operator {
    pub fn literal(self) -> &'static str {
        match self {
            Operator::Neq => "!=",
            Operator::Gte => ">=",
            Operator::Lte => "<=",
            Operator::Eq => "=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Like => "LIKE",
            Operator::And => "AND",
        }
    }

    /// Everything except the clause separator.
    pub fn is_comparison(self) -> bool {
        !matches!(self, Operator::And)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.literal())
    }
}

/// One `key OP value` comparison. Clauses combine with implicit AND.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clause {
    /// Sanitized dotted field path.
    pub key: String,
    pub op: Operator,
    /// Trimmed comparison operand.
    pub value: String,
}

/// One `orderby` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortKey {
    pub path: String,
    pub ascending: bool,
}

/// The query-string surface shared by every list endpoint.
///
/// `limit` and `offset` stay strings: malformed numbers are ignored rather
/// than rejected, which a typed `usize` extractor could not express.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryParams {
    #[serde(rename = "where", default, skip_serializing_if = "Option::is_none")]
    pub where_clause: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderby: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

impl QueryParams {
    pub fn is_empty(&self) -> bool {
        [&self.where_clause, &self.orderby, &self.limit, &self.offset]
            .iter()
            .all(|p| p.as_deref().map_or(true, str::is_empty))
    }

    /// Only the `where` part, as live-update subscriptions use it.
    pub fn where_only(&self) -> Self {
        Self {
            where_clause: self.where_clause.clone(),
            ..Self::default()
        }
    }
}
