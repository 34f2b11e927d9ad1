//! Query-string filtering for flattened content items: the `where`,
//! `orderby`, `limit` and `offset` parameters of the list endpoints.

pub mod ast;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod record;

pub use ast::{Clause, Operator, QueryParams, SortKey};
pub use eval::{apply, filter_where};
pub use parser::{parse_where, ParseError};
pub use record::Record;
