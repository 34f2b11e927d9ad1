// In-memory evaluation of `where`, `orderby`, `limit` and `offset` over
// flattened records.

use std::cmp::Ordering;

use crate::ast::{Clause, QueryParams, SortKey};
use crate::functions::compare;
use crate::parser::{parse_count, parse_order, parse_where};
use crate::record::{display_string, resolve, sort_string, Record};

/// Apply every query parameter in order: filter, sort, then slice.
pub fn apply(params: &QueryParams, records: Vec<Record>) -> Vec<Record> {
    if params.is_empty() {
        return records;
    }

    let mut records = match params.where_clause.as_deref() {
        Some(w) if !w.is_empty() => filter_where(records, w),
        _ => records,
    };

    if let Some(orderby) = params.orderby.as_deref().filter(|o| !o.is_empty()) {
        order_by(&mut records, &parse_order(orderby));
    }

    paginate(
        records,
        parse_count(params.limit.as_deref()),
        parse_count(params.offset.as_deref()),
    )
}

/// Filter with a raw `where` string.
///
/// Fails open: a string that does not parse leaves the records untouched.
/// This is the observed contract of the API, kept on purpose.
pub fn filter_where(records: Vec<Record>, where_clause: &str) -> Vec<Record> {
    match parse_where(where_clause) {
        Ok(clauses) => filter(records, &clauses),
        Err(err) => {
            tracing::debug!(%err, where_clause, "ignoring malformed where clause");
            records
        }
    }
}

/// Keep records matching every clause, applied one after another.
pub fn filter(mut records: Vec<Record>, clauses: &[Clause]) -> Vec<Record> {
    for clause in clauses {
        records.retain(|r| matches(r, clause));
    }
    records
}

/// A clause matches if any value its path reaches satisfies the operator.
/// Missing and null values never match, whatever the operator.
pub fn matches(record: &Record, clause: &Clause) -> bool {
    resolve(record, &clause.key)
        .into_iter()
        .any(|v| compare(clause.op, &display_string(v), &clause.value))
}

/// Stable multi-key sort on display strings.
pub fn order_by(records: &mut [Record], keys: &[SortKey]) {
    if keys.is_empty() {
        return;
    }
    records.sort_by(|a, b| {
        for key in keys {
            let ord = sort_string(a, &key.path).cmp(&sort_string(b, &key.path));
            let ord = if key.ascending { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
}

/// `limit` alone takes the first N; with `offset` it takes
/// `[offset, offset + limit)`. `offset` alone is a no-op. Ranges clamp.
pub fn paginate(records: Vec<Record>, limit: Option<usize>, offset: Option<usize>) -> Vec<Record> {
    let Some(limit) = limit else {
        return records;
    };
    let start = offset.unwrap_or(0);
    records.into_iter().skip(start).take(limit).collect()
}
