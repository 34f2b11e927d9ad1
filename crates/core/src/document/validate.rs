/// Field whitelisting for write bodies.
use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

/// Metadata keys a client may send without them being defined fields.
pub const RESERVED_FIELDS: &[&str] = &[
    "id",
    "contentItemId",
    "title",
    "displayText",
    "owner",
    "author",
    "createdUtc",
    "modifiedUtc",
    "publishedUtc",
    "contentType",
    "published",
    "latest",
];

#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Request body is empty")]
    EmptyBody,
    #[error("Invalid fields provided: {}", invalid.join(", "))]
    InvalidFields {
        invalid: Vec<String>,
        valid: Vec<String>,
    },
}

pub fn is_reserved(key: &str) -> bool {
    RESERVED_FIELDS.iter().any(|r| r.eq_ignore_ascii_case(key))
}

/// The flattened field names a content type accepts, matched
/// case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidFields {
    by_lowercase: BTreeMap<String, String>,
}

impl ValidFields {
    /// Union of the keys of every given flattened record.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Map<String, Value>>) -> Self {
        let mut fields = Self::default();
        for record in records {
            for key in record.keys() {
                fields
                    .by_lowercase
                    .entry(key.to_lowercase())
                    .or_insert_with(|| key.clone());
            }
        }
        fields
    }

    pub fn contains(&self, key: &str) -> bool {
        self.by_lowercase.contains_key(&key.to_lowercase())
    }

    /// Names in their flattened casing, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_lowercase.values().cloned().collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.by_lowercase.is_empty()
    }
}

/// Reject bodies that are empty or carry keys that are neither reserved nor
/// known fields of the type.
pub fn validate_body(body: &Map<String, Value>, valid: &ValidFields) -> Result<(), ValidationError> {
    if body.is_empty() {
        return Err(ValidationError::EmptyBody);
    }
    let invalid: Vec<String> = body
        .keys()
        .filter(|key| !is_reserved(key) && !valid.contains(key))
        .cloned()
        .collect();
    if invalid.is_empty() {
        Ok(())
    } else {
        Err(ValidationError::InvalidFields {
            invalid,
            valid: valid.names(),
        })
    }
}
