/// Write-path types: storage-shaped field writes and response bodies.
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Whether a body creates a new item or updates an existing one. Nulls are
/// skipped on create and clear the field on update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

/// A client body translated to storage shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageWrite {
    pub display_text: Option<String>,
    pub fields: Vec<FieldWrite>,
    pub bag: Option<BagWrite>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldWrite {
    /// Replace the stored wrapper of a PascalCase field.
    Set { name: String, value: Value },
    /// Remove the field.
    Clear { name: String },
}

#[derive(Debug, Clone, PartialEq)]
pub enum BagWrite {
    /// Replace every member with these storage-shaped members.
    Replace(Vec<Value>),
    /// `{"items": {"$push": [...]}}`: append client-shaped members, which may
    /// omit `contentType`.
    Push(Vec<Map<String, Value>>),
}

/// Body of create and update responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteResponse {
    pub id: String,
    pub title: String,
}

/// Body of delete responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub id: String,
}
