//! Role-based REST permissions.
//!
//! Permissions are ordinary content items of type `RestPermissions`, each
//! granting a set of roles a set of methods on a set of content types. The
//! table is rebuilt from storage on every check, so edits apply at once.

use std::collections::{HashMap, HashSet};

use serde_json::{Map, Value};
use thiserror::Error;

use crate::pipeline::fetch_clean_content;
use crate::store::{Store, StoreError};

pub const PERMISSIONS_TYPE: &str = "RestPermissions";
pub const ANONYMOUS: &str = "Anonymous";
pub const ADMINISTRATOR: &str = "Administrator";

#[derive(Debug, Error, PartialEq)]
#[error("User does not have permission to {method} {content_type}")]
pub struct PermissionDenied {
    pub method: String,
    pub content_type: String,
}

/// role -> content type -> upper-case methods.
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    grants: HashMap<String, HashMap<String, HashSet<String>>>,
}

impl PermissionTable {
    /// Build from flattened `RestPermissions` items. Malformed entries grant
    /// nothing.
    pub fn from_documents(docs: &[Map<String, Value>]) -> Self {
        let mut table = Self::default();
        for doc in docs {
            let roles = delimited_list(doc.get("roles"));
            let content_types = delimited_list(doc.get("contentTypes"));
            let methods: Vec<String> = array_list(doc.get("restMethods"))
                .into_iter()
                .map(|m| m.to_uppercase())
                .collect();
            for role in &roles {
                let by_type = table.grants.entry(role.clone()).or_default();
                for content_type in &content_types {
                    by_type
                        .entry(content_type.clone())
                        .or_default()
                        .extend(methods.iter().cloned());
                }
            }
        }
        table
    }

    /// Whether any of `roles`, or the implicit anonymous role, may call
    /// `method` on `content_type`.
    pub fn allows(&self, roles: &[String], content_type: &str, method: &str) -> bool {
        let method = method.to_uppercase();
        roles
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(ANONYMOUS))
            .filter_map(|role| self.grants.get(role))
            .filter_map(|by_type| by_type.get(content_type))
            .any(|methods| methods.contains(&method))
    }

    pub fn authorize(
        &self,
        roles: &[String],
        content_type: &str,
        method: &str,
    ) -> Result<(), PermissionDenied> {
        if self.allows(roles, content_type, method) {
            Ok(())
        } else {
            Err(PermissionDenied {
                method: method.to_uppercase(),
                content_type: content_type.to_string(),
            })
        }
    }
}

/// Load the current permission table.
pub async fn load_permissions<S: Store + ?Sized>(store: &S) -> Result<PermissionTable, StoreError> {
    let docs = fetch_clean_content(store, PERMISSIONS_TYPE, false).await?;
    Ok(PermissionTable::from_documents(&docs))
}

/// A comma-delimited string, possibly still wrapped as `{"text": ...}`, or a
/// list of strings.
pub fn delimited_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::String(s)) => split_trimmed(s),
        Some(Value::Object(map)) => delimited_list(map.get("text")),
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .flat_map(split_trimmed)
            .collect(),
        _ => Vec::new(),
    }
}

/// A list of strings; a bare string is read as a delimited list.
pub fn array_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(list)) => list
            .iter()
            .filter_map(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        other => delimited_list(other),
    }
}

fn split_trimmed(s: &str) -> Vec<String> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn table() -> PermissionTable {
        let docs = vec![
            json!({"id": "p1", "roles": "Anonymous", "contentTypes": "Pet", "restMethods": ["GET"]}),
            json!({"id": "p2", "roles": "Customer, Staff", "contentTypes": {"text": "Order,Pet"},
                   "restMethods": ["get", "POST"]}),
            json!({"id": "p3", "roles": 5, "contentTypes": "Pet", "restMethods": ["DELETE"]}),
        ];
        let docs: Vec<Map<String, Value>> =
            docs.into_iter().map(|d| d.as_object().unwrap().clone()).collect();
        PermissionTable::from_documents(&docs)
    }

    #[test]
    fn anonymous_grants_apply_to_everyone() {
        let t = table();
        assert!(t.allows(&[], "Pet", "GET"));
        assert!(t.allows(&["Customer".into()], "Pet", "get"));
    }

    #[test]
    fn role_grants() {
        let t = table();
        let staff = vec!["Staff".to_string()];
        assert!(t.allows(&staff, "Order", "POST"));
        assert!(t.allows(&staff, "Order", "GET"));
        assert!(!t.allows(&staff, "Order", "DELETE"));
        assert!(!t.allows(&[], "Order", "GET"));
    }

    #[test]
    fn malformed_entries_grant_nothing() {
        assert!(!table().allows(&[], "Pet", "DELETE"));
    }

    #[test]
    fn default_deny_with_message() {
        let empty = PermissionTable::default();
        let err = empty.authorize(&[ADMINISTRATOR.into()], "Pet", "put").unwrap_err();
        assert_eq!(err.to_string(), "User does not have permission to PUT Pet");
    }

    #[tokio::test]
    async fn loads_from_store() {
        use crate::document::ContentItem;
        use crate::store::{DocumentStore, MemoryStore};

        let store = MemoryStore::new();
        let item = ContentItem::from_raw(json!({
            "ContentItemId": "perm1",
            "ContentType": PERMISSIONS_TYPE,
            "RestPermissions": {
                "Roles": {"Text": "Customer"},
                "ContentTypes": {"Text": "Pet"},
                "RestMethods": {"Values": ["GET", "PUT"]}
            }
        }))
        .unwrap();
        store.insert(&item).await.unwrap();
        let t = load_permissions(&store).await.unwrap();
        assert!(t.allows(&["Customer".into()], "Pet", "PUT"));
        assert!(!t.allows(&[], "Pet", "PUT"));
    }
}
