use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::document::shape::{CONTENT_ITEM_IDS, ITEMS, USER_IDS};

/// Keys ending in `Id` that name a document's own identity, not a reference.
const IDENTITY_KEYS: [&str; 2] = ["id", "ContentItemId"];

/// A key of the form `<name>Id` that holds a single referenced id.
pub fn is_reference_key(key: &str) -> bool {
    key.len() > 2 && key.ends_with("Id") && !IDENTITY_KEYS.contains(&key)
}

/// `ownerId` becomes `owner`.
pub fn strip_id_suffix(key: &str) -> &str {
    key.strip_suffix("Id").unwrap_or(key)
}

/// Gather every content item id referenced anywhere in `tree`.
///
/// `ContentItemIds` arrays and string-valued `<name>Id` keys are references.
/// Embedded `Items` are documents already resolved and are not descended.
pub fn collect_content_item_ids(tree: &Map<String, Value>, ids: &mut BTreeSet<String>) {
    for (key, value) in tree {
        match value {
            Value::Array(list) if key == CONTENT_ITEM_IDS => {
                ids.extend(list.iter().filter_map(Value::as_str).map(String::from));
            }
            Value::String(id) if is_reference_key(key) => {
                ids.insert(id.clone());
            }
            _ if key == ITEMS => {}
            Value::Object(child) => collect_content_item_ids(child, ids),
            Value::Array(list) => collect_in_array(list, ids),
            _ => {}
        }
    }
}

fn collect_in_array(list: &[Value], ids: &mut BTreeSet<String>) {
    for value in list {
        match value {
            Value::Object(child) => collect_content_item_ids(child, ids),
            Value::Array(nested) => collect_in_array(nested, ids),
            _ => {}
        }
    }
}

/// Gather the ids of every user picked anywhere in `tree`.
pub fn collect_user_ids(tree: &Map<String, Value>, ids: &mut BTreeSet<String>) {
    for (key, value) in tree {
        match value {
            Value::Array(list) if key.eq_ignore_ascii_case(USER_IDS) => {
                ids.extend(list.iter().filter_map(Value::as_str).map(String::from));
            }
            Value::Object(child) => collect_user_ids(child, ids),
            Value::Array(list) => {
                for child in list.iter().filter_map(Value::as_object) {
                    collect_user_ids(child, ids);
                }
            }
            _ => {}
        }
    }
}
