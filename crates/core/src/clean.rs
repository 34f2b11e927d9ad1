//! Flattening of storage-native documents into the client shape.
//!
//! Metadata becomes `id`/`title`, fields of the type's own part are lifted to
//! the top level in camelCase, field wrappers are unwrapped, and bag members
//! are flattened into `items`.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::document::shape::{to_camel_case, FieldShape, BAG_PART, CONTENT_ITEMS};
use crate::document::UserRecord;

/// Users keyed by `UserId`, used to enrich user-picker fields.
pub type UserIndex = HashMap<String, UserRecord>;

/// Flatten one raw document of `content_type`.
pub fn clean_item(
    raw: &Map<String, Value>,
    content_type: &str,
    users: Option<&UserIndex>,
) -> Map<String, Value> {
    let mut clean = Map::new();
    if let Some(Value::String(id)) = raw.get("ContentItemId") {
        clean.insert("id".into(), Value::String(id.clone()));
    }
    if let Some(Value::String(title)) = raw.get("DisplayText") {
        clean.insert("title".into(), Value::String(title.clone()));
    }

    if let Some(Value::Object(section)) = raw.get(content_type) {
        for (key, value) in section {
            let Some(field) = extract_field(value, users) else {
                continue;
            };
            let mut name = to_camel_case(key);
            if field.is_reference {
                name.push_str("Id");
            }
            clean.insert(name, field.value);
        }
    }

    let bag = raw
        .get(BAG_PART)
        .and_then(|bag| bag.get(CONTENT_ITEMS))
        .and_then(Value::as_array);
    if let Some(members) = bag {
        let items: Vec<Value> = members
            .iter()
            .filter_map(|member| {
                let member = member.as_object()?;
                let member_type = member.get("ContentType")?.as_str()?;
                let mut cleaned = clean_item(member, member_type, users);
                cleaned.insert("contentType".into(), Value::String(member_type.to_string()));
                Some(Value::Object(cleaned))
            })
            .collect();
        if !items.is_empty() {
            clean.insert("items".into(), Value::Array(items));
        }
    }

    clean
}

struct Field {
    value: Value,
    is_reference: bool,
}

impl Field {
    fn plain(value: Value) -> Self {
        Self {
            value,
            is_reference: false,
        }
    }
}

/// Unwrap a top-level field. `None` means the field is omitted.
fn extract_field(value: &Value, users: Option<&UserIndex>) -> Option<Field> {
    match FieldShape::classify(value) {
        FieldShape::Text(text) => match text {
            Value::String(s) => Some(Field::plain(Value::String(s.clone()))),
            Value::Array(list) => list
                .first()
                .and_then(Value::as_str)
                .map(|s| Field::plain(Value::String(s.to_string()))),
            _ => None,
        },
        FieldShape::UserPicker { ids, names } => {
            let ids = ids.iter().filter_map(Value::as_str);
            let names = names.iter().filter_map(Value::as_str);
            let picked = ids.zip(names).map(|(id, name)| user_entry(id, name, users)).collect();
            Some(Field::plain(Value::Array(picked)))
        }
        FieldShape::ContentItemIds(ids) => {
            let mut ids: Vec<Value> = ids
                .iter()
                .filter_map(Value::as_str)
                .map(|id| Value::String(id.to_string()))
                .collect();
            let value = match ids.len() {
                0 => return None,
                1 => ids.remove(0),
                _ => Value::Array(ids),
            };
            Some(Field {
                value,
                is_reference: true,
            })
        }
        FieldShape::Items(items) => {
            let mut docs: Vec<Value> = items
                .iter()
                .filter_map(Value::as_object)
                .map(|doc| {
                    let doc_type = doc.get("ContentType").and_then(Value::as_str).unwrap_or("");
                    Value::Object(clean_item(doc, doc_type, users))
                })
                .collect();
            let value = match docs.len() {
                0 => return None,
                1 => docs.remove(0),
                _ => Value::Array(docs),
            };
            Some(Field::plain(value))
        }
        FieldShape::Values(values) => Some(Field::plain(Value::Array(extract_list(values, users)))),
        FieldShape::Object(map) => {
            let mut cleaned: Map<String, Value> = map
                .iter()
                .filter_map(|(k, v)| Some((to_camel_case(k), extract_value(v, users)?)))
                .collect();
            if cleaned.len() == 1 {
                let key = cleaned.keys().next().cloned()?;
                return cleaned.remove(&key).map(Field::plain);
            }
            Some(Field::plain(Value::Object(cleaned)))
        }
        FieldShape::Array(list) => Some(Field::plain(Value::Array(extract_list(list, users)))),
        FieldShape::Scalar(Value::Number(n)) => n.as_f64().map(|f| Field::plain(Value::from(f))),
        FieldShape::Scalar(scalar) => Some(Field::plain(scalar.clone())),
        FieldShape::Null => None,
    }
}

fn extract_value(value: &Value, users: Option<&UserIndex>) -> Option<Value> {
    extract_field(value, users).map(|field| field.value)
}

fn extract_list(list: &[Value], users: Option<&UserIndex>) -> Vec<Value> {
    list.iter().filter_map(|v| extract_value(v, users)).collect()
}

fn user_entry(id: &str, name: &str, users: Option<&UserIndex>) -> Value {
    let mut user = Map::new();
    user.insert("id".into(), Value::String(id.to_string()));
    user.insert("username".into(), Value::String(name.to_string()));
    if let Some(record) = users.and_then(|index| index.get(id)) {
        if let Some(email) = &record.email {
            user.insert("email".into(), Value::String(email.clone()));
        }
        if let Some(phone) = &record.phone_number {
            user.insert("phone".into(), Value::String(phone.clone()));
        }
        for (key, value) in &record.properties {
            if !value.is_null() {
                user.insert(to_camel_case(key), value.clone());
            }
        }
    }
    Value::Object(user)
}
