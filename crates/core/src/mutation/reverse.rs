// Client body -> storage shape.
//
// Inverse of the flattener for the field shapes it produces: strings become
// `{Text}`, numbers and booleans `{Value}`, `<name>Id` keys content picker
// references, user lists user pickers, `items` the bag.

use serde_json::{json, Map, Value};

use super::types::{BagWrite, FieldWrite, StorageWrite, WriteMode};
use crate::document::id::{looks_like_content_item_id, new_content_item_id};
use crate::document::shape::{
    get_ci, to_pascal_case, CONTENT_ITEM_IDS, MEDIA_TEXTS, PATHS, TEXT, USER_IDS, USER_NAMES,
    VALUES,
};
use crate::document::validate::is_reserved;
use crate::reference::collect::{is_reference_key, strip_id_suffix};
use query::record::display_string;

const PUSH: &str = "$push";

/// Translate a flat client body.
pub fn to_storage_shape(body: &Map<String, Value>, mode: WriteMode) -> StorageWrite {
    let mut write = StorageWrite::default();

    for (key, value) in body {
        if key.eq_ignore_ascii_case("title") {
            match value {
                Value::Null => {}
                Value::String(s) => write.display_text = Some(s.clone()),
                other => write.display_text = Some(display_string(other)),
            }
            continue;
        }
        if is_reserved(key) {
            continue;
        }
        if key.eq_ignore_ascii_case("items") {
            if let Some(bag) = bag_write(value) {
                write.bag = Some(bag);
                continue;
            }
        }

        let reference = is_reference_key(key) && !matches!(value, Value::Number(_) | Value::Bool(_));
        let name = if reference {
            to_pascal_case(strip_id_suffix(key))
        } else {
            to_pascal_case(key)
        };

        if value.is_null() {
            if mode == WriteMode::Update {
                write.fields.push(FieldWrite::Clear { name });
            }
            continue;
        }

        let stored = if reference {
            reference_wrapper(value)
        } else {
            Some(field_wrapper(value))
        };
        if let Some(value) = stored {
            write.fields.push(FieldWrite::Set { name, value });
        }
    }

    write
}

fn reference_wrapper(value: &Value) -> Option<Value> {
    let ids: Vec<Value> = match value {
        Value::String(id) => vec![Value::String(id.clone())],
        Value::Array(list) => list.iter().filter(|v| v.is_string()).cloned().collect(),
        _ => return None,
    };
    if ids.is_empty() {
        return None;
    }
    Some(json!({ CONTENT_ITEM_IDS: ids }))
}

/// Storage wrapper for a top-level field value.
fn field_wrapper(value: &Value) -> Value {
    match value {
        Value::String(s) => json!({ TEXT: s }),
        Value::Number(n) => json!({ "Value": n.as_f64() }),
        Value::Bool(b) => json!({ "Value": b }),
        Value::Array(list) => array_wrapper(list),
        Value::Object(map) => object_wrapper(map),
        Value::Null => Value::Null,
    }
}

fn array_wrapper(list: &[Value]) -> Value {
    if let Some(Value::Object(first)) = list.first() {
        if first.contains_key("id") && get_ci(first, "username").is_some() {
            return user_picker(list);
        }
    }

    if list.iter().all(Value::is_string) {
        let strings: Vec<&str> = list.iter().filter_map(Value::as_str).collect();
        if !strings.is_empty() && strings.iter().all(|s| looks_like_content_item_id(s)) {
            return json!({ CONTENT_ITEM_IDS: list });
        }
        return json!({ VALUES: list });
    }

    let values: Vec<Value> = list.iter().map(pascal_value).collect();
    json!({ VALUES: values })
}

fn user_picker(list: &[Value]) -> Value {
    let mut ids = Vec::new();
    let mut names = Vec::new();
    for user in list.iter().filter_map(Value::as_object) {
        if let Some(Value::String(id)) = user.get("id") {
            ids.push(Value::String(id.clone()));
        }
        if let Some(Value::String(name)) = get_ci(user, "username") {
            names.push(Value::String(name.clone()));
        }
    }
    json!({ USER_IDS: ids, USER_NAMES: names })
}

fn object_wrapper(map: &Map<String, Value>) -> Value {
    let paths = get_ci(map, "paths").and_then(Value::as_array);
    let texts = get_ci(map, "mediaTexts").and_then(Value::as_array);
    if let (Some(paths), Some(texts)) = (paths, texts) {
        let strings = |list: &Vec<Value>| -> Vec<Value> {
            list.iter().filter(|v| v.is_string()).cloned().collect()
        };
        return json!({ PATHS: strings(paths), MEDIA_TEXTS: strings(texts) });
    }
    pascal_value(&Value::Object(map.clone()))
}

/// Nested values keep their type; object keys become PascalCase.
fn pascal_value(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (to_pascal_case(k), pascal_value(v)))
                .collect(),
        ),
        Value::Array(list) => Value::Array(list.iter().map(pascal_value).collect()),
        Value::Number(n) => n.as_f64().map_or(Value::Null, Value::from),
        other => other.clone(),
    }
}

fn bag_write(value: &Value) -> Option<BagWrite> {
    match value {
        Value::Array(list) => Some(BagWrite::Replace(
            list.iter()
                .filter_map(Value::as_object)
                .filter_map(|member| bag_member(member, None))
                .collect(),
        )),
        Value::Object(map) => match map.get(PUSH) {
            Some(Value::Array(list)) => Some(BagWrite::Push(
                list.iter().filter_map(Value::as_object).cloned().collect(),
            )),
            _ => None,
        },
        _ => None,
    }
}

/// A storage-shaped bag member built from a client element. The member's
/// type comes from its `contentType`, or `default_type` when absent. Without
/// either the element is dropped.
pub fn bag_member(element: &Map<String, Value>, default_type: Option<&str>) -> Option<Value> {
    let member_type = match get_ci(element, "contentType") {
        Some(Value::String(t)) if !t.is_empty() => t.clone(),
        _ => default_type.filter(|t| !t.is_empty())?.to_string(),
    };
    let id = ["id", "contentItemId"]
        .iter()
        .find_map(|k| get_ci(element, k).and_then(Value::as_str))
        .map(String::from)
        .unwrap_or_else(new_content_item_id);
    let title = match get_ci(element, "title") {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => display_string(other),
    };

    let mut section = Map::new();
    for (key, value) in element {
        if is_reserved(key) || value.is_null() {
            continue;
        }
        match value {
            Value::String(s) if is_reference_key(key) => {
                section.insert(
                    to_pascal_case(strip_id_suffix(key)),
                    json!({ CONTENT_ITEM_IDS: [s] }),
                );
            }
            Value::String(s) if looks_like_content_item_id(s) => {
                section.insert(to_pascal_case(key), json!({ CONTENT_ITEM_IDS: [s] }));
            }
            other => {
                section.insert(to_pascal_case(key), field_wrapper(other));
            }
        }
    }

    let mut member = Map::new();
    member.insert("ContentItemId".into(), Value::String(id));
    member.insert("ContentType".into(), Value::String(member_type.clone()));
    member.insert("DisplayText".into(), Value::String(title));
    member.insert(member_type, Value::Object(section));
    Some(Value::Object(member))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::clean_item;
    use crate::document::ContentItem;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn set(write: &StorageWrite, name: &str) -> Value {
        write
            .fields
            .iter()
            .find_map(|f| match f {
                FieldWrite::Set { name: n, value } if n == name => Some(value.clone()),
                _ => None,
            })
            .unwrap_or(Value::Null)
    }

    #[test]
    fn scalar_fields() {
        let write = to_storage_shape(
            &body(json!({"title": "Rex", "species": "dog", "age": 3, "vaccinated": true, "id": "x"})),
            WriteMode::Create,
        );
        assert_eq!(write.display_text.as_deref(), Some("Rex"));
        assert_eq!(set(&write, "Species"), json!({"Text": "dog"}));
        assert_eq!(set(&write, "Age"), json!({"Value": 3.0}));
        assert_eq!(set(&write, "Vaccinated"), json!({"Value": true}));
        assert_eq!(write.fields.len(), 3);
    }

    #[test]
    fn references() {
        let write = to_storage_shape(
            &body(json!({"ownerId": "abc", "tagsId": ["t1", "t2"], "countId": 4})),
            WriteMode::Create,
        );
        assert_eq!(set(&write, "Owner"), json!({"ContentItemIds": ["abc"]}));
        assert_eq!(set(&write, "Tags"), json!({"ContentItemIds": ["t1", "t2"]}));
        assert_eq!(set(&write, "CountId"), json!({"Value": 4.0}));
    }

    #[test]
    fn lowercase_id_endings_are_plain_fields() {
        let write = to_storage_shape(
            &body(json!({"squid": "ink", "paid": "yes", "valid": ["a", "b"]})),
            WriteMode::Create,
        );
        assert_eq!(set(&write, "Squid"), json!({"Text": "ink"}));
        assert_eq!(set(&write, "Paid"), json!({"Text": "yes"}));
        assert_eq!(set(&write, "Valid"), json!({"Values": ["a", "b"]}));

        let member = bag_member(&body(json!({"humid": "very"})), Some("Step")).unwrap();
        assert_eq!(member["Step"]["Humid"], json!({"Text": "very"}));
    }

    #[test]
    fn arrays() {
        let id = new_content_item_id();
        let write = to_storage_shape(
            &body(json!({
                "related": [id.clone()],
                "colors": ["red", "blue"],
                "scores": [1, "two", true],
                "clerk": [{"id": "u1", "username": "ann"}],
                "empty": []
            })),
            WriteMode::Create,
        );
        assert_eq!(set(&write, "Related"), json!({"ContentItemIds": [id]}));
        assert_eq!(set(&write, "Colors"), json!({"Values": ["red", "blue"]}));
        assert_eq!(set(&write, "Scores"), json!({"Values": [1.0, "two", true]}));
        assert_eq!(set(&write, "Clerk"), json!({"UserIds": ["u1"], "UserNames": ["ann"]}));
        assert_eq!(set(&write, "Empty"), json!({"Values": []}));
    }

    #[test]
    fn objects() {
        let write = to_storage_shape(
            &body(json!({
                "photo": {"paths": ["a.png", 1], "mediaTexts": ["A"]},
                "address": {"street": "Main", "zip": 1234}
            })),
            WriteMode::Create,
        );
        assert_eq!(set(&write, "Photo"), json!({"Paths": ["a.png"], "MediaTexts": ["A"]}));
        assert_eq!(set(&write, "Address"), json!({"Street": "Main", "Zip": 1234.0}));
    }

    #[test]
    fn nulls_depend_on_mode() {
        let b = body(json!({"nickname": null, "ownerId": null}));
        assert!(to_storage_shape(&b, WriteMode::Create).fields.is_empty());
        let write = to_storage_shape(&b, WriteMode::Update);
        assert_eq!(
            write.fields,
            vec![
                FieldWrite::Clear { name: "Nickname".into() },
                FieldWrite::Clear { name: "Owner".into() }
            ]
        );
    }

    #[test]
    fn bag_replace_and_push() {
        let write = to_storage_shape(
            &body(json!({"items": [
                {"contentType": "Step", "title": "Boil", "minutes": 10, "toolId": "t1"},
                {"title": "no type"}
            ]})),
            WriteMode::Create,
        );
        let Some(BagWrite::Replace(members)) = write.bag else {
            panic!("expected replace");
        };
        assert_eq!(members.len(), 1);
        assert_eq!(members[0]["ContentType"], json!("Step"));
        assert_eq!(members[0]["DisplayText"], json!("Boil"));
        assert_eq!(members[0]["Step"]["Minutes"], json!({"Value": 10.0}));
        assert_eq!(members[0]["Step"]["Tool"], json!({"ContentItemIds": ["t1"]}));

        let write = to_storage_shape(
            &body(json!({"items": {"$push": [{"minutes": 5}]}})),
            WriteMode::Update,
        );
        assert!(matches!(write.bag, Some(BagWrite::Push(ref m)) if m.len() == 1));
    }

    #[test]
    fn flatten_round_trip() {
        let client = json!({
            "name": "Rex",
            "age": 3.0,
            "vaccinated": false,
            "ownerId": "abc",
            "colors": ["red", "blue"],
            "photo": {"paths": ["a.png"], "mediaTexts": ["A"]},
            "clerk": [{"id": "u1", "username": "ann"}],
            "items": [{"contentType": "Toy", "title": "Ball", "squeaky": true}]
        });
        let write = to_storage_shape(&body(client.clone()), WriteMode::Create);
        let mut item = ContentItem::new("Pet");
        crate::mutation::apply::apply_write(&mut item, write);
        let id = item.content_item_id.clone();
        let clean = clean_item(&item.into_raw(), "Pet", None);

        for key in ["name", "age", "vaccinated", "ownerId", "colors", "photo", "clerk"] {
            assert_eq!(clean[key], client[key], "field {key}");
        }
        assert_eq!(clean["id"], json!(id));
        assert_eq!(clean["items"][0]["title"], json!("Ball"));
        assert_eq!(clean["items"][0]["squeaky"], json!(true));
        assert_eq!(clean["items"][0]["contentType"], json!("Toy"));
    }
}
