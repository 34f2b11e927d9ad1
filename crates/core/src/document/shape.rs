// Classification of stored field wrappers.
//
// Every stored field value is one of a small set of wrapper shapes. The
// checks run in a fixed order and the first match wins, so the flattener and
// the permission loader read fields identically.

use serde_json::{Map, Value};

pub const BAG_PART: &str = "BagPart";
pub const CONTENT_ITEMS: &str = "ContentItems";
pub const CONTENT_ITEM_IDS: &str = "ContentItemIds";
pub const ITEMS: &str = "Items";
pub const TEXT: &str = "Text";
pub const VALUES: &str = "Values";
pub const USER_IDS: &str = "UserIds";
pub const USER_NAMES: &str = "UserNames";
pub const PATHS: &str = "Paths";
pub const MEDIA_TEXTS: &str = "MediaTexts";

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldShape<'a> {
    /// `{"Text": ...}` as the only key.
    Text(&'a Value),
    /// `{"UserIds": [...], "UserNames": [...]}`, keys in any casing.
    UserPicker {
        ids: &'a [Value],
        names: &'a [Value],
    },
    /// `{"ContentItemIds": [...]}`
    ContentItemIds(&'a [Value]),
    /// `{"Items": [...]}`, embedded documents left by population.
    Items(&'a [Value]),
    /// `{"Values": [...]}` or `{"values": [...]}` as the only key.
    Values(&'a [Value]),
    Object(&'a Map<String, Value>),
    Array(&'a [Value]),
    Scalar(&'a Value),
    Null,
}

impl<'a> FieldShape<'a> {
    pub fn classify(value: &'a Value) -> Self {
        let map = match value {
            Value::Null => return FieldShape::Null,
            Value::Array(items) => return FieldShape::Array(items),
            Value::Object(map) => map,
            scalar => return FieldShape::Scalar(scalar),
        };

        if map.len() == 1 {
            if let Some(text) = map.get(TEXT) {
                return FieldShape::Text(text);
            }
        }
        if let (Some(Value::Array(ids)), Some(Value::Array(names))) =
            (get_ci(map, USER_IDS), get_ci(map, USER_NAMES))
        {
            return FieldShape::UserPicker { ids, names };
        }
        if let Some(Value::Array(ids)) = map.get(CONTENT_ITEM_IDS) {
            return FieldShape::ContentItemIds(ids);
        }
        if let Some(Value::Array(items)) = map.get(ITEMS) {
            return FieldShape::Items(items);
        }
        if map.len() == 1 {
            if let Some(Value::Array(values)) = map.get(VALUES).or_else(|| map.get("values")) {
                return FieldShape::Values(values);
            }
        }
        FieldShape::Object(map)
    }
}

/// Case-insensitive key lookup.
pub fn get_ci<'a>(map: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    map.get(key).or_else(|| {
        map.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v)
    })
}

/// Lower-case the first character: `FirstName` becomes `firstName`.
pub fn to_camel_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
        _ => key.to_string(),
    }
}

/// Upper-case the first character: `firstName` becomes `FirstName`.
pub fn to_pascal_case(key: &str) -> String {
    let mut chars = key.chars();
    match chars.next() {
        Some(first) if first.is_lowercase() => first.to_uppercase().chain(chars).collect(),
        _ => key.to_string(),
    }
}
