use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::id::new_content_item_id;
use super::shape::{BAG_PART, CONTENT_ITEMS};

/// A content item in its storage-native shape.
///
/// Fixed metadata sits next to the content parts; the item's own fields live
/// in the part named after its content type, and owned bag members under
/// `BagPart.ContentItems`. Everything that is not metadata is kept verbatim in
/// `content`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContentItem {
    pub content_item_id: String,
    #[serde(default)]
    pub content_item_version_id: String,
    pub content_type: String,
    #[serde(default)]
    pub display_text: String,
    #[serde(default = "default_true")]
    pub latest: bool,
    #[serde(default = "default_true")]
    pub published: bool,
    #[serde(default)]
    pub modified_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub published_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub created_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub author: Option<String>,
    /// Content parts, keyed by part name.
    #[serde(flatten)]
    pub content: Map<String, Value>,
}

fn default_true() -> bool {
    true
}

impl ContentItem {
    /// A fresh, published item with an empty field section.
    pub fn new(content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let now = Utc::now();
        let mut content = Map::new();
        content.insert(content_type.clone(), Value::Object(Map::new()));
        Self {
            content_item_id: new_content_item_id(),
            content_item_version_id: new_content_item_id(),
            content_type,
            display_text: String::new(),
            latest: true,
            published: true,
            modified_utc: Some(now),
            published_utc: Some(now),
            created_utc: Some(now),
            owner: None,
            author: None,
            content,
        }
    }

    /// Parse a raw storage document.
    pub fn from_raw(raw: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(raw)
    }

    /// The raw JSON tree, metadata first, then parts in stored order.
    pub fn into_raw(self) -> Map<String, Value> {
        let mut raw = Map::new();
        raw.insert("ContentItemId".into(), Value::String(self.content_item_id));
        raw.insert(
            "ContentItemVersionId".into(),
            Value::String(self.content_item_version_id),
        );
        raw.insert("ContentType".into(), Value::String(self.content_type));
        raw.insert("DisplayText".into(), Value::String(self.display_text));
        raw.insert("Latest".into(), Value::Bool(self.latest));
        raw.insert("Published".into(), Value::Bool(self.published));
        raw.insert("ModifiedUtc".into(), timestamp(self.modified_utc));
        raw.insert("PublishedUtc".into(), timestamp(self.published_utc));
        raw.insert("CreatedUtc".into(), timestamp(self.created_utc));
        raw.insert("Owner".into(), self.owner.map_or(Value::Null, Value::String));
        raw.insert("Author".into(), self.author.map_or(Value::Null, Value::String));
        raw.extend(self.content);
        raw
    }

    /// The part holding the item's own fields, if present.
    pub fn type_section(&self) -> Option<&Map<String, Value>> {
        self.content.get(&self.content_type).and_then(Value::as_object)
    }

    /// The field part, created (or replaced, if it is not an object) on demand.
    pub fn type_section_mut(&mut self) -> &mut Map<String, Value> {
        let entry = self
            .content
            .entry(self.content_type.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if !entry.is_object() {
            *entry = Value::Object(Map::new());
        }
        match entry {
            Value::Object(map) => map,
            _ => unreachable!("entry was just made an object"),
        }
    }

    /// Members of the item's bag, if it has one.
    pub fn bag_items(&self) -> Option<&Vec<Value>> {
        self.content
            .get(BAG_PART)
            .and_then(|bag| bag.get(CONTENT_ITEMS))
            .and_then(Value::as_array)
    }

    /// Replace the bag's members.
    pub fn set_bag_items(&mut self, items: Vec<Value>) {
        let mut bag = Map::new();
        bag.insert(CONTENT_ITEMS.into(), Value::Array(items));
        self.content.insert(BAG_PART.into(), Value::Object(bag));
    }

    /// Stamp a modification.
    pub fn touch(&mut self) {
        let now = Utc::now();
        self.modified_utc = Some(now);
        self.published_utc = Some(now);
    }
}

fn timestamp(value: Option<DateTime<Utc>>) -> Value {
    value.map_or(Value::Null, |t| Value::String(t.to_rfc3339()))
}

/// A user known to the identity store, used to enrich user-picker fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    pub user_id: String,
    pub user_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Free-form profile properties (`FirstName`, `LastName`, ...).
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
}
