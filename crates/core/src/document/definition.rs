use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use super::model::ContentItem;
use super::shape::{BAG_PART, CONTENT_ITEMS};

/// Id placed in sample reference fields. Never persisted.
const SAMPLE_ID: &str = "sample000000000000000000000";

/// Schema of a content type: its fields and, optionally, the types its bag
/// may contain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDefinition {
    pub name: String,
    #[serde(default)]
    pub fields: Vec<FieldDefinition>,
    /// Content types allowed in the bag, when the type has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bag: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDefinition {
    /// Stored (PascalCase) field name.
    pub name: String,
    pub kind: FieldKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKind {
    Text,
    Html,
    Numeric,
    Boolean,
    ContentPicker,
    UserPicker,
    Media,
    List,
}

impl FieldKind {
    /// A stored wrapper that flattens to a present, non-null value.
    pub fn sample_value(self) -> Value {
        match self {
            FieldKind::Text => json!({ "Text": "" }),
            FieldKind::Html => json!({ "Html": "" }),
            FieldKind::Numeric => json!({ "Value": 0 }),
            FieldKind::Boolean => json!({ "Value": false }),
            FieldKind::ContentPicker => json!({ "ContentItemIds": [SAMPLE_ID] }),
            FieldKind::UserPicker => json!({ "UserIds": [], "UserNames": [] }),
            FieldKind::Media => json!({ "Paths": [], "MediaTexts": [] }),
            FieldKind::List => json!({ "Values": [] }),
        }
    }
}

impl ContentDefinition {
    /// An in-memory item with every defined field populated, used to learn
    /// the flattened field names of a type with no stored documents.
    pub fn sample_item(&self) -> ContentItem {
        let mut item = ContentItem::new(&self.name);
        item.content_item_id = SAMPLE_ID.to_string();
        let section = item.type_section_mut();
        for field in &self.fields {
            section.insert(field.name.clone(), field.kind.sample_value());
        }

        if let Some(bag) = &self.bag {
            let member_type = bag.first().cloned().unwrap_or_else(|| self.name.clone());
            let mut member = Map::new();
            member.insert("ContentItemId".into(), Value::String(SAMPLE_ID.into()));
            member.insert("ContentType".into(), Value::String(member_type.clone()));
            member.insert(member_type, Value::Object(Map::new()));
            item.content.insert(
                BAG_PART.into(),
                json!({ CONTENT_ITEMS: [Value::Object(member)] }),
            );
        }
        item
    }
}
