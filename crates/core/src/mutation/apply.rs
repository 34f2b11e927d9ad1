use serde_json::Value;

use super::reverse::bag_member;
use super::types::{BagWrite, FieldWrite, StorageWrite};
use crate::document::ContentItem;

/// Title given to items created without one.
pub const UNTITLED: &str = "Untitled";

/// A new item of `content_type` built from `write`, owned by `owner`.
pub fn build_item(content_type: &str, write: StorageWrite, owner: &str) -> ContentItem {
    let mut item = ContentItem::new(content_type);
    item.owner = Some(owner.to_string());
    item.author = Some(owner.to_string());
    item.display_text = UNTITLED.to_string();
    apply_write(&mut item, write);
    item
}

/// Apply a storage-shaped write in place. Fields not named are untouched.
pub fn apply_write(item: &mut ContentItem, write: StorageWrite) {
    if let Some(title) = write.display_text {
        item.display_text = title;
    }

    let section = item.type_section_mut();
    for field in write.fields {
        match field {
            FieldWrite::Set { name, value } => {
                section.insert(name, value);
            }
            FieldWrite::Clear { name } => {
                section.shift_remove(&name);
            }
        }
    }

    match write.bag {
        Some(BagWrite::Replace(members)) => {
            if !members.is_empty() || item.bag_items().is_some() {
                item.set_bag_items(members);
            }
        }
        Some(BagWrite::Push(elements)) => {
            let mut members = item.bag_items().cloned().unwrap_or_default();
            // Elements without a type inherit the bag's existing member type.
            let inferred = members
                .iter()
                .find_map(|m| m.get("ContentType").and_then(Value::as_str))
                .map(String::from);
            members.extend(
                elements
                    .iter()
                    .filter_map(|element| bag_member(element, inferred.as_deref())),
            );
            item.set_bag_items(members);
        }
        None => {}
    }
}
