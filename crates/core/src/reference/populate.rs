use std::collections::HashMap;

use serde_json::{Map, Value};

use super::collect::{is_reference_key, strip_id_suffix};
use crate::document::shape::{CONTENT_ITEM_IDS, ITEMS};

/// Raw documents keyed by `ContentItemId`.
pub type IdIndex = HashMap<String, Map<String, Value>>;

/// Flattened documents keyed by `id`.
pub type CleanIndex = HashMap<String, Map<String, Value>>;

/// Resolve references in a raw tree, one hop deep.
///
/// `ContentItemIds` lists become `Items` lists of the documents found, in
/// list order. A string `<name>Id` whose target is found is replaced by
/// `<name>` holding the document. Ids missing from the index are left alone
/// or dropped from `Items`. Documents already embedded are never descended,
/// so populating twice with the same index changes nothing.
pub fn populate(tree: Map<String, Value>, index: &IdIndex) -> Map<String, Value> {
    let replace = |key: &str, value: &Value| match value {
        Value::Array(ids) if key == CONTENT_ITEM_IDS => {
            let found = ids
                .iter()
                .filter_map(Value::as_str)
                .filter_map(|id| index.get(id))
                .map(|doc| Value::Object(doc.clone()))
                .collect();
            Some((ITEMS.to_string(), Value::Array(found)))
        }
        Value::String(id) if is_reference_key(key) => index
            .get(id)
            .map(|doc| (strip_id_suffix(key).to_string(), Value::Object(doc.clone()))),
        _ => None,
    };
    let is_embedded = |map: &Map<String, Value>| embedded(map, "ContentItemId", index);
    rewrite(tree, &replace, &is_embedded)
}

/// Second pass over flattened output: a string `<name>Id` whose target is in
/// `index` becomes `<name>` holding the flattened document.
pub fn splice(tree: Map<String, Value>, index: &CleanIndex) -> Map<String, Value> {
    let replace = |key: &str, value: &Value| match value {
        Value::String(id) if is_reference_key(key) => index
            .get(id)
            .map(|doc| (strip_id_suffix(key).to_string(), Value::Object(doc.clone()))),
        _ => None,
    };
    let is_embedded = |map: &Map<String, Value>| embedded(map, "id", index);
    rewrite(tree, &replace, &is_embedded)
}

fn embedded(map: &Map<String, Value>, identity: &str, index: &HashMap<String, Map<String, Value>>) -> bool {
    map.get(identity)
        .and_then(Value::as_str)
        .is_some_and(|id| index.contains_key(id))
}

type Replace<'a> = dyn Fn(&str, &Value) -> Option<(String, Value)> + 'a;
type IsEmbedded<'a> = dyn Fn(&Map<String, Value>) -> bool + 'a;

// Rebuild the map entry by entry so replaced keys keep their position.
fn rewrite(tree: Map<String, Value>, replace: &Replace<'_>, is_embedded: &IsEmbedded<'_>) -> Map<String, Value> {
    let mut out = Map::with_capacity(tree.len());
    for (key, value) in tree {
        if let Some((new_key, new_value)) = replace(&key, &value) {
            out.insert(new_key, new_value);
            continue;
        }
        let value = descend(value, replace, is_embedded);
        out.insert(key, value);
    }
    out
}

fn descend(value: Value, replace: &Replace<'_>, is_embedded: &IsEmbedded<'_>) -> Value {
    match value {
        Value::Object(map) if is_embedded(&map) => Value::Object(map),
        Value::Object(map) => Value::Object(rewrite(map, replace, is_embedded)),
        Value::Array(list) => Value::Array(
            list.into_iter()
                .map(|v| descend(v, replace, is_embedded))
                .collect(),
        ),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn index(docs: Value) -> IdIndex {
        docs.as_array()
            .unwrap()
            .iter()
            .map(|d| (d["ContentItemId"].as_str().unwrap().to_string(), map(d.clone())))
            .collect()
    }

    #[test]
    fn resolves_pickers_and_id_keys() {
        let idx = index(json!([
            {"ContentItemId": "c1", "DisplayText": "Ann"},
            {"ContentItemId": "s1", "DisplayText": "Shop"}
        ]));
        let tree = map(json!({
            "Order": {
                "Customer": {"ContentItemIds": ["c1", "missing"]},
                "ShopId": "s1",
                "WarehouseId": "nowhere"
            }
        }));
        let out = populate(tree, &idx);
        assert_eq!(
            Value::Object(out),
            json!({
                "Order": {
                    "Customer": {"Items": [{"ContentItemId": "c1", "DisplayText": "Ann"}]},
                    "Shop": {"ContentItemId": "s1", "DisplayText": "Shop"},
                    "WarehouseId": "nowhere"
                }
            })
        );
    }

    #[test]
    fn replaced_keys_keep_their_position() {
        let idx = index(json!([{"ContentItemId": "s1"}]));
        let out = populate(map(json!({"A": 1, "ShopId": "s1", "Z": 2})), &idx);
        let keys: Vec<&String> = out.keys().collect();
        assert_eq!(keys, vec!["A", "Shop", "Z"]);
    }

    #[test]
    fn populate_is_idempotent_and_one_hop() {
        let idx = index(json!([
            {"ContentItemId": "c1", "Customer": {"Shop": {"ContentItemIds": ["s1"]}}},
            {"ContentItemId": "s1"}
        ]));
        let tree = map(json!({"Order": {"Customer": {"ContentItemIds": ["c1"]}}}));
        let once = populate(tree, &idx);
        // The embedded customer keeps its own unresolved reference.
        assert_eq!(
            once["Order"]["Customer"]["Items"][0]["Customer"]["Shop"],
            json!({"ContentItemIds": ["s1"]})
        );
        let twice = populate(once.clone(), &idx);
        assert_eq!(once, twice);
    }

    #[test]
    fn empty_index_leaves_ids() {
        let tree = map(json!({"Order": {"ShopId": "s1"}}));
        assert_eq!(populate(tree.clone(), &IdIndex::new()), tree);
    }

    #[test]
    fn splice_replaces_id_keys_with_clean_docs() {
        let mut idx = CleanIndex::new();
        idx.insert("s1".into(), map(json!({"id": "s1", "title": "Shop"})));
        let tree = map(json!({
            "id": "o1",
            "customer": {"id": "c1", "shopId": "s1"},
            "items": [{"id": "b1", "shopId": "s1"}]
        }));
        let out = splice(tree, &idx);
        assert_eq!(out["customer"]["shop"], json!({"id": "s1", "title": "Shop"}));
        assert_eq!(out["items"][0]["shop"]["title"], json!("Shop"));
        assert!(out["customer"].get("shopId").is_none());
    }
}
