//! Read pipeline: load, resolve references, flatten.

use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::clean::{clean_item, UserIndex};
use crate::document::{ContentItem, ValidFields};
use crate::reference::{
    collect_content_item_ids, collect_user_ids, populate, splice, CleanIndex, IdIndex,
};
use crate::store::{Store, StoreError};

/// Flattened published items of `content_type`, optionally with references
/// resolved.
pub async fn fetch_clean_content<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
    populate_refs: bool,
) -> Result<Vec<Map<String, Value>>, StoreError> {
    let items = store.list_by_type(content_type).await?;
    clean_items(store, content_type, items, populate_refs).await
}

/// Published items of `content_type` in storage shape.
pub async fn fetch_raw_content<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
) -> Result<Vec<Map<String, Value>>, StoreError> {
    let items = store.list_by_type(content_type).await?;
    Ok(items.into_iter().map(ContentItem::into_raw).collect())
}

/// One flattened item, or `None` when it is missing, unpublished or of
/// another type.
pub async fn fetch_clean_item<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
    id: &str,
    populate_refs: bool,
) -> Result<Option<Map<String, Value>>, StoreError> {
    let item = match store.get(id).await? {
        Some(item) if item.published && item.content_type == content_type => item,
        _ => return Ok(None),
    };
    let mut cleaned = clean_items(store, content_type, vec![item], populate_refs).await?;
    Ok(cleaned.pop())
}

/// Flatten already-loaded items.
///
/// Without population this is a pure per-item flatten. With it, references
/// are resolved on the raw trees first, users are looked up for enrichment,
/// and a second pass resolves `<name>Id` keys that only surface once the
/// embedded documents are flattened.
pub async fn clean_items<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
    items: Vec<ContentItem>,
    populate_refs: bool,
) -> Result<Vec<Map<String, Value>>, StoreError> {
    let raw: Vec<Map<String, Value>> = items.into_iter().map(ContentItem::into_raw).collect();
    if !populate_refs {
        return Ok(raw
            .iter()
            .map(|doc| clean_item(doc, content_type, None))
            .collect());
    }

    let mut ids = BTreeSet::new();
    for doc in &raw {
        collect_content_item_ids(doc, &mut ids);
    }
    let mut fetched = IdIndex::new();
    fetch_into(store, &ids, &mut fetched).await?;
    let raw: Vec<Map<String, Value>> = raw
        .into_iter()
        .map(|doc| populate(doc, &fetched))
        .collect();

    let mut users = UserIndex::new();
    fetch_users(store, raw.iter(), &mut users).await?;
    let cleaned: Vec<Map<String, Value>> = raw
        .iter()
        .map(|doc| clean_item(doc, content_type, Some(&users)))
        .collect();

    let mut late = BTreeSet::new();
    for doc in &cleaned {
        collect_content_item_ids(doc, &mut late);
    }
    if late.is_empty() {
        return Ok(cleaned);
    }
    let missing: BTreeSet<String> = late
        .iter()
        .filter(|id| !fetched.contains_key(*id))
        .cloned()
        .collect();
    fetch_into(store, &missing, &mut fetched).await?;

    let targets: Vec<&Map<String, Value>> = late.iter().filter_map(|id| fetched.get(id)).collect();
    fetch_users(store, targets.iter().copied(), &mut users).await?;
    let index: CleanIndex = targets
        .into_iter()
        .filter_map(|doc| {
            let id = doc.get("ContentItemId")?.as_str()?.to_string();
            let doc_type = doc.get("ContentType").and_then(Value::as_str).unwrap_or("");
            Some((id, clean_item(doc, doc_type, Some(&users))))
        })
        .collect();

    Ok(cleaned.into_iter().map(|doc| splice(doc, &index)).collect())
}

async fn fetch_into<S: Store + ?Sized>(
    store: &S,
    ids: &BTreeSet<String>,
    index: &mut IdIndex,
) -> Result<(), StoreError> {
    if ids.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = ids.iter().cloned().collect();
    for item in store.list_by_ids(&ids).await? {
        index.insert(item.content_item_id.clone(), item.into_raw());
    }
    Ok(())
}

async fn fetch_users<'a, S: Store + ?Sized>(
    store: &S,
    docs: impl Iterator<Item = &'a Map<String, Value>>,
    users: &mut UserIndex,
) -> Result<(), StoreError> {
    let mut ids = BTreeSet::new();
    for doc in docs {
        collect_user_ids(doc, &mut ids);
    }
    ids.retain(|id| !users.contains_key(id));
    if ids.is_empty() {
        return Ok(());
    }
    let ids: Vec<String> = ids.into_iter().collect();
    for user in store.users_by_ids(&ids).await? {
        users.insert(user.user_id.clone(), user);
    }
    Ok(())
}

/// Field names a write to `content_type` may carry: the keys of the first
/// stored item, flattened, joined with those of an in-memory sample built
/// from the type's definition. The sample is never stored.
pub async fn valid_fields<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
) -> Result<ValidFields, StoreError> {
    let existing = store
        .list_by_type(content_type)
        .await?
        .into_iter()
        .next()
        .map(|item| clean_item(&item.into_raw(), content_type, None));
    let sample = store
        .definition(content_type)
        .await?
        .map(|definition| clean_item(&definition.sample_item().into_raw(), content_type, None));
    Ok(ValidFields::from_records(existing.iter().chain(sample.iter())))
}
