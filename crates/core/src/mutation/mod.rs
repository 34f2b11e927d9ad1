//! Create, update and delete of content items from flat client bodies.
//!
//! Every write is validated against the type's field whitelist before
//! anything is stored; a rejected body changes nothing.

pub mod apply;
pub mod reverse;
pub mod types;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::document::validate::{validate_body, ValidationError};
use crate::document::ContentItem;
use crate::pipeline::valid_fields;
use crate::store::{Store, StoreError};

pub use apply::{apply_write, build_item};
pub use reverse::to_storage_shape;
pub use types::{DeleteResponse, WriteMode, WriteResponse};

/// Owner recorded for writes without an authenticated caller.
pub const ANONYMOUS_OWNER: &str = "anonymous";

#[derive(Debug, Error)]
pub enum WriteError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Content item not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
}

pub async fn create<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
    body: &Map<String, Value>,
    owner: Option<&str>,
) -> Result<ContentItem, WriteError> {
    if body.is_empty() {
        return Err(ValidationError::EmptyBody.into());
    }
    let valid = valid_fields(store, content_type).await?;
    validate_body(body, &valid)?;

    let write = to_storage_shape(body, WriteMode::Create);
    let item = build_item(content_type, write, owner.unwrap_or(ANONYMOUS_OWNER));
    store.insert(&item).await?;
    tracing::info!(content_type, id = %item.content_item_id, "content item created");
    Ok(item)
}

pub async fn update<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
    id: &str,
    body: &Map<String, Value>,
) -> Result<ContentItem, WriteError> {
    if body.is_empty() {
        return Err(ValidationError::EmptyBody.into());
    }
    let mut item = match store.get(id).await? {
        Some(item) if item.published && item.content_type == content_type => item,
        _ => return Err(WriteError::NotFound),
    };
    let valid = valid_fields(store, content_type).await?;
    validate_body(body, &valid)?;

    apply_write(&mut item, to_storage_shape(body, WriteMode::Update));
    item.touch();
    store.update(&item).await?;
    tracing::info!(content_type, id, "content item updated");
    Ok(item)
}

pub async fn delete<S: Store + ?Sized>(
    store: &S,
    content_type: &str,
    id: &str,
) -> Result<(), WriteError> {
    match store.get(id).await? {
        Some(item) if item.content_type == content_type => {}
        _ => return Err(WriteError::NotFound),
    }
    if !store.remove(id).await? {
        return Err(WriteError::NotFound);
    }
    tracing::info!(content_type, id, "content item deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{ContentDefinition, FieldDefinition, FieldKind};
    use crate::pipeline::{fetch_clean_content, fetch_clean_item};
    use crate::store::{DocumentStore, MemoryStore};
    use serde_json::json;

    fn body(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    async fn pet_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .save_definition(&ContentDefinition {
                name: "Pet".into(),
                fields: vec![
                    FieldDefinition { name: "Name".into(), kind: FieldKind::Text },
                    FieldDefinition { name: "Age".into(), kind: FieldKind::Numeric },
                    FieldDefinition { name: "Owner".into(), kind: FieldKind::ContentPicker },
                ],
                bag: None,
            })
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn create_then_read_back() {
        let store = pet_store().await;
        let item = create(&store, "Pet", &body(json!({"title": "Rex", "name": "Rex", "age": 4})), None)
            .await
            .unwrap();
        let clean = fetch_clean_item(&store, "Pet", &item.content_item_id, false)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(clean["title"], json!("Rex"));
        assert_eq!(clean["age"], json!(4.0));
        assert_eq!(item.owner.as_deref(), Some(ANONYMOUS_OWNER));
    }

    #[tokio::test]
    async fn unknown_field_rejects_whole_write() {
        let store = pet_store().await;
        let err = create(&store, "Pet", &body(json!({"name": "Rex", "nmae": "x"})), None)
            .await
            .unwrap_err();
        match err {
            WriteError::Validation(ValidationError::InvalidFields { invalid, valid }) => {
                assert_eq!(invalid, vec!["nmae"]);
                assert!(valid.contains(&"ownerId".to_string()));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(store.list_by_type("Pet").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn empty_body_is_rejected() {
        let store = pet_store().await;
        assert!(matches!(
            create(&store, "Pet", &Map::new(), None).await,
            Err(WriteError::Validation(ValidationError::EmptyBody))
        ));
    }

    #[tokio::test]
    async fn reference_round_trip_through_populate() {
        let store = pet_store().await;
        let owner = create(&store, "Pet", &body(json!({"title": "Mum", "name": "Mum"})), None)
            .await
            .unwrap();
        create(
            &store,
            "Pet",
            &body(json!({"title": "Pup", "ownerId": owner.content_item_id.clone()})),
            None,
        )
        .await
        .unwrap();

        let plain = fetch_clean_content(&store, "Pet", false).await.unwrap();
        assert_eq!(plain[1]["ownerId"], json!(owner.content_item_id));

        let populated = fetch_clean_content(&store, "Pet", true).await.unwrap();
        assert_eq!(populated[1]["owner"]["id"], json!(owner.content_item_id));
        assert_eq!(populated[1]["owner"]["title"], json!("Mum"));
    }

    #[tokio::test]
    async fn field_ending_in_lowercase_id_round_trips() {
        let store = MemoryStore::new();
        store
            .save_definition(&ContentDefinition {
                name: "Dish".into(),
                fields: vec![FieldDefinition { name: "Squid".into(), kind: FieldKind::Text }],
                bag: None,
            })
            .await
            .unwrap();
        create(&store, "Dish", &body(json!({"squid": "ink"})), None)
            .await
            .unwrap();

        let dishes = fetch_clean_content(&store, "Dish", true).await.unwrap();
        assert_eq!(dishes[0].get("squid"), Some(&json!("ink")));
        assert!(!dishes[0].contains_key("squId"));
    }

    #[tokio::test]
    async fn update_and_delete_check_type() {
        let store = pet_store().await;
        let item = create(&store, "Pet", &body(json!({"name": "Rex"})), Some("ann"))
            .await
            .unwrap();
        let id = item.content_item_id.as_str();

        assert!(matches!(
            update(&store, "Cat", id, &body(json!({"name": "x"}))).await,
            Err(WriteError::NotFound)
        ));
        let updated = update(&store, "Pet", id, &body(json!({"title": "Rex II", "age": 5})))
            .await
            .unwrap();
        assert_eq!(updated.display_text, "Rex II");
        assert_eq!(updated.content["Pet"]["Name"], json!({"Text": "Rex"}));

        assert!(matches!(delete(&store, "Cat", id).await, Err(WriteError::NotFound)));
        delete(&store, "Pet", id).await.unwrap();
        assert!(matches!(delete(&store, "Pet", id).await, Err(WriteError::NotFound)));
    }
}
