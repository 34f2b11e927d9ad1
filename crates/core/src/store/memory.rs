use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{DocumentStore, StoreError, UserStore};
use crate::document::{ContentDefinition, ContentItem, UserRecord};

#[derive(Debug, Clone)]
struct Row {
    item: ContentItem,
    deleted: bool,
}

impl Row {
    fn live(&self) -> bool {
        !self.deleted && self.item.published
    }
}

/// Process-local store, used when no database is configured and in tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    items: RwLock<Vec<Row>>,
    definitions: RwLock<HashMap<String, ContentDefinition>>,
    users: RwLock<Vec<UserRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list_by_type(&self, content_type: &str) -> Result<Vec<ContentItem>, StoreError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|row| row.live() && row.item.content_type == content_type)
            .map(|row| row.item.clone())
            .collect())
    }

    async fn list_by_ids(&self, ids: &[String]) -> Result<Vec<ContentItem>, StoreError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|row| row.live() && ids.contains(&row.item.content_item_id))
            .map(|row| row.item.clone())
            .collect())
    }

    async fn get(&self, id: &str) -> Result<Option<ContentItem>, StoreError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .find(|row| !row.deleted && row.item.content_item_id == id)
            .map(|row| row.item.clone()))
    }

    async fn list_created_between(
        &self,
        content_type: &str,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>, StoreError> {
        let items = self.items.read().await;
        Ok(items
            .iter()
            .filter(|row| row.live() && row.item.content_type == content_type)
            .filter(|row| {
                row.item
                    .created_utc
                    .is_some_and(|created| created > after && created <= until)
            })
            .map(|row| row.item.clone())
            .collect())
    }

    async fn insert(&self, item: &ContentItem) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        if items.iter().any(|row| row.item.content_item_id == item.content_item_id) {
            return Err(StoreError::DuplicateItem(item.content_item_id.clone()));
        }
        items.push(Row {
            item: item.clone(),
            deleted: false,
        });
        Ok(())
    }

    async fn update(&self, item: &ContentItem) -> Result<(), StoreError> {
        let mut items = self.items.write().await;
        if let Some(row) = items
            .iter_mut()
            .find(|row| !row.deleted && row.item.content_item_id == item.content_item_id)
        {
            row.item = item.clone();
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let mut items = self.items.write().await;
        match items
            .iter_mut()
            .find(|row| !row.deleted && row.item.content_item_id == id)
        {
            Some(row) => {
                row.deleted = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn definition(&self, content_type: &str) -> Result<Option<ContentDefinition>, StoreError> {
        Ok(self.definitions.read().await.get(content_type).cloned())
    }

    async fn content_types(&self) -> Result<Vec<String>, StoreError> {
        let mut names: BTreeSet<String> = self.definitions.read().await.keys().cloned().collect();
        names.extend(
            self.items
                .read()
                .await
                .iter()
                .filter(|row| !row.deleted)
                .map(|row| row.item.content_type.clone()),
        );
        Ok(names.into_iter().collect())
    }

    async fn save_definition(&self, definition: &ContentDefinition) -> Result<(), StoreError> {
        self.definitions
            .write()
            .await
            .insert(definition.name.clone(), definition.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .filter(|u| ids.contains(&u.user_id))
            .cloned()
            .collect())
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users
            .iter()
            .find(|u| {
                u.user_name.eq_ignore_ascii_case(login)
                    || u.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(login))
            })
            .cloned())
    }

    async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let users = self.users.read().await;
        Ok(users.iter().find(|u| u.user_id == id).cloned())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        if users
            .iter()
            .any(|u| u.user_name.eq_ignore_ascii_case(&user.user_name))
        {
            return Err(StoreError::DuplicateUser(user.user_name.clone()));
        }
        users.push(user.clone());
        Ok(())
    }

    async fn user_roles(&self) -> Result<Vec<String>, StoreError> {
        let users = self.users.read().await;
        let roles: BTreeSet<String> = users.iter().flat_map(|u| u.roles.iter().cloned()).collect();
        Ok(roles.into_iter().collect())
    }
}
