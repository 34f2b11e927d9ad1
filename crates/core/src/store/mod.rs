//! Storage ports for content items, type definitions and users.

pub mod memory;
pub mod postgres;
pub mod seed;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::document::{ContentDefinition, ContentItem, UserRecord};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Stored document is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Content item {0} already exists")]
    DuplicateItem(String),
    #[error("User {0} already exists")]
    DuplicateUser(String),
}

/// Content items and content type definitions.
///
/// Listing operations only see published, non-deleted items, in creation
/// order.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list_by_type(&self, content_type: &str) -> Result<Vec<ContentItem>, StoreError>;

    async fn list_by_ids(&self, ids: &[String]) -> Result<Vec<ContentItem>, StoreError>;

    async fn get(&self, id: &str) -> Result<Option<ContentItem>, StoreError>;

    /// Items of `content_type` created in `(after, until]`.
    async fn list_created_between(
        &self,
        content_type: &str,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>, StoreError>;

    async fn insert(&self, item: &ContentItem) -> Result<(), StoreError>;

    async fn update(&self, item: &ContentItem) -> Result<(), StoreError>;

    /// Soft delete. Returns whether a live item was removed.
    async fn remove(&self, id: &str) -> Result<bool, StoreError>;

    async fn definition(&self, content_type: &str) -> Result<Option<ContentDefinition>, StoreError>;

    /// Every known content type name, sorted.
    async fn content_types(&self) -> Result<Vec<String>, StoreError>;

    async fn save_definition(&self, definition: &ContentDefinition) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRecord>, StoreError>;

    /// Look a user up by user name or email, ignoring case.
    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError>;

    /// Every role held by at least one user, sorted.
    async fn user_roles(&self) -> Result<Vec<String>, StoreError>;
}

/// A backend serving both documents and users.
pub trait Store: DocumentStore + UserStore {}

impl<T: DocumentStore + UserStore + ?Sized> Store for T {}
