use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::types::Json;
use sqlx::{PgPool, Row};

use super::{DocumentStore, StoreError, UserStore};
use crate::document::{ContentDefinition, ContentItem, UserRecord};

/// Postgres-backed store. Documents are kept whole in a `jsonb` column with
/// the columns needed for filtering alongside.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

const LIVE_ITEMS: &str = "SELECT document FROM content_items WHERE published AND NOT deleted";

fn item_from_row(row: &PgRow) -> Result<ContentItem, StoreError> {
    let Json(document): Json<Value> = row.try_get("document")?;
    Ok(ContentItem::from_raw(document)?)
}

fn items_from_rows(rows: &[PgRow]) -> Result<Vec<ContentItem>, StoreError> {
    rows.iter().map(item_from_row).collect()
}

fn user_from_row(row: &PgRow) -> Result<UserRecord, StoreError> {
    let Json(properties): Json<Value> = row.try_get("properties")?;
    Ok(UserRecord {
        user_id: row.try_get("user_id")?,
        user_name: row.try_get("user_name")?,
        email: row.try_get("email")?,
        phone_number: row.try_get("phone_number")?,
        properties: match properties {
            Value::Object(map) => map,
            _ => Default::default(),
        },
        roles: row.try_get("roles")?,
        password_hash: row.try_get("password_hash")?,
    })
}

const USER_COLUMNS: &str =
    "SELECT user_id, user_name, email, phone_number, properties, roles, password_hash FROM users";

#[async_trait]
impl DocumentStore for PgStore {
    async fn list_by_type(&self, content_type: &str) -> Result<Vec<ContentItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "{LIVE_ITEMS} AND content_type = $1 ORDER BY created_utc, seq"
        ))
        .bind(content_type)
        .fetch_all(&self.pool)
        .await?;
        items_from_rows(&rows)
    }

    async fn list_by_ids(&self, ids: &[String]) -> Result<Vec<ContentItem>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "{LIVE_ITEMS} AND content_item_id = ANY($1) ORDER BY created_utc, seq"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        items_from_rows(&rows)
    }

    async fn get(&self, id: &str) -> Result<Option<ContentItem>, StoreError> {
        let row = sqlx::query(
            "SELECT document FROM content_items WHERE content_item_id = $1 AND NOT deleted",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_created_between(
        &self,
        content_type: &str,
        after: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<ContentItem>, StoreError> {
        let rows = sqlx::query(&format!(
            "{LIVE_ITEMS} AND content_type = $1 AND created_utc > $2 AND created_utc <= $3 \
             ORDER BY created_utc, seq"
        ))
        .bind(content_type)
        .bind(after)
        .bind(until)
        .fetch_all(&self.pool)
        .await?;
        items_from_rows(&rows)
    }

    async fn insert(&self, item: &ContentItem) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO content_items
                (content_item_id, content_type, published, created_utc, modified_utc, document)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (content_item_id) DO NOTHING
            "#,
        )
        .bind(&item.content_item_id)
        .bind(&item.content_type)
        .bind(item.published)
        .bind(item.created_utc.unwrap_or_else(Utc::now))
        .bind(item.modified_utc)
        .bind(Json(item))
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateItem(item.content_item_id.clone()));
        }
        Ok(())
    }

    async fn update(&self, item: &ContentItem) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE content_items
            SET published = $2, modified_utc = $3, document = $4
            WHERE content_item_id = $1 AND NOT deleted
            "#,
        )
        .bind(&item.content_item_id)
        .bind(item.published)
        .bind(item.modified_utc)
        .bind(Json(item))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "UPDATE content_items SET deleted = TRUE, modified_utc = now() \
             WHERE content_item_id = $1 AND NOT deleted",
        )
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn definition(&self, content_type: &str) -> Result<Option<ContentDefinition>, StoreError> {
        let row = sqlx::query("SELECT definition FROM content_definitions WHERE name = $1")
            .bind(content_type)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let Json(definition): Json<ContentDefinition> = row.try_get("definition")?;
                Ok(Some(definition))
            }
            None => Ok(None),
        }
    }

    async fn content_types(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query(
            "SELECT name FROM content_definitions \
             UNION SELECT content_type FROM content_items WHERE NOT deleted \
             ORDER BY 1",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>(0).map_err(StoreError::from))
            .collect()
    }

    async fn save_definition(&self, definition: &ContentDefinition) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO content_definitions (name, definition) VALUES ($1, $2)
            ON CONFLICT (name) DO UPDATE SET definition = EXCLUDED.definition
            "#,
        )
        .bind(&definition.name)
        .bind(Json(definition))
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn users_by_ids(&self, ids: &[String]) -> Result<Vec<UserRecord>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!("{USER_COLUMNS} WHERE user_id = ANY($1)"))
            .bind(ids)
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn find_user_by_login(&self, login: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "{USER_COLUMNS} WHERE lower(user_name) = lower($1) OR lower(email) = lower($1) LIMIT 1"
        ))
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("{USER_COLUMNS} WHERE user_id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (user_id, user_name, email, phone_number, properties, roles, password_hash)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT DO NOTHING
            "#,
        )
        .bind(&user.user_id)
        .bind(&user.user_name)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(Json(&user.properties))
        .bind(&user.roles)
        .bind(&user.password_hash)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::DuplicateUser(user.user_name.clone()));
        }
        Ok(())
    }

    async fn user_roles(&self) -> Result<Vec<String>, StoreError> {
        let rows = sqlx::query("SELECT DISTINCT unnest(roles) AS role FROM users ORDER BY role")
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| row.try_get::<String, _>("role").map_err(StoreError::from))
            .collect()
    }
}
