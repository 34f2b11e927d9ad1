//! Bearer tokens and password hashing for the identity source.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::document::{new_content_item_id, UserRecord};
use crate::store::{Store, StoreError};

/// Role given to self-registered users.
pub const CUSTOMER: &str = "Customer";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid token: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),
    #[error("Password hashing failed: {0}")]
    Hash(String),
    #[error("Username and password are required")]
    MissingCredentials,
    #[error("Username {0} is already taken")]
    UsernameTaken(String),
    #[error("Invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub name: String,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and verifies HS256 tokens.
#[derive(Clone)]
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_secs: i64,
}

impl std::fmt::Debug for TokenKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenKeys")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_secs,
        }
    }

    pub fn issue(&self, user: &UserRecord) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user.user_id.clone(),
            name: user.user_name.clone(),
            roles: user.roles.clone(),
            iat: now,
            exp: now + self.ttl_secs,
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AuthError> {
        let data = decode::<Claims>(token, &self.decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|e| AuthError::Hash(e.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    PasswordHash::new(hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

/// Create a user with the given roles.
pub async fn create_user<S: Store + ?Sized>(
    store: &S,
    registration: &Registration,
    roles: Vec<String>,
) -> Result<UserRecord, AuthError> {
    let username = registration.username.trim();
    if username.is_empty() || registration.password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    if store.find_user_by_login(username).await?.is_some() {
        return Err(AuthError::UsernameTaken(username.to_string()));
    }

    let mut properties = Map::new();
    if let Some(first) = &registration.first_name {
        properties.insert("FirstName".into(), Value::String(first.clone()));
    }
    if let Some(last) = &registration.last_name {
        properties.insert("LastName".into(), Value::String(last.clone()));
    }
    let user = UserRecord {
        user_id: new_content_item_id(),
        user_name: username.to_string(),
        email: registration.email.clone().filter(|e| !e.is_empty()),
        phone_number: registration.phone.clone().filter(|p| !p.is_empty()),
        properties,
        roles,
        password_hash: hash_password(&registration.password)?,
    };
    store.insert_user(&user).await.map_err(|err| match err {
        StoreError::DuplicateUser(name) => AuthError::UsernameTaken(name),
        other => AuthError::Store(other),
    })?;
    tracing::info!(user_id = %user.user_id, roles = ?user.roles, "user created");
    Ok(user)
}

/// Self-registration: every new user is a customer.
pub async fn register<S: Store + ?Sized>(
    store: &S,
    registration: &Registration,
) -> Result<UserRecord, AuthError> {
    create_user(store, registration, vec![CUSTOMER.to_string()]).await
}

/// Check credentials given a user name or an email.
pub async fn authenticate<S: Store + ?Sized>(
    store: &S,
    login: &str,
    password: &str,
) -> Result<UserRecord, AuthError> {
    let user = store
        .find_user_by_login(login.trim())
        .await?
        .ok_or(AuthError::InvalidCredentials)?;
    if verify_password(password, &user.password_hash) {
        Ok(user)
    } else {
        Err(AuthError::InvalidCredentials)
    }
}
