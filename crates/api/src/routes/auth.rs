use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use content_rest_core::auth::{self as accounts, Registration};
use content_rest_core::{UserRecord, UserStore};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Registration and bearer-token login.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login).get(current_user))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest {
    username_or_email: String,
    password: String,
}

async fn register(
    State(state): State<AppState>,
    Json(registration): Json<Registration>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = accounts::register(state.store(), &registration).await?;
    Ok((StatusCode::CREATED, Json(user_json(&user))))
}

async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> ApiResult<Json<Value>> {
    let user =
        accounts::authenticate(state.store(), &request.username_or_email, &request.password)
            .await?;
    let token = state.tokens().issue(&user)?;
    tracing::info!(user_id = %user.user_id, "user logged in");
    Ok(Json(json!({
        "token": token,
        "tokenType": "Bearer",
        "expiresIn": state.config().jwt_ttl_secs,
        "user": user_json(&user),
    })))
}

async fn current_user(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Value>> {
    let claims = caller
        .claims()
        .ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;
    let user = state
        .store()
        .user_by_id(&claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("User no longer exists".to_string()))?;
    Ok(Json(user_json(&user)))
}

fn user_json(user: &UserRecord) -> Value {
    json!({
        "id": user.user_id,
        "username": user.user_name,
        "email": user.email,
        "phone": user.phone_number,
        "roles": user.roles,
    })
}
