use std::collections::BTreeSet;

use axum::{extract::State, http::Method, routing::get, Json, Router};
use content_rest_core::permission::ANONYMOUS;
use content_rest_core::{DocumentStore, UserStore};

use super::authorize;
use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;

/// Permission checks for these routes use this pseudo content type.
const SYSTEM: &str = "system";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/system/content-types", get(content_types))
        .route("/api/system/roles", get(roles))
}

async fn content_types(
    State(state): State<AppState>,
    caller: Caller,
) -> ApiResult<Json<Vec<String>>> {
    authorize_system(&state, &caller).await?;
    Ok(Json(state.store().content_types().await?))
}

async fn roles(State(state): State<AppState>, caller: Caller) -> ApiResult<Json<Vec<String>>> {
    authorize_system(&state, &caller).await?;
    let mut roles: BTreeSet<String> = state.store().user_roles().await?.into_iter().collect();
    roles.insert(ANONYMOUS.to_string());
    Ok(Json(roles.into_iter().collect()))
}

async fn authorize_system(state: &AppState, caller: &Caller) -> ApiResult<()> {
    if caller.is_admin() {
        return Ok(());
    }
    authorize(state, caller, SYSTEM, &Method::GET).await
}
