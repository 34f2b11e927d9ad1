use axum::{
    extract::{Path, Query, State},
    http::{Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use content_rest_core::pipeline::{fetch_clean_content, fetch_clean_item, fetch_raw_content};
use content_rest_core::{ContentItem, DocumentStore};
use query::{QueryParams, Record};
use serde_json::Value;

use super::authorize;
use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;

/// Read routes: flattened, populated and storage-shape views.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/{content_type}", get(list))
        .route("/api/{content_type}/{id}", get(item))
        .route("/api/expand/{content_type}", get(list_expanded))
        .route("/api/expand/{content_type}/{id}", get(item_expanded))
        .route("/api/raw/{content_type}", get(list_raw))
        .route("/api/raw/{content_type}/{id}", get(item_raw))
}

async fn list(
    State(state): State<AppState>,
    caller: Caller,
    Path(content_type): Path<String>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<Vec<Record>>> {
    authorize(&state, &caller, &content_type, &Method::GET).await?;
    let items = fetch_clean_content(state.store(), &content_type, false).await?;
    Ok(Json(query::apply(&params, items)))
}

async fn list_expanded(
    State(state): State<AppState>,
    caller: Caller,
    Path(content_type): Path<String>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<Vec<Record>>> {
    authorize(&state, &caller, &content_type, &Method::GET).await?;
    let items = fetch_clean_content(state.store(), &content_type, true).await?;
    Ok(Json(query::apply(&params, items)))
}

async fn list_raw(
    State(state): State<AppState>,
    caller: Caller,
    Path(content_type): Path<String>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Json<Vec<Record>>> {
    authorize(&state, &caller, &content_type, &Method::GET).await?;
    let items = fetch_raw_content(state.store(), &content_type).await?;
    Ok(Json(query::apply(&params, items)))
}

async fn item(
    State(state): State<AppState>,
    caller: Caller,
    Path((content_type, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    authorize(&state, &caller, &content_type, &Method::GET).await?;
    let found = fetch_clean_item(state.store(), &content_type, &id, false).await?;
    Ok(found_or_null(found))
}

async fn item_expanded(
    State(state): State<AppState>,
    caller: Caller,
    Path((content_type, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    authorize(&state, &caller, &content_type, &Method::GET).await?;
    let found = fetch_clean_item(state.store(), &content_type, &id, true).await?;
    Ok(found_or_null(found))
}

async fn item_raw(
    State(state): State<AppState>,
    caller: Caller,
    Path((content_type, id)): Path<(String, String)>,
) -> ApiResult<Response> {
    authorize(&state, &caller, &content_type, &Method::GET).await?;
    let found = state
        .store()
        .get(&id)
        .await?
        .filter(|item| item.published && item.content_type == content_type)
        .map(ContentItem::into_raw);
    Ok(found_or_null(found))
}

/// Single-item misses answer 404 with a bare `null` body.
fn found_or_null(found: Option<Record>) -> Response {
    match found {
        Some(item) => Json(item).into_response(),
        None => (StatusCode::NOT_FOUND, Json(Value::Null)).into_response(),
    }
}
