use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{Method, StatusCode},
    routing::{post, put},
    Json, Router,
};
use content_rest_core::document::ValidationError;
use content_rest_core::mutation::{self, DeleteResponse, WriteResponse};
use serde_json::{Map, Value};

use super::authorize;
use crate::auth::Caller;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Create, update and delete routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/{content_type}", post(create))
        .route("/api/{content_type}/{id}", put(update).delete(remove))
}

async fn create(
    State(state): State<AppState>,
    caller: Caller,
    Path(content_type): Path<String>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<WriteResponse>)> {
    authorize(&state, &caller, &content_type, &Method::POST).await?;
    let body = parse_body(&body)?;
    let item = mutation::create(state.store(), &content_type, &body, caller.name()).await?;
    Ok((
        StatusCode::CREATED,
        Json(WriteResponse {
            id: item.content_item_id,
            title: item.display_text,
        }),
    ))
}

async fn update(
    State(state): State<AppState>,
    caller: Caller,
    Path((content_type, id)): Path<(String, String)>,
    body: Bytes,
) -> ApiResult<Json<WriteResponse>> {
    authorize(&state, &caller, &content_type, &Method::PUT).await?;
    let body = parse_body(&body)?;
    let item = mutation::update(state.store(), &content_type, &id, &body).await?;
    Ok(Json(WriteResponse {
        id: item.content_item_id,
        title: item.display_text,
    }))
}

async fn remove(
    State(state): State<AppState>,
    caller: Caller,
    Path((content_type, id)): Path<(String, String)>,
) -> ApiResult<Json<DeleteResponse>> {
    authorize(&state, &caller, &content_type, &Method::DELETE).await?;
    mutation::delete(state.store(), &content_type, &id).await?;
    Ok(Json(DeleteResponse { success: true, id }))
}

/// A write body must be a JSON object. No body at all counts as empty.
fn parse_body(bytes: &[u8]) -> ApiResult<Map<String, Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(ValidationError::EmptyBody.into());
    }
    match serde_json::from_slice(bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(ApiError::BadRequest(
            "Request body must be a JSON object".to_string(),
        )),
        Err(err) => Err(ApiError::BadRequest(format!("Malformed JSON body: {err}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn body_parsing() {
        assert!(matches!(parse_body(b""), Err(ApiError::BadRequest(m)) if m == "Request body is empty"));
        assert!(matches!(parse_body(b"  \n"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_body(b"[1]"), Err(ApiError::BadRequest(_))));
        assert!(matches!(parse_body(b"{\"name\""), Err(ApiError::BadRequest(_))));
        assert_eq!(parse_body(b"{\"name\":\"Rex\"}").unwrap()["name"], "Rex");
    }
}
