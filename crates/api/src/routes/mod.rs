pub mod auth;
pub mod content;
pub mod health;
pub mod sse;
pub mod system;
pub mod write;

use axum::http::Method;
use axum::Router;
use content_rest_core::permission::load_permissions;

use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;

/// Assemble the full router with all route groups.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(system::routes())
        .merge(sse::routes())
        .merge(content::routes())
        .merge(write::routes())
        .with_state(state)
}

/// Check the caller's roles against the current permission documents.
/// Runs before any content is read or written.
pub(crate) async fn authorize(
    state: &AppState,
    caller: &Caller,
    content_type: &str,
    method: &Method,
) -> ApiResult<()> {
    let permissions = load_permissions(state.store()).await?;
    permissions.authorize(caller.roles(), content_type, method.as_str())?;
    Ok(())
}
