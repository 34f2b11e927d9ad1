use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;
use content_rest_core::auth::Claims;
use content_rest_core::permission::ADMINISTRATOR;

use crate::error::ApiError;
use crate::state::AppState;

/// The caller behind a request, taken from an optional bearer token.
///
/// A request without an `Authorization` header is anonymous and carries no
/// roles. A header with a bad or expired token is rejected with 401.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    claims: Option<Claims>,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn roles(&self) -> &[String] {
        self.claims.as_ref().map(|c| c.roles.as_slice()).unwrap_or(&[])
    }

    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// User name for the owner stamp on created items.
    pub fn name(&self) -> Option<&str> {
        self.claims.as_ref().map(|c| c.name.as_str())
    }

    pub fn is_admin(&self) -> bool {
        self.roles().iter().any(|role| role == ADMINISTRATOR)
    }
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header =
            match TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state).await {
                Ok(TypedHeader(Authorization(bearer))) => bearer,
                Err(rejection) if rejection.is_missing() => return Ok(Self::anonymous()),
                Err(rejection) => return Err(ApiError::Unauthorized(rejection.to_string())),
            };
        let claims = state.tokens().verify(header.token())?;
        Ok(Self {
            claims: Some(claims),
        })
    }
}
