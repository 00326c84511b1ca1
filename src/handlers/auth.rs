//! `AuthUser` extractor: resolves the bearer token into a user id.

use crate::{
    errors::AppError,
    services::auth::{bearer_token, validate_jwt},
    state::AppState,
};
use axum::{extract::FromRequestParts, http::request::Parts};
use uuid::Uuid;

/// Authenticated caller.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(&parts.headers)?;
        let user_id = validate_jwt(token, &state.jwt_secret)?;
        Ok(AuthUser { user_id })
    }
}
