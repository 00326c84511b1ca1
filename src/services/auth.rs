//! Bearer-token authentication (HS256 JWT).

use axum::http::{HeaderMap, header};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// `iss` claim on every token this service issues and accepts.
pub const TOKEN_ISSUER: &str = "video-store-access";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("authorization header missing")]
    MissingBearer,
    #[error("authorization header is not a bearer token")]
    MalformedHeader,
    #[error("token rejected: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token subject `{0}` is not a user id")]
    InvalidSubject(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

/// Issue a signed access token for `user_id`.
pub fn make_jwt(user_id: Uuid, secret: &str, expires_in: Duration) -> Result<String, AuthError> {
    let now = Utc::now().timestamp();
    let claims = Claims {
        iss: TOKEN_ISSUER.to_string(),
        sub: user_id.to_string(),
        iat: now,
        exp: now + expires_in.as_secs() as i64,
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?)
}

/// Validate signature, expiry and issuer, returning the user id in `sub`.
pub fn validate_jwt(token: &str, secret: &str) -> Result<Uuid, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[TOKEN_ISSUER]);

    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )?;

    Uuid::parse_str(&data.claims.sub).map_err(|_| AuthError::InvalidSubject(data.claims.sub))
}

/// Extract the token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingBearer)?
        .to_str()
        .map_err(|_| AuthError::MalformedHeader)?;

    match value.split_once(' ') {
        Some((scheme, token)) if scheme.eq_ignore_ascii_case("bearer") && !token.trim().is_empty() => {
            Ok(token.trim())
        }
        _ => Err(AuthError::MalformedHeader),
    }
}
