// src/auth.rs
//! Login verification and JWT bearer auth for the protected routes.

use crate::AppState;
use axum::{
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: usize,
}

/// Check credentials against the configured user.
pub fn authenticate(config: &crate::config::Config, username: &str, password: &str) -> bool {
    if username != config.admin_username {
        return false;
    }
    bcrypt::verify(password, &config.admin_password_hash).unwrap_or(false)
}

pub fn create_access_token(
    secret: &str,
    username: &str,
    expiry_minutes: i64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = Claims {
        sub: username.to_string(),
        exp: (Utc::now() + Duration::minutes(expiry_minutes)).timestamp() as usize,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

pub fn verify_token(secret: &str, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

fn unauthorized(message: &str) -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "success": false, "message": message })),
    )
}

/// Bearer-token middleware for the protected routes. Verified claims are
/// attached to the request extensions.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, impl IntoResponse> {
    let auth_header = match headers.get("Authorization").and_then(|h| h.to_str().ok()) {
        Some(header) => header,
        None => return Err(unauthorized("Missing Authorization header")),
    };

    let token = match auth_header.strip_prefix("Bearer ") {
        Some(token) => token,
        None => {
            return Err(unauthorized(
                "Invalid Authorization header format. Expected 'Bearer <token>'",
            ))
        }
    };

    let claims = match verify_token(&state.config.jwt_secret, token) {
        Ok(claims) => claims,
        Err(e) => {
            tracing::warn!("JWT verification failed: {}", e);
            return Err(unauthorized("Invalid or expired token"));
        }
    };

    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}
