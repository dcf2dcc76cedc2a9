// src/handlers/login.rs

use crate::auth::{authenticate, create_access_token};
use crate::AppState;
use axum::{
    extract::Extension,
    http::StatusCode,
    response::Json,
    Form,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Form(form): Form<LoginRequest>,
) -> Result<Json<Token>, (StatusCode, Json<serde_json::Value>)> {
    if !authenticate(&state.config, &form.username, &form.password) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(json!({ "success": false, "message": "Incorrect username or password" })),
        ));
    }

    let access_token = create_access_token(
        &state.config.jwt_secret,
        &form.username,
        state.config.token_expiry_minutes,
    )
    .map_err(|e| {
        tracing::error!("Failed to issue token: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "success": false, "message": "Failed to issue token" })),
        )
    })?;

    Ok(Json(Token {
        access_token,
        token_type: "bearer".to_string(),
    }))
}
