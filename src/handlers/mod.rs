// src/handlers/mod.rs

pub mod image;
pub mod login;
pub mod translate;
pub mod video;

use crate::auth::auth_middleware;
use crate::AppState;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::{Extension, Router};
use std::sync::Arc;

/// Full route table: public login, protected pipeline endpoints.
pub fn routes(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/image_generation", post(image::generate_image))
        .route("/video_generation", post(video::generate_video))
        .route("/video_translation", post(translate::translate_video))
        .layer(DefaultBodyLimit::max(100 * 1024 * 1024)) // uploads up to 100MB
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .route("/login", post(login::login))
        .merge(protected)
        .layer(Extension(state))
}
