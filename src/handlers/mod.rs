// handlers/mod.rs - HTTP surface of the users service
//
// Only the health probe and the migration trigger live here; the user CRUD
// routes are served elsewhere.

pub mod health;
pub mod migrations;

use std::sync::Arc;

use axum::{
    routing::{get, patch},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::error::ApiError;
use crate::migrations::ColorBackfill;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub backfill: Arc<ColorBackfill>,
}

impl AppState {
    pub fn new(backfill: ColorBackfill) -> Self {
        Self {
            backfill: Arc::new(backfill),
        }
    }
}

pub fn router(state: AppState, request_logging: bool) -> Router {
    let router = Router::new()
        .route("/", get(health::root))
        .route("/health", get(health::health))
        .route(
            "/migrations/user-default-color",
            patch(migrations::user_default_color),
        )
        .fallback(not_found)
        .layer(CorsLayer::permissive())
        .with_state(state);

    if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

async fn not_found() -> ApiError {
    ApiError::not_found("Route not found")
}
