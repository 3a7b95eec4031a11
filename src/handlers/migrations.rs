// handlers/migrations.rs - PATCH /migrations/user-default-color handler

use axum::{
    extract::{Query, State},
    response::Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ApiError;
use crate::handlers::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackfillQuery {
    /// Writes per batch for this run; falls back to the configured size
    pub batch_size: Option<usize>,
}

/// PATCH /migrations/user-default-color - give every uncoloured user a default colour
pub async fn user_default_color(
    State(state): State<AppState>,
    Query(query): Query<BackfillQuery>,
) -> Result<Json<Value>, ApiError> {
    let summary = state.backfill.run(query.batch_size).await?;

    Ok(Json(json!({
        "message": "User colors updated successfully!",
        "usersDetails": summary
    })))
}
