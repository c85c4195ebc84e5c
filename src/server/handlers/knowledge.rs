use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

pub async fn clear(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    state.engine.clear().await?;
    Ok(Json(json!({ "message": "Knowledge base cleared." })))
}
