use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub corpus_size: usize,
    pub embedding_model: String,
    pub generation_model: String,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let corpus_size = state.engine.corpus_size().await?;
    Ok(Json(StatusResponse {
        corpus_size,
        embedding_model: state.engine.embedding_model().to_string(),
        generation_model: state.engine.generation_model().to_string(),
    }))
}
