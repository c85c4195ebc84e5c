use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::rag::SourceRef;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatPayload {
    pub message: String,
    #[serde(default)]
    pub top_k: Option<usize>,
}

/// `reply` and `response` carry the same text; clients read either.
#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub reply: String,
    pub response: String,
    pub sources: Vec<SourceRef>,
}

pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ChatPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let resolution = state.engine.resolve(&payload.message, payload.top_k).await?;

    Ok(Json(ChatReply {
        response: resolution.reply.clone(),
        reply: resolution.reply,
        sources: resolution.sources,
    }))
}
