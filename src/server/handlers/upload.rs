use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::response::IntoResponse;
use axum::{Form, Json};
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;
use crate::extract::{pdf, text_preview};
use crate::rag::{FailedChunk, IngestReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UploadTextForm {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadUrlPayload {
    pub url: String,
    #[serde(default)]
    pub use_browser: bool,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub text_preview: String,
    pub chunk_ids: Vec<String>,
    pub failed_chunks: Vec<FailedChunk>,
}

impl UploadResponse {
    fn new(message: &str, text: &str, report: IngestReport) -> Self {
        Self {
            message: message.to_string(),
            filename: None,
            url: None,
            text_preview: text_preview(text),
            chunk_ids: report.chunk_ids,
            failed_chunks: report.failed,
        }
    }
}

fn source_metadata(source: &str, kind: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("source".to_string(), source.to_string()),
        ("kind".to_string(), kind.to_string()),
    ])
}

pub async fn upload_text(
    State(state): State<Arc<AppState>>,
    Form(form): Form<UploadTextForm>,
) -> Result<impl IntoResponse, ApiError> {
    if form.text.trim().is_empty() {
        return Err(ApiError::bad_request("text must not be empty"));
    }

    let report = state
        .engine
        .ingest(&form.text, source_metadata("text", "text"))
        .await?;

    Ok(Json(UploadResponse::new(
        "Knowledge uploaded successfully.",
        &form.text,
        report,
    )))
}

pub async fn upload_pdf(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::bad_request)? {
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(ApiError::bad_request)?;
        upload = Some((filename, bytes));
        break;
    }

    let Some((filename, bytes)) = upload else {
        return Err(ApiError::bad_request("missing multipart field 'file'"));
    };

    pdf::validate_upload(&filename, &bytes)?;
    let saved = pdf::save_upload(&state.paths.uploads_dir, &filename, &bytes).await?;
    tracing::info!("Processing PDF {}", saved.display());

    let text = tokio::task::spawn_blocking(move || pdf::extract_text(&bytes))
        .await
        .map_err(ApiError::internal)??;

    let report = state
        .engine
        .ingest(&text, source_metadata(&filename, "pdf"))
        .await?;

    let mut response = UploadResponse::new("PDF processed successfully.", &text, report);
    response.filename = Some(filename);
    Ok(Json(response))
}

pub async fn upload_url(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<UploadUrlPayload>,
) -> Result<impl IntoResponse, ApiError> {
    let text = state.web.extract(&payload.url, payload.use_browser).await?;

    let report = state
        .engine
        .ingest(&text, source_metadata(&payload.url, "url"))
        .await?;

    let mut response = UploadResponse::new("URL content processed successfully.", &text, report);
    response.url = Some(payload.url);
    Ok(Json(response))
}
