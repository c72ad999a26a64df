//! PDF analysis endpoint

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde::Serialize;

use crate::analyzer::analyze_upload;
use crate::error::{AppError, Result};
use crate::state::AppState;

/// Message returned for anything that is not a `.pdf`
pub const INVALID_FILE_TYPE: &str = "Invalid file type. Only PDFs are accepted.";

/// Multipart field carrying the upload
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct ResponseStatus {
    pub code: u16,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResult {
    pub files: Vec<String>,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub status: ResponseStatus,
    pub result: AnalyzeResult,
}

impl AnalyzeResponse {
    fn ok(files: Vec<String>, text: String) -> Self {
        Self {
            status: ResponseStatus {
                code: 200,
                message: "OK".to_string(),
            },
            result: AnalyzeResult { files, text },
        }
    }
}

/// Only the extension is checked, case-sensitively
pub fn is_pdf_file_name(file_name: &str) -> bool {
    file_name.ends_with(".pdf")
}

/// POST /pdf-analyzer/
///
/// Accepts a multipart `file`, renders one SVG per page and returns their
/// paths with the document's text.
pub async fn analyze_pdf(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<AnalyzeResponse>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read upload: {}", e))
    })? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if !is_pdf_file_name(&file_name) {
            tracing::warn!(file_name = %file_name, "Rejected non-PDF upload");
            return Err(AppError::BadRequest(INVALID_FILE_TYPE.to_string()));
        }

        let data = field.bytes().await.map_err(|e| {
            tracing::error!("Failed to read file data: {}", e);
            AppError::BadRequest(format!("Failed to read file data: {}", e))
        })?;

        tracing::debug!(file_name = %file_name, bytes = data.len(), "Received PDF upload");

        let analysis = analyze_upload(&state, &file_name, &data).await?;

        return Ok(Json(AnalyzeResponse::ok(
            analysis.svg_files(),
            analysis.text(),
        )));
    }

    tracing::warn!("No file field found in multipart upload");
    Err(AppError::BadRequest(
        "No file provided. Use field name 'file'".to_string(),
    ))
}
