//! Uploaded file serving

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::Response,
};

use crate::error::{AppError, Result};
use crate::state::AppState;

const SVG_CONTENT_TYPE: &str = "image/svg+xml";

/// GET /get-svg/:file_name
///
/// Serves a file from the upload staging directory, labelled as SVG.
pub async fn get_svg(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Result<Response> {
    let data = state
        .files()
        .read_upload(&file_name)
        .await?
        .ok_or_else(|| AppError::NotFound("File not found".to_string()))?;

    let length = data.len();

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, SVG_CONTENT_TYPE)
        .header(header::CONTENT_LENGTH, length)
        .header(header::CONTENT_DISPOSITION, content_disposition(&file_name))
        .body(Body::from(data))
        .map_err(|e| AppError::Internal(e.to_string()))
}

/// `attachment` disposition, RFC 5987 encoded when the name is not plain ASCII
fn content_disposition(file_name: &str) -> String {
    if file_name.is_ascii() && !file_name.contains(['"', '\\']) {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        format!(
            "attachment; filename*=utf-8''{}",
            urlencoding::encode(file_name)
        )
    }
}
