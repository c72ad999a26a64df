//! Stored extraction data

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use crate::db::{PageRecord, PageRecordRepository};
use crate::error::Result;
use crate::state::AppState;

/// Optional filter
#[derive(Debug, Deserialize)]
pub struct DataQuery {
    pub file_name: Option<String>,
}

/// GET /data/
///
/// Every stored row, or only those for `?file_name=`.
pub async fn list_data(
    State(state): State<AppState>,
    Query(query): Query<DataQuery>,
) -> Result<Json<Vec<PageRecord>>> {
    let repo = PageRecordRepository::new(state.db());
    let records = match query.file_name.as_deref() {
        Some(file_name) => repo.list_for_file(file_name).await?,
        None => repo.list().await?,
    };
    Ok(Json(records))
}
