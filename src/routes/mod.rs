//! Route modules for the PDF Analyzer server

pub mod analyzer;
pub mod data;
pub mod files;
pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the full application router
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let analyze = post(analyzer::analyze_pdf)
        .layer(DefaultBodyLimit::max(state.config().server.max_upload_bytes));
    let list = get(data::list_data);

    Router::new()
        .route("/health", get(health::health_check))
        .route("/pdf-analyzer/", analyze.clone())
        .route("/pdf-analyzer", analyze)
        .route("/get-svg/:file_name", get(files::get_svg))
        .route("/data/", list.clone())
        .route("/data", list)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
