use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
};
use std::sync::Arc;

use crate::web::state::AppState;
use crate::web::static_files::embedded_text;

pub async fn index_handler(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    match embedded_text("index.html") {
        Some(content) => Html(content).into_response(),
        None => (StatusCode::NOT_FOUND, "index.html missing from build").into_response(),
    }
}
