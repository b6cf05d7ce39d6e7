use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::static_files::static_handler;
use super::state::AppState;

// UI Routes - web interface
pub fn ui_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::ui::index_handler))
        .route("/static/{*path}", get(static_handler))
}

// API Routes - REST API for programmatic access
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Conversational entry point and raw SQL console
            .route("/ask", post(handlers::api::ask))
            .route("/query", post(handlers::api::execute_query))
            // Schema
            .route("/schema", get(handlers::api::get_schema))
            // Retrieval index management
            .route("/rag/rebuild", post(handlers::api::rag_rebuild))
            .route("/rag/stats", get(handlers::api::rag_stats))
            // Conversation history and named segments
            .route("/history", get(handlers::api::get_history))
            .route("/history", delete(handlers::api::clear_history))
            .route("/segments", get(handlers::api::list_segments))
            .route("/segments", post(handlers::api::save_segment))
            .route("/segments/{name}/load", post(handlers::api::load_segment))
            .route("/segments/{name}", put(handlers::api::rename_segment))
            .route("/segments/{name}", delete(handlers::api::delete_segment))
            // Data loading
            .route("/ingest", post(handlers::api::ingest_csv))
            // System status
            .route("/status", get(handlers::api::system_status)),
    )
}
