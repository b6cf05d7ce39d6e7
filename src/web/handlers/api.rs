use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

use crate::agents::orchestrator::AskResponse;
use crate::db::DbError;
use crate::session::{now_timestamp, ChatMessage, ChatStore};
use crate::web::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub debug: bool,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteQueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize)]
pub struct QueryMetadata {
    pub columns: Vec<String>,
    pub row_count: usize,
    pub execution_time_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct RebuildRequest {
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize)]
pub struct SaveSegmentRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct RenameSegmentRequest {
    pub new_name: String,
}

#[derive(Debug, Deserialize)]
pub struct IngestRequest {
    pub table: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime_seconds: i64,
    pub database_backend: String,
    pub llm_backend: String,
    pub llm_model: String,
    pub indexed_examples: usize,
    pub message_count: usize,
}

fn io_error(e: std::io::Error) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

/// The conversational entry point. Both sides of the exchange are appended
/// to the persistent history.
pub async fn ask(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AskRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let question = payload.question.trim().to_string();
    if question.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "question is empty".to_string()));
    }

    info!("Handling question: {}", question);
    let response = state.orchestrator.handle(&question, payload.debug).await;

    // The answer was already computed; a history write failure is logged,
    // not turned into an error response.
    persist_exchange(&state.chat_store, question, &response);

    Ok(Json(response))
}

fn persist_exchange(store: &ChatStore, question: String, response: &AskResponse) {
    let user = ChatMessage {
        role: "user".to_string(),
        content: question,
        sql: None,
        data: None,
        chart: None,
        chart_spec: None,
        timestamp: now_timestamp(),
    };
    let assistant = ChatMessage {
        role: "assistant".to_string(),
        content: response
            .answer
            .clone()
            .or_else(|| response.error.clone())
            .unwrap_or_default(),
        sql: response.sql.clone(),
        data: response.table.as_ref().map(|t| store.snapshot_table(t)),
        chart: response.chart.clone(),
        chart_spec: response.chart_spec.clone(),
        timestamp: now_timestamp(),
    };
    for message in [user, assistant] {
        if let Err(e) = store.append(message) {
            error!("Failed to persist chat message: {}", e);
        }
    }
}

/// Raw SQL console. Same read-only guard as generated queries.
pub async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ExecuteQueryRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let start_time = Instant::now();
    info!("Executing SQL query: {}", payload.query);

    let table = state.executor.execute(&payload.query).await.map_err(|e| {
        let status = match &e {
            DbError::Rejected(_) => StatusCode::FORBIDDEN,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, e.to_string())
    })?;

    let metadata = QueryMetadata {
        columns: table.columns.clone(),
        row_count: table.row_count(),
        execution_time_ms: start_time.elapsed().as_millis() as u64,
    };

    Ok(Json(serde_json::json!({
        "metadata": metadata,
        "rows": table.rows,
    })))
}

pub async fn get_schema(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.schema.as_ref().clone())
}

pub async fn rag_rebuild(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RebuildRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let examples_path = PathBuf::from(&state.config.rag.examples_path);
    let count = state
        .index
        .build(&examples_path, state.embedder.as_ref(), payload.force)
        .await
        .map_err(|e| {
            error!("Index rebuild failed: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    Ok(Json(serde_json::json!({ "indexed": count })))
}

pub async fn rag_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(serde_json::json!({
        "indexed_examples": state.index.len().await,
        "examples_path": state.config.rag.examples_path,
        "index_path": state.config.rag.index_path,
        "top_k": state.config.rag.top_k,
        "similarity_threshold": state.config.rag.similarity_threshold,
    }))
}

pub async fn get_history(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.chat_store.history())
}

pub async fn clear_history(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.chat_store.clear().map_err(io_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_segments(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let segments = state.chat_store.list_segments().map_err(io_error)?;
    Ok(Json(segments))
}

pub async fn save_segment(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SaveSegmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.chat_store.save_segment(&payload.name).map_err(io_error)?;
    Ok(StatusCode::CREATED)
}

pub async fn load_segment(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let count = state.chat_store.load_segment(&name).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            (StatusCode::NOT_FOUND, format!("segment '{}' not found", name))
        } else {
            io_error(e)
        }
    })?;
    Ok(Json(serde_json::json!({ "loaded_messages": count })))
}

pub async fn rename_segment(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    Json(payload): Json<RenameSegmentRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state
        .chat_store
        .rename_segment(&name, &payload.new_name)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                (StatusCode::NOT_FOUND, format!("segment '{}' not found", name))
            } else {
                io_error(e)
            }
        })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_segment(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    state.chat_store.delete_segment(&name).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            (StatusCode::NOT_FOUND, format!("segment '{}' not found", name))
        } else {
            io_error(e)
        }
    })?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn ingest_csv(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<IngestRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let path = PathBuf::from(&payload.path);
    let count = crate::ingest::csv_into_table(&state.executor, &payload.table, &path)
        .await
        .map_err(|e| {
            error!("CSV ingest failed: {}", e);
            (StatusCode::BAD_REQUEST, e.to_string())
        })?;

    Ok(Json(serde_json::json!({
        "table": payload.table,
        "rows_loaded": count,
    })))
}

pub async fn system_status(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let uptime = chrono::Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: uptime,
        database_backend: state.executor.backend_name().to_string(),
        llm_backend: state.config.llm.backend.clone(),
        llm_model: state.config.llm.model.clone(),
        indexed_examples: state.index.len().await,
        message_count: state.chat_store.history().len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "stocksense_api_{}_{}_{}",
            tag,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn answered(answer: &str) -> AskResponse {
        AskResponse {
            success: true,
            intent: None,
            sql: Some("SELECT 1".to_string()),
            table: None,
            chart: None,
            chart_spec: None,
            answer: Some(answer.to_string()),
            error: None,
            debug: None,
        }
    }

    #[test]
    fn persist_records_both_sides_of_the_exchange() {
        let dir = temp_dir("persist");
        let store = ChatStore::new(&dir, 500).unwrap();
        persist_exchange(&store, "how many skus?".to_string(), &answered("42 skus."));

        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].role, "user");
        assert_eq!(history[1].role, "assistant");
        assert_eq!(history[1].content, "42 skus.");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn persist_failure_does_not_propagate() {
        let dir = temp_dir("persist_fail");
        let store = ChatStore::new(&dir, 500).unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        // The backing directory is gone; the write fails but the call returns.
        persist_exchange(&store, "q".to_string(), &answered("a"));
        assert_eq!(store.history().len(), 2);
    }
}
