mod agents;
mod config;
mod db;
mod ingest;
mod llm;
mod rag;
mod schema;
mod session;
mod util;
mod web;

use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use crate::agents::analytics::AnalyticsAgent;
use crate::agents::orchestrator::Orchestrator;
use crate::config::{AppConfig, CliArgs};
use crate::db::duckdb_pool::DuckDbConnectionManager;
use crate::db::executor::SqlExecutor;
use crate::llm::LlmManager;
use crate::rag::embedding::{Embedder, EmbeddingClient};
use crate::rag::index::VectorIndex;
use crate::rag::retriever::ExampleRetriever;
use crate::schema::SchemaDoc;
use crate::session::ChatStore;
use crate::web::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    util::logging::init_tracing();

    let args = CliArgs::parse();
    let config = AppConfig::new(&args)?;

    std::fs::create_dir_all(&config.data_dir)?;

    let executor = Arc::new(build_executor(&config)?);
    info!(
        "Database backend: {} ({})",
        executor.backend_name(),
        config.database.connection_string
    );

    let llm = Arc::new(LlmManager::new(&config.llm)?);
    info!("LLM backend: {} model {}", config.llm.backend, config.llm.model);

    let embedder: Arc<dyn Embedder> = Arc::new(EmbeddingClient::new(&config.embedding)?);

    let index = Arc::new(VectorIndex::new(PathBuf::from(&config.rag.index_path)));
    if let Err(e) = index.load().await {
        warn!("Could not load vector index: {}", e);
    }

    // Build on startup when possible; retrieval degrades to positional
    // fallback if this fails, so the server still comes up.
    let examples_path = PathBuf::from(&config.rag.examples_path);
    if examples_path.exists() {
        match index.build(&examples_path, embedder.as_ref(), false).await {
            Ok(count) => info!("Vector index ready with {} examples", count),
            Err(e) => warn!("Vector index build failed, continuing without it: {}", e),
        }
    } else {
        warn!("Examples file {} not found", examples_path.display());
    }

    let retriever = Arc::new(ExampleRetriever::new(
        embedder.clone(),
        index.clone(),
        &config.rag,
    ));

    let schema = Arc::new(load_schema(&config.schema_path));

    let orchestrator = Orchestrator::new(
        executor.clone(),
        llm.clone(),
        retriever.clone(),
        AnalyticsAgent::new(config.analytics.clone()),
        schema.clone(),
    );

    let chat_store = ChatStore::new(Path::new(&config.data_dir), config.session.persist_row_cap)?;

    let state = Arc::new(AppState {
        config,
        executor,
        llm,
        embedder,
        index,
        retriever,
        orchestrator,
        chat_store,
        schema,
        startup_time: chrono::Utc::now(),
    });

    web::run_server(state).await
}

fn build_executor(config: &AppConfig) -> Result<SqlExecutor, Box<dyn std::error::Error>> {
    match config.database.backend.as_str() {
        "duckdb" => {
            if let Some(parent) = Path::new(&config.database.connection_string).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let manager = DuckDbConnectionManager::new(config.database.connection_string.clone());
            let pool = r2d2::Pool::builder()
                .max_size(config.database.pool_size as u32)
                .build(manager)?;
            Ok(SqlExecutor::DuckDb(pool))
        }
        "postgres" => {
            let pool = sqlx::postgres::PgPoolOptions::new()
                .max_connections(config.database.pool_size as u32)
                .connect_lazy(&config.database.connection_string)?;
            Ok(SqlExecutor::Postgres(pool))
        }
        other => Err(format!("unsupported database backend: {}", other).into()),
    }
}

fn load_schema(path: &str) -> SchemaDoc {
    match SchemaDoc::load(Path::new(path)) {
        Ok(doc) => {
            info!("Loaded schema with {} tables from {}", doc.tables.len(), path);
            doc
        }
        Err(e) => {
            warn!("Could not load schema from {}: {}", path, e);
            SchemaDoc { tables: Vec::new() }
        }
    }
}
