use crate::agents::orchestrator::Orchestrator;
use crate::config::AppConfig;
use crate::db::executor::SqlExecutor;
use crate::llm::LlmManager;
use crate::rag::embedding::Embedder;
use crate::rag::index::VectorIndex;
use crate::rag::retriever::ExampleRetriever;
use crate::schema::SchemaDoc;
use crate::session::ChatStore;
use std::sync::Arc;

/// Shared application state for the web server. Everything is wired up
/// explicitly in main and handed over as one value.
pub struct AppState {
    pub config: AppConfig,
    pub executor: Arc<SqlExecutor>,
    pub llm: Arc<LlmManager>,
    pub embedder: Arc<dyn Embedder>,
    pub index: Arc<VectorIndex>,
    pub retriever: Arc<ExampleRetriever>,
    pub orchestrator: Orchestrator,
    pub chat_store: ChatStore,
    pub schema: Arc<SchemaDoc>,
    pub startup_time: chrono::DateTime<chrono::Utc>,
}
