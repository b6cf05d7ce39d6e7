use crate::agents::intent::{self, Intent, IntentResult};
use crate::agents::{analytics, report, response, sqlgen, viz};
use crate::db::executor::SqlExecutor;
use crate::db::table::ResultTable;
use crate::llm::LlmManager;
use crate::rag::retriever::{ExampleRetriever, RetrievalMetadata};
use crate::schema::SchemaDoc;
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info};

#[derive(Debug, Clone, Serialize)]
pub struct StepTiming {
    pub step: String,
    pub millis: u128,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct DebugTrace {
    pub steps: Vec<StepTiming>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retrieval: Option<RetrievalMetadata>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlgen: Option<sqlgen::SqlGenDebug>,
}

impl DebugTrace {
    fn record(&mut self, step: &str, started: Instant) {
        self.steps.push(StepTiming {
            step: step.to_string(),
            millis: started.elapsed().as_millis(),
        });
    }
}

/// Everything a single question produces. `success: false` carries an error
/// message; partial results (a table without an answer) are still returned.
#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<ResultTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart: Option<viz::ChartData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chart_spec: Option<viz::ChartSpec>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<DebugTrace>,
}

impl AskResponse {
    fn empty() -> Self {
        Self {
            success: false,
            intent: None,
            sql: None,
            table: None,
            chart: None,
            chart_spec: None,
            answer: None,
            error: None,
            debug: None,
        }
    }
}

/// Routes a question through classification, the matching agent and answer
/// synthesis. Steps run sequentially; a failed step produces a structured
/// error rather than a retry loop.
pub struct Orchestrator {
    executor: Arc<SqlExecutor>,
    llm: Arc<LlmManager>,
    retriever: Arc<ExampleRetriever>,
    analytics: analytics::AnalyticsAgent,
    schema: Arc<SchemaDoc>,
}

impl Orchestrator {
    pub fn new(
        executor: Arc<SqlExecutor>,
        llm: Arc<LlmManager>,
        retriever: Arc<ExampleRetriever>,
        analytics: analytics::AnalyticsAgent,
        schema: Arc<SchemaDoc>,
    ) -> Self {
        Self {
            executor,
            llm,
            retriever,
            analytics,
            schema,
        }
    }

    pub async fn handle(&self, question: &str, want_debug: bool) -> AskResponse {
        let mut trace = DebugTrace::default();

        let started = Instant::now();
        let intent_result = intent::classify(&self.llm, question).await;
        trace.record("classify-intent", started);
        info!(
            "Classified question as {:?} (confidence {:.2})",
            intent_result.intent, intent_result.confidence
        );

        let mut response = match intent_result.intent {
            Intent::SchemaLookup => self.handle_schema_lookup(&mut trace).await,
            Intent::Analytics => self.handle_analytics(question, &mut trace).await,
            Intent::Report => self.handle_report(question, &mut trace).await,
            Intent::DataQuery => self.handle_data_query(question, false, &mut trace).await,
            Intent::Visualize => self.handle_data_query(question, true, &mut trace).await,
        };

        response.intent = Some(intent_result);
        if want_debug {
            response.debug = Some(trace);
        }
        response
    }

    async fn handle_schema_lookup(&self, trace: &mut DebugTrace) -> AskResponse {
        let started = Instant::now();
        let mut table = ResultTable::new(vec![
            "table".into(),
            "column".into(),
            "type".into(),
            "description".into(),
        ]);
        for t in &self.schema.tables {
            for c in &t.columns {
                table.rows.push(vec![
                    json!(t.name),
                    json!(c.name),
                    json!(c.column_type),
                    json!(c.description),
                ]);
            }
        }
        trace.record("schema-lookup", started);

        let answer = format!(
            "The warehouse exposes {} tables: {}.",
            self.schema.tables.len(),
            self.schema.table_names().join(", ")
        );

        AskResponse {
            success: true,
            table: Some(table),
            answer: Some(answer),
            ..AskResponse::empty()
        }
    }

    async fn handle_analytics(&self, question: &str, trace: &mut DebugTrace) -> AskResponse {
        let Some(request) = analytics::parse_request(question) else {
            // Classifier said analytics but no operation matched; a plain
            // data query is the closest useful behavior.
            info!("No analytics operation matched, treating as data query");
            return self.handle_data_query(question, false, trace).await;
        };

        let started = Instant::now();
        let table = match self.analytics.run(&self.executor, &request).await {
            Ok(table) => table,
            Err(e) => {
                error!("Analytics operation failed: {}", e);
                return AskResponse {
                    error: Some(e.to_string()),
                    ..AskResponse::empty()
                };
            }
        };
        trace.record("analytics", started);

        let started = Instant::now();
        let answer = response::synthesize(&self.llm, question, None, &table).await;
        trace.record("synthesize-answer", started);

        AskResponse {
            success: true,
            table: Some(table),
            answer: Some(answer),
            ..AskResponse::empty()
        }
    }

    async fn handle_report(&self, question: &str, trace: &mut DebugTrace) -> AskResponse {
        let Some(request) = report::parse_request(question) else {
            info!("No report template matched, treating as data query");
            return self.handle_data_query(question, false, trace).await;
        };

        let started = Instant::now();
        let result = report::run(&self.executor, &request).await;
        trace.record("report", started);

        match result {
            Ok(report) => AskResponse {
                success: true,
                answer: Some(format!("{}: {}", report.title, report.summary)),
                table: Some(report.table),
                ..AskResponse::empty()
            },
            Err(e) => {
                error!("Report failed: {}", e);
                AskResponse {
                    error: Some(e.to_string()),
                    ..AskResponse::empty()
                }
            }
        }
    }

    async fn handle_data_query(
        &self,
        question: &str,
        with_chart: bool,
        trace: &mut DebugTrace,
    ) -> AskResponse {
        let started = Instant::now();
        let (examples, retrieval) = self.retriever.retrieve(question).await;
        trace.record("retrieve-examples", started);
        trace.retrieval = Some(retrieval.clone());

        let schema_context = self.schema.render_context();

        let started = Instant::now();
        let generation = match sqlgen::generate(
            &self.llm,
            question,
            &schema_context,
            &examples,
            &retrieval,
        )
        .await
        {
            Ok(generation) => generation,
            Err(e) => {
                error!("SQL generation failed: {}", e);
                return AskResponse {
                    error: Some(e.to_string()),
                    ..AskResponse::empty()
                };
            }
        };
        trace.record("generate-sql", started);
        trace.sqlgen = Some(generation.debug);

        let Some(sql) = generation.sql else {
            return AskResponse {
                error: Some("could not produce a SQL query for this question".to_string()),
                ..AskResponse::empty()
            };
        };

        let started = Instant::now();
        let table = match self.executor.execute(&sql).await {
            Ok(table) => table,
            Err(e) => {
                error!("Query execution failed: {}", e);
                return AskResponse {
                    sql: Some(sql),
                    error: Some(e.to_string()),
                    ..AskResponse::empty()
                };
            }
        };
        trace.record("execute-sql", started);

        let (chart, chart_spec) = if with_chart && !table.is_empty() {
            let started = Instant::now();
            let spec = viz::plan(&self.llm, question, &table).await;
            let chart = viz::render(&table, &spec);
            trace.record("plan-chart", started);
            (chart, Some(spec))
        } else {
            (None, None)
        };

        let started = Instant::now();
        let answer = response::synthesize(&self.llm, question, Some(&sql), &table).await;
        trace.record("synthesize-answer", started);

        AskResponse {
            success: true,
            sql: Some(sql),
            table: Some(table),
            chart,
            chart_spec,
            answer: Some(answer),
            ..AskResponse::empty()
        }
    }
}
