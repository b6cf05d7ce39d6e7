use crate::llm::{extract, LlmError, LlmManager};
use crate::rag::retriever::RetrievalMetadata;
use crate::rag::FewShotExample;
use serde::Serialize;
use tracing::{info, warn};

const GENERATE_TEMPERATURE: f32 = 0.1;

/// Diagnostic trail of one generation attempt, surfaced on debug requests.
#[derive(Debug, Clone, Serialize)]
pub struct SqlGenDebug {
    pub model: String,
    pub selected_examples: Vec<String>,
    pub retrieval_method: String,
    pub retried: bool,
    pub prompt_snippet: String,
    pub raw_snippet: String,
}

pub struct SqlGeneration {
    pub sql: Option<String>,
    pub debug: SqlGenDebug,
}

fn fewshot_block(examples: &[FewShotExample]) -> String {
    let mut block = String::new();
    for example in examples {
        block.push_str(&format!(
            "Question: {}\n```sql\n{}\n```\n\n",
            example.question, example.sql
        ));
    }
    block
}

fn generation_prompt(question: &str, schema_context: &str, examples: &[FewShotExample]) -> String {
    format!(
        r#"### Instructions:
Convert the question into a single SQL query over the warehouse schema below.
Adhere to these rules:
- Only produce SELECT statements, optionally starting with a WITH clause
- Use the exact column and table names from the schema; they are case sensitive
- Use table aliases to prevent ambiguity in joins
- When creating a ratio, always cast the numerator as float
- Return the query inside a ```sql code block

### Schema:
{}

### Examples:
{}### Question:
{}

### Response:
```sql
"#,
        schema_context,
        fewshot_block(examples),
        question
    )
}

fn retry_prompt(question: &str, schema_context: &str) -> String {
    format!(
        r#"Write one SQL SELECT statement answering the question below against this schema.
Output only the SQL, nothing else. No explanation, no markdown.

Schema:
{}

Question: {}"#,
        schema_context, question
    )
}

fn snippet(text: &str) -> String {
    text.chars().take(400).collect()
}

/// One LLM call plus at most one stricter retry when no SELECT could be
/// extracted from the first reply.
pub async fn generate(
    llm: &LlmManager,
    question: &str,
    schema_context: &str,
    examples: &[FewShotExample],
    retrieval: &RetrievalMetadata,
) -> Result<SqlGeneration, LlmError> {
    let prompt = generation_prompt(question, schema_context, examples);
    let reply = llm.complete(&prompt, GENERATE_TEMPERATURE).await?;

    let mut debug = SqlGenDebug {
        model: llm.model_name().to_string(),
        selected_examples: examples.iter().map(|e| e.question.clone()).collect(),
        retrieval_method: retrieval.method.clone(),
        retried: false,
        prompt_snippet: snippet(&prompt),
        raw_snippet: snippet(&reply),
    };

    if let Some(sql) = extract::sql_statement(&reply) {
        info!("Generated SQL on first attempt");
        return Ok(SqlGeneration {
            sql: Some(sql),
            debug,
        });
    }

    warn!("No SQL found in first reply, retrying with stricter prompt");
    debug.retried = true;

    let reply = llm
        .complete(&retry_prompt(question, schema_context), GENERATE_TEMPERATURE)
        .await?;
    debug.raw_snippet = snippet(&reply);

    let sql = extract::sql_statement(&reply);
    if sql.is_none() {
        warn!("Retry also produced no usable SQL");
    }

    Ok(SqlGeneration { sql, debug })
}
