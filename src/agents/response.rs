use crate::db::table::ResultTable;
use crate::llm::LlmManager;
use tracing::warn;

const ANSWER_TEMPERATURE: f32 = 0.2;

fn answer_prompt(question: &str, sql: Option<&str>, table: &ResultTable) -> String {
    let sql_block = match sql {
        Some(sql) => format!("The SQL that produced it:\n{}\n\n", sql),
        None => String::new(),
    };
    format!(
        r#"A user asked: {}

The query returned {} rows over columns [{}].
{}First rows as CSV:
{}

Answer the question in one or two plain sentences using only this data.
Do not mention SQL, tables or columns; just state the answer."#,
        question,
        table.row_count(),
        table.columns.join(", "),
        sql_block,
        table.preview_csv(10)
    )
}

/// Describes the table when the model cannot.
pub fn fallback_answer(table: &ResultTable) -> String {
    format!(
        "Returned {} rows with columns: {}",
        table.row_count(),
        table.columns.join(", ")
    )
}

/// Turns a result table into a short natural-language answer. An LLM failure
/// degrades to a mechanical description of the result.
pub async fn synthesize(
    llm: &LlmManager,
    question: &str,
    sql: Option<&str>,
    table: &ResultTable,
) -> String {
    match llm.complete(&answer_prompt(question, sql, table), ANSWER_TEMPERATURE).await {
        Ok(reply) => {
            let trimmed = reply.trim();
            if trimmed.is_empty() {
                fallback_answer(table)
            } else {
                trimmed.to_string()
            }
        }
        Err(e) => {
            warn!("Answer synthesis failed: {}", e);
            fallback_answer(table)
        }
    }
}
