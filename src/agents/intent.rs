use crate::llm::{extract, LlmManager};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Closed set of request categories. Anything the model invents outside this
/// set degrades to a low-confidence DataQuery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Intent {
    DataQuery,
    Visualize,
    Report,
    SchemaLookup,
    Analytics,
}

#[derive(Debug, Clone, Serialize)]
pub struct IntentResult {
    pub intent: Intent,
    pub confidence: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

const CLASSIFY_TEMPERATURE: f32 = 0.1;

fn classification_prompt(question: &str) -> String {
    format!(
        r#"Classify the user's request into exactly one of these intents:

- data-query: a question answerable with a SQL query over the warehouse data
- visualize: the user wants a chart, graph or plot
- report: the user wants a canned report (low stock, top products, category summary, inventory valuation, overstock)
- schema-lookup: the user asks what tables or columns exist
- analytics: stock cover, restock recommendations, overstock, stockout predictions, turnover or a warehouse summary

Respond with only a JSON object:
{{"intent": "<intent>", "confidence": <0.0-1.0>, "reasoning": "<one short sentence>"}}

Request: {}"#,
        question
    )
}

/// Parses a model reply into an IntentResult. Never fails: unparseable or
/// unknown replies become a DataQuery with reduced confidence.
pub fn parse_reply(text: &str) -> IntentResult {
    let Some(value) = extract::json_object(text) else {
        return IntentResult {
            intent: Intent::DataQuery,
            confidence: 0.3,
            reasoning: Some("classifier reply was not valid JSON".to_string()),
        };
    };

    let reasoning = value
        .get("reasoning")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    let confidence = value
        .get("confidence")
        .and_then(|v| v.as_f64())
        .map(|c| c.clamp(0.0, 1.0) as f32)
        .unwrap_or(0.5);

    let intent = value
        .get("intent")
        .and_then(|v| serde_json::from_value::<Intent>(v.clone()).ok());

    match intent {
        Some(intent) => IntentResult {
            intent,
            confidence,
            reasoning,
        },
        None => IntentResult {
            intent: Intent::DataQuery,
            confidence: confidence.min(0.5),
            reasoning: Some("classifier returned an unknown intent".to_string()),
        },
    }
}

/// Classifies a question via the LLM. An LLM failure degrades to DataQuery
/// at confidence 0.3 so the request still gets an answer attempt.
pub async fn classify(llm: &LlmManager, question: &str) -> IntentResult {
    match llm.complete(&classification_prompt(question), CLASSIFY_TEMPERATURE).await {
        Ok(reply) => parse_reply(&reply),
        Err(e) => {
            warn!("Intent classification failed: {}", e);
            IntentResult {
                intent: Intent::DataQuery,
                confidence: 0.3,
                reasoning: Some(format!("classifier unavailable: {}", e)),
            }
        }
    }
}
