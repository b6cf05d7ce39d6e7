//! Pulls structured payloads out of free-form model replies.
//!
//! Models wrap answers in prose, markdown fences or both; these helpers are
//! the single place that deals with that.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// First JSON object embedded in `text`, or the whole text if it parses.
pub fn json_object(text: &str) -> Option<Value> {
    if let Ok(value) = serde_json::from_str::<Value>(text.trim()) {
        if value.is_object() {
            return Some(value);
        }
    }

    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<Value>(&text[start..=end])
        .ok()
        .filter(Value::is_object)
}

fn raw_select_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)\b(select|with)\b[\s\S]+$").expect("static regex")
    })
}

/// Extracts a SELECT/WITH statement from a model reply.
///
/// Tries a ```sql fence, then a plain ``` fence, then scans for a raw
/// SELECT or WITH keyword and takes everything to the end. The candidate
/// must start with select/with; a trailing semicolon is stripped.
pub fn sql_statement(text: &str) -> Option<String> {
    if let Some(start) = text.find("```sql") {
        let body = &text[start + 6..];
        if let Some(end) = body.find("```") {
            if let Some(sql) = accept(&body[..end]) {
                return Some(sql);
            }
        }
    }

    if let Some(start) = text.find("```") {
        let body = &text[start + 3..];
        if let Some(end) = body.find("```") {
            if let Some(sql) = accept(&body[..end]) {
                return Some(sql);
            }
        }
    }

    raw_select_re()
        .find(text)
        .and_then(|m| accept(m.as_str()))
}

fn accept(candidate: &str) -> Option<String> {
    let trimmed = candidate.trim();
    let lowered = trimmed.to_lowercase();
    if !(lowered.starts_with("select") || lowered.starts_with("with")) {
        return None;
    }
    Some(trimmed.trim_end_matches(';').trim_end().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_from_clean_reply() {
        let v = json_object(r#"{"intent": "data-query", "confidence": 0.9}"#);
        assert_eq!(v, Some(json!({"intent": "data-query", "confidence": 0.9})));
    }

    #[test]
    fn json_from_wrapped_reply() {
        let text = "Sure! Here is the classification:\n{\"intent\": \"visualize\"}\nHope that helps.";
        let v = json_object(text);
        assert_eq!(v, Some(json!({"intent": "visualize"})));
    }

    #[test]
    fn json_rejects_garbage() {
        assert!(json_object("no braces here").is_none());
        assert!(json_object("{not json}").is_none());
        assert!(json_object("[1, 2, 3]").is_none());
    }

    #[test]
    fn sql_from_fenced_block() {
        let text = "Here you go:\n```sql\nSELECT * FROM inventory;\n```\nLet me know.";
        assert_eq!(
            sql_statement(text).as_deref(),
            Some("SELECT * FROM inventory")
        );
    }

    #[test]
    fn sql_from_plain_fence() {
        let text = "```\nselect sku_id from skus\n```";
        assert_eq!(sql_statement(text).as_deref(), Some("select sku_id from skus"));
    }

    #[test]
    fn sql_from_raw_text() {
        let text = "The query is: SELECT count(*) FROM sales WHERE order_quantity > 0";
        assert_eq!(
            sql_statement(text).as_deref(),
            Some("SELECT count(*) FROM sales WHERE order_quantity > 0")
        );
    }

    #[test]
    fn sql_with_cte() {
        let text = "```sql\nWITH recent AS (SELECT * FROM sales) SELECT * FROM recent;\n```";
        assert_eq!(
            sql_statement(text).as_deref(),
            Some("WITH recent AS (SELECT * FROM sales) SELECT * FROM recent")
        );
    }

    #[test]
    fn sql_rejects_mutations_and_prose() {
        assert!(sql_statement("```sql\nDROP TABLE sales\n```").is_none());
        assert!(sql_statement("I cannot answer that question.").is_none());
    }

    #[test]
    fn fenced_block_wins_over_raw_text() {
        let text = "First select the right table.\n```sql\nSELECT a FROM b\n```";
        assert_eq!(sql_statement(text).as_deref(), Some("SELECT a FROM b"));
    }
}
