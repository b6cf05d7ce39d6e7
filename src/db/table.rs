use serde::{Deserialize, Serialize};
use serde_json::Value;

/// In-memory result of a query: named columns over JSON-typed rows.
///
/// The column set is whatever the SQL produced; nothing about it is known
/// statically, so helpers below classify columns by inspecting the values.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResultTable {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl ResultTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Value at (row, column name), if both exist.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)
    }

    pub fn f64_at(&self, row: usize, column: &str) -> Option<f64> {
        match self.value(row, column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.parse::<f64>().ok(),
            _ => None,
        }
    }

    pub fn string_at(&self, row: usize, column: &str) -> Option<String> {
        match self.value(row, column)? {
            Value::String(s) => Some(s.clone()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }

    /// Columns whose non-null values are all numeric.
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| self.column_is_numeric(*idx))
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Columns that are not numeric.
    pub fn categorical_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| !self.column_is_numeric(*idx))
            .map(|(_, name)| name.clone())
            .collect()
    }

    fn column_is_numeric(&self, idx: usize) -> bool {
        let mut seen = false;
        for row in &self.rows {
            match row.get(idx) {
                Some(Value::Number(_)) => seen = true,
                Some(Value::Null) | None => {}
                _ => return false,
            }
        }
        seen
    }

    /// Heuristic for date-like columns: name contains "date"/"time" or values
    /// parse as ISO dates.
    pub fn column_is_date_like(&self, name: &str) -> bool {
        let lowered = name.to_lowercase();
        if lowered.contains("date") || lowered.contains("time") {
            return true;
        }
        let Some(idx) = self.column_index(name) else {
            return false;
        };
        let mut seen = false;
        for row in self.rows.iter().take(10) {
            match row.get(idx) {
                Some(Value::String(s)) => {
                    if chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_err() {
                        return false;
                    }
                    seen = true;
                }
                Some(Value::Null) | None => {}
                _ => return false,
            }
        }
        seen
    }

    /// Sorts in place by a numeric column; NULL and non-numeric values sink to
    /// the end regardless of direction.
    pub fn sort_by_f64(&mut self, column: &str, ascending: bool) {
        let Some(idx) = self.column_index(column) else {
            return;
        };
        self.rows.sort_by(|a, b| {
            let av = a.get(idx).and_then(Value::as_f64);
            let bv = b.get(idx).and_then(Value::as_f64);
            match (av, bv) {
                (Some(x), Some(y)) => {
                    let ord = x.partial_cmp(&y).unwrap_or(std::cmp::Ordering::Equal);
                    if ascending {
                        ord
                    } else {
                        ord.reverse()
                    }
                }
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        });
    }

    pub fn head(&self, n: usize) -> ResultTable {
        ResultTable {
            columns: self.columns.clone(),
            rows: self.rows.iter().take(n).cloned().collect(),
        }
    }

    /// CSV preview of the first `n` rows, used in LLM prompts.
    pub fn preview_csv(&self, n: usize) -> String {
        let mut out = self.columns.join(",");
        for row in self.rows.iter().take(n) {
            out.push('\n');
            let cells: Vec<String> = row
                .iter()
                .map(|v| match v {
                    Value::Null => String::new(),
                    Value::String(s) => s.replace(',', " "),
                    other => other.to_string(),
                })
                .collect();
            out.push_str(&cells.join(","));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> ResultTable {
        ResultTable {
            columns: vec!["category".into(), "total".into(), "order_date".into()],
            rows: vec![
                vec![json!("widgets"), json!(10.5), json!("2023-01-02")],
                vec![json!("gadgets"), json!(3), json!("2023-01-01")],
                vec![json!("gizmos"), Value::Null, json!("2023-01-03")],
            ],
        }
    }

    #[test]
    fn classifies_columns() {
        let t = sample();
        assert_eq!(t.numeric_columns(), vec!["total".to_string()]);
        assert_eq!(
            t.categorical_columns(),
            vec!["category".to_string(), "order_date".to_string()]
        );
        assert!(t.column_is_date_like("order_date"));
        assert!(!t.column_is_date_like("category"));
    }

    #[test]
    fn sorts_with_nulls_last() {
        let mut t = sample();
        t.sort_by_f64("total", true);
        assert_eq!(t.string_at(0, "category").as_deref(), Some("gadgets"));
        assert_eq!(t.string_at(2, "category").as_deref(), Some("gizmos"));

        t.sort_by_f64("total", false);
        assert_eq!(t.string_at(0, "category").as_deref(), Some("widgets"));
        assert_eq!(t.string_at(2, "category").as_deref(), Some("gizmos"));
    }

    #[test]
    fn head_keeps_columns_and_truncates_rows() {
        let t = sample();
        let h = t.head(2);
        assert_eq!(h.columns, t.columns);
        assert_eq!(h.row_count(), 2);
        assert!(t.head(10).row_count() == 3);
    }

    #[test]
    fn preview_is_bounded() {
        let t = sample();
        let csv = t.preview_csv(2);
        assert_eq!(csv.lines().count(), 3);
        assert!(csv.starts_with("category,total,order_date"));
    }
}
