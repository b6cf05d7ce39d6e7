use crate::db::table::ResultTable;
use crate::llm::{extract, LlmManager};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};

const PLAN_TEMPERATURE: f32 = 0.2;
const PIE_BUCKET_LIMIT: usize = 10;

/// Declarative chart plan. Produced by the model, validated against the
/// actual table, and falling back to a heuristic when invalid.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    #[serde(default = "default_chart_type")]
    pub chart_type: String,
    #[serde(default)]
    pub x: Option<String>,
    #[serde(default)]
    pub y: Vec<String>,
    #[serde(default)]
    pub group_by: Option<String>,
    #[serde(default)]
    pub agg: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

fn default_chart_type() -> String {
    "line".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Series {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Render-ready chart payload for the frontend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartData {
    pub chart_type: String,
    pub title: String,
    pub x: String,
    pub labels: Vec<String>,
    pub series: Vec<Series>,
}

fn plan_prompt(question: &str, table: &ResultTable) -> String {
    let numeric = table.numeric_columns();
    let categorical = table.categorical_columns();
    format!(
        r#"Plan a chart for this result.

Question: {}
Numeric columns: {}
Categorical columns: {}
First rows as CSV:
{}

Respond with only a JSON object:
{{"chart_type": "bar|line|scatter|pie|donut", "x": "<column>", "y": ["<column>"], "group_by": "<column>|null", "agg": "sum|mean|null", "title": "<short title>"}}"#,
        question,
        numeric.join(", "),
        categorical.join(", "),
        table.preview_csv(5)
    )
}

fn spec_is_valid(spec: &ChartSpec, table: &ResultTable) -> bool {
    let x_ok = spec
        .x
        .as_ref()
        .map(|x| table.column_index(x).is_some())
        .unwrap_or(false);
    let y_ok = !spec.y.is_empty()
        && spec
            .y
            .iter()
            .all(|y| table.column_index(y).is_some());
    x_ok && y_ok
}

/// Chart shape from the table alone: one numeric against one categorical is
/// a bar, two numerics a scatter, anything else a line.
pub fn heuristic_spec(table: &ResultTable) -> ChartSpec {
    let numeric = table.numeric_columns();
    let categorical = table.categorical_columns();

    if numeric.len() == 1 && !categorical.is_empty() {
        return ChartSpec {
            chart_type: "bar".to_string(),
            x: Some(categorical[0].clone()),
            y: vec![numeric[0].clone()],
            group_by: None,
            agg: None,
            title: None,
        };
    }
    if numeric.len() >= 2 {
        return ChartSpec {
            chart_type: "scatter".to_string(),
            x: Some(numeric[0].clone()),
            y: vec![numeric[1].clone()],
            group_by: None,
            agg: None,
            title: None,
        };
    }
    ChartSpec {
        chart_type: "line".to_string(),
        x: table.columns.first().cloned(),
        y: numeric,
        group_by: None,
        agg: None,
        title: None,
    }
}

/// Asks the model for a chart plan, keeping it only if its columns exist.
pub async fn plan(llm: &LlmManager, question: &str, table: &ResultTable) -> ChartSpec {
    match llm.complete(&plan_prompt(question, table), PLAN_TEMPERATURE).await {
        Ok(reply) => match extract::json_object(&reply)
            .and_then(|v| serde_json::from_value::<ChartSpec>(v).ok())
        {
            Some(spec) if spec_is_valid(&spec, table) => spec,
            Some(spec) => {
                debug!("Planned chart references missing columns: {:?}", spec);
                heuristic_spec(table)
            }
            None => heuristic_spec(table),
        },
        Err(e) => {
            warn!("Chart planning failed, using heuristic: {}", e);
            heuristic_spec(table)
        }
    }
}

fn label_of(table: &ResultTable, row: usize, column: &str) -> String {
    table
        .string_at(row, column)
        .unwrap_or_else(|| "(null)".to_string())
}

fn aggregate(values: &[f64], agg: &str) -> f64 {
    match agg {
        "mean" => {
            if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            }
        }
        _ => values.iter().sum(),
    }
}

/// Materializes a spec against a table. Returns None when there is nothing
/// drawable (empty table or no usable axes).
pub fn render(table: &ResultTable, spec: &ChartSpec) -> Option<ChartData> {
    if table.is_empty() {
        return None;
    }
    let x = spec.x.clone()?;
    table.column_index(&x)?;
    let y_columns: Vec<String> = spec
        .y
        .iter()
        .filter(|y| table.column_index(y).is_some())
        .cloned()
        .collect();
    if y_columns.is_empty() {
        return None;
    }

    // Date-like axes get sorted chronologically before plotting.
    let mut working = table.clone();
    if working.column_is_date_like(&x) {
        let idx = working.column_index(&x)?;
        working.rows.sort_by(|a, b| {
            let av = a.get(idx).and_then(|v| v.as_str()).unwrap_or("");
            let bv = b.get(idx).and_then(|v| v.as_str()).unwrap_or("");
            av.cmp(bv)
        });
    }

    let title = spec
        .title
        .clone()
        .unwrap_or_else(|| format!("{} by {}", y_columns.join(", "), x));

    let chart_type = spec.chart_type.as_str();
    if chart_type == "pie" || chart_type == "donut" {
        return render_pie(&working, &x, &y_columns[0], chart_type, &title);
    }

    let group_by = spec
        .group_by
        .as_deref()
        .filter(|g| table.column_index(g).is_some() && *g != x);
    if group_by.is_some() || spec.agg.is_some() {
        let agg = spec.agg.as_deref().unwrap_or("sum");
        return render_grouped(&working, &x, &y_columns, group_by, agg, chart_type, &title);
    }

    let labels: Vec<String> = (0..working.row_count())
        .map(|i| label_of(&working, i, &x))
        .collect();
    let series = y_columns
        .iter()
        .map(|column| Series {
            name: column.clone(),
            values: (0..working.row_count())
                .map(|i| working.f64_at(i, column))
                .collect(),
        })
        .collect();

    Some(ChartData {
        chart_type: chart_type.to_string(),
        title,
        x,
        labels,
        series,
    })
}

fn render_grouped(
    table: &ResultTable,
    x: &str,
    y_columns: &[String],
    group_by: Option<&str>,
    agg: &str,
    chart_type: &str,
    title: &str,
) -> Option<ChartData> {
    if let Some(group) = group_by {
        return render_split_series(table, x, &y_columns[0], group, agg, chart_type, title);
    }

    let mut groups: BTreeMap<String, Vec<Vec<f64>>> = BTreeMap::new();
    for i in 0..table.row_count() {
        let label = label_of(table, i, x);
        let entry = groups
            .entry(label)
            .or_insert_with(|| vec![Vec::new(); y_columns.len()]);
        for (j, column) in y_columns.iter().enumerate() {
            if let Some(v) = table.f64_at(i, column) {
                entry[j].push(v);
            }
        }
    }

    let labels: Vec<String> = groups.keys().cloned().collect();
    let series = y_columns
        .iter()
        .enumerate()
        .map(|(j, column)| Series {
            name: column.clone(),
            values: groups
                .values()
                .map(|buckets| Some(aggregate(&buckets[j], agg)))
                .collect(),
        })
        .collect();

    Some(ChartData {
        chart_type: chart_type.to_string(),
        title: title.to_string(),
        x: x.to_string(),
        labels,
        series,
    })
}

/// One series per distinct group value, aggregated over the x buckets. Gaps
/// (a group with no rows for an x value) stay None rather than zero.
fn render_split_series(
    table: &ResultTable,
    x: &str,
    y: &str,
    group: &str,
    agg: &str,
    chart_type: &str,
    title: &str,
) -> Option<ChartData> {
    let mut labels: Vec<String> = Vec::new();
    let mut buckets: BTreeMap<String, BTreeMap<String, Vec<f64>>> = BTreeMap::new();
    for i in 0..table.row_count() {
        let label = label_of(table, i, x);
        if !labels.contains(&label) {
            labels.push(label.clone());
        }
        if let Some(v) = table.f64_at(i, y) {
            buckets
                .entry(label_of(table, i, group))
                .or_default()
                .entry(label)
                .or_default()
                .push(v);
        }
    }
    if buckets.is_empty() {
        return None;
    }

    let series = buckets
        .iter()
        .map(|(name, per_label)| Series {
            name: name.clone(),
            values: labels
                .iter()
                .map(|l| per_label.get(l).map(|vs| aggregate(vs, agg)))
                .collect(),
        })
        .collect();

    Some(ChartData {
        chart_type: chart_type.to_string(),
        title: title.to_string(),
        x: x.to_string(),
        labels,
        series,
    })
}

/// Pie slices keep the ten largest values; the rest collapse into "Others".
fn render_pie(
    table: &ResultTable,
    x: &str,
    y: &str,
    chart_type: &str,
    title: &str,
) -> Option<ChartData> {
    let mut slices: Vec<(String, f64)> = (0..table.row_count())
        .filter_map(|i| Some((label_of(table, i, x), table.f64_at(i, y)?)))
        .collect();
    if slices.is_empty() {
        return None;
    }
    slices.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    if slices.len() > PIE_BUCKET_LIMIT {
        let rest: f64 = slices[PIE_BUCKET_LIMIT..].iter().map(|(_, v)| v).sum();
        slices.truncate(PIE_BUCKET_LIMIT);
        slices.push(("Others".to_string(), rest));
    }

    let labels = slices.iter().map(|(l, _)| l.clone()).collect();
    let values = slices.iter().map(|(_, v)| Some(*v)).collect();

    Some(ChartData {
        chart_type: chart_type.to_string(),
        title: title.to_string(),
        x: x.to_string(),
        labels,
        series: vec![Series {
            name: y.to_string(),
            values,
        }],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bar_table() -> ResultTable {
        let mut t = ResultTable::new(vec!["category".into(), "total_value".into()]);
        t.rows.push(vec![json!("widgets"), json!(10.0)]);
        t.rows.push(vec![json!("gadgets"), json!(20.0)]);
        t
    }

    #[test]
    fn heuristic_prefers_bar_for_one_numeric_one_categorical() {
        let spec = heuristic_spec(&bar_table());
        assert_eq!(spec.chart_type, "bar");
        assert_eq!(spec.x.as_deref(), Some("category"));
        assert_eq!(spec.y, vec!["total_value".to_string()]);
    }

    #[test]
    fn heuristic_prefers_scatter_for_two_numerics() {
        let mut t = ResultTable::new(vec!["on_hand".into(), "total_value".into()]);
        t.rows.push(vec![json!(1.0), json!(2.0)]);
        let spec = heuristic_spec(&t);
        assert_eq!(spec.chart_type, "scatter");
        assert_eq!(spec.x.as_deref(), Some("on_hand"));
    }

    #[test]
    fn render_produces_labels_and_series() {
        let t = bar_table();
        let spec = heuristic_spec(&t);
        let chart = render(&t, &spec).unwrap();
        assert_eq!(chart.labels, vec!["widgets", "gadgets"]);
        assert_eq!(chart.series.len(), 1);
        assert_eq!(chart.series[0].values, vec![Some(10.0), Some(20.0)]);
    }

    #[test]
    fn render_rejects_empty_tables() {
        let t = ResultTable::new(vec!["a".into()]);
        let spec = heuristic_spec(&t);
        assert!(render(&t, &spec).is_none());
    }

    #[test]
    fn invalid_planned_columns_fall_back() {
        let t = bar_table();
        let spec = ChartSpec {
            chart_type: "bar".to_string(),
            x: Some("nope".to_string()),
            y: vec!["total_value".to_string()],
            group_by: None,
            agg: None,
            title: None,
        };
        assert!(!spec_is_valid(&spec, &t));
    }

    #[test]
    fn pie_buckets_overflow_into_others() {
        let mut t = ResultTable::new(vec!["category".into(), "total_value".into()]);
        for i in 0..12 {
            t.rows
                .push(vec![json!(format!("c{}", i)), json!(100.0 - i as f64)]);
        }
        let spec = ChartSpec {
            chart_type: "pie".to_string(),
            x: Some("category".to_string()),
            y: vec!["total_value".to_string()],
            group_by: None,
            agg: None,
            title: None,
        };
        let chart = render(&t, &spec).unwrap();
        assert_eq!(chart.labels.len(), 11);
        assert_eq!(chart.labels.last().map(String::as_str), Some("Others"));
        // 89 + 90 from the two smallest slices
        assert_eq!(chart.series[0].values.last().copied().flatten(), Some(179.0));
    }

    #[test]
    fn grouped_render_aggregates() {
        let mut t = ResultTable::new(vec!["category".into(), "revenue".into()]);
        t.rows.push(vec![json!("a"), json!(1.0)]);
        t.rows.push(vec![json!("a"), json!(3.0)]);
        t.rows.push(vec![json!("b"), json!(5.0)]);
        let spec = ChartSpec {
            chart_type: "bar".to_string(),
            x: Some("category".to_string()),
            y: vec!["revenue".to_string()],
            group_by: None,
            agg: Some("sum".to_string()),
            title: None,
        };
        let chart = render(&t, &spec).unwrap();
        assert_eq!(chart.labels, vec!["a", "b"]);
        assert_eq!(chart.series[0].values, vec![Some(4.0), Some(5.0)]);
    }

    #[test]
    fn group_by_splits_into_one_series_per_group() {
        let mut t = ResultTable::new(vec!["month".into(), "region".into(), "revenue".into()]);
        t.rows.push(vec![json!("jan"), json!("north"), json!(1.0)]);
        t.rows.push(vec![json!("jan"), json!("south"), json!(2.0)]);
        t.rows.push(vec![json!("feb"), json!("north"), json!(3.0)]);
        let spec = ChartSpec {
            chart_type: "bar".to_string(),
            x: Some("month".to_string()),
            y: vec!["revenue".to_string()],
            group_by: Some("region".to_string()),
            agg: Some("sum".to_string()),
            title: None,
        };
        let chart = render(&t, &spec).unwrap();
        assert_eq!(chart.labels, vec!["jan", "feb"]);
        assert_eq!(chart.series.len(), 2);
        assert_eq!(chart.series[0].name, "north");
        assert_eq!(chart.series[0].values, vec![Some(1.0), Some(3.0)]);
        assert_eq!(chart.series[1].name, "south");
        assert_eq!(chart.series[1].values, vec![Some(2.0), None]);
    }

    #[test]
    fn date_axis_sorts_chronologically() {
        let mut t = ResultTable::new(vec!["order_date".into(), "revenue".into()]);
        t.rows.push(vec![json!("2023-02-01"), json!(2.0)]);
        t.rows.push(vec![json!("2023-01-01"), json!(1.0)]);
        let spec = ChartSpec {
            chart_type: "line".to_string(),
            x: Some("order_date".to_string()),
            y: vec!["revenue".to_string()],
            group_by: None,
            agg: None,
            title: None,
        };
        let chart = render(&t, &spec).unwrap();
        assert_eq!(chart.labels, vec!["2023-01-01", "2023-02-01"]);
        assert_eq!(chart.series[0].values, vec![Some(1.0), Some(2.0)]);
    }
}
