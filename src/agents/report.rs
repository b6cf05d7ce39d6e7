use crate::db::executor::SqlExecutor;
use crate::db::table::ResultTable;
use crate::db::DbError;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

const DEFAULT_LOW_STOCK_THRESHOLD: f64 = 50.0;
const DEFAULT_OVERSTOCK_THRESHOLD: f64 = 500.0;
const DEFAULT_TOP_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReportType {
    LowStock,
    TopProducts,
    CategorySummary,
    InventoryValuation,
    Overstock,
}

impl ReportType {
    pub fn title(&self) -> &'static str {
        match self {
            ReportType::LowStock => "Low Stock Report",
            ReportType::TopProducts => "Top Products Report",
            ReportType::CategorySummary => "Category Summary Report",
            ReportType::InventoryValuation => "Inventory Valuation Report",
            ReportType::Overstock => "Overstock Report",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportRequest {
    pub report_type: ReportType,
    pub threshold: Option<f64>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub report_type: ReportType,
    pub title: String,
    pub summary: String,
    pub table: ResultTable,
}

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:top|below|under|less than|over|above|more than)\s+(\d+(?:\.\d+)?)")
            .expect("static regex")
    })
}

/// Maps a question onto a canned report, or None when nothing matches.
pub fn parse_request(question: &str) -> Option<ReportRequest> {
    let q = question.to_lowercase();
    let number = number_re()
        .captures(&q)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    let report_type = if q.contains("low stock") || q.contains("running low") {
        ReportType::LowStock
    } else if q.contains("top") && (q.contains("product") || q.contains("seller") || q.contains("sku")) {
        ReportType::TopProducts
    } else if q.contains("category") {
        ReportType::CategorySummary
    } else if q.contains("valuation") || q.contains("inventory value") {
        ReportType::InventoryValuation
    } else if q.contains("overstock") {
        ReportType::Overstock
    } else {
        return None;
    };

    let (threshold, limit) = match report_type {
        ReportType::TopProducts => (None, number.map(|n| n as usize)),
        _ => (number, None),
    };

    Some(ReportRequest {
        report_type,
        threshold,
        limit,
    })
}

fn report_sql(request: &ReportRequest) -> String {
    match request.report_type {
        ReportType::LowStock => format!(
            r#"SELECT k.sku_id, k.sku_name, i.warehouse_id,
       i.current_inventory_quantity AS on_hand,
       i.average_lead_time_days AS lead_time_days,
       i.vendor_name
FROM inventory i
JOIN skus k ON k.sku_id = i.sku_id
WHERE i.current_inventory_quantity < {}
ORDER BY i.current_inventory_quantity ASC"#,
            request.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
        ),
        ReportType::TopProducts => format!(
            r#"SELECT k.sku_id, k.sku_name, k.category,
       SUM(s.revenue) AS total_revenue,
       SUM(s.order_quantity) AS units_sold
FROM sales s
JOIN skus k ON k.sku_id = s.sku_id
GROUP BY k.sku_id, k.sku_name, k.category
ORDER BY total_revenue DESC
LIMIT {}"#,
            request.limit.unwrap_or(DEFAULT_TOP_LIMIT)
        ),
        ReportType::CategorySummary => r#"SELECT k.category,
       COUNT(DISTINCT k.sku_id) AS sku_count,
       SUM(i.current_inventory_quantity) AS total_units,
       SUM(i.total_value) AS total_value
FROM inventory i
JOIN skus k ON k.sku_id = i.sku_id
GROUP BY k.category
ORDER BY total_value DESC"#
            .to_string(),
        ReportType::InventoryValuation => r#"SELECT i.warehouse_id,
       COUNT(DISTINCT i.sku_id) AS sku_count,
       SUM(i.current_inventory_quantity) AS total_units,
       SUM(i.total_value) AS total_value
FROM inventory i
GROUP BY i.warehouse_id
ORDER BY total_value DESC"#
            .to_string(),
        ReportType::Overstock => format!(
            r#"SELECT k.sku_id, k.sku_name, i.warehouse_id,
       i.current_inventory_quantity AS on_hand,
       i.total_value
FROM inventory i
JOIN skus k ON k.sku_id = i.sku_id
WHERE i.current_inventory_quantity > {}
ORDER BY i.total_value DESC"#,
            request.threshold.unwrap_or(DEFAULT_OVERSTOCK_THRESHOLD)
        ),
    }
}

fn summarize(request: &ReportRequest, table: &ResultTable) -> String {
    let n = table.row_count();
    match request.report_type {
        ReportType::LowStock => format!(
            "{} items below {} units on hand.",
            n,
            request.threshold.unwrap_or(DEFAULT_LOW_STOCK_THRESHOLD)
        ),
        ReportType::TopProducts => {
            let leader = table.string_at(0, "sku_name").unwrap_or_default();
            if n == 0 {
                "No sales recorded.".to_string()
            } else {
                format!("Top {} products by revenue, led by {}.", n, leader)
            }
        }
        ReportType::CategorySummary => {
            let total: f64 = (0..n).filter_map(|i| table.f64_at(i, "total_value")).sum();
            format!("{} categories holding {:.2} in inventory value.", n, total)
        }
        ReportType::InventoryValuation => {
            let total: f64 = (0..n).filter_map(|i| table.f64_at(i, "total_value")).sum();
            format!(
                "{} warehouses with a combined inventory value of {:.2}.",
                n, total
            )
        }
        ReportType::Overstock => format!(
            "{} items above {} units on hand.",
            n,
            request.threshold.unwrap_or(DEFAULT_OVERSTOCK_THRESHOLD)
        ),
    }
}

pub async fn run(executor: &SqlExecutor, request: &ReportRequest) -> Result<Report, DbError> {
    let table = executor.execute(&report_sql(request)).await?;
    let summary = summarize(request, &table);
    Ok(Report {
        report_type: request.report_type,
        title: request.report_type.title().to_string(),
        summary,
        table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn routes_questions_to_report_types() {
        assert_eq!(
            parse_request("show me the low stock report").map(|r| r.report_type),
            Some(ReportType::LowStock)
        );
        assert_eq!(
            parse_request("top 5 products by revenue"),
            Some(ReportRequest {
                report_type: ReportType::TopProducts,
                threshold: None,
                limit: Some(5),
            })
        );
        assert_eq!(
            parse_request("summary by category").map(|r| r.report_type),
            Some(ReportType::CategorySummary)
        );
        assert_eq!(
            parse_request("inventory valuation by warehouse").map(|r| r.report_type),
            Some(ReportType::InventoryValuation)
        );
        assert_eq!(
            parse_request("overstock report over 800").map(|r| (r.report_type, r.threshold)),
            Some((ReportType::Overstock, Some(800.0)))
        );
        assert_eq!(parse_request("how is the weather"), None);
    }

    #[test]
    fn low_stock_threshold_lands_in_sql() {
        let request = ReportRequest {
            report_type: ReportType::LowStock,
            threshold: Some(25.0),
            limit: None,
        };
        let sql = report_sql(&request);
        assert!(sql.contains("current_inventory_quantity < 25"));
        assert!(sql.trim_start().to_lowercase().starts_with("select"));
    }

    #[test]
    fn top_products_limit_defaults() {
        let request = ReportRequest {
            report_type: ReportType::TopProducts,
            threshold: None,
            limit: None,
        };
        assert!(report_sql(&request).contains("LIMIT 10"));
    }

    #[test]
    fn summary_reports_totals() {
        let mut table = ResultTable::new(vec!["warehouse_id".into(), "total_value".into()]);
        table.rows.push(vec![json!("W1"), json!(100.0)]);
        table.rows.push(vec![json!("W2"), json!(50.5)]);
        let request = ReportRequest {
            report_type: ReportType::InventoryValuation,
            threshold: None,
            limit: None,
        };
        let summary = summarize(&request, &table);
        assert!(summary.contains("2 warehouses"));
        assert!(summary.contains("150.50"));
    }

    #[test]
    fn templates_pass_read_only_guard() {
        // All templates must be plain SELECTs so the read-only guard passes.
        for report_type in [
            ReportType::LowStock,
            ReportType::TopProducts,
            ReportType::CategorySummary,
            ReportType::InventoryValuation,
            ReportType::Overstock,
        ] {
            let request = ReportRequest {
                report_type,
                threshold: None,
                limit: None,
            };
            assert!(crate::db::read_only_violation(&report_sql(&request)).is_none());
        }
    }
}
