use crate::config::AnalyticsConfig;
use crate::db::executor::SqlExecutor;
use crate::db::table::ResultTable;
use crate::db::DbError;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;

/// Stock position labels, ordered from worst to best-then-too-much.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    NoSales,
    Critical,
    Warning,
    Healthy,
    Good,
    Overstock,
}

impl StockStatus {
    pub fn label(&self) -> &'static str {
        match self {
            StockStatus::NoSales => "No Sales",
            StockStatus::Critical => "Critical",
            StockStatus::Warning => "Warning",
            StockStatus::Healthy => "Healthy",
            StockStatus::Good => "Good",
            StockStatus::Overstock => "Overstock",
        }
    }
}

/// Labels a stock position from average daily sales and days of cover.
///
/// No sales means cover is undefined. Cover between healthy_days and
/// overstock_days is "Good"; the band is part of the policy, not a gap.
pub fn classify_status(
    avg_daily_sales: f64,
    cover_days: Option<f64>,
    config: &AnalyticsConfig,
) -> StockStatus {
    if avg_daily_sales <= 0.0 {
        return StockStatus::NoSales;
    }
    let Some(cover) = cover_days else {
        return StockStatus::NoSales;
    };
    if cover < config.critical_days {
        StockStatus::Critical
    } else if cover < config.warning_days {
        StockStatus::Warning
    } else if cover < config.healthy_days {
        StockStatus::Healthy
    } else if cover >= config.overstock_days {
        StockStatus::Overstock
    } else {
        StockStatus::Good
    }
}

/// Stockout risk relative to replenishment lead time. Unknown lead time
/// means no risk call can be made.
pub fn classify_stockout_risk(cover_days: f64, lead_time_days: Option<f64>) -> Option<&'static str> {
    let lead = lead_time_days?;
    if lead <= 0.0 {
        return None;
    }
    if cover_days < lead {
        Some("At Risk")
    } else if cover_days < 1.5 * lead {
        Some("Warning")
    } else {
        Some("Safe")
    }
}

/// One sku/warehouse position from the cover query.
#[derive(Debug, Clone)]
pub struct StockCoverRow {
    pub sku_id: String,
    pub sku_name: String,
    pub warehouse_id: String,
    pub avg_daily_sales: f64,
    pub on_hand: f64,
    pub stock_cover_days: Option<f64>,
    pub lead_time_days: Option<f64>,
    pub total_value: f64,
}

impl StockCoverRow {
    fn from_table(table: &ResultTable) -> Vec<StockCoverRow> {
        (0..table.row_count())
            .filter_map(|i| {
                Some(StockCoverRow {
                    sku_id: table.string_at(i, "sku_id")?,
                    sku_name: table.string_at(i, "sku_name").unwrap_or_default(),
                    warehouse_id: table.string_at(i, "warehouse_id").unwrap_or_default(),
                    avg_daily_sales: table.f64_at(i, "avg_daily_sales").unwrap_or(0.0),
                    on_hand: table.f64_at(i, "on_hand").unwrap_or(0.0),
                    stock_cover_days: table.f64_at(i, "stock_cover_days"),
                    lead_time_days: table.f64_at(i, "lead_time_days"),
                    total_value: table.f64_at(i, "total_value").unwrap_or(0.0),
                })
            })
            .collect()
    }
}

/// The analytics operations a question can route to.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsRequest {
    StockCover { below_days: Option<f64> },
    Restock,
    Overstock,
    StockoutPrediction { threshold_days: Option<f64> },
    Turnover,
    WarehouseSummary,
}

fn threshold_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:under|below|less than|within)\s+(\d+(?:\.\d+)?)\s*days?")
            .expect("static regex")
    })
}

/// Keyword router from a question to an analytics operation. Returns None
/// when the question does not look like any known operation.
pub fn parse_request(question: &str) -> Option<AnalyticsRequest> {
    let q = question.to_lowercase();
    let threshold = threshold_re()
        .captures(&q)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    if q.contains("restock") || q.contains("reorder") || q.contains("replenish") {
        return Some(AnalyticsRequest::Restock);
    }
    if q.contains("overstock") || q.contains("excess stock") || q.contains("too much stock") {
        return Some(AnalyticsRequest::Overstock);
    }
    if q.contains("stockout") || q.contains("stock out") || q.contains("run out") {
        return Some(AnalyticsRequest::StockoutPrediction {
            threshold_days: threshold,
        });
    }
    if q.contains("turnover") {
        return Some(AnalyticsRequest::Turnover);
    }
    if q.contains("summary") || q.contains("overview") || q.contains("health") {
        return Some(AnalyticsRequest::WarehouseSummary);
    }
    if q.contains("stock cover") || q.contains("cover") || q.contains("days of stock") {
        return Some(AnalyticsRequest::StockCover {
            below_days: threshold,
        });
    }
    None
}

pub struct AnalyticsAgent {
    config: AnalyticsConfig,
}

impl AnalyticsAgent {
    pub fn new(config: AnalyticsConfig) -> Self {
        Self { config }
    }

    /// Cover query shared by every operation. Anchored at the latest order
    /// date in the data rather than the wall clock, so stale datasets still
    /// produce meaningful averages.
    fn cover_sql(&self) -> String {
        let period = self.config.sales_period_days;
        format!(
            r#"WITH anchor AS (
    SELECT MAX(order_date) AS max_date FROM sales
),
recent_sales AS (
    SELECT s.sku_id, s.warehouse_id,
           CAST(SUM(s.order_quantity) AS DOUBLE PRECISION) / {period} AS avg_daily_sales
    FROM sales s, anchor a
    WHERE s.order_date > a.max_date - INTERVAL '{period} days'
    GROUP BY s.sku_id, s.warehouse_id
)
SELECT k.sku_id,
       k.sku_name,
       i.warehouse_id,
       COALESCE(r.avg_daily_sales, 0) AS avg_daily_sales,
       i.current_inventory_quantity AS on_hand,
       CASE WHEN COALESCE(r.avg_daily_sales, 0) > 0
            THEN i.current_inventory_quantity / r.avg_daily_sales
            ELSE NULL END AS stock_cover_days,
       i.average_lead_time_days AS lead_time_days,
       i.total_value AS total_value
FROM inventory i
JOIN skus k ON k.sku_id = i.sku_id
LEFT JOIN recent_sales r
       ON r.sku_id = i.sku_id AND r.warehouse_id = i.warehouse_id
ORDER BY stock_cover_days ASC NULLS LAST"#,
            period = period
        )
    }

    fn turnover_sql(&self) -> String {
        let period = self.config.turnover_period_days;
        format!(
            r#"WITH anchor AS (
    SELECT MAX(order_date) AS max_date FROM sales
),
recent AS (
    SELECT s.sku_id,
           SUM(s.order_quantity) AS units_sold,
           SUM(s.revenue) AS revenue
    FROM sales s, anchor a
    WHERE s.order_date > a.max_date - INTERVAL '{period} days'
    GROUP BY s.sku_id
),
stock AS (
    SELECT sku_id, SUM(current_inventory_quantity) AS on_hand
    FROM inventory
    GROUP BY sku_id
)
SELECT k.sku_id,
       k.sku_name,
       k.category,
       COALESCE(r.units_sold, 0) AS units_sold,
       COALESCE(r.revenue, 0) AS revenue,
       COALESCE(st.on_hand, 0) AS on_hand,
       CASE WHEN COALESCE(st.on_hand, 0) > 0
            THEN CAST(COALESCE(r.units_sold, 0) AS DOUBLE PRECISION) / st.on_hand
            ELSE NULL END AS turnover_ratio,
       CASE WHEN COALESCE(r.units_sold, 0) > 0
            THEN {period} * CAST(st.on_hand AS DOUBLE PRECISION) / r.units_sold
            ELSE NULL END AS days_to_sell
FROM skus k
LEFT JOIN stock st ON st.sku_id = k.sku_id
LEFT JOIN recent r ON r.sku_id = k.sku_id
ORDER BY turnover_ratio DESC NULLS LAST"#,
            period = period
        )
    }

    pub async fn run(
        &self,
        executor: &SqlExecutor,
        request: &AnalyticsRequest,
    ) -> Result<ResultTable, DbError> {
        if matches!(request, AnalyticsRequest::Turnover) {
            return executor.execute(&self.turnover_sql()).await;
        }

        let cover = executor.execute(&self.cover_sql()).await?;
        let rows = StockCoverRow::from_table(&cover);
        Ok(match request {
            AnalyticsRequest::StockCover { below_days } => {
                self.stock_cover_table(&rows, *below_days)
            }
            AnalyticsRequest::Restock => self.restock_table(&rows),
            AnalyticsRequest::Overstock => self.overstock_table(&rows),
            AnalyticsRequest::StockoutPrediction { threshold_days } => {
                self.stockout_table(&rows, *threshold_days)
            }
            _ => self.summary_table(&rows),
        })
    }

    fn stock_cover_table(&self, rows: &[StockCoverRow], below_days: Option<f64>) -> ResultTable {
        let mut table = ResultTable::new(vec![
            "sku_id".into(),
            "sku_name".into(),
            "warehouse_id".into(),
            "on_hand".into(),
            "avg_daily_sales".into(),
            "stock_cover_days".into(),
            "status".into(),
        ]);
        for row in rows {
            if let Some(limit) = below_days {
                match row.stock_cover_days {
                    Some(cover) if cover < limit => {}
                    _ => continue,
                }
            }
            let status = classify_status(row.avg_daily_sales, row.stock_cover_days, &self.config);
            table.rows.push(vec![
                json!(row.sku_id),
                json!(row.sku_name),
                json!(row.warehouse_id),
                json!(row.on_hand),
                json!(round2(row.avg_daily_sales)),
                opt_round2(row.stock_cover_days),
                json!(status.label()),
            ]);
        }
        // Lowest cover first; no-sales rows (NULL cover) sink to the end.
        table.sort_by_f64("stock_cover_days", true);
        table
    }

    /// Critical and Warning items, with the order quantity that tops each
    /// one back up to the target cover and an urgency call vs lead time.
    fn restock_table(&self, rows: &[StockCoverRow]) -> ResultTable {
        let mut table = ResultTable::new(vec![
            "sku_id".into(),
            "sku_name".into(),
            "warehouse_id".into(),
            "on_hand".into(),
            "stock_cover_days".into(),
            "status".into(),
            "recommended_order_qty".into(),
            "urgency".into(),
        ]);
        for row in rows {
            let Some(cover) = row.stock_cover_days else {
                continue;
            };
            let status = classify_status(row.avg_daily_sales, Some(cover), &self.config);
            if !matches!(status, StockStatus::Critical | StockStatus::Warning) {
                continue;
            }
            let reorder = ((self.config.target_cover_days - cover) * row.avg_daily_sales)
                .max(0.0)
                .ceil();
            let urgency = classify_stockout_risk(cover, row.lead_time_days);
            table.rows.push(vec![
                json!(row.sku_id),
                json!(row.sku_name),
                json!(row.warehouse_id),
                json!(row.on_hand),
                json!(round2(cover)),
                json!(status.label()),
                json!(reorder),
                urgency.map(|u| json!(u)).unwrap_or(Value::Null),
            ]);
        }
        table
    }

    /// Items above the overstock threshold, valued at their average unit
    /// cost from the inventory snapshot.
    fn overstock_table(&self, rows: &[StockCoverRow]) -> ResultTable {
        let mut table = ResultTable::new(vec![
            "sku_id".into(),
            "sku_name".into(),
            "warehouse_id".into(),
            "on_hand".into(),
            "stock_cover_days".into(),
            "excess_units".into(),
            "excess_value".into(),
        ]);
        let mut scored: Vec<(f64, Vec<Value>)> = Vec::new();
        for row in rows {
            let Some(cover) = row.stock_cover_days else {
                continue;
            };
            if cover < self.config.overstock_days || row.avg_daily_sales <= 0.0 {
                continue;
            }
            let excess_units =
                ((cover - self.config.overstock_target_days) * row.avg_daily_sales).max(0.0);
            let cost_per_unit = if row.on_hand > 0.0 {
                row.total_value / row.on_hand
            } else {
                0.0
            };
            let excess_value = excess_units * cost_per_unit;
            scored.push((
                excess_value,
                vec![
                    json!(row.sku_id),
                    json!(row.sku_name),
                    json!(row.warehouse_id),
                    json!(row.on_hand),
                    json!(round2(cover)),
                    json!(round2(excess_units)),
                    json!(round2(excess_value)),
                ],
            ));
        }
        scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));
        table.rows = scored.into_iter().map(|(_, r)| r).collect();
        table
    }

    /// Projects a stockout date for every moving item under the threshold.
    /// Items that will run out inside their lead time are flagged emergency.
    fn stockout_table(&self, rows: &[StockCoverRow], threshold_days: Option<f64>) -> ResultTable {
        let threshold = threshold_days.unwrap_or(self.config.warning_days);
        let today = chrono::Utc::now().date_naive();
        let mut table = ResultTable::new(vec![
            "sku_id".into(),
            "sku_name".into(),
            "warehouse_id".into(),
            "stock_cover_days".into(),
            "predicted_stockout_date".into(),
            "lead_time_days".into(),
            "risk".into(),
            "emergency".into(),
        ]);
        for row in rows {
            let Some(cover) = row.stock_cover_days else {
                continue;
            };
            if row.avg_daily_sales <= 0.0 || cover <= 0.0 || cover >= threshold {
                continue;
            }
            let stockout_date = today + chrono::Duration::days(cover.floor() as i64);
            let risk = classify_stockout_risk(cover, row.lead_time_days);
            let emergency = row
                .lead_time_days
                .map(|lead| lead > 0.0 && cover < lead)
                .unwrap_or(false);
            table.rows.push(vec![
                json!(row.sku_id),
                json!(row.sku_name),
                json!(row.warehouse_id),
                json!(round2(cover)),
                json!(stockout_date.to_string()),
                opt_round2(row.lead_time_days),
                risk.map(|r| json!(r)).unwrap_or(Value::Null),
                json!(emergency),
            ]);
        }
        table
    }

    /// Per-warehouse cover statistics plus critical/overstock counts.
    fn summary_table(&self, rows: &[StockCoverRow]) -> ResultTable {
        use std::collections::BTreeMap;

        let mut by_warehouse: BTreeMap<String, Vec<&StockCoverRow>> = BTreeMap::new();
        for row in rows {
            by_warehouse
                .entry(row.warehouse_id.clone())
                .or_default()
                .push(row);
        }

        let mut table = ResultTable::new(vec![
            "warehouse_id".into(),
            "sku_count".into(),
            "mean_cover_days".into(),
            "median_cover_days".into(),
            "min_cover_days".into(),
            "max_cover_days".into(),
            "critical_count".into(),
            "overstock_count".into(),
        ]);

        for (warehouse, group) in by_warehouse {
            let mut covers: Vec<f64> = group
                .iter()
                .filter_map(|r| r.stock_cover_days)
                .collect();
            covers.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

            let mean = if covers.is_empty() {
                None
            } else {
                Some(covers.iter().sum::<f64>() / covers.len() as f64)
            };
            let median = median_of(&covers);
            let min = covers.first().copied();
            let max = covers.last().copied();

            let mut critical = 0usize;
            let mut overstock = 0usize;
            for row in &group {
                match classify_status(row.avg_daily_sales, row.stock_cover_days, &self.config) {
                    StockStatus::Critical => critical += 1,
                    StockStatus::Overstock => overstock += 1,
                    _ => {}
                }
            }

            table.rows.push(vec![
                json!(warehouse),
                json!(group.len()),
                opt_round2(mean),
                opt_round2(median),
                opt_round2(min),
                opt_round2(max),
                json!(critical),
                json!(overstock),
            ]);
        }
        table
    }
}

fn median_of(sorted: &[f64]) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    } else {
        Some(sorted[mid])
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn opt_round2(v: Option<f64>) -> Value {
    v.map(|x| json!(round2(x))).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> AnalyticsConfig {
        AnalyticsConfig::default()
    }

    fn row(
        sku: &str,
        avg: f64,
        on_hand: f64,
        cover: Option<f64>,
        lead: Option<f64>,
        value: f64,
    ) -> StockCoverRow {
        StockCoverRow {
            sku_id: sku.to_string(),
            sku_name: format!("{} name", sku),
            warehouse_id: "W1".to_string(),
            avg_daily_sales: avg,
            on_hand,
            stock_cover_days: cover,
            lead_time_days: lead,
            total_value: value,
        }
    }

    #[test]
    fn status_ladder_boundaries() {
        let c = cfg();
        assert_eq!(classify_status(0.0, None, &c), StockStatus::NoSales);
        assert_eq!(classify_status(2.0, None, &c), StockStatus::NoSales);
        assert_eq!(classify_status(2.0, Some(10.0), &c), StockStatus::Critical);
        assert_eq!(classify_status(2.0, Some(14.99), &c), StockStatus::Critical);
        assert_eq!(classify_status(2.0, Some(15.0), &c), StockStatus::Warning);
        assert_eq!(classify_status(2.0, Some(29.99), &c), StockStatus::Warning);
        assert_eq!(classify_status(2.0, Some(30.0), &c), StockStatus::Healthy);
        assert_eq!(classify_status(2.0, Some(45.0), &c), StockStatus::Healthy);
        assert_eq!(classify_status(2.0, Some(60.0), &c), StockStatus::Good);
        assert_eq!(classify_status(2.0, Some(89.99), &c), StockStatus::Good);
        assert_eq!(classify_status(2.0, Some(90.0), &c), StockStatus::Overstock);
    }

    #[test]
    fn stockout_risk_relative_to_lead_time() {
        assert_eq!(classify_stockout_risk(5.0, Some(7.0)), Some("At Risk"));
        assert_eq!(classify_stockout_risk(8.0, Some(7.0)), Some("Warning"));
        assert_eq!(classify_stockout_risk(11.0, Some(7.0)), Some("Safe"));
        assert_eq!(classify_stockout_risk(5.0, None), None);
        assert_eq!(classify_stockout_risk(5.0, Some(0.0)), None);
    }

    #[test]
    fn parses_requests_with_thresholds() {
        assert_eq!(
            parse_request("which items will stock out within 10 days?"),
            Some(AnalyticsRequest::StockoutPrediction {
                threshold_days: Some(10.0)
            })
        );
        assert_eq!(
            parse_request("show stock cover below 20 days"),
            Some(AnalyticsRequest::StockCover {
                below_days: Some(20.0)
            })
        );
        assert_eq!(parse_request("what should we restock?"), Some(AnalyticsRequest::Restock));
        assert_eq!(parse_request("any overstock?"), Some(AnalyticsRequest::Overstock));
        assert_eq!(parse_request("inventory turnover please"), Some(AnalyticsRequest::Turnover));
        assert_eq!(
            parse_request("give me a warehouse summary"),
            Some(AnalyticsRequest::WarehouseSummary)
        );
        assert_eq!(parse_request("what color is sku A?"), None);
    }

    #[test]
    fn restock_tops_up_to_target() {
        let agent = AnalyticsAgent::new(cfg());
        let rows = vec![
            row("A", 2.0, 20.0, Some(10.0), Some(14.0), 100.0),
            row("B", 1.0, 100.0, Some(100.0), None, 100.0),
            row("C", 0.0, 50.0, None, None, 100.0),
            // Healthy cover (40d) stays off the restock list.
            row("D", 2.0, 80.0, Some(40.0), None, 100.0),
        ];
        let table = agent.restock_table(&rows);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.string_at(0, "sku_id").as_deref(), Some("A"));
        // (45 - 10) * 2 = 70
        assert_eq!(table.f64_at(0, "recommended_order_qty"), Some(70.0));
        assert_eq!(table.string_at(0, "urgency").as_deref(), Some("At Risk"));
    }

    #[test]
    fn overstock_values_excess_at_unit_cost() {
        let agent = AnalyticsAgent::new(cfg());
        let rows = vec![
            row("A", 1.0, 120.0, Some(120.0), None, 240.0),
            row("B", 1.0, 30.0, Some(30.0), None, 60.0),
        ];
        let table = agent.overstock_table(&rows);
        assert_eq!(table.row_count(), 1);
        // excess = (120 - 60) * 1 = 60 units at 240/120 = 2.0 each
        assert_eq!(table.f64_at(0, "excess_units"), Some(60.0));
        assert_eq!(table.f64_at(0, "excess_value"), Some(120.0));
    }

    #[test]
    fn stockout_prediction_flags_emergencies() {
        let agent = AnalyticsAgent::new(cfg());
        let rows = vec![
            row("A", 2.0, 10.0, Some(5.0), Some(7.0), 100.0),
            row("B", 2.0, 40.0, Some(20.0), Some(7.0), 100.0),
            row("C", 2.0, 200.0, Some(100.0), Some(7.0), 100.0),
        ];
        let table = agent.stockout_table(&rows, None);
        assert_eq!(table.row_count(), 2);
        assert_eq!(table.string_at(0, "risk").as_deref(), Some("At Risk"));
        assert_eq!(table.value(0, "emergency"), Some(&json!(true)));
        assert_eq!(table.string_at(1, "risk").as_deref(), Some("Safe"));
        assert_eq!(table.value(1, "emergency"), Some(&json!(false)));
    }

    #[test]
    fn summary_counts_and_stats() {
        let agent = AnalyticsAgent::new(cfg());
        let rows = vec![
            row("A", 2.0, 20.0, Some(10.0), None, 100.0),
            row("B", 2.0, 80.0, Some(40.0), None, 100.0),
            row("C", 1.0, 100.0, Some(100.0), None, 100.0),
        ];
        let table = agent.summary_table(&rows);
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.f64_at(0, "sku_count"), Some(3.0));
        assert_eq!(table.f64_at(0, "median_cover_days"), Some(40.0));
        assert_eq!(table.f64_at(0, "critical_count"), Some(1.0));
        assert_eq!(table.f64_at(0, "overstock_count"), Some(1.0));
        assert_eq!(table.f64_at(0, "mean_cover_days"), Some(50.0));
    }

    #[test]
    fn cover_filter_applies() {
        let agent = AnalyticsAgent::new(cfg());
        let rows = vec![
            row("A", 2.0, 20.0, Some(10.0), None, 100.0),
            row("B", 2.0, 80.0, Some(40.0), None, 100.0),
        ];
        let table = agent.stock_cover_table(&rows, Some(20.0));
        assert_eq!(table.row_count(), 1);
        assert_eq!(table.string_at(0, "status").as_deref(), Some("Critical"));
    }

    #[test]
    fn cover_rows_sorted_ascending_nulls_last() {
        let agent = AnalyticsAgent::new(cfg());
        let rows = vec![
            row("B", 2.0, 80.0, Some(40.0), None, 100.0),
            row("C", 0.0, 50.0, None, None, 100.0),
            row("A", 2.0, 20.0, Some(10.0), None, 100.0),
        ];
        let table = agent.stock_cover_table(&rows, None);
        assert_eq!(table.string_at(0, "sku_id").as_deref(), Some("A"));
        assert_eq!(table.string_at(1, "sku_id").as_deref(), Some("B"));
        assert_eq!(table.string_at(2, "sku_id").as_deref(), Some("C"));
        assert_eq!(table.string_at(2, "status").as_deref(), Some("No Sales"));
    }

    #[test]
    fn templates_pass_read_only_guard_and_order_by_cover() {
        let agent = AnalyticsAgent::new(cfg());
        let cover = agent.cover_sql();
        let turnover = agent.turnover_sql();
        assert!(crate::db::read_only_violation(&cover).is_none());
        assert!(crate::db::read_only_violation(&turnover).is_none());
        assert!(cover.contains("ORDER BY stock_cover_days ASC NULLS LAST"));
        assert!(turnover.contains("ORDER BY turnover_ratio DESC NULLS LAST"));
    }
}
