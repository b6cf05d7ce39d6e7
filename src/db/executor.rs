use r2d2::Pool;
use rust_decimal::prelude::ToPrimitive;
use serde_json::Value;
use sqlx::{Column, Executor, Row, TypeInfo};
use tracing::{debug, error};

use crate::db::duckdb_pool::DuckDbConnectionManager;
use crate::db::table::ResultTable;
use crate::db::{read_only_violation, DbError};

/// Executes generated SQL against the configured backend. Every statement
/// passes the read-only guard before any connection is touched.
pub enum SqlExecutor {
    DuckDb(Pool<DuckDbConnectionManager>),
    Postgres(sqlx::PgPool),
}

impl SqlExecutor {
    pub fn backend_name(&self) -> &'static str {
        match self {
            SqlExecutor::DuckDb(_) => "duckdb",
            SqlExecutor::Postgres(_) => "postgres",
        }
    }

    pub async fn execute(&self, sql: &str) -> Result<ResultTable, DbError> {
        if let Some(reason) = read_only_violation(sql) {
            return Err(DbError::Rejected(reason));
        }

        debug!("Executing SQL on {}: {}", self.backend_name(), sql);

        match self {
            SqlExecutor::DuckDb(pool) => {
                let pool = pool.clone();
                let sql = sql.to_string();
                // DuckDB connections are not Send-friendly across awaits, so
                // run the whole query on a blocking thread as the pool owner.
                let result = tokio::task::spawn_blocking(move || execute_duckdb(&pool, &sql))
                    .await
                    .map_err(|e| DbError::Execution(format!("task join error: {}", e)))?;
                result
            }
            SqlExecutor::Postgres(pool) => execute_postgres(pool, sql).await,
        }
    }
}

fn execute_duckdb(
    pool: &Pool<DuckDbConnectionManager>,
    sql: &str,
) -> Result<ResultTable, DbError> {
    let conn = pool.get().map_err(|e| {
        error!("Failed to get DuckDB connection: {}", e);
        DbError::Connection(e.to_string())
    })?;

    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| DbError::Execution(e.to_string()))?;

    let column_count = stmt.column_count();
    let mut columns = Vec::with_capacity(column_count);
    for i in 0..column_count {
        match stmt.column_name(i) {
            Ok(name) => columns.push(name.to_string()),
            Err(_) => columns.push(format!("column_{}", i)),
        }
    }
    let mut table = ResultTable::new(columns);

    let mut rows = stmt.query([]).map_err(|e| DbError::Execution(e.to_string()))?;
    while let Some(row) = rows.next().map_err(|e| DbError::Execution(e.to_string()))? {
        let mut values = Vec::with_capacity(column_count);
        for i in 0..column_count {
            values.push(duckdb_value_to_json(row, i));
        }
        table.rows.push(values);
    }

    Ok(table)
}

fn duckdb_value_to_json(row: &duckdb::Row<'_>, idx: usize) -> Value {
    use duckdb::types::ValueRef;

    match row.get_ref(idx) {
        Ok(ValueRef::Null) => Value::Null,
        Ok(ValueRef::Boolean(b)) => Value::Bool(b),
        Ok(ValueRef::TinyInt(v)) => Value::from(v),
        Ok(ValueRef::SmallInt(v)) => Value::from(v),
        Ok(ValueRef::Int(v)) => Value::from(v),
        Ok(ValueRef::BigInt(v)) => Value::from(v),
        Ok(ValueRef::UTinyInt(v)) => Value::from(v),
        Ok(ValueRef::USmallInt(v)) => Value::from(v),
        Ok(ValueRef::UInt(v)) => Value::from(v),
        Ok(ValueRef::UBigInt(v)) => Value::from(v),
        Ok(ValueRef::Float(v)) => Value::from(v),
        Ok(ValueRef::Double(v)) => Value::from(v),
        Ok(ValueRef::Text(t)) => Value::String(String::from_utf8_lossy(t).into_owned()),
        // Dates, timestamps, decimals and the rest render through the
        // driver's string conversion.
        Ok(_) => match row.get::<_, String>(idx) {
            Ok(s) => Value::String(s),
            Err(_) => Value::Null,
        },
        Err(_) => Value::Null,
    }
}

async fn execute_postgres(pool: &sqlx::PgPool, sql: &str) -> Result<ResultTable, DbError> {
    let pg_rows = sqlx::query(sql)
        .fetch_all(pool)
        .await
        .map_err(|e| DbError::Execution(e.to_string()))?;

    let Some(first) = pg_rows.first() else {
        // Zero rows carry no column metadata; describe the statement so the
        // caller still sees headers, matching the DuckDB path.
        let columns = match pool.describe(sql).await {
            Ok(described) => described
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                debug!("Could not describe statement for empty result: {}", e);
                Vec::new()
            }
        };
        return Ok(ResultTable::new(columns));
    };

    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    let mut table = ResultTable::new(columns);
    for row in &pg_rows {
        let mut values = Vec::with_capacity(table.columns.len());
        for idx in 0..table.columns.len() {
            values.push(pg_value_to_json(row, idx));
        }
        table.rows.push(values);
    }

    Ok(table)
}

fn pg_value_to_json(row: &sqlx::postgres::PgRow, idx: usize) -> Value {
    let type_name = row.columns()[idx].type_info().name().to_string();

    match type_name.as_str() {
        "BOOL" => row
            .try_get::<Option<bool>, _>(idx)
            .ok()
            .flatten()
            .map(Value::Bool)
            .unwrap_or(Value::Null),
        "INT2" => opt_num(row.try_get::<Option<i16>, _>(idx).ok().flatten().map(i64::from)),
        "INT4" => opt_num(row.try_get::<Option<i32>, _>(idx).ok().flatten().map(i64::from)),
        "INT8" => opt_num(row.try_get::<Option<i64>, _>(idx).ok().flatten()),
        "FLOAT4" => opt_f64(row.try_get::<Option<f32>, _>(idx).ok().flatten().map(f64::from)),
        "FLOAT8" => opt_f64(row.try_get::<Option<f64>, _>(idx).ok().flatten()),
        "NUMERIC" => opt_f64(
            row.try_get::<Option<rust_decimal::Decimal>, _>(idx)
                .ok()
                .flatten()
                .and_then(|d| d.to_f64()),
        ),
        "DATE" => row
            .try_get::<Option<chrono::NaiveDate>, _>(idx)
            .ok()
            .flatten()
            .map(|d| Value::String(d.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMP" => row
            .try_get::<Option<chrono::NaiveDateTime>, _>(idx)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_string()))
            .unwrap_or(Value::Null),
        "TIMESTAMPTZ" => row
            .try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(idx)
            .ok()
            .flatten()
            .map(|t| Value::String(t.to_rfc3339()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get::<Option<String>, _>(idx)
            .ok()
            .flatten()
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

fn opt_num(v: Option<i64>) -> Value {
    v.map(Value::from).unwrap_or(Value::Null)
}

fn opt_f64(v: Option<f64>) -> Value {
    v.map(Value::from).unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn duckdb_executor() -> SqlExecutor {
        let manager = DuckDbConnectionManager::new(":memory:".to_string());
        let pool = Pool::builder().max_size(1).build(manager).unwrap();
        SqlExecutor::DuckDb(pool)
    }

    #[tokio::test]
    async fn empty_results_keep_column_headers() {
        let executor = duckdb_executor();
        let table = executor
            .execute("SELECT 1 AS x, 'a' AS y WHERE 1 = 0")
            .await
            .unwrap();
        assert!(table.is_empty());
        assert_eq!(table.columns, vec!["x".to_string(), "y".to_string()]);
    }

    #[tokio::test]
    async fn mutations_are_rejected_before_the_pool() {
        let executor = duckdb_executor();
        let err = executor.execute("DROP TABLE sales").await.unwrap_err();
        assert!(matches!(err, DbError::Rejected(_)));
    }
}
