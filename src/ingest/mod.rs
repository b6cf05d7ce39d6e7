use crate::db::duckdb_pool::DuckDbConnectionManager;
use crate::db::executor::SqlExecutor;
use r2d2::Pool;
use std::error::Error;
use std::fmt;
use std::path::Path;
use tracing::info;

#[derive(Debug)]
pub enum IngestError {
    Unsupported(String),
    InvalidInput(String),
    Load(String),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestError::Unsupported(msg) => write!(f, "ingest not supported: {}", msg),
            IngestError::InvalidInput(msg) => write!(f, "invalid ingest input: {}", msg),
            IngestError::Load(msg) => write!(f, "ingest failed: {}", msg),
        }
    }
}

impl Error for IngestError {}

/// Table names come from user input; only a strict identifier shape is
/// allowed since they are spliced into DDL.
fn valid_table_name(name: &str) -> bool {
    !name.is_empty()
        && name.chars().next().map(|c| c.is_ascii_alphabetic() || c == '_').unwrap_or(false)
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Loads a CSV file into a DuckDB table via read_csv_auto, replacing any
/// existing table of that name. Returns the loaded row count.
pub async fn csv_into_table(
    executor: &SqlExecutor,
    table: &str,
    csv_path: &Path,
) -> Result<usize, IngestError> {
    let SqlExecutor::DuckDb(pool) = executor else {
        return Err(IngestError::Unsupported(
            "CSV ingest requires the duckdb backend".to_string(),
        ));
    };

    if !valid_table_name(table) {
        return Err(IngestError::InvalidInput(format!(
            "invalid table name: {}",
            table
        )));
    }
    if !csv_path.exists() {
        return Err(IngestError::InvalidInput(format!(
            "file not found: {}",
            csv_path.display()
        )));
    }

    let pool = pool.clone();
    let table = table.to_string();
    let path = csv_path.to_string_lossy().replace('\'', "''");

    let count = tokio::task::spawn_blocking(move || load_csv(&pool, &table, &path))
        .await
        .map_err(|e| IngestError::Load(format!("task join error: {}", e)))??;

    Ok(count)
}

fn load_csv(
    pool: &Pool<DuckDbConnectionManager>,
    table: &str,
    path: &str,
) -> Result<usize, IngestError> {
    let conn = pool.get().map_err(|e| IngestError::Load(e.to_string()))?;

    let create = format!(
        "CREATE OR REPLACE TABLE {} AS SELECT * FROM read_csv_auto('{}')",
        table, path
    );
    conn.execute_batch(&create)
        .map_err(|e| IngestError::Load(e.to_string()))?;

    let count: i64 = conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
            row.get(0)
        })
        .map_err(|e| IngestError::Load(e.to_string()))?;

    info!("Loaded {} rows into table {}", count, table);
    Ok(count.max(0) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_name_validation() {
        assert!(valid_table_name("sales"));
        assert!(valid_table_name("_staging_2024"));
        assert!(!valid_table_name(""));
        assert!(!valid_table_name("2024sales"));
        assert!(!valid_table_name("sales; DROP TABLE skus"));
        assert!(!valid_table_name("sales-data"));
    }
}
