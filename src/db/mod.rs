pub mod duckdb_pool;
pub mod executor;
pub mod table;

use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum DbError {
    /// The statement failed the read-only guard and never reached a database.
    Rejected(String),
    Connection(String),
    Execution(String),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::Rejected(msg) => write!(f, "statement rejected: {}", msg),
            DbError::Connection(msg) => write!(f, "database connection error: {}", msg),
            DbError::Execution(msg) => write!(f, "database error: {}", msg),
        }
    }
}

impl Error for DbError {}

/// Returns a rejection reason unless the statement is a SELECT or WITH query.
///
/// This is a prefix check, not a parse; chained statements or CTEs wrapping
/// mutations would slip through. The gap is documented in DESIGN.md.
pub fn read_only_violation(sql: &str) -> Option<String> {
    let head = sql.trim_start().to_lowercase();
    if head.starts_with("select") || head.starts_with("with") {
        None
    } else {
        Some("only SELECT or WITH statements are allowed".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_and_with_pass() {
        assert!(read_only_violation("SELECT 1").is_none());
        assert!(read_only_violation("  select * from inventory").is_none());
        assert!(read_only_violation("WITH x AS (SELECT 1) SELECT * FROM x").is_none());
        assert!(read_only_violation("\n\twith t as (select 2) select * from t").is_none());
    }

    #[test]
    fn destructive_statements_rejected() {
        assert!(read_only_violation("DROP TABLE sales").is_some());
        assert!(read_only_violation("DELETE FROM inventory").is_some());
        assert!(read_only_violation("INSERT INTO sales VALUES (1)").is_some());
        assert!(read_only_violation("UPDATE inventory SET total_value = 0").is_some());
        assert!(read_only_violation("").is_some());
    }
}
