pub mod embedding;
pub mod index;
pub mod retriever;

use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::path::Path;
use tracing::warn;

/// A curated question/SQL pair used as few-shot context for SQL generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FewShotExample {
    pub question: String,
    pub sql: String,
}

/// Loads examples from a JSONL file, skipping blank and malformed lines.
pub fn load_examples(path: &Path) -> std::io::Result<Vec<FewShotExample>> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);

    let mut examples = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<FewShotExample>(&line) {
            Ok(example) => examples.push(example),
            Err(e) => {
                warn!(
                    "Skipping malformed example at {}:{}: {}",
                    path.display(),
                    line_no + 1,
                    e
                );
            }
        }
    }
    Ok(examples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_and_skips_malformed_lines() {
        let path = std::env::temp_dir().join(format!(
            "examples_test_{}_{}.jsonl",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, r#"{{"question": "q1", "sql": "SELECT 1"}}"#).unwrap();
        writeln!(f).unwrap();
        writeln!(f, "not json at all").unwrap();
        writeln!(f, r#"{{"question": "q2", "sql": "SELECT 2"}}"#).unwrap();

        let examples = load_examples(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].question, "q1");
        assert_eq!(examples[1].sql, "SELECT 2");
    }
}
