use crate::llm::LlmError;
use crate::rag::embedding::Embedder;
use crate::rag::{load_examples, FewShotExample};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::info;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexedExample {
    pub id: String,
    pub question: String,
    pub sql: String,
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
pub struct ScoredExample {
    pub example: FewShotExample,
    pub score: f32,
}

/// File-backed vector index over the few-shot examples.
///
/// The corpus is tens of entries, so search is a brute-force cosine scan;
/// the whole index is kept in memory and persisted as one JSON file.
pub struct VectorIndex {
    path: PathBuf,
    entries: RwLock<Vec<IndexedExample>>,
}

impl VectorIndex {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: RwLock::new(Vec::new()),
        }
    }

    /// Loads a previously saved index. Missing file is not an error; the
    /// index just starts empty.
    pub async fn load(&self) -> std::io::Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let entries: Vec<IndexedExample> = serde_json::from_str(&raw)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        info!("Loaded {} indexed examples from {}", entries.len(), self.path.display());
        *self.entries.write().await = entries;
        Ok(())
    }

    async fn save(&self, entries: &[IndexedExample]) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string(entries)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(&self.path, raw)
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// (Re)builds the index from the examples file.
    ///
    /// A build is skipped when the stored entry count already matches the
    /// number of valid examples on disk, unless `force` is set.
    pub async fn build(
        &self,
        examples_path: &Path,
        embedder: &dyn Embedder,
        force: bool,
    ) -> Result<usize, LlmError> {
        let examples = load_examples(examples_path)
            .map_err(|e| LlmError::ConfigError(format!("cannot read examples: {}", e)))?;

        if !force {
            let stored = self.len().await;
            if stored > 0 && stored == examples.len() {
                info!("Vector index is current ({} entries), skipping rebuild", stored);
                return Ok(stored);
            }
        }

        let questions: Vec<String> = examples.iter().map(|e| e.question.clone()).collect();
        let embeddings = embedder.embed(&questions).await?;

        if embeddings.len() != examples.len() {
            return Err(LlmError::ResponseError(format!(
                "embedder returned {} vectors for {} examples",
                embeddings.len(),
                examples.len()
            )));
        }

        let entries: Vec<IndexedExample> = examples
            .into_iter()
            .zip(embeddings)
            .enumerate()
            .map(|(i, (example, embedding))| IndexedExample {
                id: format!("example_{}", i),
                question: example.question,
                sql: example.sql,
                embedding,
            })
            .collect();

        self.save(&entries)
            .await
            .map_err(|e| LlmError::ConfigError(format!("cannot save index: {}", e)))?;

        let count = entries.len();
        info!("Built vector index with {} entries", count);
        *self.entries.write().await = entries;
        Ok(count)
    }

    /// Top-k entries by cosine similarity to the query vector.
    pub async fn search(&self, query: &[f32], top_k: usize) -> Vec<ScoredExample> {
        let entries = self.entries.read().await;
        let mut scored: Vec<ScoredExample> = entries
            .iter()
            .map(|entry| ScoredExample {
                example: FewShotExample {
                    question: entry.question.clone(),
                    sql: entry.sql.clone(),
                },
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(top_k);
        scored
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::io::Write;

    struct StubEmbedder;

    #[async_trait]
    impl Embedder for StubEmbedder {
        async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
            // Deterministic vectors keyed off the text length.
            Ok(texts
                .iter()
                .map(|t| vec![t.len() as f32, 1.0, 0.0])
                .collect())
        }
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "{}_{}_{}",
            name,
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ))
    }

    fn write_examples(path: &Path) {
        let mut f = std::fs::File::create(path).unwrap();
        writeln!(f, r#"{{"question": "how many skus", "sql": "SELECT count(*) FROM skus"}}"#)
            .unwrap();
        writeln!(
            f,
            r#"{{"question": "total inventory value", "sql": "SELECT sum(total_value) FROM inventory"}}"#
        )
        .unwrap();
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[tokio::test]
    async fn build_is_idempotent_unless_forced() {
        let examples_path = temp_path("rag_examples.jsonl");
        let index_path = temp_path("rag_index.json");
        write_examples(&examples_path);

        let index = VectorIndex::new(index_path.clone());
        let first = index.build(&examples_path, &StubEmbedder, false).await.unwrap();
        assert_eq!(first, 2);

        // Same counts, no force: skipped.
        let second = index.build(&examples_path, &StubEmbedder, false).await.unwrap();
        assert_eq!(second, 2);

        let forced = index.build(&examples_path, &StubEmbedder, true).await.unwrap();
        assert_eq!(forced, 2);

        // A fresh index loads the persisted entries.
        let reloaded = VectorIndex::new(index_path.clone());
        reloaded.load().await.unwrap();
        assert_eq!(reloaded.len().await, 2);

        std::fs::remove_file(&examples_path).ok();
        std::fs::remove_file(&index_path).ok();
    }

    #[tokio::test]
    async fn search_ranks_by_similarity() {
        let examples_path = temp_path("rag_examples2.jsonl");
        let index_path = temp_path("rag_index2.json");
        write_examples(&examples_path);

        let index = VectorIndex::new(index_path.clone());
        index.build(&examples_path, &StubEmbedder, true).await.unwrap();

        // Query vector matching the first example's stub embedding exactly.
        let query = vec!["how many skus".len() as f32, 1.0, 0.0];
        let hits = index.search(&query, 1).await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].example.question, "how many skus");
        assert!(hits[0].score > 0.99);

        std::fs::remove_file(&examples_path).ok();
        std::fs::remove_file(&index_path).ok();
    }
}
