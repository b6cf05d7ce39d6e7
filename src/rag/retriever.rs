use crate::config::RagConfig;
use crate::rag::embedding::Embedder;
use crate::rag::index::VectorIndex;
use crate::rag::{load_examples, FewShotExample};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// How the few-shot examples for a request were chosen. Surfaced to callers
/// so a degraded retrieval is visible instead of silent.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievalMetadata {
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub similarity_scores: Vec<f32>,
}

pub struct ExampleRetriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<VectorIndex>,
    examples_path: PathBuf,
    similarity_threshold: f32,
    top_k: usize,
}

impl ExampleRetriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<VectorIndex>, config: &RagConfig) -> Self {
        Self {
            embedder,
            index,
            examples_path: PathBuf::from(&config.examples_path),
            similarity_threshold: config.similarity_threshold,
            top_k: config.top_k,
        }
    }

    /// Semantic retrieval with a positional fallback.
    ///
    /// When the index is empty, embedding fails, or nothing clears the
    /// similarity threshold, the first `top_k` examples from the file are
    /// returned instead and the metadata says so.
    pub async fn retrieve(&self, question: &str) -> (Vec<FewShotExample>, RetrievalMetadata) {
        if self.index.is_empty().await {
            return self.positional_fallback("vector index is empty");
        }

        let query = match self.embedder.embed(&[question.to_string()]).await {
            Ok(mut vectors) if !vectors.is_empty() => vectors.remove(0),
            Ok(_) => return self.positional_fallback("embedder returned no vector"),
            Err(e) => {
                warn!("Query embedding failed, falling back: {}", e);
                return self.positional_fallback(&format!("embedding failed: {}", e));
            }
        };

        let hits = self.index.search(&query, self.top_k).await;
        let passing: Vec<_> = hits
            .into_iter()
            .filter(|hit| hit.score >= self.similarity_threshold)
            .collect();

        if passing.is_empty() {
            return self.positional_fallback("no example cleared the similarity threshold");
        }

        let scores = passing.iter().map(|hit| hit.score).collect();
        let examples = passing.into_iter().map(|hit| hit.example).collect();
        (
            examples,
            RetrievalMetadata {
                method: "semantic".to_string(),
                reason: None,
                similarity_scores: scores,
            },
        )
    }

    fn positional_fallback(&self, reason: &str) -> (Vec<FewShotExample>, RetrievalMetadata) {
        let examples = match load_examples(&self.examples_path) {
            Ok(all) => all.into_iter().take(self.top_k).collect(),
            Err(e) => {
                warn!("Positional fallback could not read examples: {}", e);
                Vec::new()
            }
        };
        (
            examples,
            RetrievalMetadata {
                method: "positional-fallback".to_string(),
                reason: Some(reason.to_string()),
                similarity_scores: Vec::new(),
            },
        )
    }
}
