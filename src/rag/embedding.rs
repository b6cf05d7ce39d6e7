use crate::config::EmbeddingConfig;
use crate::llm::LlmError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Turns text into vectors. Kept as a trait so the index and retriever can be
/// exercised without a running model server.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

pub enum EmbeddingClient {
    Remote {
        client: reqwest::Client,
        api_url: String,
        api_key: String,
        model: String,
    },
    Ollama {
        client: reqwest::Client,
        api_url: String,
        model: String,
    },
}

#[derive(Serialize)]
struct RemoteEmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct RemoteEmbeddingResponse {
    data: Vec<RemoteEmbeddingItem>,
}

#[derive(Deserialize)]
struct RemoteEmbeddingItem {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct OllamaEmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct OllamaEmbeddingResponse {
    embedding: Vec<f32>,
}

impl EmbeddingClient {
    pub fn new(config: &EmbeddingConfig) -> Result<Self, LlmError> {
        match config.backend.as_str() {
            "remote" => {
                let api_url = config.api_url.clone().ok_or_else(|| {
                    LlmError::ConfigError(
                        "API URL is required for remote embedding provider".to_string(),
                    )
                })?;
                let api_key = config.api_key.clone().ok_or_else(|| {
                    LlmError::ConfigError(
                        "API key is required for remote embedding provider".to_string(),
                    )
                })?;
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(60))
                    .build()
                    .map_err(|e| LlmError::ConnectionError(e.to_string()))?;
                Ok(EmbeddingClient::Remote {
                    client,
                    api_url,
                    api_key,
                    model: config.model.clone(),
                })
            }
            "ollama" => {
                let api_url = config
                    .api_url
                    .clone()
                    .unwrap_or_else(|| "http://localhost:11434/api/embeddings".to_string());
                Ok(EmbeddingClient::Ollama {
                    client: reqwest::Client::new(),
                    api_url,
                    model: config.model.clone(),
                })
            }
            other => Err(LlmError::ConfigError(format!(
                "Unsupported embedding backend: {}",
                other
            ))),
        }
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        match self {
            EmbeddingClient::Remote {
                client,
                api_url,
                api_key,
                model,
            } => {
                let request = RemoteEmbeddingRequest {
                    model,
                    input: texts,
                };
                let response = client
                    .post(api_url)
                    .header("Authorization", format!("Bearer {}", api_key))
                    .json(&request)
                    .send()
                    .await
                    .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

                if !response.status().is_success() {
                    return Err(LlmError::ResponseError(format!(
                        "Embedding API responded with status code: {}",
                        response.status()
                    )));
                }

                let parsed: RemoteEmbeddingResponse = response
                    .json()
                    .await
                    .map_err(|e| LlmError::ResponseError(e.to_string()))?;

                if parsed.data.len() != texts.len() {
                    return Err(LlmError::ResponseError(format!(
                        "Embedding count mismatch: sent {}, got {}",
                        texts.len(),
                        parsed.data.len()
                    )));
                }

                Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
            }
            EmbeddingClient::Ollama {
                client,
                api_url,
                model,
            } => {
                // Ollama's embeddings endpoint takes one prompt per call.
                let mut out = Vec::with_capacity(texts.len());
                for text in texts {
                    let request = OllamaEmbeddingRequest {
                        model,
                        prompt: text,
                    };
                    let response = client
                        .post(api_url)
                        .json(&request)
                        .send()
                        .await
                        .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

                    if !response.status().is_success() {
                        return Err(LlmError::ResponseError(format!(
                            "Ollama embeddings responded with status code: {}",
                            response.status()
                        )));
                    }

                    let parsed: OllamaEmbeddingResponse = response
                        .json()
                        .await
                        .map_err(|e| LlmError::ResponseError(e.to_string()))?;
                    out.push(parsed.embedding);
                }
                Ok(out)
            }
        }
    }
}
