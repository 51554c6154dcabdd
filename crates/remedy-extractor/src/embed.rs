//! Text embedders for PR titles

use async_trait::async_trait;
use remedy_core::{EmbeddingBackend, EmbeddingConfig, RemedyError, Result};
use sha2::{Digest, Sha256};
use std::time::Duration;
use tracing::debug;

/// Turns texts into fixed-length vectors, one per input, in input order
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Human-readable backend description for logs
    fn describe(&self) -> String;
}

/// Build the embedder selected by configuration
pub fn build_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    match config.backend {
        EmbeddingBackend::Ollama => Ok(Box::new(OllamaEmbedder::new(config.clone())?)),
        EmbeddingBackend::Hashing => Ok(Box::new(HashingEmbedder::new(config.dimensions))),
    }
}

/// Sentence embeddings from a local Ollama server
pub struct OllamaEmbedder {
    client: reqwest::Client,
    config: EmbeddingConfig,
}

impl OllamaEmbedder {
    pub fn new(config: EmbeddingConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RemedyError::Embedding(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EmbeddingConfig {
        &self.config
    }

    fn clamp_input(&self, s: &str) -> String {
        s.chars().take(self.config.max_chars).collect()
    }

    /// Batched `/api/embed`
    async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>> {
        let clamped: Vec<String> = inputs.iter().map(|s| self.clamp_input(s)).collect();
        let payload = serde_json::json!({
            "model": self.config.model,
            "input": clamped,
        });
        let json = self.post_json("/api/embed", &payload).await?;

        // { embeddings: [[...], ...] } or { data: [ { embedding: [...] }, ... ] }
        if let Some(rows) = json.get("embeddings").and_then(|v| v.as_array()) {
            return parse_embedding_matrix(rows);
        }
        if let Some(items) = json.get("data").and_then(|v| v.as_array()) {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                let row = item
                    .get("embedding")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| {
                        RemedyError::Embedding("/api/embed: missing data[i].embedding".to_string())
                    })?;
                out.push(parse_embedding_vec(row)?);
            }
            return Ok(out);
        }

        Err(RemedyError::Embedding(format!(
            "/api/embed: unrecognized response shape: {}",
            json
        )))
    }

    /// Single-prompt `/api/embeddings`
    async fn embed_one(&self, input: &str) -> Result<Vec<f32>> {
        let payload = serde_json::json!({
            "model": self.config.model,
            "prompt": self.clamp_input(input),
        });
        let json = self.post_json("/api/embeddings", &payload).await?;

        let row = json
            .get("embedding")
            .and_then(|v| v.as_array())
            .ok_or_else(|| RemedyError::Embedding("/api/embeddings: missing embedding".to_string()))?;
        parse_embedding_vec(row)
    }

    async fn post_json(&self, path: &str, payload: &serde_json::Value) -> Result<serde_json::Value> {
        let url = format!("{}{}", self.config.endpoint.trim_end_matches('/'), path);

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| RemedyError::Embedding(format!("POST {}: {}", url, e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RemedyError::Embedding(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(RemedyError::Embedding(format!("http {}: {}", status, text)));
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(self.config.batch_size.max(1)) {
            match self.embed_batch(chunk).await {
                Ok(rows) if rows.len() == chunk.len() => {
                    out.extend(rows);
                    continue;
                }
                Ok(rows) => debug!(
                    "/api/embed returned {} rows for {} inputs, falling back",
                    rows.len(),
                    chunk.len()
                ),
                Err(e) => debug!("/api/embed failed, falling back: {}", e),
            }

            for text in chunk {
                out.push(self.embed_one(text).await?);
            }
        }

        Ok(out)
    }

    fn describe(&self) -> String {
        format!("ollama:{} at {}", self.config.model, self.config.endpoint)
    }
}

fn parse_embedding_matrix(rows: &[serde_json::Value]) -> Result<Vec<Vec<f32>>> {
    rows.iter()
        .map(|row| {
            let row = row
                .as_array()
                .ok_or_else(|| RemedyError::Embedding("expected array of arrays".to_string()))?;
            parse_embedding_vec(row)
        })
        .collect()
}

fn parse_embedding_vec(values: &[serde_json::Value]) -> Result<Vec<f32>> {
    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| RemedyError::Embedding("expected float".to_string()))
        })
        .collect()
}

/// Offline feature-hashing embedder.
///
/// Each lowercase token and token bigram is hashed with SHA-256 into one of
/// `dimensions` buckets with a hash-derived sign; the result is L2-normalized.
/// Titles sharing vocabulary land close together. No semantics beyond that.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut vector = vec![0f32; self.dimensions];

        let bigrams = tokens.windows(2).map(|w| format!("{} {}", w[0], w[1]));
        for feature in tokens.iter().map(|t| t.to_string()).chain(bigrams) {
            let digest = Sha256::digest(feature.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            let index = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[index] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }

    fn describe(&self) -> String {
        format!("hashing:{}", self.dimensions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_input_truncates() {
        let config = EmbeddingConfig {
            max_chars: 3,
            ..EmbeddingConfig::default()
        };
        let embedder = OllamaEmbedder::new(config).unwrap();
        assert_eq!(embedder.clamp_input("abcdef"), "abc");
        assert_eq!(embedder.clamp_input("ab"), "ab");
    }

    #[test]
    fn test_parse_embedding_shapes() {
        let rows = serde_json::json!([[0.5, 1.0], [0.0, -1.0]]);
        let parsed = parse_embedding_matrix(rows.as_array().unwrap()).unwrap();
        assert_eq!(parsed, vec![vec![0.5, 1.0], vec![0.0, -1.0]]);

        let bad = serde_json::json!([["x"]]);
        assert!(parse_embedding_matrix(bad.as_array().unwrap()).is_err());
    }

    #[test]
    fn test_hashing_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed_text("Fix XSS in markdown renderer");
        let b = embedder.embed_text("fix xss in Markdown renderer");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let norm = a.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new(8);
        assert!(embedder.embed_text("  ").iter().all(|v| *v == 0.0));
    }

    #[tokio::test]
    async fn test_hashing_embeds_in_order() {
        let embedder = HashingEmbedder::new(16);
        let texts = vec!["one".to_string(), "two".to_string()];
        let rows = embedder.embed(&texts).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], embedder.embed_text("one"));
        assert_eq!(rows[1], embedder.embed_text("two"));
    }

    #[test]
    fn test_build_embedder_selects_backend() {
        let config = EmbeddingConfig {
            backend: EmbeddingBackend::Hashing,
            dimensions: 32,
            ..EmbeddingConfig::default()
        };
        let embedder = build_embedder(&config).unwrap();
        assert_eq!(embedder.describe(), "hashing:32");
    }
}
