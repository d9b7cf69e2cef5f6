use anyhow::Context;
use async_trait::async_trait;
use serde_json::json;

#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>>;
}

pub struct OllamaEmbedder {
    url: String,
    model: String,
    client: reqwest::Client,
}

impl OllamaEmbedder {
    pub fn new(url: String, model: String) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            model,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        let body = json!({
            "model": self.model,
            "prompt": text,
        });

        let data: serde_json::Value = self
            .client
            .post(format!("{}/api/embeddings", self.url))
            .json(&body)
            .send()
            .await
            .context("failed to call Ollama embeddings API")?
            .error_for_status()
            .context("Ollama embeddings API returned error")?
            .json()
            .await
            .context("failed to parse Ollama embeddings response")?;

        let values = data["embedding"]
            .as_array()
            .ok_or_else(|| anyhow::anyhow!("missing embedding in Ollama response"))?;

        values
            .iter()
            .map(|v| {
                v.as_f64()
                    .map(|f| f as f32)
                    .ok_or_else(|| anyhow::anyhow!("non-numeric embedding component"))
            })
            .collect()
    }
}
