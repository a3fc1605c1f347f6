//! Ollama client: embeddings and non-streaming generation over the local HTTP API.

use super::{Embedder, Generator, RagError};
use crate::config::RagConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Vec<f32>,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Clone)]
pub struct OllamaClient {
    client: reqwest::blocking::Client,
    base_url: String,
    model: String,
    embed_model: String,
}

impl OllamaClient {
    pub fn new(config: &RagConfig) -> Result<Self, RagError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            embed_model: config.embed_model.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn post<T: Serialize + ?Sized, R: DeserializeOwned>(&self, path: &str, body: &T) -> Result<R, RagError> {
        let url = format!("{}{}", self.base_url, path);
        let res = self.client.post(&url).json(body).send()?;
        if !res.status().is_success() {
            let status = res.status().as_u16();
            let body = res.text().unwrap_or_default();
            return Err(RagError::Status { status, body });
        }
        Ok(res.json()?)
    }
}

impl Embedder for OllamaClient {
    fn embed(&self, text: &str) -> Result<Vec<f32>, RagError> {
        let res: EmbeddingResponse = self.post(
            "/api/embeddings",
            &EmbeddingRequest {
                model: &self.embed_model,
                prompt: text,
            },
        )?;
        if res.embedding.is_empty() {
            return Err(RagError::MalformedResponse("empty embedding".to_string()));
        }
        Ok(res.embedding)
    }
}

impl Generator for OllamaClient {
    fn generate(&self, prompt: &str) -> Result<String, RagError> {
        let res: GenerateResponse = self.post(
            "/api/generate",
            &GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            },
        )?;
        debug!(model = %self.model, done = res.done, chars = res.response.len(), "generation finished");
        Ok(res.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_trimmed() {
        let config = RagConfig {
            base_url: "http://localhost:11434/".to_string(),
            ..RagConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert_eq!(client.base_url(), "http://localhost:11434");
    }

    #[test]
    fn unreachable_server_is_http_error() {
        let config = RagConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout_secs: 2,
            connect_timeout_secs: 1,
            ..RagConfig::default()
        };
        let client = OllamaClient::new(&config).unwrap();
        assert!(matches!(client.generate("hi"), Err(RagError::Http(_))));
    }
}
