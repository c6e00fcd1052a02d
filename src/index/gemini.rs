//! Client for the Google Generative Language API.
//!
//! One client serves both roles: `embedContent` for [`Embedder`] and
//! `generateContent` for [`Generator`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::embedder::{Embedder, Generator};
use crate::config::ProviderConfig;
use crate::error::{EmbeddingError, Error, ProviderError, Result};

pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    embedding_model: String,
    generation_model: String,
    generation: GenerationConfig,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    content: Content<'a>,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Option<EmbeddingValues>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: &'a GenerationConfig,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// Build a client, failing if no API key can be resolved
    pub fn new(config: &ProviderConfig) -> std::result::Result<Self, ProviderError> {
        let api_key = config.resolve_api_key().ok_or(ProviderError::MissingApiKey)?;
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: config.embedding_model.clone(),
            generation_model: config.generation_model.clone(),
            generation: GenerationConfig {
                temperature: config.temperature,
                top_p: config.top_p,
                top_k: config.top_k,
                max_output_tokens: config.max_output_tokens,
            },
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/v1beta/{model}:{method}", self.base_url)
    }

    async fn post<B: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        url: String,
        body: &B,
    ) -> std::result::Result<R, ProviderError> {
        let resp = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp.json().await?)
    }

    async fn embed_content(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let request = EmbedRequest {
            model: &self.embedding_model,
            content: Content {
                parts: vec![Part { text }],
            },
        };
        let url = self.endpoint(&self.embedding_model, "embedContent");
        let resp: EmbedResponse = self.post(url, &request).await?;

        match resp.embedding {
            Some(e) if !e.values.is_empty() => Ok(e.values),
            _ => Err(ProviderError::EmptyResponse("embedding")),
        }
    }

    async fn generate_content(&self, prompt: &str) -> std::result::Result<String, ProviderError> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: &self.generation,
        };
        let url = self.endpoint(&self.generation_model, "generateContent");
        let resp: GenerateResponse = self.post(url, &request).await?;

        let text = resp
            .candidates
            .iter()
            .filter_map(|c| c.content.as_ref())
            .flat_map(|c| c.parts.iter())
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let text = text.trim();
        if text.is_empty() {
            return Err(ProviderError::EmptyResponse("candidates"));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Embedder for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tracing::debug!(model = %self.embedding_model, chars = text.len(), "requesting embedding");
        self.embed_content(text)
            .await
            .map_err(|e| Error::Embedding(EmbeddingError::Provider(e)))
    }

    fn model(&self) -> &str {
        &self.embedding_model
    }
}

#[async_trait]
impl Generator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String> {
        tracing::debug!(model = %self.generation_model, chars = prompt.len(), "requesting generation");
        self.generate_content(prompt).await.map_err(Error::Generation)
    }
}
