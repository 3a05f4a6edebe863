//! OpenAI-compatible HTTP provider.

use async_trait::async_trait;
use civic_core::{ChatRequest, Message, TokenUsage};
use civic_error::{ProviderError, ProviderErrorKind};
use civic_interface::{CompletionProvider, EmbeddingProvider, ProviderCompletion, ProviderEmbeddings};
use reqwest::header::RETRY_AFTER;
use serde::{Deserialize, Serialize};
use tracing::instrument;

/// Default API root.
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

#[derive(Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct ChatReply {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
}

impl From<Usage> for TokenUsage {
    fn from(usage: Usage) -> Self {
        TokenUsage::new(usage.prompt_tokens, usage.completion_tokens)
    }
}

#[derive(Serialize)]
struct EmbeddingBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingReply {
    data: Vec<EmbeddingItem>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

/// Chat and embedding provider speaking the OpenAI REST protocol.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    /// Creates a provider for `base_url` (without the `/v1` suffix).
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Reads `OPENAI_API_KEY` and optionally `OPENAI_BASE_URL`.
    ///
    /// A missing key is reported on the first call, not here.
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty());
        Self::new(base_url, api_key)
    }

    /// API root in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ProviderError>
    where
        B: Serialize + ?Sized,
        R: for<'de> Deserialize<'de>,
    {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::new(ProviderErrorKind::MissingApiKey("OPENAI_API_KEY".to_string()))
        })?;

        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(url = %url, "Sending provider request");

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Request failed: {}", e);
                ProviderError::new(ProviderErrorKind::Request(e.to_string()))
            })?;

        let status = response.status();
        if status.as_u16() == 429 {
            let retry_after_secs = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            return Err(ProviderError::new(ProviderErrorKind::RateLimited {
                retry_after_secs,
            }));
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "Provider returned error");
            return Err(ProviderError::new(ProviderErrorKind::Http {
                status: status.as_u16(),
                message,
            }));
        }

        response.json::<R>().await.map_err(|e| {
            tracing::error!("Failed to parse response: {}", e);
            ProviderError::new(ProviderErrorKind::InvalidResponse(e.to_string()))
        })
    }
}

#[async_trait]
impl CompletionProvider for OpenAiProvider {
    #[instrument(skip(self, request), fields(model = %request.model))]
    async fn complete(&self, request: &ChatRequest) -> Result<ProviderCompletion, ProviderError> {
        let body = ChatBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
        };
        let reply: ChatReply = self.post("/v1/chat/completions", &body).await?;

        let text = reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                ProviderError::new(ProviderErrorKind::InvalidResponse(
                    "no completion choices".to_string(),
                ))
            })?;

        Ok(ProviderCompletion {
            text,
            usage: reply.usage.map(TokenUsage::from),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    #[instrument(skip(self, texts), fields(model = %model, texts = texts.len()))]
    async fn embed(
        &self,
        model: &str,
        texts: &[String],
    ) -> Result<ProviderEmbeddings, ProviderError> {
        let body = EmbeddingBody { model, input: texts };
        let mut reply: EmbeddingReply = self.post("/v1/embeddings", &body).await?;
        reply.data.sort_by_key(|item| item.index);

        Ok(ProviderEmbeddings {
            vectors: reply.data.into_iter().map(|item| item.embedding).collect(),
            usage: reply.usage.map(TokenUsage::from),
        })
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}
