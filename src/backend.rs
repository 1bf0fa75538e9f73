//! Chat completion backends
//!
//! The conversation manager only sees the [`ChatBackend`] trait; the
//! OpenAI-compatible HTTP adapter lives here too.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::conversation::{Role, Turn};

/// Default OpenAI API base URL
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Category of a completion failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendErrorKind {
    RateLimit,
    Auth,
    Transport,
}

/// Completion failure, tagged by category so callers can pick retry or abort
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// Provider asked us to slow down
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Credentials were rejected
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Network failure, timeout, server error or unusable response
    #[error("transport failure: {0}")]
    Transport(String),
}

impl BackendError {
    /// Category of this failure
    #[must_use]
    pub const fn kind(&self) -> BackendErrorKind {
        match self {
            Self::RateLimit(_) => BackendErrorKind::RateLimit,
            Self::Auth(_) => BackendErrorKind::Auth,
            Self::Transport(_) => BackendErrorKind::Transport,
        }
    }

    /// Rate-limit and transport failures may succeed on retry; auth never will
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::Auth(_))
    }

    /// Classify a non-success HTTP status
    #[must_use]
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let detail = format!("{status}: {body}");
        match status {
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimit(detail),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Auth(detail),
            _ => Self::Transport(detail),
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}

/// Stateless request/response chat completion
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Produce exactly one assistant turn for the full ordered transcript
    ///
    /// # Errors
    ///
    /// Returns a categorized [`BackendError`] if the completion fails
    async fn complete(&self, transcript: &[Turn]) -> Result<Turn, BackendError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Turn],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// `OpenAI`-compatible `/chat/completions` client
pub struct OpenAiBackend {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiBackend {
    /// Create a backend for `model`
    ///
    /// # Errors
    ///
    /// Returns `CriticalInit` if the API key is missing or the client cannot be built
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        timeout: Duration,
    ) -> crate::Result<Self> {
        if api_key.is_empty() {
            return Err(crate::Error::CriticalInit(
                "OPENAI_API_KEY is required for chat completions".to_string(),
            ));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| crate::Error::CriticalInit(format!("http client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or_else(|| DEFAULT_OPENAI_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            api_key,
            model,
        })
    }

    /// Model requested from the provider
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, transcript: &[Turn]) -> Result<Turn, BackendError> {
        tracing::info!(model = %self.model, turns = transcript.len(), "requesting completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&ChatRequest {
                model: &self.model,
                messages: transcript,
            })
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                BackendError::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "chat API error");
            return Err(BackendError::from_status(status, &body));
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| BackendError::Transport("response contained no message".to_string()))?;

        Ok(Turn {
            role: Role::Assistant,
            content,
        })
    }
}
