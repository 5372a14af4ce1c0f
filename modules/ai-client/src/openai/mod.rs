mod client;
pub(crate) mod types;

use crate::message::Message;
use anyhow::{anyhow, Result};
use std::time::Duration;

use client::OpenAiClient;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Completion options
// =============================================================================

/// Sampling parameters for a single chat completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    pub top_p: Option<f32>,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.0,
            max_tokens: 4096,
            top_p: None,
        }
    }
}

// =============================================================================
// OpenAi
// =============================================================================

#[derive(Clone)]
pub struct OpenAi {
    api_key: String,
    model: String,
    embedding_model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl OpenAi {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_env(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .map_err(|_| anyhow!("OPENAI_API_KEY environment variable not set"))?;
        Ok(Self::new(api_key, model))
    }

    pub fn with_embedding_model(mut self, model: impl Into<String>) -> Self {
        self.embedding_model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Per-request deadline applied to every HTTP call.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    fn client(&self) -> Result<OpenAiClient> {
        let client = OpenAiClient::new(&self.api_key, self.timeout)?;
        Ok(match self.base_url {
            Some(ref url) => client.with_base_url(url),
            None => client,
        })
    }

    /// Run a chat completion over an arbitrary message list.
    pub async fn chat(&self, messages: &[Message], options: CompletionOptions) -> Result<String> {
        let mut request = types::ChatRequest::new(&self.model);
        for m in messages.iter().filter(|m| !m.is_blank()) {
            request = request.message(m.into());
        }

        if types::uses_max_completion_tokens(&self.model) {
            request = request.max_completion_tokens(options.max_tokens);
        } else {
            request = request
                .max_tokens(options.max_tokens)
                .temperature(options.temperature);
            if let Some(p) = options.top_p {
                request = request.top_p(p);
            }
        }

        let response = self.client()?.chat(&request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow!("No response from model {}", self.model))
    }

    /// System + user completion with explicit sampling options.
    pub async fn complete_with(
        &self,
        system: impl Into<String>,
        user: impl Into<String>,
        options: CompletionOptions,
    ) -> Result<String> {
        let messages = [Message::system(system), Message::user(user)];
        self.chat(&messages, options).await
    }

    pub async fn create_embedding(&self, text: &str) -> Result<Vec<f32>> {
        self.client()?.embed(&self.embedding_model, text).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_models_and_timeout() {
        let ai = OpenAi::new("sk-test", "gpt-4o-mini")
            .with_embedding_model("text-embedding-3-large")
            .with_base_url("http://localhost:8000/v1")
            .with_timeout(Duration::from_secs(5));
        assert_eq!(ai.model(), "gpt-4o-mini");
        assert_eq!(ai.embedding_model(), "text-embedding-3-large");
        assert_eq!(ai.timeout, Duration::from_secs(5));
    }
}
