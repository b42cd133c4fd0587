//! Generation back-end contract and implementations.
//!
//! The core consumes generation through a minimal "submit prompt, receive
//! text" contract: no streaming, no structured-output enforcement, and no
//! retries. A failing call aborts the run; callers apply deadlines externally.

use async_trait::async_trait;
use rig::client::CompletionClient;
use rig::completion::Prompt;
use rig::providers::openai;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Environment variable for the OpenAI API key
const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";

/// Environment variable for the generation model (defaults to gpt-4o-mini)
const ENV_GENERATION_MODEL: &str = "GENERATION_MODEL";

/// Default model for answer generation and claim repair
const DEFAULT_MODEL: &str = openai::GPT_4O_MINI;

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BackendError {
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    #[error("generation back-end not configured (missing {ENV_OPENAI_API_KEY})")]
    NotConfigured,
}

/// Minimal generation contract: one prompt in, raw reply text out.
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError>;
}

/// OpenAI-backed generation via rig.
pub struct OpenAiBackend {
    client: openai::Client,
    model: String,
}

impl OpenAiBackend {
    /// Build from `OPENAI_API_KEY` and optional `GENERATION_MODEL`.
    pub fn from_env() -> Result<Self, BackendError> {
        let api_key = std::env::var(ENV_OPENAI_API_KEY).map_err(|_| BackendError::NotConfigured)?;
        let client = openai::Client::new(&api_key);
        let model =
            std::env::var(ENV_GENERATION_MODEL).unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        tracing::info!(model = %model, "Generation back-end initialized");
        Ok(Self { client, model })
    }
}

#[async_trait]
impl GenerationBackend for OpenAiBackend {
    async fn generate(&self, prompt: &str) -> Result<String, BackendError> {
        let start_time = std::time::Instant::now();
        let agent = self.client.agent(&self.model).build();

        match agent.prompt(prompt).await {
            Ok(reply) => {
                tracing::debug!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length = prompt.len(),
                    reply_length = reply.len(),
                    "Generation call completed"
                );
                Ok(reply)
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model,
                    elapsed_ms = start_time.elapsed().as_millis(),
                    prompt_length = prompt.len(),
                    error = %e,
                    "Generation call failed"
                );
                Err(BackendError::RequestFailed(e.to_string()))
            }
        }
    }
}

/// Replays a fixed sequence of replies in order. Used by tests and offline
/// demo runs; errors once the script is exhausted.
pub struct ScriptedBackend {
    replies: Mutex<VecDeque<String>>,
}

impl ScriptedBackend {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
        }
    }
}

#[async_trait]
impl GenerationBackend for ScriptedBackend {
    async fn generate(&self, _prompt: &str) -> Result<String, BackendError> {
        let mut replies = self
            .replies
            .lock()
            .map_err(|_| BackendError::RequestFailed("scripted replies poisoned".to_string()))?;
        replies
            .pop_front()
            .ok_or_else(|| BackendError::RequestFailed("no scripted reply left".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_backend_replays_in_order() {
        let backend = ScriptedBackend::new(["one", "two"]);
        assert_eq!(backend.generate("a").await.unwrap(), "one");
        assert_eq!(backend.generate("b").await.unwrap(), "two");
        assert!(matches!(
            backend.generate("c").await,
            Err(BackendError::RequestFailed(_))
        ));
    }
}
