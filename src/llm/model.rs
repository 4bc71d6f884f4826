//! Retrying front door to a model backend
//!
//! Stages never talk to an [`LLMClient`] directly. They go through
//! [`ModelClient`], which owns the retry/backoff policy and folds the raw
//! response into a [`ModelReply`].

use super::client::LLMClient;
use super::error::BackendError;
use super::types::{ChatMessage, LLMRequest, ToolDefinition};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_TEMPERATURE: f32 = 1.0;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

/// What the model answered with
#[derive(Debug, Clone, PartialEq)]
pub enum ModelReply {
    /// Free text
    Text(String),
    /// A structured tool invocation
    ToolInvocation {
        name: String,
        arguments: serde_json::Value,
    },
}

impl ModelReply {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            ModelReply::Text(text) => Some(text),
            ModelReply::ToolInvocation { .. } => None,
        }
    }
}

/// Backoff schedule: `base_delay * 2^attempt` between attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay
            .saturating_mul(2u32.saturating_pow(attempt.min(16)))
    }
}

/// Immutable handle shared by every stage that needs a model
#[derive(Clone)]
pub struct ModelClient {
    backend: Arc<dyn LLMClient>,
    retry: RetryPolicy,
    temperature: f32,
}

impl ModelClient {
    pub fn new(backend: Arc<dyn LLMClient>) -> Self {
        Self {
            backend,
            retry: RetryPolicy::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn temperature(&self) -> f32 {
        self.temperature
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Sends one conversation, retrying transport/service failures.
    ///
    /// At most `max_retries` attempts are made (at least one). The last
    /// error is returned once the budget is spent.
    pub async fn chat(
        &self,
        messages: Vec<ChatMessage>,
        tools: Vec<ToolDefinition>,
        temperature: f32,
        max_tokens: Option<u32>,
        max_retries: u32,
    ) -> Result<ModelReply, BackendError> {
        let mut request = LLMRequest::new(messages)
            .with_tools(tools)
            .with_temperature(temperature);
        if let Some(max_tokens) = max_tokens {
            request = request.with_max_tokens(max_tokens);
        }

        let attempts = max_retries.max(1);
        let mut attempt = 0;
        loop {
            debug!(
                backend = %self.backend.label(),
                attempt = attempt + 1,
                attempts,
                "LLM call"
            );

            match self.backend.chat(request.clone()).await {
                Ok(response) => {
                    let reply = match response.tool_calls.into_iter().next() {
                        Some(call) => ModelReply::ToolInvocation {
                            name: call.name,
                            arguments: call.arguments,
                        },
                        None => ModelReply::Text(response.content),
                    };
                    return Ok(reply);
                }
                Err(e) => {
                    error!(attempt = attempt + 1, error = %e, "LLM call failed");
                    if attempt + 1 >= attempts {
                        return Err(e);
                    }
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }

    /// Single user turn (plus optional system prompt), text answer only
    pub async fn simple_chat(
        &self,
        prompt: impl Into<String>,
        system_prompt: Option<&str>,
    ) -> Result<String, BackendError> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = system_prompt {
            messages.push(ChatMessage::system(system));
        }
        messages.push(ChatMessage::user(prompt));

        let reply = self
            .chat(
                messages,
                Vec::new(),
                self.temperature,
                None,
                self.retry.max_retries,
            )
            .await?;

        match reply {
            ModelReply::Text(text) => Ok(text),
            ModelReply::ToolInvocation { name, .. } => Err(BackendError::InvalidResponse {
                message: format!("expected text, model invoked tool '{}'", name),
                raw_response: None,
            }),
        }
    }
}

impl std::fmt::Debug for ModelClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelClient")
            .field("backend", &self.backend.label())
            .field("retry", &self.retry)
            .field("temperature", &self.temperature)
            .finish()
    }
}
