//! LLM client abstraction layer
//!
//! This module provides a trait-based abstraction for LLM communication,
//! allowing different backends (GenAI, Mock) to be used interchangeably,
//! and the retrying [`ModelClient`] every pipeline stage goes through.

mod client;
mod error;
mod genai;
mod mock;
mod model;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::{GenAIClient, ModelEndpoint};
pub use mock::{MockLLMClient, MockResponse};
pub use model::{ModelClient, ModelReply, RetryPolicy};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole, ToolCall, ToolDefinition};
