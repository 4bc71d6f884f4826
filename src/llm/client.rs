use super::error::BackendError;
use super::types::{LLMRequest, LLMResponse};
use async_trait::async_trait;

/// Chat backend behind the analyzer and coder model roles.
///
/// One call is one stateless exchange: the request carries the whole
/// conversation and any tools the model may invoke. Retries live in
/// `ModelClient`, not here.
#[async_trait]
pub trait LLMClient: Send + Sync {
    async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError>;

    /// Provider name, e.g. `OpenAI`
    fn name(&self) -> &str;

    /// Model identifier when the backend is bound to one
    fn model_info(&self) -> Option<String> {
        None
    }

    /// `provider/model` for log lines, or just the provider
    fn label(&self) -> String {
        match self.model_info() {
            Some(model) => format!("{}/{}", self.name(), model),
            None => self.name().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ToolCall;
    use serde_json::json;
    use std::time::Duration;

    /// Coder stand-in: invokes the first offered tool, answers in prose otherwise
    struct CoderBackend;

    #[async_trait]
    impl LLMClient for CoderBackend {
        async fn chat(&self, request: LLMRequest) -> Result<LLMResponse, BackendError> {
            let elapsed = Duration::from_millis(5);
            match request.tools.first() {
                Some(tool) => Ok(LLMResponse::with_tool_calls(
                    "",
                    vec![ToolCall {
                        call_id: "call_1".to_string(),
                        name: tool.name.clone(),
                        arguments: json!({"code": "print(1)\n", "file_name": "model.py"}),
                    }],
                    elapsed,
                )),
                None => Ok(LLMResponse::text("```python\nprint(1)\n```", elapsed)),
            }
        }

        fn name(&self) -> &str {
            "coder"
        }

        fn model_info(&self) -> Option<String> {
            Some("gpt-4o".to_string())
        }
    }

    struct AnalyzerBackend;

    #[async_trait]
    impl LLMClient for AnalyzerBackend {
        async fn chat(&self, _request: LLMRequest) -> Result<LLMResponse, BackendError> {
            Ok(LLMResponse::text(r#"{"type": "theoretical"}"#, Duration::ZERO))
        }

        fn name(&self) -> &str {
            "analyzer"
        }
    }

    #[test]
    fn test_label() {
        assert_eq!(CoderBackend.label(), "coder/gpt-4o");
        assert_eq!(AnalyzerBackend.label(), "analyzer");
    }

    #[tokio::test]
    async fn test_tool_offer_decides_reply_shape() {
        let client: Box<dyn LLMClient> = Box::new(CoderBackend);
        let tool = crate::synthesis::generate_code_tool();

        let with_tool = client
            .chat(LLMRequest::new(vec![]).with_tools(vec![tool]))
            .await
            .unwrap();
        assert!(with_tool.has_tool_calls());
        assert_eq!(with_tool.tool_calls[0].name, "generate_code");
        assert_eq!(with_tool.tool_calls[0].arguments["file_name"], "model.py");

        let prose = client.chat(LLMRequest::new(vec![])).await.unwrap();
        assert!(!prose.has_tool_calls());
        assert!(prose.content.contains("```python"));
    }
}
