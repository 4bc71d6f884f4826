//! Pipeline context for managing dependencies

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::config::Thesis2CodeConfig;
use crate::document::{ConversionService, HttpConversionService, LocalExtractor, PdfTextExtractor};
use crate::llm::{GenAIClient, ModelClient};
use crate::progress::{LoggingHandler, ProgressHandler};

use super::config::PipelineConfig;

/// Context that owns all long-lived pipeline dependencies
#[derive(Clone)]
pub struct PipelineContext {
    /// Document structuring and analysis
    pub analyzer_model: ModelClient,

    /// Synthesis and repair
    pub coder_model: ModelClient,

    pub conversion: Arc<dyn ConversionService>,

    pub local_extractor: Arc<dyn LocalExtractor>,

    pub progress: Arc<dyn ProgressHandler>,

    pub config: PipelineConfig,
}

impl PipelineContext {
    pub fn new(
        analyzer_model: ModelClient,
        coder_model: ModelClient,
        conversion: Arc<dyn ConversionService>,
        local_extractor: Arc<dyn LocalExtractor>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            analyzer_model,
            coder_model,
            conversion,
            local_extractor,
            progress: Arc::new(LoggingHandler),
            config,
        }
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressHandler>) -> Self {
        self.progress = progress;
        self
    }

    /// Builds real clients for both model roles and the conversion service
    pub fn from_config(config: &Thesis2CodeConfig) -> Result<Self> {
        let timeout = config.request_timeout();
        let retry = config.retry_policy();

        let analyzer = GenAIClient::new(config.analyzer_endpoint()?, timeout)
            .context("Failed to create analyzer model client")?;
        let coder = GenAIClient::new(config.coder_endpoint()?, timeout)
            .context("Failed to create coder model client")?;
        let conversion = HttpConversionService::new(config.conversion_settings())
            .context("Failed to create conversion client")?;

        Ok(Self::new(
            ModelClient::new(Arc::new(analyzer)).with_retry_policy(retry),
            ModelClient::new(Arc::new(coder)).with_retry_policy(retry),
            Arc::new(conversion),
            Arc::new(PdfTextExtractor),
            config.pipeline_config(),
        ))
    }
}

impl std::fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineContext")
            .field("analyzer_model", &self.analyzer_model)
            .field("coder_model", &self.coder_model)
            .field("conversion", &self.conversion.name())
            .field("local_extractor", &self.local_extractor.name())
            .field("config", &self.config)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{MockConversionService, MockLocalExtractor};
    use crate::llm::MockLLMClient;
    use serial_test::serial;

    #[test]
    fn test_context_creation() {
        let context = PipelineContext::new(
            ModelClient::new(Arc::new(MockLLMClient::with_name("analyzer"))),
            ModelClient::new(Arc::new(MockLLMClient::with_name("coder"))),
            Arc::new(MockConversionService::new()),
            Arc::new(MockLocalExtractor::failing()),
            PipelineConfig::default().with_concurrency(2),
        );

        assert_eq!(context.analyzer_model.backend_name(), "analyzer");
        assert_eq!(context.coder_model.backend_name(), "coder");
        assert_eq!(context.config.concurrency, 2);
    }

    #[test]
    #[serial]
    fn test_from_config() {
        let mut config = Thesis2CodeConfig::default();
        config.analyzer.provider = "ollama".to_string();
        config.analyzer.model = "qwen2.5:7b".to_string();
        config.coder = config.analyzer.clone();
        config.max_chat_retries = 2;

        let context = PipelineContext::from_config(&config).unwrap();
        assert_eq!(context.analyzer_model.retry_policy().max_retries, 2);
        assert_eq!(context.local_extractor.name(), "lopdf");
    }

    #[test]
    #[serial]
    fn test_from_config_rejects_unknown_provider() {
        let mut config = Thesis2CodeConfig::default();
        config.coder.provider = "unknown".to_string();
        assert!(PipelineContext::from_config(&config).is_err());
    }
}
