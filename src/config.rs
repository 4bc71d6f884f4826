//! Configuration management for thesis2code
//!
//! Settings are loaded once at process start from environment variables
//! with sensible defaults, then handed to components as plain values.
//!
//! # Environment Variables
//!
//! ## Model roles
//! - `THESIS2CODE_PROVIDER` / `THESIS2CODE_MODEL` / `THESIS2CODE_BASE_URL` /
//!   `THESIS2CODE_API_KEY`: shared settings for both roles
//! - `THESIS2CODE_ANALYZER_*`: analyzer role (document structuring, analysis);
//!   overrides the shared settings
//! - `THESIS2CODE_CODER_*`: coder role (synthesis, repair); falls back to the
//!   analyzer settings when unset
//!
//! Providers are genai adapter names (`openai`, `anthropic`, `gemini`,
//! `ollama`, `groq`, `deepseek`, ...). Without an explicit API key genai
//! reads the provider's own variable (`OPENAI_API_KEY`, ...).
//!
//! ## Document conversion
//! - `THESIS2CODE_CONVERSION_URL`: default "https://mineru.net/api/v4"
//! - `THESIS2CODE_CONVERSION_TOKEN`: bearer token; without it only local
//!   extraction is available for PDFs
//! - `THESIS2CODE_POLL_INTERVAL` / `THESIS2CODE_MAX_WAIT`: seconds, default 5 / 300
//!
//! ## Runtime
//! - `THESIS2CODE_REQUEST_TIMEOUT`: seconds - default "120"
//! - `THESIS2CODE_MAX_CODE_RETRIES`: default "5"
//! - `THESIS2CODE_MAX_CHAT_RETRIES`: default "3"
//! - `THESIS2CODE_CONCURRENCY`: default "4"
//! - `THESIS2CODE_OUTPUT_DIR`: default "output"
//! - `THESIS2CODE_LOG_LEVEL`: default "info"
//! - `THESIS2CODE_DUPLICATE_FILES`: `last_writer_wins` | `keep_first`
//! - `THESIS2CODE_FAILED_TASKS`: `drop` | `abort`
//! - `THESIS2CODE_DEADLINE`: overall run deadline in seconds, unset for none

use crate::document::remote::{DEFAULT_BASE_URL, DEFAULT_MODEL_VERSION};
use crate::document::ConversionSettings;
use crate::llm::{ModelEndpoint, RetryPolicy};
use crate::pipeline::PipelineConfig;
use crate::project::DuplicateFilePolicy;
use crate::synthesis::FailedTaskPolicy;
use crate::util::logging::is_known_level;
use genai::adapter::AdapterKind;
use std::env;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

const ENV_PREFIX: &str = "THESIS2CODE_";
const DEFAULT_PROVIDER: &str = "openai";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;
const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;
const DEFAULT_MAX_WAIT_SECS: u64 = 300;
const DEFAULT_MAX_CODE_RETRIES: u32 = 5;
const DEFAULT_MAX_CHAT_RETRIES: u32 = 3;
const DEFAULT_CONCURRENCY: usize = 4;
const MAX_CONCURRENCY: usize = 16;
const MAX_RETRIES: u32 = 20;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Provider name genai does not know
    #[error("Invalid provider: {0}. Valid options: openai, anthropic, gemini, ollama, groq, deepseek, xai, cohere")]
    InvalidProvider(String),

    /// Configuration validation failed
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),

    /// Failed to parse configuration value
    #[error("Failed to parse {field}: {error}")]
    ParseError { field: String, error: String },
}

/// Connection settings for one model role, provider still unparsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRoleConfig {
    pub provider: String,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
}

impl ModelRoleConfig {
    pub fn adapter_kind(&self) -> Result<AdapterKind, ConfigError> {
        parse_provider(&self.provider)
    }

    pub fn endpoint(&self) -> Result<ModelEndpoint, ConfigError> {
        Ok(ModelEndpoint {
            provider: self.adapter_kind()?,
            model: self.model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
        })
    }
}

pub fn parse_provider(name: &str) -> Result<AdapterKind, ConfigError> {
    let lower = name.trim().to_lowercase();
    let normalized = match lower.as_str() {
        "claude" => "anthropic",
        "grok" => "xai",
        other => other,
    };
    AdapterKind::from_lower_str(normalized).ok_or_else(|| ConfigError::InvalidProvider(name.to_string()))
}

/// Main configuration structure for thesis2code
#[derive(Debug, Clone)]
pub struct Thesis2CodeConfig {
    pub analyzer: ModelRoleConfig,
    pub coder: ModelRoleConfig,
    pub request_timeout_secs: u64,
    pub conversion_base_url: String,
    pub conversion_token: Option<String>,
    pub poll_interval_secs: u64,
    pub max_wait_secs: u64,
    pub max_code_retries: u32,
    pub max_chat_retries: u32,
    pub concurrency: usize,
    pub output_dir: PathBuf,
    pub log_level: String,
    pub duplicate_policy: DuplicateFilePolicy,
    pub failed_task_policy: FailedTaskPolicy,
    pub deadline_secs: Option<u64>,
}

fn var(name: &str) -> Option<String> {
    env::var(format!("{}{}", ENV_PREFIX, name))
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    var(name).and_then(|v| v.parse::<T>().ok())
}

fn role_from_env(role: &str, fallback: &ModelRoleConfig) -> ModelRoleConfig {
    ModelRoleConfig {
        provider: var(&format!("{}_PROVIDER", role)).unwrap_or_else(|| fallback.provider.clone()),
        model: var(&format!("{}_MODEL", role)).unwrap_or_else(|| fallback.model.clone()),
        base_url: var(&format!("{}_BASE_URL", role)).or_else(|| fallback.base_url.clone()),
        api_key: var(&format!("{}_API_KEY", role)).or_else(|| fallback.api_key.clone()),
    }
}

impl Default for Thesis2CodeConfig {
    /// Loads from `THESIS2CODE_*` environment variables; unparseable values
    /// fall back to defaults
    fn default() -> Self {
        let shared = ModelRoleConfig {
            provider: var("PROVIDER").unwrap_or_else(|| DEFAULT_PROVIDER.to_string()),
            model: var("MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            base_url: var("BASE_URL"),
            api_key: var("API_KEY"),
        };
        let analyzer = role_from_env("ANALYZER", &shared);
        let coder = role_from_env("CODER", &analyzer);

        Self {
            analyzer,
            coder,
            request_timeout_secs: parsed("REQUEST_TIMEOUT").unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
            conversion_base_url: var("CONVERSION_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            conversion_token: var("CONVERSION_TOKEN"),
            poll_interval_secs: parsed("POLL_INTERVAL").unwrap_or(DEFAULT_POLL_INTERVAL_SECS),
            max_wait_secs: parsed("MAX_WAIT").unwrap_or(DEFAULT_MAX_WAIT_SECS),
            max_code_retries: parsed("MAX_CODE_RETRIES").unwrap_or(DEFAULT_MAX_CODE_RETRIES),
            max_chat_retries: parsed("MAX_CHAT_RETRIES").unwrap_or(DEFAULT_MAX_CHAT_RETRIES),
            concurrency: parsed("CONCURRENCY").unwrap_or(DEFAULT_CONCURRENCY),
            output_dir: var("OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
            log_level: var("LOG_LEVEL")
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
                .to_lowercase(),
            duplicate_policy: parsed("DUPLICATE_FILES").unwrap_or_default(),
            failed_task_policy: parsed("FAILED_TASKS").unwrap_or_default(),
            deadline_secs: parsed("DEADLINE"),
        }
    }
}

impl Thesis2CodeConfig {
    /// Validates the configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for unknown providers or log levels and for
    /// out-of-range numbers
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analyzer.adapter_kind()?;
        self.coder.adapter_kind()?;

        if self.analyzer.model.is_empty() || self.coder.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "Model name cannot be empty".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if self.poll_interval_secs == 0 || self.max_wait_secs == 0 {
            return Err(ConfigError::ValidationFailed(
                "Poll interval and max wait must be at least 1 second".to_string(),
            ));
        }
        if self.concurrency == 0 || self.concurrency > MAX_CONCURRENCY {
            return Err(ConfigError::ValidationFailed(format!(
                "Concurrency must be between 1 and {}",
                MAX_CONCURRENCY
            )));
        }
        if self.max_code_retries > MAX_RETRIES || self.max_chat_retries > MAX_RETRIES {
            return Err(ConfigError::ValidationFailed(format!(
                "Retry budgets cannot exceed {}",
                MAX_RETRIES
            )));
        }
        if self.deadline_secs == Some(0) {
            return Err(ConfigError::ValidationFailed(
                "Deadline must be at least 1 second".to_string(),
            ));
        }
        if !is_known_level(&self.log_level) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}. Valid options: trace, debug, info, warn, error",
                self.log_level
            )));
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn analyzer_endpoint(&self) -> Result<ModelEndpoint, ConfigError> {
        self.analyzer.endpoint()
    }

    pub fn coder_endpoint(&self) -> Result<ModelEndpoint, ConfigError> {
        self.coder.endpoint()
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_chat_retries,
            ..RetryPolicy::default()
        }
    }

    pub fn conversion_settings(&self) -> ConversionSettings {
        ConversionSettings {
            base_url: self.conversion_base_url.clone(),
            token: self.conversion_token.clone(),
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            request_timeout: self.request_timeout(),
            poll_interval: Duration::from_secs(self.poll_interval_secs),
            max_wait: Duration::from_secs(self.max_wait_secs),
        }
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig::new()
            .with_concurrency(self.concurrency)
            .with_max_code_retries(self.max_code_retries)
            .with_max_chat_retries(self.max_chat_retries)
            .with_failed_task_policy(self.failed_task_policy)
            .with_duplicate_policy(self.duplicate_policy)
            .with_polling(
                Duration::from_secs(self.poll_interval_secs),
                Duration::from_secs(self.max_wait_secs),
            )
            .with_deadline(self.deadline_secs.map(Duration::from_secs))
    }
}

fn mask(secret: &Option<String>) -> &'static str {
    if secret.is_some() {
        "set"
    } else {
        "unset"
    }
}

impl fmt::Display for Thesis2CodeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "thesis2code Configuration:")?;
        writeln!(
            f,
            "  Analyzer: {}/{} (key {})",
            self.analyzer.provider,
            self.analyzer.model,
            mask(&self.analyzer.api_key)
        )?;
        writeln!(
            f,
            "  Coder: {}/{} (key {})",
            self.coder.provider,
            self.coder.model,
            mask(&self.coder.api_key)
        )?;
        writeln!(
            f,
            "  Conversion: {} (token {})",
            self.conversion_base_url,
            mask(&self.conversion_token)
        )?;
        writeln!(f, "  Request Timeout: {}s", self.request_timeout_secs)?;
        writeln!(
            f,
            "  Retries: code {}, chat {}",
            self.max_code_retries, self.max_chat_retries
        )?;
        writeln!(f, "  Concurrency: {}", self.concurrency)?;
        writeln!(f, "  Output Dir: {}", self.output_dir.display())?;
        writeln!(f, "  Log Level: {}", self.log_level)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Helper to temporarily set environment variables for testing
    struct EnvGuard {
        key: String,
        old_value: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &str, value: &str) -> Self {
            let old_value = env::var(key).ok();
            env::set_var(key, value);
            Self {
                key: key.to_string(),
                old_value,
            }
        }

        fn unset(key: &str) -> Self {
            let old_value = env::var(key).ok();
            env::remove_var(key);
            Self {
                key: key.to_string(),
                old_value,
            }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.old_value {
                Some(v) => env::set_var(&self.key, v),
                None => env::remove_var(&self.key),
            }
        }
    }

    const ROLE_VARS: &[&str] = &[
        "THESIS2CODE_PROVIDER",
        "THESIS2CODE_MODEL",
        "THESIS2CODE_BASE_URL",
        "THESIS2CODE_API_KEY",
        "THESIS2CODE_ANALYZER_PROVIDER",
        "THESIS2CODE_ANALYZER_MODEL",
        "THESIS2CODE_ANALYZER_BASE_URL",
        "THESIS2CODE_ANALYZER_API_KEY",
        "THESIS2CODE_CODER_PROVIDER",
        "THESIS2CODE_CODER_MODEL",
        "THESIS2CODE_CODER_BASE_URL",
        "THESIS2CODE_CODER_API_KEY",
    ];

    fn clear_roles() -> Vec<EnvGuard> {
        ROLE_VARS.iter().map(|k| EnvGuard::unset(k)).collect()
    }

    #[test]
    #[serial]
    fn test_default_configuration() {
        let _roles = clear_roles();
        let _guards = vec![
            EnvGuard::unset("THESIS2CODE_CONCURRENCY"),
            EnvGuard::unset("THESIS2CODE_LOG_LEVEL"),
            EnvGuard::unset("THESIS2CODE_DEADLINE"),
        ];

        let config = Thesis2CodeConfig::default();

        assert_eq!(config.analyzer.provider, DEFAULT_PROVIDER);
        assert_eq!(config.analyzer.model, DEFAULT_MODEL);
        assert_eq!(config.coder, config.analyzer);
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.deadline_secs.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_coder_falls_back_to_analyzer() {
        let _roles = clear_roles();
        let _guards = vec![
            EnvGuard::set("THESIS2CODE_ANALYZER_PROVIDER", "anthropic"),
            EnvGuard::set("THESIS2CODE_ANALYZER_MODEL", "claude-sonnet"),
            EnvGuard::set("THESIS2CODE_ANALYZER_BASE_URL", "http://gateway"),
        ];

        let config = Thesis2CodeConfig::default();
        assert_eq!(config.coder.provider, "anthropic");
        assert_eq!(config.coder.model, "claude-sonnet");
        assert_eq!(config.coder.base_url.as_deref(), Some("http://gateway"));
    }

    #[test]
    #[serial]
    fn test_roles_configured_independently() {
        let _roles = clear_roles();
        let _guards = vec![
            EnvGuard::set("THESIS2CODE_MODEL", "shared-model"),
            EnvGuard::set("THESIS2CODE_CODER_PROVIDER", "ollama"),
            EnvGuard::set("THESIS2CODE_CODER_MODEL", "qwen2.5-coder:7b"),
            EnvGuard::set("THESIS2CODE_MAX_CODE_RETRIES", "2"),
            EnvGuard::set("THESIS2CODE_FAILED_TASKS", "abort"),
            EnvGuard::set("THESIS2CODE_DEADLINE", "900"),
        ];

        let config = Thesis2CodeConfig::default();
        assert_eq!(config.analyzer.model, "shared-model");
        assert_eq!(config.coder.model, "qwen2.5-coder:7b");
        assert_eq!(config.coder_endpoint().unwrap().provider, AdapterKind::Ollama);
        assert_eq!(config.max_code_retries, 2);
        assert_eq!(config.failed_task_policy, FailedTaskPolicy::Abort);
        assert_eq!(
            config.pipeline_config().deadline,
            Some(Duration::from_secs(900))
        );
    }

    #[test]
    #[serial]
    fn test_unparseable_numbers_use_defaults() {
        let _guard = EnvGuard::set("THESIS2CODE_CONCURRENCY", "lots");
        let config = Thesis2CodeConfig::default();
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
    }

    #[test]
    fn test_parse_provider_aliases() {
        assert_eq!(parse_provider("OpenAI").unwrap(), AdapterKind::OpenAI);
        assert_eq!(parse_provider("claude").unwrap(), AdapterKind::Anthropic);
        assert!(matches!(
            parse_provider("nonsense"),
            Err(ConfigError::InvalidProvider(_))
        ));
    }

    #[test]
    #[serial]
    fn test_validation_rejects_out_of_range() {
        let base = Thesis2CodeConfig::default();

        let mut config = base.clone();
        config.concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.concurrency = 17;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.max_code_retries = 21;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = base.clone();
        config.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = base;
        config.coder.provider = "nope".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidProvider(_))
        ));
    }

    #[test]
    #[serial]
    fn test_conversion_settings() {
        let _guards = vec![
            EnvGuard::set("THESIS2CODE_CONVERSION_TOKEN", "secret"),
            EnvGuard::set("THESIS2CODE_POLL_INTERVAL", "2"),
        ];
        let config = Thesis2CodeConfig::default();
        let settings = config.conversion_settings();
        assert_eq!(settings.token.as_deref(), Some("secret"));
        assert_eq!(settings.poll_interval, Duration::from_secs(2));
        assert!(!format!("{}", config).contains("secret"));
    }
}
