//! Remote document-conversion service
//!
//! The service accepts either a public locator or an uploaded file, runs an
//! asynchronous conversion task and exposes its status for polling. On
//! completion the Markdown is inline or behind a fetchable locator.

use super::error::ConversionError;
use crate::extract::lenient_string;
use async_trait::async_trait;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_BASE_URL: &str = "https://mineru.net/api/v4";
pub const DEFAULT_MODEL_VERSION: &str = "vlm";

/// What an upload returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadReceipt {
    /// The upload already started a conversion task
    Task(String),
    /// The file is now reachable at a locator that must be submitted
    Locator(String),
}

/// Converted content on completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConvertedContent {
    Inline(String),
    Locator(String),
}

/// One status report for a conversion task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Submitted,
    Processing,
    Completed(ConvertedContent),
    Failed(String),
}

#[async_trait]
pub trait ConversionService: Send + Sync {
    fn name(&self) -> &str;

    /// Submits a public locator, returning the task id
    async fn submit_url(&self, url: &str) -> Result<String, ConversionError>;

    /// Uploads a local file
    async fn upload(&self, path: &Path) -> Result<UploadReceipt, ConversionError>;

    async fn status(&self, task_id: &str) -> Result<TaskStatus, ConversionError>;

    /// Downloads converted text from a result locator
    async fn fetch_text(&self, locator: &str) -> Result<String, ConversionError>;
}

/// Connection settings for [`HttpConversionService`]
#[derive(Debug, Clone)]
pub struct ConversionSettings {
    pub base_url: String,
    pub token: Option<String>,
    pub model_version: String,
    pub request_timeout: Duration,
    pub poll_interval: Duration,
    pub max_wait: Duration,
}

impl Default for ConversionSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            token: None,
            model_version: DEFAULT_MODEL_VERSION.to_string(),
            request_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
        }
    }
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default, deserialize_with = "lenient_string")]
    msg: String,
    #[serde(default)]
    data: Option<EnvelopeData>,
}

#[derive(Debug, Default, Deserialize)]
struct EnvelopeData {
    #[serde(default, deserialize_with = "lenient_string")]
    task_id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    status: String,
    #[serde(default, deserialize_with = "lenient_string")]
    url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    markdown: String,
    #[serde(default, deserialize_with = "lenient_string")]
    markdown_url: String,
    #[serde(default, deserialize_with = "lenient_string")]
    err_msg: String,
}

impl Envelope {
    /// Unwraps `data`, turning a non-zero `code` into [`ConversionError::Rejected`]
    fn into_data(self) -> Result<EnvelopeData, ConversionError> {
        match self.code {
            Some(code) if code != 0 => Err(ConversionError::Rejected {
                code,
                message: self.msg,
            }),
            _ => Ok(self.data.unwrap_or_default()),
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn parse_status(data: EnvelopeData) -> TaskStatus {
    match data.status.trim().to_ascii_lowercase().as_str() {
        "completed" | "done" | "success" => match non_empty(data.markdown_url) {
            Some(locator) => TaskStatus::Completed(ConvertedContent::Locator(locator)),
            None => TaskStatus::Completed(ConvertedContent::Inline(data.markdown)),
        },
        "failed" | "error" => TaskStatus::Failed(
            non_empty(data.err_msg).unwrap_or_else(|| "conversion failed".to_string()),
        ),
        "" | "submitted" | "pending" | "waiting" | "queued" => TaskStatus::Submitted,
        _ => TaskStatus::Processing,
    }
}

/// Checks a response for a non-success status
async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ConversionError> {
    if !resp.status().is_success() {
        return Err(ConversionError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

async fn read_envelope(resp: reqwest::Response) -> Result<EnvelopeData, ConversionError> {
    let resp = check_response(resp).await?;
    let body = resp.text().await?;
    let envelope: Envelope =
        serde_json::from_str(&body).map_err(|e| ConversionError::Parse(e.to_string()))?;
    envelope.into_data()
}

/// [`ConversionService`] over the service's HTTP API
pub struct HttpConversionService {
    http: reqwest::Client,
    settings: ConversionSettings,
}

impl HttpConversionService {
    pub fn new(settings: ConversionSettings) -> Result<Self, ConversionError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("thesis2code/", env!("CARGO_PKG_VERSION")))
            .timeout(settings.request_timeout)
            .build()?;
        Ok(Self { http, settings })
    }

    pub fn settings(&self) -> &ConversionSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.settings.base_url.trim_end_matches('/'), path)
    }

    fn token(&self) -> Result<&str, ConversionError> {
        self.settings
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ConversionError::NotConfigured("missing API token".to_string()))
    }
}

#[async_trait]
impl ConversionService for HttpConversionService {
    fn name(&self) -> &str {
        "http"
    }

    async fn submit_url(&self, url: &str) -> Result<String, ConversionError> {
        let resp = self
            .http
            .post(self.endpoint("extract/task"))
            .bearer_auth(self.token()?)
            .json(&serde_json::json!({
                "url": url,
                "model_version": self.settings.model_version,
            }))
            .send()
            .await?;

        let data = read_envelope(resp).await?;
        debug!(task_id = %data.task_id, "Conversion task submitted");
        non_empty(data.task_id).ok_or(ConversionError::MissingField("task_id"))
    }

    async fn upload(&self, path: &Path) -> Result<UploadReceipt, ConversionError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "document.pdf".to_string());

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")?;
        let form = reqwest::multipart::Form::new().part("file", part);

        let resp = self
            .http
            .post(self.endpoint("file/upload"))
            .bearer_auth(self.token()?)
            .multipart(form)
            .send()
            .await?;

        let data = read_envelope(resp).await?;
        if let Some(task_id) = non_empty(data.task_id) {
            return Ok(UploadReceipt::Task(task_id));
        }
        non_empty(data.url)
            .map(UploadReceipt::Locator)
            .ok_or(ConversionError::MissingField("task_id or url"))
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatus, ConversionError> {
        let resp = self
            .http
            .get(self.endpoint(&format!("extract/task/{}", task_id)))
            .bearer_auth(self.token()?)
            .send()
            .await?;

        Ok(parse_status(read_envelope(resp).await?))
    }

    async fn fetch_text(&self, locator: &str) -> Result<String, ConversionError> {
        let resp = check_response(self.http.get(locator).send().await?).await?;
        Ok(resp.text().await?)
    }
}

impl std::fmt::Debug for HttpConversionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConversionService")
            .field("base_url", &self.settings.base_url)
            .field("has_token", &self.settings.token.is_some())
            .finish()
    }
}
