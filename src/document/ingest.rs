//! Document ingestion fallback chain
//!
//! Tiers, first success wins:
//! 1. remote locator submitted to the conversion service, then polled
//! 2. local PDF uploaded; a returned task is polled, a returned locator goes through tier 1
//! 3. local page-by-page text extraction
//!
//! Markdown and plain-text inputs skip the chain and are read directly.
//! Exhausting every tier yields empty text, never an error.

use super::local::{render_pages, LocalExtractor};
use super::remote::{ConversionService, ConvertedContent, TaskStatus, UploadReceipt};
use super::types::{DocumentSource, IngestTier, IngestedText};
use crate::util::wait::{TimedWait, WaitOutcome};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const TEXT_EXTENSIONS: &[&str] = &["md", "markdown", "txt"];

/// Terminal state of one conversion attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionOutcome {
    Completed(String),
    Failed(String),
    Timeout,
    Cancelled,
}

impl ConversionOutcome {
    fn into_text(self) -> Option<String> {
        match self {
            ConversionOutcome::Completed(text) if !text.trim().is_empty() => Some(text),
            _ => None,
        }
    }
}

pub struct DocumentIngestor {
    service: Arc<dyn ConversionService>,
    local: Arc<dyn LocalExtractor>,
    poll_interval: Duration,
    max_wait: Duration,
}

impl DocumentIngestor {
    pub fn new(
        service: Arc<dyn ConversionService>,
        local: Arc<dyn LocalExtractor>,
        poll_interval: Duration,
        max_wait: Duration,
    ) -> Self {
        Self {
            service,
            local,
            poll_interval,
            max_wait,
        }
    }

    /// Converts `source` to plain text via the first tier that succeeds
    pub async fn ingest(&self, source: &DocumentSource, cancel: &CancellationToken) -> IngestedText {
        info!(source = %source, "Ingesting document");

        let result = match source {
            DocumentSource::LocalText(path) => read_direct(path).await,
            DocumentSource::Remote(url) => match self.convert_locator(url, cancel).await {
                Some(text) => IngestedText {
                    text,
                    tier: IngestTier::Remote,
                },
                None => IngestedText::empty(),
            },
            DocumentSource::LocalPdf(path) => self.ingest_local_pdf(path, cancel).await,
        };

        if result.tier == IngestTier::None {
            warn!(source = %source, "All ingestion tiers failed, continuing with empty document");
        } else {
            info!(
                tier = ?result.tier,
                chars = result.text.chars().count(),
                "Document ingested"
            );
        }
        result
    }

    async fn ingest_local_pdf(&self, path: &Path, cancel: &CancellationToken) -> IngestedText {
        if !path.exists() {
            error!(path = %path.display(), "Document not found");
            return IngestedText::empty();
        }

        if let Some(text) = self.convert_upload(path, cancel).await {
            return IngestedText {
                text,
                tier: IngestTier::Upload,
            };
        }
        if cancel.is_cancelled() {
            return IngestedText::empty();
        }

        info!(extractor = self.local.name(), "Remote conversion failed, extracting locally");
        match self.extract_local(path).await {
            Some(text) => IngestedText {
                text,
                tier: IngestTier::Local,
            },
            None => IngestedText::empty(),
        }
    }

    /// Tier 1
    async fn convert_locator(&self, url: &str, cancel: &CancellationToken) -> Option<String> {
        let task_id = match self.service.submit_url(url).await {
            Ok(id) => id,
            Err(e) => {
                error!(error = %e, "Conversion submission failed");
                return None;
            }
        };
        self.poll(&task_id, cancel).await.into_text()
    }

    /// Tier 2
    async fn convert_upload(&self, path: &Path, cancel: &CancellationToken) -> Option<String> {
        match self.service.upload(path).await {
            Ok(UploadReceipt::Task(task_id)) => self.poll(&task_id, cancel).await.into_text(),
            Ok(UploadReceipt::Locator(url)) => {
                debug!(url = %url, "Upload returned a locator, submitting it");
                self.convert_locator(&url, cancel).await
            }
            Err(e) => {
                warn!(error = %e, "Upload failed");
                None
            }
        }
    }

    /// Tier 3
    async fn extract_local(&self, path: &Path) -> Option<String> {
        let local = Arc::clone(&self.local);
        let owned = path.to_path_buf();
        let pages = tokio::task::spawn_blocking(move || local.extract_pages(&owned)).await;

        match pages {
            Ok(Ok(pages)) => {
                info!(pages = pages.len(), "Local extraction complete");
                let text = render_pages(&pages);
                (!text.trim().is_empty()).then_some(text)
            }
            Ok(Err(e)) => {
                error!(error = %e, "Local extraction failed");
                None
            }
            Err(e) => {
                error!(error = %e, "Local extraction task panicked");
                None
            }
        }
    }

    /// Polls `task_id` every `poll_interval` until it settles, `max_wait` passes, or `cancel` fires
    pub async fn poll(&self, task_id: &str, cancel: &CancellationToken) -> ConversionOutcome {
        let wait = TimedWait::new(self.max_wait, cancel.clone());

        loop {
            match wait.run(self.service.status(task_id)).await {
                Err(WaitOutcome::Cancelled) => return ConversionOutcome::Cancelled,
                Err(_) => break,
                Ok(Ok(TaskStatus::Completed(content))) => {
                    return self.resolve_content(content, &wait).await;
                }
                Ok(Ok(TaskStatus::Failed(reason))) => {
                    error!(task_id, reason = %reason, "Conversion task failed");
                    return ConversionOutcome::Failed(reason);
                }
                Ok(Ok(status)) => debug!(task_id, status = ?status, "Conversion in progress"),
                Ok(Err(e)) => warn!(task_id, error = %e, "Status check failed"),
            }

            match wait.pause(self.poll_interval).await {
                WaitOutcome::Ready => continue,
                WaitOutcome::Cancelled => return ConversionOutcome::Cancelled,
                WaitOutcome::Expired => break,
            }
        }

        error!(task_id, max_wait_secs = self.max_wait.as_secs(), "Conversion timed out");
        ConversionOutcome::Timeout
    }

    async fn resolve_content(&self, content: ConvertedContent, wait: &TimedWait) -> ConversionOutcome {
        match content {
            ConvertedContent::Inline(text) => ConversionOutcome::Completed(text),
            ConvertedContent::Locator(locator) => match wait.run(self.service.fetch_text(&locator)).await {
                Ok(Ok(text)) => ConversionOutcome::Completed(text),
                Ok(Err(e)) => ConversionOutcome::Failed(format!("fetching result failed: {}", e)),
                Err(WaitOutcome::Cancelled) => ConversionOutcome::Cancelled,
                Err(_) => ConversionOutcome::Timeout,
            },
        }
    }
}

async fn read_direct(path: &Path) -> IngestedText {
    let known = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| TEXT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(true);
    if !known {
        warn!(path = %path.display(), "Unrecognised extension, reading as Markdown");
    }

    match tokio::fs::read(path).await {
        Ok(bytes) => IngestedText {
            text: String::from_utf8_lossy(&bytes).into_owned(),
            tier: IngestTier::Direct,
        },
        Err(e) => {
            error!(path = %path.display(), error = %e, "Failed to read document");
            IngestedText::empty()
        }
    }
}
