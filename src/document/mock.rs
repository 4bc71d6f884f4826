use super::error::ConversionError;
use super::local::LocalExtractor;
use super::remote::{ConversionService, TaskStatus, UploadReceipt};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// A call received by [`MockConversionService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionCall {
    Submit(String),
    Upload(PathBuf),
    Status(String),
    Fetch(String),
}

/// Scripted [`ConversionService`] for tests.
///
/// Submissions and uploads fail unless a result was queued. Status polls
/// report `Processing` once their queue is empty, so an unscripted task
/// never completes.
#[derive(Default)]
pub struct MockConversionService {
    submits: Mutex<VecDeque<Result<String, ConversionError>>>,
    uploads: Mutex<VecDeque<Result<UploadReceipt, ConversionError>>>,
    statuses: Mutex<VecDeque<Result<TaskStatus, ConversionError>>>,
    documents: Mutex<HashMap<String, String>>,
    calls: Mutex<Vec<ConversionCall>>,
}

fn unavailable() -> ConversionError {
    ConversionError::Api {
        status: 503,
        message: "mock service unavailable".to_string(),
    }
}

impl MockConversionService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_submit(&self, result: Result<String, ConversionError>) {
        self.submits.lock().unwrap().push_back(result);
    }

    pub fn add_upload(&self, result: Result<UploadReceipt, ConversionError>) {
        self.uploads.lock().unwrap().push_back(result);
    }

    pub fn add_status(&self, result: Result<TaskStatus, ConversionError>) {
        self.statuses.lock().unwrap().push_back(result);
    }

    pub fn add_document(&self, locator: impl Into<String>, text: impl Into<String>) {
        self.documents
            .lock()
            .unwrap()
            .insert(locator.into(), text.into());
    }

    pub fn calls(&self) -> Vec<ConversionCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, matches: impl Fn(&ConversionCall) -> bool) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| matches(c)).count()
    }

    fn record(&self, call: ConversionCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl ConversionService for MockConversionService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn submit_url(&self, url: &str) -> Result<String, ConversionError> {
        self.record(ConversionCall::Submit(url.to_string()));
        self.submits
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unavailable()))
    }

    async fn upload(&self, path: &Path) -> Result<UploadReceipt, ConversionError> {
        self.record(ConversionCall::Upload(path.to_path_buf()));
        self.uploads
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(unavailable()))
    }

    async fn status(&self, task_id: &str) -> Result<TaskStatus, ConversionError> {
        self.record(ConversionCall::Status(task_id.to_string()));
        self.statuses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(TaskStatus::Processing))
    }

    async fn fetch_text(&self, locator: &str) -> Result<String, ConversionError> {
        self.record(ConversionCall::Fetch(locator.to_string()));
        self.documents
            .lock()
            .unwrap()
            .get(locator)
            .cloned()
            .ok_or_else(|| ConversionError::Api {
                status: 404,
                message: format!("no document at {}", locator),
            })
    }
}

/// [`LocalExtractor`] returning fixed pages and counting invocations
pub struct MockLocalExtractor {
    pages: Option<Vec<String>>,
    calls: AtomicUsize,
}

impl MockLocalExtractor {
    pub fn with_pages(pages: Vec<String>) -> Self {
        Self {
            pages: Some(pages),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            pages: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LocalExtractor for MockLocalExtractor {
    fn name(&self) -> &str {
        "mock"
    }

    fn extract_pages(&self, _path: &Path) -> anyhow::Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.pages
            .clone()
            .ok_or_else(|| anyhow::anyhow!("mock extraction failure"))
    }
}
