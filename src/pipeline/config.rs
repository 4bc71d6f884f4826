use crate::document::data_files::DEFAULT_FILE_LIMIT;
use crate::document::structure::DEFAULT_CHAR_BUDGET;
use crate::project::DuplicateFilePolicy;
use crate::synthesis::{FailedTaskPolicy, DEFAULT_CONCURRENCY};
use crate::validation::DEFAULT_MAX_RETRIES;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Synthesis worker pool size
    pub concurrency: usize,
    /// Repair requests per artifact
    pub max_code_retries: u32,
    /// Attempts per model call
    pub max_chat_retries: u32,
    pub failed_task_policy: FailedTaskPolicy,
    pub duplicate_policy: DuplicateFilePolicy,
    /// Characters of raw text handed to the structuring prompt
    pub structure_char_budget: usize,
    pub data_file_limit: usize,
    pub poll_interval: Duration,
    pub max_wait: Duration,
    /// Overall run deadline
    pub deadline: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            max_code_retries: DEFAULT_MAX_RETRIES,
            max_chat_retries: 3,
            failed_task_policy: FailedTaskPolicy::default(),
            duplicate_policy: DuplicateFilePolicy::default(),
            structure_char_budget: DEFAULT_CHAR_BUDGET,
            data_file_limit: DEFAULT_FILE_LIMIT,
            poll_interval: Duration::from_secs(5),
            max_wait: Duration::from_secs(300),
            deadline: None,
        }
    }
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_max_code_retries(mut self, retries: u32) -> Self {
        self.max_code_retries = retries;
        self
    }

    pub fn with_max_chat_retries(mut self, retries: u32) -> Self {
        self.max_chat_retries = retries;
        self
    }

    pub fn with_failed_task_policy(mut self, policy: FailedTaskPolicy) -> Self {
        self.failed_task_policy = policy;
        self
    }

    pub fn with_duplicate_policy(mut self, policy: DuplicateFilePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    pub fn with_polling(mut self, interval: Duration, max_wait: Duration) -> Self {
        self.poll_interval = interval;
        self.max_wait = max_wait;
        self
    }

    pub fn with_deadline(mut self, deadline: Option<Duration>) -> Self {
        self.deadline = deadline;
        self
    }
}
