use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task id reserved for the integration artifact
pub const INTEGRATION_TASK_ID: &str = "main";
pub const INTEGRATION_FILE_NAME: &str = "main.py";
pub const INTEGRATION_DESCRIPTION: &str = "Main program entry point";

/// One synthesized source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub task_id: String,
    pub file_name: String,
    pub code: String,
    pub description: String,
    pub dependencies: Vec<String>,
}

impl GeneratedArtifact {
    pub fn is_integration(&self) -> bool {
        self.task_id == INTEGRATION_TASK_ID
    }

    /// Same artifact with different source text
    pub fn with_code(&self, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            ..self.clone()
        }
    }
}

/// What to do when a task yields no artifact
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedTaskPolicy {
    /// Skip the task and keep going
    #[default]
    Drop,
    /// Fail the synthesis stage
    Abort,
}

impl std::str::FromStr for FailedTaskPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "drop" => Ok(FailedTaskPolicy::Drop),
            "abort" => Ok(FailedTaskPolicy::Abort),
            other => Err(format!("unknown failed-task policy '{}'", other)),
        }
    }
}

/// Synthesis stage result
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisOutput {
    /// Task artifacts in priority order, integration artifact last
    pub artifacts: Vec<GeneratedArtifact>,
    /// Ids of tasks that produced nothing
    pub failed_tasks: Vec<String>,
}

impl SynthesisOutput {
    pub fn integration(&self) -> Option<&GeneratedArtifact> {
        self.artifacts.iter().find(|a| a.is_integration())
    }
}

#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("synthesis of task {task_id} failed: {reason}")]
    TaskFailed { task_id: String, reason: String },
}
