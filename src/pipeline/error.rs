use super::phase::Phase;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("run cancelled during {phase}")]
    Cancelled { phase: Phase },

    #[error("run deadline exceeded during {phase}")]
    DeadlineExceeded { phase: Phase },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl WorkflowError {
    /// Phase a cancelled or expired run stopped in
    pub fn aborted_phase(&self) -> Option<Phase> {
        match self {
            WorkflowError::Cancelled { phase } | WorkflowError::DeadlineExceeded { phase } => {
                Some(*phase)
            }
            _ => None,
        }
    }
}
