//! Run orchestration: one controller drives every phase in order

pub mod config;
pub mod context;
pub mod error;
pub mod orchestrator;
pub mod phase;

pub use config::PipelineConfig;
pub use context::PipelineContext;
pub use error::WorkflowError;
pub use orchestrator::{CompletedRun, RunOutcome, RunRequest, WorkflowController};
pub use phase::Phase;
