//! thesis2code - turns a thesis document into a runnable Python project
//!
//! The pipeline reads a thesis (local PDF, Markdown or a remote PDF URL),
//! asks an analyzer model to classify it and break its method into code
//! tasks, asks a coder model for one Python module per task plus a `main.py`
//! entry point, repairs syntax errors in a bounded loop and writes the
//! resulting project to a per-run directory.
//!
//! # Core Concepts
//!
//! - **Model roles**: an analyzer model for structuring and classification,
//!   a coder model for synthesis and repair, both behind [`llm::LLMClient`]
//! - **Ingestion tiers**: remote conversion, upload conversion, local
//!   extraction and direct reads, tried in that order
//! - **Run outcome**: a completed [`project::ProjectBundle`] on disk, or an
//!   abort naming the phase that was interrupted
//!
//! # Example Usage
//!
//! ```ignore
//! use thesis2code::{DocumentSource, PipelineContext, RunRequest, Thesis2CodeConfig, WorkflowController};
//! use tokio_util::sync::CancellationToken;
//!
//! async fn generate() -> anyhow::Result<()> {
//!     let config = Thesis2CodeConfig::default();
//!     let controller = WorkflowController::new(PipelineContext::from_config(&config)?);
//!     let request = RunRequest::new(DocumentSource::classify("thesis.pdf"), "output");
//!     let outcome = controller.run(request, CancellationToken::new()).await?;
//!     println!("completed: {}", outcome.is_completed());
//!     Ok(())
//! }
//! ```
//!
//! # Project Structure
//!
//! - [`document`]: ingestion, structuring and data-file scanning
//! - [`analysis`]: classification and task decomposition
//! - [`synthesis`]: per-task code generation and the integration file
//! - [`validation`]: syntax checks, advisory rules and the repair loop
//! - [`project`]: bundle assembly, generated docs and workspace output
//! - [`pipeline`]: the phase-ordered workflow controller

pub mod analysis;
pub mod cli;
pub mod config;
pub mod document;
pub mod extract;
pub mod llm;
pub mod pipeline;
pub mod progress;
pub mod project;
pub mod synthesis;
pub mod util;
pub mod validation;

// Re-export key types for convenient access
pub use analysis::{AnalysisResult, CodeTask, ContentAnalyzer, ThesisType};
pub use config::{ConfigError, ModelRoleConfig, Thesis2CodeConfig};
pub use document::{DocumentIngestor, DocumentSource, ParsedDocument};
pub use llm::{BackendError, LLMClient, ModelClient};
pub use pipeline::{
    CompletedRun, Phase, PipelineConfig, PipelineContext, RunOutcome, RunRequest,
    WorkflowController, WorkflowError,
};
pub use project::{ProjectAssembler, ProjectBundle};
pub use synthesis::{CodeSynthesizer, GeneratedArtifact};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};
pub use validation::{CodeValidator, ValidationOutcome};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_exists() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_name_is_thesis2code() {
        assert_eq!(NAME, "thesis2code");
    }
}
