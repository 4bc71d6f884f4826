//! Logging-based progress handler

use super::{ProgressEvent, ProgressHandler};
use tracing::{debug, error, info, warn};

/// Handler that logs progress events using tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingHandler;

impl ProgressHandler for LoggingHandler {
    fn on_progress(&self, event: &ProgressEvent) {
        match event {
            ProgressEvent::RunStarted { run_id, document } => {
                info!(run_id = %run_id, document = %document, "Starting run");
            }
            ProgressEvent::PhaseStarted { phase } => {
                info!(phase = %phase, "Starting phase");
            }
            ProgressEvent::PhaseComplete { phase, duration } => {
                info!(
                    phase = %phase,
                    duration_ms = duration.as_millis(),
                    "Phase complete"
                );
            }
            ProgressEvent::TaskSynthesized { task_id, file_name } => {
                debug!(task_id = %task_id, file = %file_name, "Task synthesized");
            }
            ProgressEvent::TaskDropped { task_id } => {
                warn!(task_id = %task_id, "Task produced no code");
            }
            ProgressEvent::ArtifactValidated {
                file_name,
                is_valid,
                repaired,
                suggestions,
            } => {
                if *is_valid {
                    debug!(file = %file_name, repaired, suggestions, "Artifact valid");
                } else {
                    warn!(file = %file_name, "Artifact failed validation");
                }
            }
            ProgressEvent::RunComplete {
                run_id,
                work_dir,
                files,
                total_time,
            } => {
                info!(
                    run_id = %run_id,
                    work_dir = %work_dir.display(),
                    files,
                    total_time_ms = total_time.as_millis(),
                    "Run complete"
                );
            }
            ProgressEvent::RunFailed { phase, error: err } => {
                error!(phase = %phase, error = %err, "Run failed");
            }
            ProgressEvent::RunAborted { run_id, phase } => {
                warn!(run_id = %run_id, phase = %phase, "Run aborted");
            }
        }
    }
}
