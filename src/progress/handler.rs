//! Progress handler trait and events

use crate::pipeline::Phase;
use std::path::PathBuf;
use std::time::Duration;

/// Events emitted while a run moves through its phases
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    /// Run started; `run_id` names the working directory
    RunStarted { run_id: String, document: String },

    PhaseStarted { phase: Phase },

    PhaseComplete { phase: Phase, duration: Duration },

    /// One task produced an artifact
    TaskSynthesized { task_id: String, file_name: String },

    /// One task produced nothing and was left out
    TaskDropped { task_id: String },

    ArtifactValidated {
        file_name: String,
        is_valid: bool,
        repaired: bool,
        suggestions: usize,
    },

    RunComplete {
        run_id: String,
        work_dir: PathBuf,
        files: usize,
        total_time: Duration,
    },

    RunFailed { phase: Phase, error: String },

    /// Cancelled or past its deadline
    RunAborted { run_id: String, phase: Phase },
}

/// Trait for handling progress events during a run
pub trait ProgressHandler: Send + Sync {
    /// Called when a progress event occurs
    fn on_progress(&self, event: &ProgressEvent);
}

/// No-op handler that ignores all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpHandler;

impl ProgressHandler for NoOpHandler {
    fn on_progress(&self, _event: &ProgressEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingHandler {
        count: Arc<AtomicUsize>,
    }

    impl ProgressHandler for CountingHandler {
        fn on_progress(&self, _event: &ProgressEvent) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_noop_handler() {
        NoOpHandler.on_progress(&ProgressEvent::PhaseStarted {
            phase: Phase::Ingest,
        });
    }

    #[test]
    fn test_progress_events() {
        let count = Arc::new(AtomicUsize::new(0));
        let handler = CountingHandler {
            count: count.clone(),
        };

        handler.on_progress(&ProgressEvent::RunStarted {
            run_id: "20260101_000000_abcdef".to_string(),
            document: "thesis.pdf".to_string(),
        });
        handler.on_progress(&ProgressEvent::TaskDropped {
            task_id: "task_1".to_string(),
        });
        handler.on_progress(&ProgressEvent::PhaseComplete {
            phase: Phase::Synthesize,
            duration: Duration::from_millis(20),
        });

        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_event_debug() {
        let event = ProgressEvent::PhaseStarted {
            phase: Phase::Validate,
        };
        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("PhaseStarted"));
        assert!(debug_str.contains("Validate"));
    }
}
