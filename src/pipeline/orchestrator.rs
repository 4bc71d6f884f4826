use super::context::PipelineContext;
use super::error::WorkflowError;
use super::phase::Phase;
use crate::analysis::{AnalysisResult, AnalysisSummary, ContentAnalyzer};
use crate::document::{
    scan_data_files, DataFileDescriptor, DocumentIngestor, DocumentSource, DocumentStructurer,
    IngestTier, ParsedDocument,
};
use crate::progress::ProgressEvent;
use crate::project::{create_archive, new_run_id, ProjectAssembler, ProjectBundle, Workspace};
use crate::synthesis::{CodeSynthesizer, SynthesisOutput};
use crate::util::{TimedWait, WaitOutcome};
use crate::validation::{apply_fixes, CodeValidator, ValidationOutcome};
use anyhow::{Context, Result};
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Inputs of one run
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub document: DocumentSource,
    pub data_dir: Option<PathBuf>,
    pub output_dir: PathBuf,
    /// Also pack the working directory as `.tar.gz`
    pub archive: bool,
}

impl RunRequest {
    pub fn new(document: DocumentSource, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            document,
            data_dir: None,
            output_dir: output_dir.into(),
            archive: false,
        }
    }

    pub fn with_data_dir(mut self, data_dir: Option<PathBuf>) -> Self {
        self.data_dir = data_dir;
        self
    }

    pub fn with_archive(mut self, archive: bool) -> Self {
        self.archive = archive;
        self
    }
}

/// A finished run
#[derive(Debug, Clone)]
pub struct CompletedRun {
    pub bundle: ProjectBundle,
    pub work_dir: PathBuf,
    pub archive: Option<PathBuf>,
    pub ingest_tier: IngestTier,
    /// Tasks that produced no artifact
    pub failed_tasks: Vec<String>,
}

#[derive(Debug, Clone)]
pub enum RunOutcome {
    Completed(CompletedRun),
    /// Cancelled or past the deadline; files written so far stay on disk
    Aborted {
        run_id: String,
        phase: Phase,
        reason: String,
    },
}

impl RunOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, RunOutcome::Completed(_))
    }
}

/// Cancellation and deadline shared by every phase of one run
struct RunGuard {
    cancel: CancellationToken,
    wait: Option<TimedWait>,
}

impl RunGuard {
    fn new(cancel: CancellationToken, deadline: Option<std::time::Duration>) -> Self {
        let wait = deadline.map(|d| TimedWait::new(d, cancel.clone()));
        Self { cancel, wait }
    }

    fn token(&self) -> &CancellationToken {
        &self.cancel
    }

    fn aborted(&self, phase: Phase, outcome: WaitOutcome) -> WorkflowError {
        self.cancel.cancel();
        match outcome {
            WaitOutcome::Expired => WorkflowError::DeadlineExceeded { phase },
            WaitOutcome::Cancelled | WaitOutcome::Ready => WorkflowError::Cancelled { phase },
        }
    }

    fn check(&self, phase: Phase) -> Result<(), WorkflowError> {
        if self.cancel.is_cancelled() {
            return Err(self.aborted(phase, WaitOutcome::Cancelled));
        }
        if self.wait.as_ref().is_some_and(|w| w.is_expired()) {
            return Err(self.aborted(phase, WaitOutcome::Expired));
        }
        Ok(())
    }

    /// Drives `fut` to completion unless the run is cancelled or expires
    /// first; the future is dropped in that case
    async fn run<F: Future>(&self, phase: Phase, fut: F) -> Result<F::Output, WorkflowError> {
        let result = match &self.wait {
            Some(wait) => wait.run(fut).await,
            None => {
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => Err(WaitOutcome::Cancelled),
                    output = fut => Ok(output),
                }
            }
        };
        result.map_err(|outcome| self.aborted(phase, outcome))
    }
}

/// Drives one thesis through every phase
pub struct WorkflowController {
    context: PipelineContext,
    ingestor: DocumentIngestor,
    structurer: DocumentStructurer,
    analyzer: ContentAnalyzer,
    synthesizer: CodeSynthesizer,
    validator: CodeValidator,
    assembler: ProjectAssembler,
}

impl WorkflowController {
    pub fn new(context: PipelineContext) -> Self {
        let config = &context.config;
        let ingestor = DocumentIngestor::new(
            context.conversion.clone(),
            context.local_extractor.clone(),
            config.poll_interval,
            config.max_wait,
        );
        let structurer =
            DocumentStructurer::new(context.analyzer_model.clone(), config.structure_char_budget);
        let analyzer = ContentAnalyzer::new(context.analyzer_model.clone());
        let synthesizer = CodeSynthesizer::new(context.coder_model.clone())
            .with_concurrency(config.concurrency)
            .with_policy(config.failed_task_policy);
        let validator = CodeValidator::new(context.coder_model.clone())
            .with_max_retries(config.max_code_retries)
            .with_chat_retries(config.max_chat_retries);
        let assembler = ProjectAssembler::new(config.duplicate_policy);

        Self {
            context,
            ingestor,
            structurer,
            analyzer,
            synthesizer,
            validator,
            assembler,
        }
    }

    pub fn context(&self) -> &PipelineContext {
        &self.context
    }

    fn emit(&self, event: ProgressEvent) {
        self.context.progress.on_progress(&event);
    }

    fn begin(&self, phase: &mut Phase, next: Phase) -> Instant {
        *phase = next;
        info!("Phase: {}", next);
        self.emit(ProgressEvent::PhaseStarted { phase: next });
        Instant::now()
    }

    fn finish(&self, phase: Phase, started: Instant) {
        self.emit(ProgressEvent::PhaseComplete {
            phase,
            duration: started.elapsed(),
        });
        debug!("Phase {} complete", phase);
    }

    /// Runs every phase.
    ///
    /// Cancellation of `cancel` or the configured deadline yields
    /// `RunOutcome::Aborted`; any other failure is an error naming the phase.
    pub async fn run(&self, request: RunRequest, cancel: CancellationToken) -> Result<RunOutcome> {
        let run_id = new_run_id();
        let started = Instant::now();
        let mut phase = Phase::Prepare;
        self.emit(ProgressEvent::RunStarted {
            run_id: run_id.clone(),
            document: request.document.to_string(),
        });

        let guard = RunGuard::new(cancel.child_token(), self.context.config.deadline);
        let result = self
            .execute(&run_id, &request, &guard, &mut phase)
            .await;

        match result {
            Ok(completed) => {
                self.emit(ProgressEvent::RunComplete {
                    run_id,
                    work_dir: completed.work_dir.clone(),
                    files: completed.bundle.files.len(),
                    total_time: started.elapsed(),
                });
                Ok(RunOutcome::Completed(completed))
            }
            Err(e) => {
                let aborted = e
                    .downcast_ref::<WorkflowError>()
                    .and_then(WorkflowError::aborted_phase);
                if let Some(at) = aborted {
                    self.emit(ProgressEvent::RunAborted {
                        run_id: run_id.clone(),
                        phase: at,
                    });
                    return Ok(RunOutcome::Aborted {
                        run_id,
                        phase: at,
                        reason: e.to_string(),
                    });
                }
                self.emit(ProgressEvent::RunFailed {
                    phase,
                    error: format!("{:#}", e),
                });
                Err(e.context(format!("Phase {} failed (run {})", phase, run_id)))
            }
        }
    }

    async fn execute(
        &self,
        run_id: &str,
        request: &RunRequest,
        guard: &RunGuard,
        phase: &mut Phase,
    ) -> Result<CompletedRun> {
        let config = &self.context.config;

        let t = self.begin(phase, Phase::Prepare);
        let workspace = Workspace::create(&request.output_dir, run_id)?;
        self.finish(*phase, t);

        let t = self.begin(phase, Phase::Ingest);
        let ingested = guard
            .run(
                Phase::Ingest,
                self.ingestor.ingest(&request.document, guard.token()),
            )
            .await?;
        let ingest_tier = ingested.tier;
        let document: ParsedDocument = guard
            .run(Phase::Ingest, self.structurer.structure(ingested.text))
            .await?;
        workspace.store_document(&request.document, &document.raw_text)?;
        self.finish(*phase, t);

        let t = self.begin(phase, Phase::ScanData);
        guard.check(Phase::ScanData)?;
        let data_files = match &request.data_dir {
            Some(dir) if dir.is_dir() => {
                let dir = dir.clone();
                let limit = config.data_file_limit;
                let found = tokio::task::spawn_blocking(move || scan_data_files(&dir, true, limit))
                    .await
                    .context("Data file scan task failed")?;
                workspace.copy_data_files(&found)?
            }
            Some(dir) => {
                info!(dir = %dir.display(), "Data directory not found, continuing without data files");
                Vec::new()
            }
            None => Vec::new(),
        };
        self.finish(*phase, t);

        let t = self.begin(phase, Phase::Analyze);
        let analysis = self
            .analyze(&document, &data_files, &workspace, guard)
            .await?;
        self.finish(*phase, t);

        let t = self.begin(phase, Phase::Synthesize);
        let synthesis: SynthesisOutput = guard
            .run(Phase::Synthesize, self.synthesizer.synthesize(&analysis))
            .await??;
        for artifact in &synthesis.artifacts {
            self.emit(ProgressEvent::TaskSynthesized {
                task_id: artifact.task_id.clone(),
                file_name: artifact.file_name.clone(),
            });
        }
        for task_id in &synthesis.failed_tasks {
            self.emit(ProgressEvent::TaskDropped {
                task_id: task_id.clone(),
            });
        }
        self.finish(*phase, t);

        let t = self.begin(phase, Phase::Validate);
        let outcomes: Vec<ValidationOutcome> = guard
            .run(
                Phase::Validate,
                self.validator.validate_all(&synthesis.artifacts),
            )
            .await?;
        for outcome in &outcomes {
            self.emit(ProgressEvent::ArtifactValidated {
                file_name: outcome.file_name.clone(),
                is_valid: outcome.is_valid,
                repaired: outcome.fixed_code.is_some(),
                suggestions: outcome.suggestions.len(),
            });
        }
        let final_artifacts = apply_fixes(&synthesis.artifacts, &outcomes);
        self.finish(*phase, t);

        let t = self.begin(phase, Phase::Assemble);
        guard.check(Phase::Assemble)?;
        let bundle =
            self.assembler
                .assemble(run_id, &document, &analysis, &final_artifacts, &outcomes)?;
        workspace.write_bundle(&bundle)?;
        self.finish(*phase, t);

        let archive = if request.archive {
            let t = self.begin(phase, Phase::Package);
            guard.check(Phase::Package)?;
            let root = workspace.root().to_path_buf();
            let path = tokio::task::spawn_blocking(move || create_archive(&root))
                .await
                .context("Archive task failed")??;
            self.finish(*phase, t);
            Some(path)
        } else {
            None
        };

        info!(run_id = %run_id, work_dir = %workspace.root().display(), "Run complete");
        Ok(CompletedRun {
            bundle,
            work_dir: workspace.root().to_path_buf(),
            archive,
            ingest_tier,
            failed_tasks: synthesis.failed_tasks,
        })
    }

    /// Analysis, persisted right away so a later failure still leaves it on disk
    async fn analyze(
        &self,
        document: &ParsedDocument,
        data_files: &[DataFileDescriptor],
        workspace: &Workspace,
        guard: &RunGuard,
    ) -> Result<AnalysisResult> {
        let analysis = guard
            .run(Phase::Analyze, self.analyzer.analyze(document, data_files))
            .await?;
        let json = serde_json::to_string_pretty(&AnalysisSummary::from(&analysis))
            .context("Failed to serialize analysis summary")?;
        workspace.write_analysis(&json)?;
        Ok(analysis)
    }
}

impl std::fmt::Debug for WorkflowController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkflowController")
            .field("context", &self.context)
            .finish()
    }
}
