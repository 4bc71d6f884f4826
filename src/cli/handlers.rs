//! Subcommand handlers; each returns the process exit code

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::commands::{ConfigArgs, GenerateArgs};
use super::output::{OutputFormat, OutputFormatter};
use crate::config::Thesis2CodeConfig;
use crate::document::DocumentSource;
use crate::pipeline::{PipelineContext, RunOutcome, RunRequest, WorkflowController};
use crate::progress::{LoggingHandler, NoOpHandler, ProgressHandler};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_ABORTED: i32 = 2;

/// Layers command-line overrides over the environment configuration
pub fn apply_overrides(mut config: Thesis2CodeConfig, args: &GenerateArgs) -> Thesis2CodeConfig {
    if let Some(output) = &args.output {
        config.output_dir = output.clone();
    }
    if let Some(timeout) = args.timeout {
        config.deadline_secs = Some(timeout);
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }
    if let Some(retries) = args.max_retries {
        config.max_code_retries = retries;
    }
    if let Some(model) = &args.analyzer_model {
        debug!("Analyzer model overridden to: {}", model);
        config.analyzer.model = model.clone();
    }
    if let Some(model) = &args.coder_model {
        debug!("Coder model overridden to: {}", model);
        config.coder.model = model.clone();
    }
    config
}

pub async fn handle_generate(args: &GenerateArgs, quiet: bool) -> i32 {
    info!("Starting thesis code generation");

    let document = DocumentSource::classify(&args.document);
    debug!("Document source: {:?}", document);
    if let DocumentSource::LocalPdf(path) | DocumentSource::LocalText(path) = &document {
        if !path.is_file() {
            error!("Document does not exist: {}", path.display());
            return EXIT_FAILURE;
        }
    }
    if let Some(data) = &args.data {
        if !data.is_dir() {
            error!("Data directory does not exist: {}", data.display());
            return EXIT_FAILURE;
        }
    }

    let config = apply_overrides(Thesis2CodeConfig::default(), args);
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        eprintln!("\nPlease check your environment variables and command-line arguments.");
        return EXIT_FAILURE;
    }
    debug!("Configuration: {}", config);

    let progress: Arc<dyn ProgressHandler> = if quiet {
        Arc::new(NoOpHandler)
    } else {
        Arc::new(LoggingHandler)
    };
    let context = match PipelineContext::from_config(&config) {
        Ok(context) => context.with_progress(progress),
        Err(e) => {
            error!("Failed to initialize pipeline: {:#}", e);
            return EXIT_FAILURE;
        }
    };
    let controller = WorkflowController::new(context);

    let cancel = CancellationToken::new();
    let ctrl_c = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling run");
                cancel.cancel();
            }
        })
    };

    let request = RunRequest::new(document, config.output_dir.clone())
        .with_data_dir(args.data.clone())
        .with_archive(args.archive);
    let result = controller.run(request, cancel).await;
    ctrl_c.abort();

    let outcome = match result {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("Generation failed: {:#}", e);
            return EXIT_FAILURE;
        }
    };

    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    match formatter.format_run(&outcome) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to format output: {}", e);
            return EXIT_FAILURE;
        }
    }

    exit_code(&outcome)
}

pub fn exit_code(outcome: &RunOutcome) -> i32 {
    match outcome {
        RunOutcome::Completed(_) => EXIT_SUCCESS,
        RunOutcome::Aborted { .. } => EXIT_ABORTED,
    }
}

pub async fn handle_config(args: &ConfigArgs) -> i32 {
    let config = Thesis2CodeConfig::default();
    let formatter = OutputFormatter::new(OutputFormat::from(args.format));
    match formatter.format_config(&config) {
        Ok(text) => println!("{}", text),
        Err(e) => {
            error!("Failed to format configuration: {}", e);
            return EXIT_FAILURE;
        }
    }

    match config.validate() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            error!("Configuration error: {}", e);
            EXIT_FAILURE
        }
    }
}
