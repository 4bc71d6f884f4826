//! Output formatting for run results and configuration
//!
//! Formatters render either JSON (machine-readable) or human-readable text.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt;
use std::path::Path;

use crate::config::Thesis2CodeConfig;
use crate::document::IngestTier;
use crate::pipeline::{Phase, RunOutcome};

/// Output format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format (machine-readable)
    Json,
    /// Human-readable formatted text
    Human,
}

#[derive(Debug, Serialize)]
struct FileReport<'a> {
    file_name: &'a str,
    description: &'a str,
    valid: Option<bool>,
    repaired: bool,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum RunReport<'a> {
    Completed {
        run_id: &'a str,
        title: &'a str,
        work_dir: &'a Path,
        archive: Option<&'a Path>,
        ingest_tier: IngestTier,
        files: Vec<FileReport<'a>>,
        requirements: &'a [String],
        failed_tasks: &'a [String],
    },
    Aborted {
        run_id: &'a str,
        phase: Phase,
        reason: &'a str,
    },
}

impl<'a> From<&'a RunOutcome> for RunReport<'a> {
    fn from(outcome: &'a RunOutcome) -> Self {
        match outcome {
            RunOutcome::Completed(run) => {
                let files = run
                    .bundle
                    .files
                    .iter()
                    .map(|file| {
                        let validation = run
                            .bundle
                            .validation
                            .iter()
                            .find(|v| v.file_name == file.file_name);
                        FileReport {
                            file_name: &file.file_name,
                            description: &file.description,
                            valid: validation.map(|v| v.is_valid),
                            repaired: validation.is_some_and(|v| v.fixed_code.is_some()),
                        }
                    })
                    .collect();
                RunReport::Completed {
                    run_id: &run.bundle.project_name,
                    title: &run.bundle.title,
                    work_dir: &run.work_dir,
                    archive: run.archive.as_deref(),
                    ingest_tier: run.ingest_tier,
                    files,
                    requirements: &run.bundle.requirements,
                    failed_tasks: &run.failed_tasks,
                }
            }
            RunOutcome::Aborted {
                run_id,
                phase,
                reason,
            } => RunReport::Aborted {
                run_id,
                phase: *phase,
                reason,
            },
        }
    }
}

/// Output formatter for run results
pub struct OutputFormatter {
    format: OutputFormat,
}

impl OutputFormatter {
    /// Creates a new output formatter with the specified format
    pub fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    pub fn format_run(&self, outcome: &RunOutcome) -> Result<String> {
        let report = RunReport::from(outcome);
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(&report).context("Failed to serialize run report")
            }
            OutputFormat::Human => Ok(report.to_string()),
        }
    }

    pub fn format_config(&self, config: &Thesis2CodeConfig) -> Result<String> {
        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "analyzer": {
                        "provider": config.analyzer.provider,
                        "model": config.analyzer.model,
                        "base_url": config.analyzer.base_url,
                        "api_key_set": config.analyzer.api_key.is_some(),
                    },
                    "coder": {
                        "provider": config.coder.provider,
                        "model": config.coder.model,
                        "base_url": config.coder.base_url,
                        "api_key_set": config.coder.api_key.is_some(),
                    },
                    "conversion_base_url": config.conversion_base_url,
                    "conversion_token_set": config.conversion_token.is_some(),
                    "request_timeout_secs": config.request_timeout_secs,
                    "max_code_retries": config.max_code_retries,
                    "max_chat_retries": config.max_chat_retries,
                    "concurrency": config.concurrency,
                    "output_dir": config.output_dir,
                    "log_level": config.log_level,
                    "deadline_secs": config.deadline_secs,
                });
                serde_json::to_string_pretty(&value).context("Failed to serialize configuration")
            }
            OutputFormat::Human => Ok(config.to_string()),
        }
    }
}

impl fmt::Display for RunReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunReport::Completed {
                run_id,
                title,
                work_dir,
                archive,
                ingest_tier,
                files,
                requirements,
                failed_tasks,
            } => {
                writeln!(f, "Project generated: {}", run_id)?;
                if !title.is_empty() {
                    writeln!(f, "Title: {}", title)?;
                }
                writeln!(f, "Directory: {}", work_dir.display())?;
                if let Some(archive) = archive {
                    writeln!(f, "Archive: {}", archive.display())?;
                }
                writeln!(f, "Document text from: {}", ingest_tier)?;
                writeln!(f, "\nFiles:")?;
                for file in files {
                    let mark = match (file.valid, file.repaired) {
                        (Some(true), true) => "repaired",
                        (Some(true), false) => "ok",
                        (Some(false), _) => "INVALID",
                        (None, _) => "-",
                    };
                    writeln!(f, "  [{:>8}] {}  {}", mark, file.file_name, file.description)?;
                }
                if !requirements.is_empty() {
                    writeln!(f, "\nRequirements: {}", requirements.join(", "))?;
                }
                if !failed_tasks.is_empty() {
                    writeln!(f, "\nTasks without code: {}", failed_tasks.join(", "))?;
                }
            }
            RunReport::Aborted {
                run_id,
                phase,
                reason,
            } => {
                writeln!(f, "Run {} aborted during {}: {}", run_id, phase, reason)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::CompletedRun;
    use crate::project::{ProjectBundle, ProjectFile};
    use crate::validation::ValidationOutcome;
    use std::path::PathBuf;

    fn completed() -> RunOutcome {
        RunOutcome::Completed(CompletedRun {
            bundle: ProjectBundle {
                project_name: "20260101_000000_abcdef".to_string(),
                title: "Solar Forecasting".to_string(),
                files: vec![ProjectFile {
                    file_name: "model.py".to_string(),
                    task_id: "task_1".to_string(),
                    description: "LSTM model".to_string(),
                    code: String::new(),
                }],
                requirements: vec!["numpy".to_string(), "torch".to_string()],
                readme: String::new(),
                run_instructions: String::new(),
                analysis_json: String::new(),
                validation: vec![ValidationOutcome {
                    file_name: "model.py".to_string(),
                    is_valid: true,
                    fixed_code: Some("x".to_string()),
                    ..Default::default()
                }],
            },
            work_dir: PathBuf::from("/tmp/out/20260101_000000_abcdef"),
            archive: None,
            ingest_tier: IngestTier::Direct,
            failed_tasks: vec!["task_2".to_string()],
        })
    }

    #[test]
    fn test_human_completed() {
        let text = OutputFormatter::new(OutputFormat::Human)
            .format_run(&completed())
            .unwrap();
        assert!(text.contains("Project generated: 20260101_000000_abcdef"));
        assert!(text.contains("repaired"));
        assert!(text.contains("Requirements: numpy, torch"));
        assert!(text.contains("Tasks without code: task_2"));
    }

    #[test]
    fn test_json_completed() {
        let text = OutputFormatter::new(OutputFormat::Json)
            .format_run(&completed())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["status"], "completed");
        assert_eq!(value["files"][0]["repaired"], true);
        assert_eq!(value["ingest_tier"], "direct");
    }

    #[test]
    fn test_aborted() {
        let outcome = RunOutcome::Aborted {
            run_id: "r".to_string(),
            phase: Phase::Synthesize,
            reason: "run cancelled during synthesize".to_string(),
        };
        let text = OutputFormatter::new(OutputFormat::Human)
            .format_run(&outcome)
            .unwrap();
        assert!(text.starts_with("Run r aborted during synthesize"));

        let json = OutputFormatter::new(OutputFormat::Json)
            .format_run(&outcome)
            .unwrap();
        assert!(json.contains("\"phase\": \"synthesize\""));
    }
}
