use super::docs::{render_readme, render_run_instructions};
use crate::analysis::{AnalysisResult, AnalysisSummary};
use crate::document::ParsedDocument;
use crate::synthesis::GeneratedArtifact;
use crate::validation::ValidationOutcome;
use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use tracing::{debug, warn};

/// Which artifact wins when two share a file name
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateFilePolicy {
    #[default]
    LastWriterWins,
    KeepFirst,
}

impl std::str::FromStr for DuplicateFilePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "last_writer_wins" | "last" => Ok(DuplicateFilePolicy::LastWriterWins),
            "keep_first" | "first" => Ok(DuplicateFilePolicy::KeepFirst),
            other => Err(format!("unknown duplicate-file policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProjectFile {
    pub file_name: String,
    pub task_id: String,
    pub description: String,
    pub code: String,
}

impl From<&GeneratedArtifact> for ProjectFile {
    fn from(artifact: &GeneratedArtifact) -> Self {
        Self {
            file_name: artifact.file_name.clone(),
            task_id: artifact.task_id.clone(),
            description: artifact.description.clone(),
            code: artifact.code.clone(),
        }
    }
}

/// Everything that lands in the working directory
#[derive(Debug, Clone, Serialize)]
pub struct ProjectBundle {
    /// The run id
    pub project_name: String,
    pub title: String,
    /// Task files in priority order, integration file last
    pub files: Vec<ProjectFile>,
    /// Deduplicated, ascending
    pub requirements: Vec<String>,
    pub readme: String,
    pub run_instructions: String,
    pub analysis_json: String,
    pub validation: Vec<ValidationOutcome>,
}

impl ProjectBundle {
    pub fn file(&self, file_name: &str) -> Option<&ProjectFile> {
        self.files.iter().find(|f| f.file_name == file_name)
    }

    pub fn file_names(&self) -> Vec<&str> {
        self.files.iter().map(|f| f.file_name.as_str()).collect()
    }

    pub fn invalid_files(&self) -> Vec<&ValidationOutcome> {
        self.validation.iter().filter(|v| !v.is_valid).collect()
    }

    pub fn requirements_txt(&self) -> String {
        self.requirements.join("\n")
    }
}

/// Union of every declared dependency, deduplicated and sorted
pub fn merge_dependencies(artifacts: &[GeneratedArtifact], libraries: &[String]) -> Vec<String> {
    artifacts
        .iter()
        .flat_map(|a| a.dependencies.iter())
        .chain(libraries.iter())
        .map(|dep| dep.trim())
        .filter(|dep| !dep.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectAssembler {
    policy: DuplicateFilePolicy,
}

impl ProjectAssembler {
    pub fn new(policy: DuplicateFilePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> DuplicateFilePolicy {
        self.policy
    }

    /// Merges artifacts by file name.
    ///
    /// A duplicate keeps the slot of the first occurrence; its content
    /// follows the configured policy.
    pub fn merge_files(&self, artifacts: &[GeneratedArtifact]) -> Vec<ProjectFile> {
        let mut files: Vec<ProjectFile> = Vec::with_capacity(artifacts.len());
        let mut slots: HashMap<&str, usize> = HashMap::new();

        for artifact in artifacts {
            match slots.get(artifact.file_name.as_str()) {
                Some(&slot) => {
                    warn!(
                        file = %artifact.file_name,
                        task_id = %artifact.task_id,
                        policy = ?self.policy,
                        "Duplicate file name"
                    );
                    if self.policy == DuplicateFilePolicy::LastWriterWins {
                        files[slot] = ProjectFile::from(artifact);
                    }
                }
                None => {
                    slots.insert(&artifact.file_name, files.len());
                    files.push(ProjectFile::from(artifact));
                }
            }
        }
        files
    }

    /// `artifacts` must already carry any repaired source
    pub fn assemble(
        &self,
        run_id: &str,
        document: &ParsedDocument,
        analysis: &AnalysisResult,
        artifacts: &[GeneratedArtifact],
        validation: &[ValidationOutcome],
    ) -> Result<ProjectBundle> {
        let files = self.merge_files(artifacts);
        let requirements = merge_dependencies(artifacts, &analysis.libraries);
        debug!(
            files = files.len(),
            requirements = requirements.len(),
            "Assembling project"
        );

        let analysis_json = serde_json::to_string_pretty(&AnalysisSummary::from(analysis))
            .context("Failed to serialize analysis summary")?;
        let readme = render_readme(
            run_id,
            &document.title,
            analysis,
            &files,
            validation,
            Local::now(),
        );
        let run_instructions = render_run_instructions(&files);

        Ok(ProjectBundle {
            project_name: run_id.to_string(),
            title: document.title.clone(),
            files,
            requirements,
            readme,
            run_instructions,
            analysis_json,
            validation: validation.to_vec(),
        })
    }
}
