//! Per-task code synthesis
//!
//! Every task gets a fresh two-message conversation (system prompt plus one
//! user turn carrying the task and the shared project context). Nothing is
//! carried between tasks, so they run on a bounded pool. `buffered` keeps
//! the output in priority order regardless of completion order.

use super::tool::{generate_code_tool, GenerateCodeArgs, GENERATE_CODE_TOOL};
use super::types::{
    FailedTaskPolicy, GeneratedArtifact, SynthesisError, SynthesisOutput, INTEGRATION_DESCRIPTION,
    INTEGRATION_FILE_NAME, INTEGRATION_TASK_ID,
};
use crate::analysis::{AnalysisResult, CodeTask};
use crate::extract::extract_code_block;
use crate::llm::{ChatMessage, ModelClient, ModelReply};
use crate::project::{is_safe_relative, RESERVED_FILE_NAMES};
use futures_util::stream::{self, StreamExt};
use std::fmt;
use std::path::{Component, Path};
use tracing::{info, warn};

pub const DEFAULT_CONCURRENCY: usize = 4;
const SAMPLE_ROWS_IN_CONTEXT: usize = 2;

const SYSTEM_PROMPT: &str = r#"You are an expert Python developer generating high-quality, runnable code for graduation theses.

## Code rules
1. Code must be complete and run as-is
2. Include every required import
3. Add clear comments
4. Use conventional variable names
5. Handle errors
6. Use relative paths for data files

## Style
- pandas for data handling
- matplotlib/seaborn for visualisation
- scikit-learn for machine learning
- Clear structure built from functions

## Output
- One standalone .py file per task
- Each file runs on its own
- Include a main function as the entry point
- Print the key results

Use the generate_code tool to return the code."#;

/// Context shared by every request of one run
pub fn build_project_context(analysis: &AnalysisResult) -> String {
    ProjectContext(analysis).to_string()
}

struct ProjectContext<'a>(&'a AnalysisResult);

impl fmt::Display for ProjectContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## Project background")?;
        writeln!(f, "Thesis type: {}", self.0.thesis_type)?;
        writeln!(f, "Research method: {}", self.0.research_method)?;
        writeln!(f, "Tech stack: {}", self.0.tech_stack.join(", "))?;
        writeln!(f, "Libraries: {}", self.0.libraries.join(", "))?;
        writeln!(f, "\n## Data")?;

        if self.0.data_files.is_empty() {
            writeln!(
                f,
                "No data files supplied; simulate or generate sample data from the thesis description."
            )?;
        }
        for file in &self.0.data_files {
            writeln!(f, "\n### {}", file.file_name)?;
            writeln!(f, "- type: {}", file.kind.as_str())?;
            if !file.columns.is_empty() {
                writeln!(f, "- columns: {:?}", file.columns)?;
            }
            if let Some(rows) = file.row_count {
                writeln!(f, "- rows: {}", rows)?;
            }
            if !file.sample_rows.is_empty() {
                let shown = file.sample_rows.len().min(SAMPLE_ROWS_IN_CONTEXT);
                let samples = &file.sample_rows[..shown];
                writeln!(
                    f,
                    "- sample rows: {}",
                    serde_json::to_string(samples).unwrap_or_default()
                )?;
            }
        }

        writeln!(f, "\n## Code tasks")?;
        for task in self.0.ordered_tasks() {
            writeln!(f, "\n### {}", task.title)?;
            writeln!(f, "- type: {}", task.kind)?;
            writeln!(f, "- description: {}", task.description)?;
            if !task.requirements.is_empty() {
                writeln!(f, "- requirements: {:?}", task.requirements)?;
            }
        }
        Ok(())
    }
}

fn task_prompt(task: &CodeTask, context: &str) -> String {
    format!(
        r#"Generate Python code for the following task.

{context}

## Current task
- task id: {id}
- title: {title}
- type: {kind}
- description: {description}
- requirements: {requirements:?}
- input: {input}
- expected output: {output}

Use the generate_code tool to return one complete Python file. The code must:
1. Run on its own
2. Include all imports
3. Be clearly commented
4. Have a main function
5. Handle likely exceptions"#,
        id = task.task_id,
        title = task.title,
        kind = task.kind,
        description = task.description,
        requirements = task.requirements,
        input = task.input_data.as_deref().unwrap_or("n/a"),
        output = task.expected_output.as_deref().unwrap_or("n/a"),
    )
}

fn integration_prompt(artifacts: &[GeneratedArtifact], context: &str) -> String {
    let files = artifacts
        .iter()
        .map(|a| format!("- {}: {}", a.file_name, a.description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"Generate a main program, main.py, that coordinates the following code files.

{context}

## Generated files
{files}

The main program should:
1. Import and call each module in the right order
2. Offer command-line options to run a single module
3. Explain how to run it
4. Catch exceptions and print a helpful message

Use the generate_code tool to return the code."#
    )
}

/// Defaults applied when a reply leaves a field empty
struct ArtifactDefaults<'a> {
    task_id: &'a str,
    file_name: String,
    description: &'a str,
    /// Integration artifacts ignore the model's file name and description
    fixed: bool,
    /// Names owned by the workspace or by copied data files
    reserved: &'a [String],
}

/// Names a task file may not take: workspace documents, copied data files
/// and the integration file
pub fn reserved_file_names(analysis: &AnalysisResult) -> Vec<String> {
    RESERVED_FILE_NAMES
        .iter()
        .map(|name| name.to_string())
        .chain(analysis.data_files.iter().map(|f| f.file_name.clone()))
        .chain(std::iter::once(INTEGRATION_FILE_NAME.to_string()))
        .collect()
}

/// The model's file name in normalised relative form, or `None` when it is
/// empty, leaves the working directory or collides with a reserved name
fn usable_file_name(candidate: &str, reserved: &[String]) -> Option<String> {
    let candidate = candidate.trim();
    if !is_safe_relative(candidate) {
        return None;
    }
    let normalised = Path::new(candidate)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/");
    if normalised.is_empty() || reserved.iter().any(|r| r.eq_ignore_ascii_case(&normalised)) {
        return None;
    }
    Some(normalised)
}

/// Structured tool payload first, fenced code block in prose second
fn artifact_from_reply(
    reply: ModelReply,
    defaults: ArtifactDefaults<'_>,
) -> Result<GeneratedArtifact, String> {
    match reply {
        ModelReply::ToolInvocation { name, arguments } => {
            if name != GENERATE_CODE_TOOL {
                return Err(format!("model invoked unknown tool '{}'", name));
            }
            let args = GenerateCodeArgs::from_arguments(arguments)
                .map_err(|e| format!("malformed tool arguments: {}", e))?;
            if args.code.trim().is_empty() {
                return Err("tool invocation carried no code".to_string());
            }

            let file_name = if defaults.fixed {
                defaults.file_name
            } else {
                match usable_file_name(&args.file_name, defaults.reserved) {
                    Some(name) => name,
                    None => {
                        if !args.file_name.trim().is_empty() {
                            warn!(
                                task_id = defaults.task_id,
                                file = %args.file_name.trim(),
                                fallback = %defaults.file_name,
                                "Unusable file name, using the task default"
                            );
                        }
                        defaults.file_name
                    }
                }
            };
            let description = if defaults.fixed || args.description.trim().is_empty() {
                defaults.description.to_string()
            } else {
                args.description
            };

            Ok(GeneratedArtifact {
                task_id: defaults.task_id.to_string(),
                file_name,
                code: args.code,
                description,
                dependencies: args.dependencies,
            })
        }
        ModelReply::Text(text) => {
            let code = extract_code_block(&text)
                .ok_or_else(|| "response had neither a tool call nor a code block".to_string())?;
            warn!(task_id = defaults.task_id, "No tool call, using fenced code from prose");
            Ok(GeneratedArtifact {
                task_id: defaults.task_id.to_string(),
                file_name: defaults.file_name,
                code,
                description: defaults.description.to_string(),
                dependencies: Vec::new(),
            })
        }
    }
}

/// Synthesis stage, holding only immutable configuration
#[derive(Debug, Clone)]
pub struct CodeSynthesizer {
    model: ModelClient,
    concurrency: usize,
    policy: FailedTaskPolicy,
    chat_retries: u32,
    max_tokens: Option<u32>,
}

impl CodeSynthesizer {
    pub fn new(model: ModelClient) -> Self {
        let chat_retries = model.retry_policy().max_retries;
        Self {
            model,
            concurrency: DEFAULT_CONCURRENCY,
            policy: FailedTaskPolicy::default(),
            chat_retries,
            max_tokens: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_policy(mut self, policy: FailedTaskPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Synthesizes every task, then the integration artifact
    pub async fn synthesize(
        &self,
        analysis: &AnalysisResult,
    ) -> Result<SynthesisOutput, SynthesisError> {
        let ordered = analysis.ordered_tasks();
        info!(
            tasks = ordered.len(),
            concurrency = self.concurrency,
            "Synthesizing code"
        );

        let context = build_project_context(analysis);
        let context = context.as_str();
        let reserved = reserved_file_names(analysis);
        let reserved = reserved.as_slice();

        let results: Vec<(&CodeTask, Result<GeneratedArtifact, String>)> = stream::iter(ordered)
            .map(|task| async move { (task, self.synthesize_task(task, context, reserved).await) })
            .buffered(self.concurrency)
            .collect()
            .await;

        let mut output = SynthesisOutput::default();
        for (task, result) in results {
            match result {
                Ok(artifact) => {
                    info!(task_id = %task.task_id, file = %artifact.file_name, "Task synthesized");
                    output.artifacts.push(artifact);
                }
                Err(reason) => {
                    warn!(task_id = %task.task_id, reason = %reason, "Task produced no artifact");
                    if self.policy == FailedTaskPolicy::Abort {
                        return Err(SynthesisError::TaskFailed {
                            task_id: task.task_id.clone(),
                            reason,
                        });
                    }
                    output.failed_tasks.push(task.task_id.clone());
                }
            }
        }

        if output.artifacts.is_empty() {
            warn!("No artifacts produced, skipping integration artifact");
        } else {
            match self.synthesize_integration(&output.artifacts, context).await {
                Ok(artifact) => output.artifacts.push(artifact),
                Err(reason) => warn!(reason = %reason, "Integration artifact not generated"),
            }
        }

        info!(
            artifacts = output.artifacts.len(),
            failed = output.failed_tasks.len(),
            "Synthesis complete"
        );
        Ok(output)
    }

    async fn request(&self, prompt: String) -> Result<ModelReply, String> {
        let messages = vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(prompt)];
        self.model
            .chat(
                messages,
                vec![generate_code_tool()],
                self.model.temperature(),
                self.max_tokens,
                self.chat_retries,
            )
            .await
            .map_err(|e| e.to_string())
    }

    /// One stateless request for one task
    pub async fn synthesize_task(
        &self,
        task: &CodeTask,
        context: &str,
        reserved: &[String],
    ) -> Result<GeneratedArtifact, String> {
        let reply = self.request(task_prompt(task, context)).await?;
        artifact_from_reply(
            reply,
            ArtifactDefaults {
                task_id: &task.task_id,
                file_name: task.kind.default_file_name(),
                description: &task.description,
                fixed: false,
                reserved,
            },
        )
    }

    /// Integration artifact over the artifacts produced so far
    pub async fn synthesize_integration(
        &self,
        artifacts: &[GeneratedArtifact],
        context: &str,
    ) -> Result<GeneratedArtifact, String> {
        let reply = self.request(integration_prompt(artifacts, context)).await?;
        artifact_from_reply(
            reply,
            ArtifactDefaults {
                task_id: INTEGRATION_TASK_ID,
                file_name: INTEGRATION_FILE_NAME.to_string(),
                description: INTEGRATION_DESCRIPTION,
                fixed: true,
                reserved: &[],
            },
        )
    }
}
