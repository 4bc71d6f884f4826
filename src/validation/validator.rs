use super::rules::{
    default_rules, parse_python, AdvisoryRule, DocstringRule, EntryPointRule, ErrorHandlingRule,
};
use super::syntax::check_syntax;
use crate::extract::extract_code_block;
use crate::llm::{ChatMessage, ModelClient, ModelReply};
use crate::synthesis::{GenerateCodeArgs, GeneratedArtifact, GENERATE_CODE_TOOL};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_RETRIES: u32 = 5;
pub const RETRY_BUDGET_EXHAUSTED: &str = "retry budget exhausted";

const REPAIR_SYSTEM_PROMPT: &str = "You are an expert Python code reviewer and fixer. \
Fix syntax errors, broken imports and obvious logic errors while keeping the original \
behaviour. Keep existing comments. The fixed program must run on its own.";

/// Result of validating one artifact
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub task_id: String,
    pub file_name: String,
    pub is_valid: bool,
    pub syntax_check: bool,
    pub has_entry_point: bool,
    pub has_error_handling: bool,
    pub functions_documented: bool,
    pub error_message: Option<String>,
    pub suggestions: Vec<String>,
    /// Repaired source, present only when it differs from the original
    pub fixed_code: Option<String>,
    pub repair_attempts: u32,
}

impl ValidationOutcome {
    fn invalid(artifact: &GeneratedArtifact, error: String, repair_attempts: u32) -> Self {
        Self {
            task_id: artifact.task_id.clone(),
            file_name: artifact.file_name.clone(),
            is_valid: false,
            error_message: Some(error),
            repair_attempts,
            ..Self::default()
        }
    }
}

pub struct CodeValidator {
    model: ModelClient,
    max_retries: u32,
    chat_retries: u32,
    rules: Vec<Box<dyn AdvisoryRule>>,
}

impl CodeValidator {
    pub fn new(model: ModelClient) -> Self {
        let chat_retries = model.retry_policy().max_retries;
        Self {
            model,
            max_retries: DEFAULT_MAX_RETRIES,
            chat_retries,
            rules: default_rules(),
        }
    }

    /// Upper bound on fix requests per artifact
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_chat_retries(mut self, chat_retries: u32) -> Self {
        self.chat_retries = chat_retries;
        self
    }

    pub fn with_rules(mut self, rules: Vec<Box<dyn AdvisoryRule>>) -> Self {
        self.rules = rules;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// One outcome per artifact, in input order
    pub async fn validate_all(&self, artifacts: &[GeneratedArtifact]) -> Vec<ValidationOutcome> {
        info!(files = artifacts.len(), "Validating generated code");
        let mut outcomes = Vec::with_capacity(artifacts.len());
        for artifact in artifacts {
            outcomes.push(self.validate(artifact).await);
        }
        let valid = outcomes.iter().filter(|o| o.is_valid).count();
        info!(valid, total = outcomes.len(), "Validation complete");
        outcomes
    }

    pub async fn validate(&self, artifact: &GeneratedArtifact) -> ValidationOutcome {
        debug!(file = %artifact.file_name, task_id = %artifact.task_id, "Validating");
        let mut current = artifact.code.clone();
        let mut first_error: Option<String> = None;

        for attempt in 0..=self.max_retries {
            let error = match check_syntax(&current) {
                Ok(()) => return self.accept(artifact, current, attempt),
                Err(error) => error,
            };
            warn!(file = %artifact.file_name, error = %error, attempt, "Syntax error");
            let original_error = first_error.get_or_insert_with(|| error.clone()).clone();

            if attempt == self.max_retries {
                break;
            }

            match self.request_fix(&current, &error).await {
                Some(fixed) => current = fixed,
                None => {
                    return ValidationOutcome {
                        suggestions: vec!["Check the code syntax".to_string()],
                        ..ValidationOutcome::invalid(artifact, original_error, attempt + 1)
                    }
                }
            }
        }

        warn!(
            file = %artifact.file_name,
            max_retries = self.max_retries,
            "Repair budget exhausted"
        );
        ValidationOutcome {
            suggestions: vec!["Code still has problems, check it manually".to_string()],
            ..ValidationOutcome::invalid(
                artifact,
                RETRY_BUDGET_EXHAUSTED.to_string(),
                self.max_retries,
            )
        }
    }

    fn accept(&self, artifact: &GeneratedArtifact, code: String, attempts: u32) -> ValidationOutcome {
        let tree = parse_python(&code);
        let suggestions = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(&tree))
            .collect();
        let fixed_code = (code != artifact.code).then_some(code);
        if fixed_code.is_some() {
            info!(file = %artifact.file_name, attempts, "Code repaired");
        }

        ValidationOutcome {
            task_id: artifact.task_id.clone(),
            file_name: artifact.file_name.clone(),
            is_valid: true,
            syntax_check: true,
            has_entry_point: EntryPointRule::has_entry_point(&tree),
            has_error_handling: ErrorHandlingRule::has_error_handling(&tree),
            functions_documented: DocstringRule::undocumented_functions(&tree).is_empty(),
            error_message: None,
            suggestions,
            fixed_code,
            repair_attempts: attempts,
        }
    }

    /// Asks the coder model for a corrected file; `None` when no code came back
    async fn request_fix(&self, code: &str, error: &str) -> Option<String> {
        let prompt = format!(
            "Fix the errors in the following Python code.\n\n\
             ## Error\nSyntax error: {}\n\n\
             ## Original code\n```python\n{}\n```\n\n\
             Return only the complete fixed code wrapped in ```python and ```, without explanation.",
            error, code
        );
        let messages = vec![
            ChatMessage::system(REPAIR_SYSTEM_PROMPT),
            ChatMessage::user(prompt),
        ];

        let reply = match self
            .model
            .chat(
                messages,
                Vec::new(),
                self.model.temperature(),
                None,
                self.chat_retries,
            )
            .await
        {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Repair request failed");
                return None;
            }
        };

        match reply {
            ModelReply::Text(text) => extract_code_block(&text),
            ModelReply::ToolInvocation { name, arguments } if name == GENERATE_CODE_TOOL => {
                GenerateCodeArgs::from_arguments(arguments)
                    .ok()
                    .map(|args| args.code)
                    .filter(|code| !code.trim().is_empty())
            }
            ModelReply::ToolInvocation { name, .. } => {
                warn!(tool = %name, "Unexpected tool in repair reply");
                None
            }
        }
    }
}

/// Substitutes repaired source where an outcome carries one
pub fn apply_fixes(
    artifacts: &[GeneratedArtifact],
    outcomes: &[ValidationOutcome],
) -> Vec<GeneratedArtifact> {
    artifacts
        .iter()
        .map(|artifact| {
            outcomes
                .iter()
                .find(|o| o.task_id == artifact.task_id && o.file_name == artifact.file_name)
                .and_then(|o| o.fixed_code.as_deref())
                .map(|code| artifact.with_code(code))
                .unwrap_or_else(|| artifact.clone())
        })
        .collect()
}

impl std::fmt::Debug for CodeValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodeValidator")
            .field("model", &self.model)
            .field("max_retries", &self.max_retries)
            .field("chat_retries", &self.chat_retries)
            .field(
                "rules",
                &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
