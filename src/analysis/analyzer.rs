//! Thesis classification and task decomposition
//!
//! Three independent model calls: classification, decomposition into code
//! tasks, and tech-stack recommendation. Each degrades to a fixed default
//! when the call fails or its answer cannot be decoded.

use super::types::{
    AnalysisResult, CodeTask, CodeTaskKind, DataSourceKind, ThesisType,
};
use crate::document::{DataFileDescriptor, DataFileKind, ParsedDocument};
use crate::extract::{self, lenient_i64, lenient_string, string_list};
use crate::llm::ModelClient;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const CHAPTER_EXCERPT_CHARS: usize = 3000;
const DATA_FILE_COLUMNS: usize = 10;

const SYSTEM_PROMPT: &str = "You are an expert at analysing graduation theses and turning them \
into code implementation plans. You identify the thesis type, the research method and technical \
route, the data processing needs, the concrete code tasks to implement, and a suitable Python \
technology stack. Tasks must be specific and executable.";

pub const DEFAULT_TECH_STACK: [&str; 3] = ["Python", "Pandas", "NumPy"];
pub const DEFAULT_LIBRARIES: [&str; 4] = ["pandas", "numpy", "matplotlib", "scikit-learn"];

/// Decoded classification answer
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Classification {
    #[serde(default, rename = "type", deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub method: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: String,
    #[serde(default, deserialize_with = "string_list")]
    pub key_techniques: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_requirements: String,
}

impl Classification {
    pub fn thesis_type(&self) -> ThesisType {
        ThesisType::from_label(&self.label)
    }
}

#[derive(Debug, Deserialize)]
struct TaskPayload {
    #[serde(default, alias = "type", deserialize_with = "lenient_string")]
    task_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    description: String,
    #[serde(default, deserialize_with = "string_list")]
    requirements: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    input_data: String,
    #[serde(default, deserialize_with = "lenient_string")]
    expected_output: String,
    #[serde(default, deserialize_with = "lenient_i64")]
    priority: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct StackPayload {
    #[serde(default, deserialize_with = "string_list")]
    tech_stack: Vec<String>,
    #[serde(default, deserialize_with = "string_list")]
    libraries: Vec<String>,
}

/// Data source by precedence: Excel files, CSV files, embedded tables, none
pub fn determine_data_source(
    document: &ParsedDocument,
    data_files: &[DataFileDescriptor],
) -> DataSourceKind {
    if data_files.iter().any(|f| f.kind == DataFileKind::Excel) {
        DataSourceKind::ExcelFile
    } else if data_files.iter().any(|f| f.kind == DataFileKind::Csv) {
        DataSourceKind::CsvFile
    } else if !document.tables.is_empty() {
        DataSourceKind::PdfEmbedded
    } else {
        DataSourceKind::NoData
    }
}

fn optional(text: String) -> Option<String> {
    let trimmed = text.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn new_task_id(taken: &mut HashSet<String>) -> String {
    loop {
        let simple = uuid::Uuid::new_v4().simple().to_string();
        let id = format!("task_{}", &simple[..8]);
        if taken.insert(id.clone()) {
            return id;
        }
    }
}

/// Turns the decomposition payload into tasks with fresh unique ids.
///
/// Accepts `{"tasks": [...]}` or a bare array. Entries that are not objects
/// are skipped. A missing priority defaults to the entry's list position.
fn tasks_from_value(value: Value) -> Vec<CodeTask> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("tasks") {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    let mut taken = HashSet::new();
    items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let payload: TaskPayload = match serde_json::from_value(item) {
                Ok(p) => p,
                Err(e) => {
                    debug!(index, error = %e, "Skipping malformed task entry");
                    return None;
                }
            };
            let title = optional(payload.title).unwrap_or_else(|| format!("Task {}", index + 1));
            Some(CodeTask {
                task_id: new_task_id(&mut taken),
                kind: CodeTaskKind::from_label(&payload.task_type),
                title,
                description: payload.description,
                requirements: payload.requirements,
                input_data: optional(payload.input_data),
                expected_output: optional(payload.expected_output),
                priority: payload.priority.unwrap_or(index as i64),
            })
        })
        .collect()
}

fn describe_data_files(data_files: &[DataFileDescriptor]) -> String {
    if data_files.is_empty() {
        return "none; data must be extracted from the thesis or simulated".to_string();
    }
    data_files
        .iter()
        .map(|f| {
            let mut line = format!("\n- file: {}, type: {}", f.file_name, f.kind.as_str());
            if !f.columns.is_empty() {
                let columns: Vec<&str> = f
                    .columns
                    .iter()
                    .take(DATA_FILE_COLUMNS)
                    .map(String::as_str)
                    .collect();
                line.push_str(&format!(", columns: {:?}", columns));
            }
            if let Some(rows) = f.row_count {
                line.push_str(&format!(", rows: {}", rows));
            }
            line
        })
        .collect()
}

fn chapter_excerpt(document: &ParsedDocument) -> String {
    let map: Map<String, Value> = document
        .chapters
        .iter()
        .map(|c| (c.name.clone(), Value::String(c.summary.clone())))
        .collect();
    let pretty = serde_json::to_string_pretty(&Value::Object(map)).unwrap_or_default();
    pretty.chars().take(CHAPTER_EXCERPT_CHARS).collect()
}

/// Analyzer stage, holding only the immutable model handle
#[derive(Debug, Clone)]
pub struct ContentAnalyzer {
    model: ModelClient,
}

impl ContentAnalyzer {
    pub fn new(model: ModelClient) -> Self {
        Self { model }
    }

    pub async fn analyze(
        &self,
        document: &ParsedDocument,
        data_files: &[DataFileDescriptor],
    ) -> AnalysisResult {
        info!("Analyzing thesis content");

        let data_source = determine_data_source(document, data_files);
        let classification = self.classify(document).await;
        let code_tasks = self.decompose(document, &classification, data_files).await;
        let kinds: Vec<CodeTaskKind> = code_tasks.iter().map(|t| t.kind).collect();
        let (tech_stack, libraries) = self.recommend_stack(&classification, &kinds).await;

        let result = AnalysisResult {
            thesis_type: classification.thesis_type(),
            research_method: classification.method,
            data_source,
            data_files: data_files.to_vec(),
            code_tasks,
            tech_stack,
            libraries,
            summary: classification.summary,
        };

        info!(
            thesis_type = %result.thesis_type,
            data_source = %result.data_source,
            tasks = result.code_tasks.len(),
            libraries = result.libraries.len(),
            "Analysis complete"
        );
        result
    }

    async fn ask(&self, prompt: String) -> Option<Value> {
        let response = match self.model.simple_chat(prompt, Some(SYSTEM_PROMPT)).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Analyzer call failed");
                return None;
            }
        };
        match extract::extract_json(&response) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, "Analyzer response unusable");
                None
            }
        }
    }

    /// Falls back to an `Other` classification with empty fields
    pub async fn classify(&self, document: &ParsedDocument) -> Classification {
        let prompt = format!(
            r#"Analyze the following thesis information and determine the thesis type and research method.

Title: {title}
Abstract: {abstract_text}
Keywords: {keywords}
Chapters: {chapters:?}

Return JSON:
{{
    "type": "thesis type (empirical/simulation/algorithm/system_design/data_analysis/machine_learning/other)",
    "method": "detailed research method",
    "summary": "summary of the thesis",
    "key_techniques": ["technique 1", "technique 2"],
    "data_requirements": "data requirements"
}}

Return only JSON."#,
            title = document.title,
            abstract_text = document.abstract_text,
            keywords = document.keywords.join(", "),
            chapters = document.chapter_names(),
        );

        let classification = self
            .ask(prompt)
            .await
            .and_then(|value| match serde_json::from_value::<Classification>(value) {
                Ok(c) => Some(c),
                Err(e) => {
                    warn!(error = %e, "Classification payload has the wrong shape");
                    None
                }
            })
            .unwrap_or_default();

        debug!(thesis_type = %classification.thesis_type(), "Thesis classified");
        classification
    }

    /// Falls back to an empty task list
    pub async fn decompose(
        &self,
        document: &ParsedDocument,
        classification: &Classification,
        data_files: &[DataFileDescriptor],
    ) -> Vec<CodeTask> {
        let kinds = CodeTaskKind::ALL
            .iter()
            .map(|k| format!("- {}", k.as_str()))
            .collect::<Vec<_>>()
            .join("\n");

        let prompt = format!(
            r#"Based on the following thesis information, produce the list of Python code tasks to implement.

Thesis title: {title}
Thesis type: {thesis_type}
Research method: {method}
Key techniques: {techniques:?}
Data requirements: {requirements}

Available data files: {data_files}

Chapter content:
{chapters}

Each task must be specific and executable. Task types:
{kinds}

Return JSON:
{{
    "tasks": [
        {{
            "task_type": "task type",
            "title": "task title",
            "description": "detailed description",
            "requirements": ["requirement 1", "requirement 2"],
            "input_data": "input data description",
            "expected_output": "expected output",
            "priority": 0
        }}
    ]
}}

List tasks in execution order; a smaller priority runs earlier. Return only JSON."#,
            title = document.title,
            thesis_type = classification.thesis_type(),
            method = classification.method,
            techniques = classification.key_techniques,
            requirements = classification.data_requirements,
            data_files = describe_data_files(data_files),
            chapters = chapter_excerpt(document),
        );

        let tasks = self.ask(prompt).await.map(tasks_from_value).unwrap_or_default();
        if tasks.is_empty() {
            warn!("No code tasks extracted");
        }
        tasks
    }

    /// Falls back to [`DEFAULT_TECH_STACK`] and [`DEFAULT_LIBRARIES`]
    pub async fn recommend_stack(
        &self,
        classification: &Classification,
        kinds: &[CodeTaskKind],
    ) -> (Vec<String>, Vec<String>) {
        let kind_labels: Vec<&str> = kinds.iter().map(CodeTaskKind::as_str).collect();
        let prompt = format!(
            r#"Based on the following information, recommend a Python technology stack and the libraries it needs.

Thesis type: {thesis_type}
Key techniques: {techniques:?}
Code task types: {kind_labels:?}

Return JSON:
{{
    "tech_stack": ["technology 1", "technology 2"],
    "libraries": ["library 1", "library 2"]
}}

`libraries` must be pip-installable package names. Return only JSON."#,
            thesis_type = classification.thesis_type(),
            techniques = classification.key_techniques,
        );

        match self
            .ask(prompt)
            .await
            .map(serde_json::from_value::<StackPayload>)
        {
            Some(Ok(stack)) => (stack.tech_stack, stack.libraries),
            Some(Err(e)) => {
                warn!(error = %e, "Tech stack payload has the wrong shape, using defaults");
                default_stack()
            }
            None => default_stack(),
        }
    }
}

fn default_stack() -> (Vec<String>, Vec<String>) {
    (
        DEFAULT_TECH_STACK.iter().map(|s| s.to_string()).collect(),
        DEFAULT_LIBRARIES.iter().map(|s| s.to_string()).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::TableDescriptor;
    use crate::llm::{BackendError, MockLLMClient, MockResponse, RetryPolicy};
    use serde_json::json;
    use std::path::PathBuf;
    use std::sync::Arc;
    use std::time::Duration;

    fn analyzer(mock: Arc<MockLLMClient>) -> ContentAnalyzer {
        ContentAnalyzer::new(ModelClient::new(mock).with_retry_policy(RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
        }))
    }

    fn data_file(kind: DataFileKind) -> DataFileDescriptor {
        DataFileDescriptor {
            path: PathBuf::from("x"),
            file_name: "x".to_string(),
            kind,
            columns: (0..15).map(|i| format!("c{}", i)).collect(),
            row_count: Some(3),
            sample_rows: vec![],
            description: String::new(),
        }
    }

    fn document_with_tables() -> ParsedDocument {
        ParsedDocument {
            title: "T".to_string(),
            tables: vec![TableDescriptor::default()],
            ..ParsedDocument::default()
        }
    }

    #[test]
    fn test_data_source_precedence() {
        let doc = document_with_tables();
        assert_eq!(determine_data_source(&doc, &[]), DataSourceKind::PdfEmbedded);
        assert_eq!(
            determine_data_source(&doc, &[data_file(DataFileKind::Csv)]),
            DataSourceKind::CsvFile
        );
        assert_eq!(
            determine_data_source(
                &doc,
                &[data_file(DataFileKind::Csv), data_file(DataFileKind::Excel)]
            ),
            DataSourceKind::ExcelFile
        );
        assert_eq!(
            determine_data_source(&ParsedDocument::default(), &[]),
            DataSourceKind::NoData
        );
    }

    #[test]
    fn test_tasks_get_unique_ids_and_positional_priority() {
        let tasks = tasks_from_value(json!({
            "tasks": [
                {"task_type": "visualization", "title": "Plot", "priority": "3"},
                {"task_type": "mystery", "requirements": "[\"a\", \"b\"]"},
                "not a task",
                {"task_type": "simulation", "title": "Sim", "input_data": ""}
            ]
        }));

        assert_eq!(tasks.len(), 3);
        assert_eq!(tasks[0].priority, 3);
        assert_eq!(tasks[0].kind, CodeTaskKind::Visualization);
        assert_eq!(tasks[1].priority, 1);
        assert_eq!(tasks[1].kind, CodeTaskKind::Utility);
        assert_eq!(tasks[1].title, "Task 2");
        assert_eq!(tasks[1].requirements, vec!["a", "b"]);
        assert_eq!(tasks[2].priority, 3);
        assert_eq!(tasks[2].input_data, None);

        let ids: HashSet<&str> = tasks.iter().map(|t| t.task_id.as_str()).collect();
        assert_eq!(ids.len(), 3);
        assert!(tasks.iter().all(|t| t.task_id.starts_with("task_") && t.task_id.len() == 13));
    }

    #[test]
    fn test_tasks_from_bare_array() {
        let tasks = tasks_from_value(json!([{"title": "Only"}]));
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].priority, 0);
    }

    #[test]
    fn test_data_file_prompt_truncates_columns() {
        let text = describe_data_files(&[data_file(DataFileKind::Csv)]);
        assert!(text.contains("c9"));
        assert!(!text.contains("c10"));
        assert!(text.contains("rows: 3"));
    }

    #[tokio::test]
    async fn test_full_analysis() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(vec![
            MockResponse::text(
                r#"{"type": "machine_learning", "method": "CNN", "summary": "S", "key_techniques": ["conv"]}"#,
            ),
            MockResponse::text(
                r#"Here you go: {"tasks": [{"task_type": "model_training", "title": "Train"}]}"#,
            ),
            MockResponse::text(
                r#"{"tech_stack": ["PyTorch"], "libraries": "[\"numpy\",\"pandas\"]"}"#,
            ),
        ]);

        let result = analyzer(mock.clone())
            .analyze(&document_with_tables(), &[])
            .await;

        assert_eq!(result.thesis_type, ThesisType::MachineLearning);
        assert_eq!(result.research_method, "CNN");
        assert_eq!(result.data_source, DataSourceKind::PdfEmbedded);
        assert_eq!(result.code_tasks.len(), 1);
        assert_eq!(result.libraries, vec!["numpy", "pandas"]);
        assert_eq!(result.summary, "S");

        let stack_prompt = mock.requests()[2].user_text();
        assert!(stack_prompt.contains("model_training"));
    }

    #[tokio::test]
    async fn test_every_call_failing_degrades_to_defaults() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_responses(vec![
            MockResponse::error(BackendError::NetworkError {
                message: "down".to_string(),
            }),
            MockResponse::text("no json here"),
            MockResponse::text("still nothing"),
        ]);

        let result = analyzer(mock)
            .analyze(&ParsedDocument::default(), &[])
            .await;

        assert_eq!(result.thesis_type, ThesisType::Other);
        assert!(result.code_tasks.is_empty());
        assert_eq!(result.tech_stack, vec!["Python", "Pandas", "NumPy"]);
        assert_eq!(
            result.libraries,
            vec!["pandas", "numpy", "matplotlib", "scikit-learn"]
        );
        assert_eq!(result.data_source, DataSourceKind::NoData);
    }
}
