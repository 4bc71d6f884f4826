//! Analysis result types

use crate::document::DataFileDescriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Broad kind of thesis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThesisType {
    Empirical,
    Simulation,
    Algorithm,
    SystemDesign,
    DataAnalysis,
    MachineLearning,
    Other,
}

impl ThesisType {
    pub const ALL: [ThesisType; 7] = [
        ThesisType::Empirical,
        ThesisType::Simulation,
        ThesisType::Algorithm,
        ThesisType::SystemDesign,
        ThesisType::DataAnalysis,
        ThesisType::MachineLearning,
        ThesisType::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThesisType::Empirical => "empirical",
            ThesisType::Simulation => "simulation",
            ThesisType::Algorithm => "algorithm",
            ThesisType::SystemDesign => "system_design",
            ThesisType::DataAnalysis => "data_analysis",
            ThesisType::MachineLearning => "machine_learning",
            ThesisType::Other => "other",
        }
    }

    /// Maps a free-text label; anything unrecognised is `Other`
    pub fn from_label(label: &str) -> Self {
        let normalized = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == normalized)
            .unwrap_or(ThesisType::Other)
    }
}

impl fmt::Display for ThesisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of code a task asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodeTaskKind {
    DataPreprocessing,
    DataAnalysis,
    ModelTraining,
    Visualization,
    AlgorithmImpl,
    StatisticalTest,
    Simulation,
    Utility,
}

impl CodeTaskKind {
    pub const ALL: [CodeTaskKind; 8] = [
        CodeTaskKind::DataPreprocessing,
        CodeTaskKind::DataAnalysis,
        CodeTaskKind::ModelTraining,
        CodeTaskKind::Visualization,
        CodeTaskKind::AlgorithmImpl,
        CodeTaskKind::StatisticalTest,
        CodeTaskKind::Simulation,
        CodeTaskKind::Utility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CodeTaskKind::DataPreprocessing => "data_preprocessing",
            CodeTaskKind::DataAnalysis => "data_analysis",
            CodeTaskKind::ModelTraining => "model_training",
            CodeTaskKind::Visualization => "visualization",
            CodeTaskKind::AlgorithmImpl => "algorithm_impl",
            CodeTaskKind::StatisticalTest => "statistical_test",
            CodeTaskKind::Simulation => "simulation",
            CodeTaskKind::Utility => "utility",
        }
    }

    /// Maps a free-text label; anything unrecognised is `Utility`
    pub fn from_label(label: &str) -> Self {
        let normalized = normalize_label(label);
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == normalized)
            .unwrap_or(CodeTaskKind::Utility)
    }

    /// File name used when the model answers in prose
    pub fn default_file_name(&self) -> String {
        format!("{}.py", self.as_str())
    }
}

impl fmt::Display for CodeTaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn normalize_label(label: &str) -> String {
    label
        .trim()
        .to_lowercase()
        .replace([' ', '-'], "_")
}

/// Where the thesis data comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSourceKind {
    ExcelFile,
    CsvFile,
    /// Tables embedded in the document itself
    PdfEmbedded,
    NoData,
}

impl DataSourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSourceKind::ExcelFile => "excel_file",
            DataSourceKind::CsvFile => "csv_file",
            DataSourceKind::PdfEmbedded => "pdf_embedded",
            DataSourceKind::NoData => "no_data",
        }
    }
}

impl fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One unit of code to synthesize
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeTask {
    pub task_id: String,
    pub kind: CodeTaskKind,
    pub title: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub input_data: Option<String>,
    pub expected_output: Option<String>,
    /// Lower runs earlier
    pub priority: i64,
}

/// Everything the analyzer learned about the thesis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub thesis_type: ThesisType,
    pub research_method: String,
    pub data_source: DataSourceKind,
    pub data_files: Vec<DataFileDescriptor>,
    /// In extraction order; see [`AnalysisResult::ordered_tasks`]
    pub code_tasks: Vec<CodeTask>,
    pub tech_stack: Vec<String>,
    pub libraries: Vec<String>,
    pub summary: String,
}

impl AnalysisResult {
    /// Tasks by ascending priority, ties kept in extraction order
    pub fn ordered_tasks(&self) -> Vec<&CodeTask> {
        let mut tasks: Vec<&CodeTask> = self.code_tasks.iter().collect();
        tasks.sort_by_key(|t| t.priority);
        tasks
    }

    pub fn task(&self, task_id: &str) -> Option<&CodeTask> {
        self.code_tasks.iter().find(|t| t.task_id == task_id)
    }

    /// Task kinds in priority order, duplicates kept
    pub fn task_kinds(&self) -> Vec<CodeTaskKind> {
        self.ordered_tasks().into_iter().map(|t| t.kind).collect()
    }
}

/// Serialized as `analysis_result.json`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisSummary<'a> {
    pub thesis_type: ThesisType,
    pub research_method: &'a str,
    pub data_source: DataSourceKind,
    pub tech_stack: &'a [String],
    pub libraries: &'a [String],
    pub code_tasks: Vec<TaskSummary<'a>>,
    pub summary: &'a str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskSummary<'a> {
    pub task_id: &'a str,
    #[serde(rename = "type")]
    pub kind: CodeTaskKind,
    pub title: &'a str,
    pub description: &'a str,
    pub priority: i64,
}

impl<'a> From<&'a AnalysisResult> for AnalysisSummary<'a> {
    fn from(result: &'a AnalysisResult) -> Self {
        Self {
            thesis_type: result.thesis_type,
            research_method: &result.research_method,
            data_source: result.data_source,
            tech_stack: &result.tech_stack,
            libraries: &result.libraries,
            code_tasks: result
                .ordered_tasks()
                .into_iter()
                .map(|t| TaskSummary {
                    task_id: &t.task_id,
                    kind: t.kind,
                    title: &t.title,
                    description: &t.description,
                    priority: t.priority,
                })
                .collect(),
            summary: &result.summary,
        }
    }
}
