//! Content analysis: thesis classification and code task decomposition

pub mod analyzer;
pub mod types;

pub use analyzer::{determine_data_source, Classification, ContentAnalyzer};
pub use types::{
    AnalysisResult, AnalysisSummary, CodeTask, CodeTaskKind, DataSourceKind, TaskSummary,
    ThesisType,
};
