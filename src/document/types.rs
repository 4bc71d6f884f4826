//! Document and data-file descriptors

use crate::extract::{lenient_string, string_list};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

/// One chapter heading and its summary, in document order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    pub name: String,
    pub summary: String,
}

/// A table the document embeds
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub data_hint: String,
}

/// Structured view of the source document
///
/// Built once per run and never mutated afterwards. Every field may be
/// empty: ingestion and structuring both degrade instead of failing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedDocument {
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub keywords: Vec<String>,
    pub chapters: Vec<Chapter>,
    pub tables: Vec<TableDescriptor>,
    pub raw_text: String,
}

impl ParsedDocument {
    /// A document holding only raw text (structuring skipped or failed)
    pub fn raw(raw_text: impl Into<String>) -> Self {
        Self {
            raw_text: raw_text.into(),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw_text.trim().is_empty() && self.title.is_empty()
    }

    pub fn chapter_names(&self) -> Vec<&str> {
        self.chapters.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Kind of auxiliary tabular file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataFileKind {
    Excel,
    Csv,
}

impl DataFileKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "xlsx" | "xls" | "xlsm" | "ods" => Some(DataFileKind::Excel),
            "csv" => Some(DataFileKind::Csv),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DataFileKind::Excel => "excel",
            DataFileKind::Csv => "csv",
        }
    }
}

/// Metadata about one auxiliary data file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFileDescriptor {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: DataFileKind,
    pub columns: Vec<String>,
    pub row_count: Option<usize>,
    pub sample_rows: Vec<Map<String, Value>>,
    pub description: String,
}

impl DataFileDescriptor {
    /// Descriptor for a file that could not be read
    pub fn unreadable(path: &Path, kind: DataFileKind, reason: impl std::fmt::Display) -> Self {
        Self {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            kind,
            columns: Vec::new(),
            row_count: None,
            sample_rows: Vec::new(),
            description: format!("failed to read: {}", reason),
        }
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

/// Where the document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentSource {
    /// Remote locator handed straight to the conversion service
    Remote(String),
    /// Local PDF, converted remotely or extracted locally
    LocalPdf(PathBuf),
    /// Local Markdown or plain text, read as-is
    LocalText(PathBuf),
}

impl DocumentSource {
    pub fn classify(input: &str) -> Self {
        let lower = input.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            return DocumentSource::Remote(input.to_string());
        }

        let path = PathBuf::from(input);
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            DocumentSource::LocalPdf(path)
        } else {
            DocumentSource::LocalText(path)
        }
    }

    pub fn is_pdf(&self) -> bool {
        match self {
            DocumentSource::LocalPdf(_) => true,
            DocumentSource::Remote(url) => url.to_ascii_lowercase().ends_with(".pdf"),
            DocumentSource::LocalText(_) => false,
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentSource::Remote(url) => write!(f, "{}", url),
            DocumentSource::LocalPdf(path) | DocumentSource::LocalText(path) => {
                write!(f, "{}", path.display())
            }
        }
    }
}

/// Which strategy produced the raw text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestTier {
    /// Remote locator submitted and converted
    Remote,
    /// Local file uploaded and converted
    Upload,
    /// Local text extraction fallback
    Local,
    /// Markdown/plain text read directly
    Direct,
    /// Every tier failed; the text is empty
    None,
}

impl std::fmt::Display for IngestTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IngestTier::Remote => "remote conversion",
            IngestTier::Upload => "uploaded conversion",
            IngestTier::Local => "local extraction",
            IngestTier::Direct => "direct read",
            IngestTier::None => "none",
        };
        f.write_str(name)
    }
}

/// Raw ingestion result, before structuring
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedText {
    pub text: String,
    pub tier: IngestTier,
}

impl IngestedText {
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            tier: IngestTier::None,
        }
    }
}

/// Shape the structuring prompt asks the model for
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StructurePayload {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, rename = "abstract", deserialize_with = "lenient_string")]
    pub abstract_text: String,
    #[serde(default, deserialize_with = "string_list")]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub chapters: Option<Value>,
    #[serde(default)]
    pub tables: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_sources() {
        assert_eq!(
            DocumentSource::classify("https://example.org/thesis.pdf"),
            DocumentSource::Remote("https://example.org/thesis.pdf".to_string())
        );
        assert_eq!(
            DocumentSource::classify("docs/thesis.PDF"),
            DocumentSource::LocalPdf(PathBuf::from("docs/thesis.PDF"))
        );
        assert_eq!(
            DocumentSource::classify("thesis.md"),
            DocumentSource::LocalText(PathBuf::from("thesis.md"))
        );
        assert_eq!(
            DocumentSource::classify("notes"),
            DocumentSource::LocalText(PathBuf::from("notes"))
        );
    }

    #[test]
    fn test_data_file_kind() {
        assert_eq!(
            DataFileKind::from_path(Path::new("a/b/survey.XLSX")),
            Some(DataFileKind::Excel)
        );
        assert_eq!(
            DataFileKind::from_path(Path::new("survey.csv")),
            Some(DataFileKind::Csv)
        );
        assert_eq!(DataFileKind::from_path(Path::new("survey.pdf")), None);
        assert_eq!(DataFileKind::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_parsed_document_serializes_abstract_key() {
        let doc = ParsedDocument {
            abstract_text: "short".to_string(),
            ..ParsedDocument::default()
        };
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["abstract"], "short");
        assert!(ParsedDocument::raw("  ").is_empty());
    }
}
