//! Local text extraction, the last ingestion tier

use anyhow::{Context, Result};
use std::path::Path;

/// Page-segmented plain-text extraction from a local document
pub trait LocalExtractor: Send + Sync {
    fn name(&self) -> &str;

    /// One entry per page, in page order
    fn extract_pages(&self, path: &Path) -> Result<Vec<String>>;
}

/// Joins pages with a `## Page N` boundary marker, skipping blank pages
pub fn render_pages(pages: &[String]) -> String {
    pages
        .iter()
        .enumerate()
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(idx, text)| format!("## Page {}\n\n{}", idx + 1, text.trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// PDF text extraction via `lopdf`
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl LocalExtractor for PdfTextExtractor {
    fn name(&self) -> &str {
        "lopdf"
    }

    fn extract_pages(&self, path: &Path) -> Result<Vec<String>> {
        let document = lopdf::Document::load(path)
            .with_context(|| format!("Failed to open PDF {}", path.display()))?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().keys() {
            // Pages with unsupported encodings come back empty rather than failing the file
            let text = document.extract_text(&[*page_number]).unwrap_or_default();
            pages.push(text);
        }

        Ok(pages)
    }
}
