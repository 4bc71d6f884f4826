//! Turning raw document text into a [`ParsedDocument`]

use super::types::{Chapter, ParsedDocument, StructurePayload, TableDescriptor};
use crate::extract;
use crate::llm::ModelClient;
use serde_json::Value;
use tracing::{info, warn};

pub const DEFAULT_CHAR_BUDGET: usize = 15_000;

const SYSTEM_PROMPT: &str = "You are a document parsing assistant. You extract the structure of \
an academic thesis from Markdown: title, abstract, keywords, chapter summaries and tables. \
Answer with JSON only.";

fn build_prompt(excerpt: &str) -> String {
    format!(
        r#"Analyze the following Markdown document and extract the thesis structure.

Document:
{excerpt}

Return JSON with exactly these fields:
{{
    "title": "thesis title",
    "abstract": "abstract text",
    "keywords": ["keyword 1", "keyword 2"],
    "chapters": {{
        "chapter name 1": "chapter summary",
        "chapter name 2": "chapter summary"
    }},
    "tables": [
        {{"name": "table name", "description": "what it shows", "data_hint": "data characteristics"}}
    ],
    "research_method": "research method",
    "data_description": "data description, if any"
}}

Return only the JSON."#
    )
}

/// Asks the analyzer model for the document's structure
#[derive(Debug, Clone)]
pub struct DocumentStructurer {
    model: ModelClient,
    char_budget: usize,
}

impl DocumentStructurer {
    pub fn new(model: ModelClient, char_budget: usize) -> Self {
        Self { model, char_budget }
    }

    /// Never fails: on any error the result holds only `raw_text`
    pub async fn structure(&self, raw_text: String) -> ParsedDocument {
        if raw_text.trim().is_empty() {
            warn!("Empty document text, skipping structuring");
            return ParsedDocument::raw(raw_text);
        }

        let excerpt: String = raw_text.chars().take(self.char_budget).collect();
        let response = match self
            .model
            .simple_chat(build_prompt(&excerpt), Some(SYSTEM_PROMPT))
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Structuring call failed, keeping raw text only");
                return ParsedDocument::raw(raw_text);
            }
        };

        match extract::decode::<StructurePayload>(&response) {
            Ok(payload) => {
                let document = from_payload(payload, raw_text);
                info!(
                    title = %document.title,
                    chapters = document.chapters.len(),
                    tables = document.tables.len(),
                    "Document structured"
                );
                document
            }
            Err(e) => {
                warn!(error = %e, "Structuring response unusable, keeping raw text only");
                ParsedDocument::raw(raw_text)
            }
        }
    }
}

fn from_payload(payload: StructurePayload, raw_text: String) -> ParsedDocument {
    ParsedDocument {
        title: payload.title.trim().to_string(),
        abstract_text: payload.abstract_text.trim().to_string(),
        keywords: payload.keywords,
        chapters: payload.chapters.map(chapters_from).unwrap_or_default(),
        tables: payload.tables.map(tables_from).unwrap_or_default(),
        raw_text,
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Accepts `{name: summary}` (key order kept) or `[{name, summary}]`
fn chapters_from(value: Value) -> Vec<Chapter> {
    match value {
        Value::Object(map) => map
            .into_iter()
            .map(|(name, summary)| Chapter {
                name,
                summary: value_text(&summary),
            })
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| {
                let name = item.get("name").or_else(|| item.get("title"))?;
                Some(Chapter {
                    name: value_text(name),
                    summary: item.get("summary").map(value_text).unwrap_or_default(),
                })
            })
            .collect(),
        _ => Vec::new(),
    }
}

fn tables_from(value: Value) -> Vec<TableDescriptor> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{BackendError, MockLLMClient, MockResponse, RetryPolicy};
    use std::sync::Arc;
    use std::time::Duration;

    fn structurer(mock: Arc<MockLLMClient>, budget: usize) -> DocumentStructurer {
        let model = ModelClient::new(mock).with_retry_policy(RetryPolicy {
            max_retries: 1,
            base_delay: Duration::from_millis(1),
        });
        DocumentStructurer::new(model, budget)
    }

    #[tokio::test]
    async fn test_structures_document_preserving_chapter_order() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text(
            r#"```json
{"title": "Traffic Forecasting", "abstract": "We forecast.", "keywords": "[\"LSTM\", \"traffic\"]",
 "chapters": {"Introduction": "why", "Method": "how", "Appendix": "extra"},
 "tables": [{"name": "Table 1", "description": "flows"}, "junk"]}
```"#,
        ));

        let doc = structurer(mock, DEFAULT_CHAR_BUDGET)
            .structure("raw body".to_string())
            .await;

        assert_eq!(doc.title, "Traffic Forecasting");
        assert_eq!(doc.keywords, vec!["LSTM", "traffic"]);
        assert_eq!(doc.chapter_names(), vec!["Introduction", "Method", "Appendix"]);
        assert_eq!(doc.tables.len(), 1);
        assert_eq!(doc.tables[0].name, "Table 1");
        assert_eq!(doc.raw_text, "raw body");
    }

    #[tokio::test]
    async fn test_truncates_prompt_to_budget() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("{}"));

        structurer(mock.clone(), 10)
            .structure("0123456789ABCDEFGHIJ".to_string())
            .await;

        let prompt = mock.requests()[0].user_text();
        assert!(prompt.contains("0123456789"));
        assert!(!prompt.contains("ABCDEFGHIJ"));
    }

    #[tokio::test]
    async fn test_degrades_on_unparseable_response() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::text("I cannot help with that."));

        let doc = structurer(mock, DEFAULT_CHAR_BUDGET)
            .structure("text".to_string())
            .await;

        assert_eq!(doc, ParsedDocument::raw("text"));
    }

    #[tokio::test]
    async fn test_degrades_on_backend_error() {
        let mock = Arc::new(MockLLMClient::new());
        mock.add_response(MockResponse::error(BackendError::TimeoutError { seconds: 1 }));

        let doc = structurer(mock, DEFAULT_CHAR_BUDGET)
            .structure("text".to_string())
            .await;

        assert_eq!(doc.raw_text, "text");
        assert!(doc.title.is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_skips_model() {
        let mock = Arc::new(MockLLMClient::new());
        let doc = structurer(mock.clone(), DEFAULT_CHAR_BUDGET)
            .structure(String::new())
            .await;

        assert!(doc.is_empty());
        assert_eq!(mock.request_count(), 0);
    }

    #[test]
    fn test_chapters_from_array() {
        let chapters = chapters_from(serde_json::json!([
            {"name": "One", "summary": "s1"},
            {"title": "Two"},
            {"summary": "orphan"}
        ]));
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[1].name, "Two");
        assert_eq!(chapters[1].summary, "");
    }
}
