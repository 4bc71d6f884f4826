//! Pulling structured data out of free-form model text
//!
//! Models wrap JSON in prose and Markdown fences, and occasionally encode a
//! list as a JSON string. Everything here is tolerant of that noise but never
//! guesses: when no bracketed payload exists the caller gets an error.

use regex::Regex;
use serde::de::{DeserializeOwned, Deserializer};
use serde::Deserialize;
use serde_json::Value;
use std::sync::OnceLock;
use thiserror::Error;

const SNIPPET_LEN: usize = 200;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("no JSON object or array found in response: {snippet}")]
    NoJsonPayload { snippet: String },

    #[error("malformed JSON in response: {source} (payload: {snippet})")]
    MalformedJson {
        #[source]
        source: serde_json::Error,
        snippet: String,
    },
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect()
}

/// Removes one leading fence line (```` ``` ```` or ```` ```json ````) and one trailing fence.
pub fn strip_code_fences(text: &str) -> &str {
    let mut cleaned = text.trim();

    if cleaned.starts_with("```") {
        cleaned = match cleaned.find('\n') {
            Some(newline) => &cleaned[newline + 1..],
            None => "",
        };
    }

    if let Some(stripped) = cleaned.trim_end().strip_suffix("```") {
        cleaned = stripped;
    }

    cleaned.trim()
}

/// Slices from the first `{`/`[` to the last `}`/`]`.
pub fn extract_json_blob(text: &str) -> Result<&str, ExtractError> {
    let cleaned = strip_code_fences(text);

    let start = [cleaned.find('{'), cleaned.find('[')]
        .into_iter()
        .flatten()
        .min();
    let end = [cleaned.rfind('}'), cleaned.rfind(']')]
        .into_iter()
        .flatten()
        .max();

    match (start, end) {
        (Some(start), Some(end)) if end > start => Ok(cleaned[start..=end].trim()),
        _ => Err(ExtractError::NoJsonPayload {
            snippet: snippet(text),
        }),
    }
}

/// Parses the JSON payload embedded in a model response
pub fn extract_json(text: &str) -> Result<Value, ExtractError> {
    let blob = extract_json_blob(text)?;
    serde_json::from_str(blob).map_err(|source| ExtractError::MalformedJson {
        source,
        snippet: snippet(blob),
    })
}

/// Parses and decodes the payload into a typed schema
pub fn decode<T: DeserializeOwned>(text: &str) -> Result<T, ExtractError> {
    let blob = extract_json_blob(text)?;
    serde_json::from_str(blob).map_err(|source| ExtractError::MalformedJson {
        source,
        snippet: snippet(blob),
    })
}

/// Normalises a "list of strings" field.
///
/// Accepts a JSON array (non-string scalars are stringified, nulls and
/// nested structures dropped) or a string holding a JSON-encoded array.
/// Anything else, including a string that is not a JSON array, yields an
/// empty list.
pub fn normalize_string_list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                Value::Bool(b) => Some(b.to_string()),
                _ => None,
            })
            .filter(|s| !s.is_empty())
            .collect(),
        Value::String(encoded) => match serde_json::from_str::<Value>(encoded.trim()) {
            Ok(inner @ Value::Array(_)) => normalize_string_list(&inner),
            _ => Vec::new(),
        },
        _ => Vec::new(),
    }
}

/// `deserialize_with` adapter for [`normalize_string_list`]
pub fn string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.map(|v| normalize_string_list(&v)).unwrap_or_default())
}

/// `deserialize_with` adapter for text fields that may arrive as null or a number
pub fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

/// `deserialize_with` adapter for integers that may arrive as strings
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn python_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```(?:python|py)[ \t]*\r?\n(.*?)```").expect("valid regex"))
}

fn any_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)```[A-Za-z0-9_+-]*[ \t]*\r?\n(.*?)```").expect("valid regex"))
}

/// Degraded-mode code extraction from prose: the first ```` ```python ````
/// block, else the first fenced block of any language.
pub fn extract_code_block(text: &str) -> Option<String> {
    python_fence()
        .captures(text)
        .or_else(|| any_fence().captures(text))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|code| !code.trim().is_empty())
}
