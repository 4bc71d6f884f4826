//! Python syntax check over the tree-sitter grammar

use ast_grep_language::{LanguageExt, SupportLang};
use tree_sitter::{Node, Parser};

/// Parses `source` as Python.
///
/// Returns `Err("line N: ...")` pointing at the first error or missing
/// node the parser recovered from.
pub fn check_syntax(source: &str) -> Result<(), String> {
    let language = SupportLang::Python.get_ts_language();
    let mut parser = Parser::new();
    parser
        .set_language(&language)
        .map_err(|e| format!("python grammar unavailable: {}", e))?;

    let tree = parser
        .parse(source, None)
        .ok_or_else(|| "parser returned no tree".to_string())?;
    let root = tree.root_node();
    if !root.has_error() {
        return Ok(());
    }

    let Some(node) = first_error(root) else {
        return Err("line 1: invalid syntax".to_string());
    };
    let line = node.start_position().row + 1;
    if node.is_missing() {
        return Err(format!("line {}: missing '{}'", line, node.kind()));
    }

    let snippet = node
        .utf8_text(source.as_bytes())
        .unwrap_or_default()
        .lines()
        .next()
        .unwrap_or_default()
        .trim();
    if snippet.is_empty() {
        Err(format!("line {}: invalid syntax", line))
    } else {
        Err(format!("line {}: invalid syntax near '{}'", line, truncate(snippet, 40)))
    }
}

pub fn is_valid_python(source: &str) -> bool {
    check_syntax(source).is_ok()
}

fn first_error(node: Node<'_>) -> Option<Node<'_>> {
    if node.is_error() || node.is_missing() {
        return Some(node);
    }
    let mut cursor = node.walk();
    let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|child| child.has_error() || child.is_missing())
        .find_map(first_error)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
