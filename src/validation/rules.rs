use ast_grep_core::matcher::KindMatcher;
use ast_grep_core::tree_sitter::StrDoc;
use ast_grep_core::{AstGrep, Doc, Node};
use ast_grep_language::{LanguageExt, SupportLang};

pub type PythonTree = AstGrep<StrDoc<SupportLang>>;

pub fn parse_python(source: &str) -> PythonTree {
    SupportLang::Python.ast_grep(source)
}

/// Non-blocking structural check; each returned string is one suggestion
pub trait AdvisoryRule: Send + Sync {
    fn name(&self) -> &'static str;
    fn check(&self, tree: &PythonTree) -> Vec<String>;
}

fn has_kind(tree: &PythonTree, kind: &str) -> bool {
    tree.root()
        .find(KindMatcher::new(kind, SupportLang::Python))
        .is_some()
}

pub struct EntryPointRule;

impl EntryPointRule {
    pub fn has_entry_point(tree: &PythonTree) -> bool {
        let root = tree.root();
        let has_main = root
            .find_all(KindMatcher::new("function_definition", SupportLang::Python))
            .any(|def| function_name(&def).as_deref() == Some("main"));
        if has_main {
            return true;
        }
        let guarded = root
            .find_all(KindMatcher::new("if_statement", SupportLang::Python))
            .filter_map(|stmt| stmt.field("condition"))
            .any(|cond| cond.text().contains("__name__"));
        guarded
    }
}

impl AdvisoryRule for EntryPointRule {
    fn name(&self) -> &'static str {
        "EntryPoint"
    }

    fn check(&self, tree: &PythonTree) -> Vec<String> {
        if Self::has_entry_point(tree) {
            Vec::new()
        } else {
            vec!["Add a main() function or an `if __name__ == '__main__':` entry point".to_string()]
        }
    }
}

pub struct ErrorHandlingRule;

impl ErrorHandlingRule {
    pub fn has_error_handling(tree: &PythonTree) -> bool {
        has_kind(tree, "try_statement")
    }
}

impl AdvisoryRule for ErrorHandlingRule {
    fn name(&self) -> &'static str {
        "ErrorHandling"
    }

    fn check(&self, tree: &PythonTree) -> Vec<String> {
        if Self::has_error_handling(tree) {
            Vec::new()
        } else {
            vec!["Add exception handling (try/except)".to_string()]
        }
    }
}

pub struct DocstringRule;

impl DocstringRule {
    /// Names of functions whose body does not open with a string literal
    pub fn undocumented_functions(tree: &PythonTree) -> Vec<String> {
        tree.root()
            .find_all(KindMatcher::new("function_definition", SupportLang::Python))
            .filter(|def| !has_docstring(def))
            .map(|def| function_name(&def).unwrap_or_else(|| "<anonymous>".to_string()))
            .collect()
    }
}

impl AdvisoryRule for DocstringRule {
    fn name(&self) -> &'static str {
        "Docstring"
    }

    fn check(&self, tree: &PythonTree) -> Vec<String> {
        Self::undocumented_functions(tree)
            .into_iter()
            .map(|name| format!("Function {} is missing a docstring", name))
            .collect()
    }
}

fn function_name<D: Doc>(def: &Node<D>) -> Option<String> {
    def.field("name").map(|n| n.text().to_string())
}

fn has_docstring<D: Doc>(def: &Node<D>) -> bool {
    let Some(body) = def.field("body") else {
        return false;
    };
    let Some(first) = body.children().next() else {
        return false;
    };
    first.kind().as_ref() == "expression_statement"
        && first.children().any(|c| c.kind().as_ref() == "string")
}

pub fn default_rules() -> Vec<Box<dyn AdvisoryRule>> {
    vec![
        Box::new(EntryPointRule),
        Box::new(ErrorHandlingRule),
        Box::new(DocstringRule),
    ]
}
