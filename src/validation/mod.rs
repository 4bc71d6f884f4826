//! Static checks and the bounded repair loop for generated Python files

pub mod rules;
pub mod syntax;
pub mod validator;

pub use rules::{
    default_rules, parse_python, AdvisoryRule, DocstringRule, EntryPointRule, ErrorHandlingRule,
    PythonTree,
};
pub use syntax::{check_syntax, is_valid_python};
pub use validator::{
    apply_fixes, CodeValidator, ValidationOutcome, DEFAULT_MAX_RETRIES, RETRY_BUDGET_EXHAUSTED,
};
