//! Code synthesis: one stateless model request per task plus an integration artifact

pub mod synthesizer;
pub mod tool;
pub mod types;

pub use synthesizer::{
    build_project_context, reserved_file_names, CodeSynthesizer, DEFAULT_CONCURRENCY,
};
pub use tool::{generate_code_tool, GenerateCodeArgs, GENERATE_CODE_TOOL};
pub use types::{
    FailedTaskPolicy, GeneratedArtifact, SynthesisError, SynthesisOutput, INTEGRATION_DESCRIPTION,
    INTEGRATION_FILE_NAME, INTEGRATION_TASK_ID,
};
