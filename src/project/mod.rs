//! Project assembly and on-disk output

pub mod archive;
pub mod assemble;
pub mod docs;
pub mod workspace;

pub use archive::create_archive;
pub use assemble::{
    merge_dependencies, DuplicateFilePolicy, ProjectAssembler, ProjectBundle, ProjectFile,
};
pub use docs::{render_readme, render_run_instructions, render_validation_report};
pub use workspace::{is_safe_relative, new_run_id, Workspace, RESERVED_FILE_NAMES};
