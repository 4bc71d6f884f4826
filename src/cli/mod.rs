pub mod commands;
pub mod handlers;
pub mod output;

pub use commands::{CliArgs, Commands, ConfigArgs, GenerateArgs, OutputFormatArg};
pub use handlers::{handle_config, handle_generate};
pub use output::{OutputFormat, OutputFormatter};
