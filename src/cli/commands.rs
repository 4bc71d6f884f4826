use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Turns a thesis into a runnable Python project
#[derive(Parser, Debug)]
#[command(
    name = "thesis2code",
    about = "Turn a thesis document into a runnable Python project",
    version,
    long_about = "thesis2code reads a thesis (PDF, Markdown or a remote PDF URL), analyzes its \
                  research method with an LLM, generates one Python module per code task plus a \
                  main entry point, repairs syntax errors and writes the project to disk."
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(long, global = true, value_name = "LEVEL", help = "Set logging level")]
    pub log_level: Option<String>,

    #[arg(short = 'v', long, global = true, help = "Enable debug logging")]
    pub verbose: bool,

    #[arg(
        short = 'q',
        long,
        global = true,
        conflicts_with = "verbose",
        help = "Quiet mode - suppress non-error output"
    )]
    pub quiet: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Generate a code project from a thesis",
        long_about = "Runs ingestion, analysis, code synthesis, validation and assembly.\n\n\
                      Examples:\n  \
                      thesis2code generate thesis.pdf\n  \
                      thesis2code generate thesis.md --data ./data --archive\n  \
                      thesis2code generate https://example.org/paper.pdf --timeout 1800"
    )]
    Generate(GenerateArgs),

    #[command(about = "Show the effective configuration")]
    Config(ConfigArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct GenerateArgs {
    #[arg(value_name = "DOCUMENT", help = "Thesis path (.pdf, .md, .txt) or PDF URL")]
    pub document: String,

    #[arg(short = 'd', long, value_name = "DIR", help = "Directory with Excel/CSV data files")]
    pub data: Option<PathBuf>,

    #[arg(
        short = 'o',
        long,
        value_name = "DIR",
        help = "Output directory (default: THESIS2CODE_OUTPUT_DIR or ./output)"
    )]
    pub output: Option<PathBuf>,

    #[arg(long, help = "Also write a .tar.gz of the project")]
    pub archive: bool,

    #[arg(long, value_name = "SECONDS", help = "Abort the run after this many seconds")]
    pub timeout: Option<u64>,

    #[arg(long, value_name = "N", help = "Parallel code generation requests")]
    pub concurrency: Option<usize>,

    #[arg(long, value_name = "N", help = "Repair attempts per generated file")]
    pub max_retries: Option<u32>,

    #[arg(long, value_name = "MODEL", help = "Model for analysis (overrides env)")]
    pub analyzer_model: Option<String>,

    #[arg(long, value_name = "MODEL", help = "Model for code generation (overrides env)")]
    pub coder_model: Option<String>,

    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(Parser, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(
        short = 'f',
        long,
        value_enum,
        default_value = "human",
        help = "Output format"
    )]
    pub format: OutputFormatArg,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatArg {
    Json,
    Human,
}

impl From<OutputFormatArg> for super::output::OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Json => super::output::OutputFormat::Json,
            OutputFormatArg::Human => super::output::OutputFormat::Human,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_args_verify() {
        CliArgs::command().debug_assert();
    }

    #[test]
    fn test_default_generate_args() {
        let args = CliArgs::parse_from(["thesis2code", "generate", "thesis.pdf"]);
        match args.command {
            Commands::Generate(generate) => {
                assert_eq!(generate.document, "thesis.pdf");
                assert_eq!(generate.format, OutputFormatArg::Human);
                assert!(generate.data.is_none());
                assert!(generate.output.is_none());
                assert!(!generate.archive);
                assert!(generate.timeout.is_none());
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_generate_with_options() {
        let args = CliArgs::parse_from([
            "thesis2code",
            "generate",
            "paper.md",
            "--data",
            "./data",
            "-o",
            "/tmp/out",
            "--archive",
            "--timeout",
            "600",
            "--concurrency",
            "2",
            "--max-retries",
            "1",
            "-f",
            "json",
        ]);
        match args.command {
            Commands::Generate(generate) => {
                assert_eq!(generate.data, Some(PathBuf::from("./data")));
                assert_eq!(generate.output, Some(PathBuf::from("/tmp/out")));
                assert!(generate.archive);
                assert_eq!(generate.timeout, Some(600));
                assert_eq!(generate.concurrency, Some(2));
                assert_eq!(generate.max_retries, Some(1));
                assert_eq!(generate.format, OutputFormatArg::Json);
            }
            _ => panic!("Expected Generate command"),
        }
    }

    #[test]
    fn test_global_flags() {
        let args = CliArgs::parse_from(["thesis2code", "-v", "config"]);
        assert!(args.verbose);
        assert!(!args.quiet);
        assert!(matches!(args.command, Commands::Config(_)));
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = CliArgs::try_parse_from(["thesis2code", "-v", "-q", "config"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_document_is_required() {
        assert!(CliArgs::try_parse_from(["thesis2code", "generate"]).is_err());
    }
}
