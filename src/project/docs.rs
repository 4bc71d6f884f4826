//! README and run-instruction rendering

use super::assemble::ProjectFile;
use crate::analysis::AnalysisResult;
use crate::synthesis::INTEGRATION_FILE_NAME;
use crate::validation::ValidationOutcome;
use chrono::{DateTime, Local};
use std::fmt;

const DEFAULT_TITLE: &str = "Thesis Code";

pub fn render_readme(
    run_id: &str,
    title: &str,
    analysis: &AnalysisResult,
    files: &[ProjectFile],
    validation: &[ValidationOutcome],
    generated_at: DateTime<Local>,
) -> String {
    Readme {
        run_id,
        title,
        analysis,
        files,
        validation,
        generated_at,
    }
    .to_string()
}

/// Empty when nothing was validated
pub fn render_validation_report(validation: &[ValidationOutcome]) -> String {
    ValidationReport(validation).to_string()
}

/// Numbered per-file steps; the integration file is always the last step
pub fn render_run_instructions(files: &[ProjectFile]) -> String {
    RunInstructions(files).to_string()
}

struct Readme<'a> {
    run_id: &'a str,
    title: &'a str,
    analysis: &'a AnalysisResult,
    files: &'a [ProjectFile],
    validation: &'a [ValidationOutcome],
    generated_at: DateTime<Local>,
}

impl fmt::Display for Readme<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let heading = if self.title.trim().is_empty() {
            DEFAULT_TITLE
        } else {
            self.title.trim()
        };

        writeln!(f, "# {}\n", heading)?;
        f.write_str("## About\n\n")?;
        f.write_str("Python implementation generated from the thesis.\n\n")?;
        f.write_str("### Thesis\n\n")?;
        writeln!(f, "- **Title**: {}", self.title)?;
        writeln!(f, "- **Type**: {}", self.analysis.thesis_type)?;
        writeln!(f, "- **Research method**: {}\n", self.analysis.research_method)?;

        f.write_str("### Tech stack\n\n")?;
        for tech in &self.analysis.tech_stack {
            writeln!(f, "- {}", tech)?;
        }

        f.write_str("\n## Layout\n\n```\n")?;
        writeln!(f, "{}/", self.run_id)?;
        for file in self.files {
            writeln!(f, "├── {}  # {}", file.file_name, file.description)?;
        }
        f.write_str("├── requirements.txt  # dependencies\n")?;
        f.write_str("├── RUN_INSTRUCTIONS.md  # how to run\n")?;
        f.write_str("├── README.md  # this file\n")?;
        f.write_str("└── analysis_result.json  # analysis result\n```\n\n")?;

        f.write_str("## Install\n\n```bash\npip install -r requirements.txt\n```\n\n")?;
        writeln!(f, "## Run\n\n```bash\npython {}\n```\n", INTEGRATION_FILE_NAME)?;

        f.write_str("## Modules\n\n")?;
        for file in self.files {
            writeln!(f, "### {}\n{}\n", file.file_name, file.description)?;
        }

        write!(f, "{}", ValidationReport(self.validation))?;

        f.write_str("## Notes\n\n")?;
        f.write_str("1. Install every dependency before running.\n")?;
        f.write_str("2. Put data files in the project directory.\n")?;
        f.write_str("3. The code is machine-generated and may need adjusting.\n\n")?;

        f.write_str("## Generated\n\n")?;
        writeln!(f, "- Time: {}", self.generated_at.format("%Y-%m-%d %H:%M:%S"))?;
        writeln!(f, "- Run id: {}", self.run_id)
    }
}

struct ValidationReport<'a>(&'a [ValidationOutcome]);

impl fmt::Display for ValidationReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let validation = self.0;
        if validation.is_empty() {
            return Ok(());
        }

        let valid = validation.iter().filter(|v| v.is_valid).count();
        let repaired = validation.iter().filter(|v| v.fixed_code.is_some()).count();
        f.write_str("## Validation\n\n")?;
        writeln!(
            f,
            "{}/{} files passed syntax checks ({} repaired).\n",
            valid,
            validation.len(),
            repaired
        )?;

        let invalid: Vec<_> = validation.iter().filter(|v| !v.is_valid).collect();
        if !invalid.is_empty() {
            f.write_str("Files that still need manual review:\n\n")?;
            for outcome in invalid {
                writeln!(
                    f,
                    "- `{}`: {}",
                    outcome.file_name,
                    outcome.error_message.as_deref().unwrap_or("invalid")
                )?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

struct RunInstructions<'a>(&'a [ProjectFile]);

impl fmt::Display for RunInstructions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("# Run Instructions\n\n")?;
        f.write_str("## Setup\n\n")?;
        f.write_str("1. Python >= 3.8\n")?;
        f.write_str("2. Install dependencies: pip install -r requirements.txt\n\n")?;
        f.write_str("## Steps\n\n")?;

        let (integration, modules): (Vec<&ProjectFile>, Vec<&ProjectFile>) = self
            .0
            .iter()
            .partition(|file| file.file_name == INTEGRATION_FILE_NAME);
        for (step, file) in modules.iter().chain(integration.iter()).enumerate() {
            writeln!(
                f,
                "{}. Run {}: `python {}`",
                step + 1,
                file.file_name,
                file.file_name
            )?;
        }

        if !integration.is_empty() {
            write!(
                f,
                "\n## Or run the main program\n\n```bash\npython {}\n```\n",
                INTEGRATION_FILE_NAME
            )?;
        }

        f.write_str("\n## Troubleshooting\n\n")?;
        f.write_str("1. Import errors usually mean a dependency is missing.\n")?;
        f.write_str("2. Fix data file paths in the code if they differ.\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{DataSourceKind, ThesisType};

    fn file(name: &str, description: &str) -> ProjectFile {
        ProjectFile {
            file_name: name.to_string(),
            task_id: name.trim_end_matches(".py").to_string(),
            description: description.to_string(),
            code: String::new(),
        }
    }

    fn analysis() -> AnalysisResult {
        AnalysisResult {
            thesis_type: ThesisType::DataAnalysis,
            research_method: "panel regression".to_string(),
            data_source: DataSourceKind::NoData,
            data_files: vec![],
            code_tasks: vec![],
            tech_stack: vec!["Python".to_string(), "Pandas".to_string()],
            libraries: vec![],
            summary: String::new(),
        }
    }

    #[test]
    fn test_readme_lists_modules_in_order() {
        let files = vec![
            file("clean.py", "cleaning"),
            file("fit.py", "fitting"),
            file("main.py", "Main program entry point"),
        ];
        let readme = render_readme("run1", "Housing", &analysis(), &files, &[], Local::now());

        assert!(readme.starts_with("# Housing\n"));
        assert!(readme.contains("- **Type**: data_analysis"));
        assert!(readme.contains("- Pandas"));
        let clean = readme.find("### clean.py").unwrap();
        let fit = readme.find("### fit.py").unwrap();
        let main = readme.find("### main.py").unwrap();
        assert!(clean < fit && fit < main);
        assert!(!readme.contains("## Validation"));
    }

    #[test]
    fn test_readme_without_title() {
        let readme = render_readme("run1", " ", &analysis(), &[], &[], Local::now());
        assert!(readme.starts_with("# Thesis Code\n"));
    }

    #[test]
    fn test_validation_report_lists_invalid_files() {
        let outcomes = vec![
            ValidationOutcome {
                file_name: "ok.py".to_string(),
                is_valid: true,
                fixed_code: Some("x = 1".to_string()),
                ..Default::default()
            },
            ValidationOutcome {
                file_name: "bad.py".to_string(),
                is_valid: false,
                error_message: Some("retry budget exhausted".to_string()),
                ..Default::default()
            },
        ];
        let report = render_validation_report(&outcomes);
        assert!(report.contains("1/2 files passed syntax checks (1 repaired)"));
        assert!(report.contains("- `bad.py`: retry budget exhausted"));
        assert!(!report.contains("ok.py"));
    }

    #[test]
    fn test_run_instructions_put_main_last() {
        let files = vec![
            file("main.py", "entry"),
            file("a.py", "a"),
            file("b.py", "b"),
        ];
        let text = render_run_instructions(&files);
        assert!(text.contains("1. Run a.py: `python a.py`"));
        assert!(text.contains("2. Run b.py: `python b.py`"));
        assert!(text.contains("3. Run main.py: `python main.py`"));
        assert!(text.contains("## Or run the main program"));
    }

    #[test]
    fn test_run_instructions_without_main() {
        let text = render_run_instructions(&[file("a.py", "a")]);
        assert!(text.contains("1. Run a.py"));
        assert!(!text.contains("## Or run the main program"));
    }
}
