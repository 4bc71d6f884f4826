//! Per-run working directory

use super::assemble::ProjectBundle;
use crate::document::{DataFileDescriptor, DocumentSource};
use anyhow::{bail, Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use uuid::Uuid;

pub const REQUIREMENTS_FILE: &str = "requirements.txt";
pub const README_FILE: &str = "README.md";
pub const RUN_INSTRUCTIONS_FILE: &str = "RUN_INSTRUCTIONS.md";
pub const ANALYSIS_FILE: &str = "analysis_result.json";
pub const THESIS_TEXT_FILE: &str = "thesis.md";
pub const THESIS_PDF_FILE: &str = "thesis.pdf";

/// Names the workspace writes itself; generated code must not take them
pub const RESERVED_FILE_NAMES: [&str; 6] = [
    REQUIREMENTS_FILE,
    README_FILE,
    RUN_INSTRUCTIONS_FILE,
    ANALYSIS_FILE,
    THESIS_TEXT_FILE,
    THESIS_PDF_FILE,
];

/// `YYYYmmdd_HHMMSS_<6 hex>`
pub fn new_run_id() -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", Local::now().format("%Y%m%d_%H%M%S"), &suffix[..6])
}

/// Whether `name` stays inside the working directory once joined to it
pub fn is_safe_relative(name: &str) -> bool {
    !name.trim().is_empty()
        && Path::new(name)
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}

/// Rejects empty, absolute and parent-escaping names
fn checked_relative(name: &str) -> Result<&Path> {
    if name.trim().is_empty() {
        bail!("empty file name");
    }
    if !is_safe_relative(name) {
        bail!("file name '{}' leaves the working directory", name);
    }
    Ok(Path::new(name))
}

/// Working directory owned by one run; the only writer to its files
#[derive(Debug, Clone)]
pub struct Workspace {
    run_id: String,
    root: PathBuf,
}

impl Workspace {
    pub fn create(output_dir: &Path, run_id: impl Into<String>) -> Result<Self> {
        let run_id = run_id.into();
        let root = output_dir.join(&run_id);
        fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create working directory {}", root.display()))?;
        info!(work_dir = %root.display(), "Working directory created");
        Ok(Self { run_id, root })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let relative = checked_relative(name)?;
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(&path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        debug!(file = %name, bytes = contents.len(), "Wrote file");
        Ok(path)
    }

    /// Keeps the thesis next to the code: `thesis.pdf` plus the extracted
    /// `thesis.md` for PDFs, `thesis.md` otherwise
    pub fn store_document(&self, source: &DocumentSource, raw_text: &str) -> Result<()> {
        match source {
            DocumentSource::LocalPdf(path) if path.is_file() => {
                let dest = self.root.join(THESIS_PDF_FILE);
                fs::copy(path, &dest)
                    .with_context(|| format!("Failed to copy {}", path.display()))?;
                self.write_file(THESIS_TEXT_FILE, raw_text)?;
            }
            DocumentSource::LocalText(path) if path.is_file() => {
                let dest = self.root.join(THESIS_TEXT_FILE);
                fs::copy(path, &dest)
                    .with_context(|| format!("Failed to copy {}", path.display()))?;
            }
            _ => {
                self.write_file(THESIS_TEXT_FILE, raw_text)?;
            }
        }
        Ok(())
    }

    /// Copies data files into the directory; descriptors come back pointing
    /// at the copies
    pub fn copy_data_files(&self, files: &[DataFileDescriptor]) -> Result<Vec<DataFileDescriptor>> {
        let mut copied = Vec::with_capacity(files.len());
        for file in files {
            let dest = self.root.join(checked_relative(&file.file_name)?);
            if let Err(e) = fs::copy(&file.path, &dest) {
                warn!(file = %file.path.display(), error = %e, "Data file not copied");
                copied.push(file.clone());
                continue;
            }
            copied.push(DataFileDescriptor {
                path: dest,
                ..file.clone()
            });
        }
        Ok(copied)
    }

    pub fn write_analysis(&self, analysis_json: &str) -> Result<PathBuf> {
        self.write_file(ANALYSIS_FILE, analysis_json)
    }

    /// Writes code files, requirements and documents; returns written paths
    pub fn write_bundle(&self, bundle: &ProjectBundle) -> Result<Vec<PathBuf>> {
        let mut written = Vec::with_capacity(bundle.files.len() + 4);
        for file in &bundle.files {
            written.push(self.write_file(&file.file_name, &file.code)?);
        }
        written.push(self.write_file(REQUIREMENTS_FILE, &bundle.requirements_txt())?);
        written.push(self.write_file(README_FILE, &bundle.readme)?);
        written.push(self.write_file(RUN_INSTRUCTIONS_FILE, &bundle.run_instructions)?);
        written.push(self.write_analysis(&bundle.analysis_json)?);
        info!(files = written.len(), work_dir = %self.root.display(), "Project files saved");
        Ok(written)
    }
}
