use anyhow::{Context, Result};
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::info;

/// Packs `work_dir` into `<parent>/<dir name>.tar.gz`; entries are rooted at
/// the directory name
pub fn create_archive(work_dir: &Path) -> Result<PathBuf> {
    let name = work_dir
        .file_name()
        .context("Working directory has no name")?
        .to_string_lossy()
        .to_string();
    let parent = work_dir.parent().unwrap_or_else(|| Path::new("."));
    let archive_path = parent.join(format!("{}.tar.gz", name));

    let file = File::create(&archive_path)
        .with_context(|| format!("Failed to create {}", archive_path.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder
        .append_dir_all(&name, work_dir)
        .with_context(|| format!("Failed to archive {}", work_dir.display()))?;
    builder
        .into_inner()
        .context("Failed to finish tar stream")?
        .finish()
        .context("Failed to finish gzip stream")?;

    info!(archive = %archive_path.display(), "Archive created");
    Ok(archive_path)
}
