//! Auxiliary data-file scan
//!
//! Walks a directory for CSV and spreadsheet files and records their
//! header, row count and a few sample rows. A file that cannot be read
//! still produces a descriptor whose description carries the reason.

use super::types::{file_name_of, DataFileDescriptor, DataFileKind};
use anyhow::{anyhow, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use serde_json::{Map, Value};
use std::path::Path;
use tracing::{info, warn};
use walkdir::WalkDir;

pub const DEFAULT_FILE_LIMIT: usize = 50;
const SAMPLE_ROWS: usize = 5;

/// Scans `dir` for data files, stopping after `limit` matches
pub fn scan_data_files(dir: &Path, recursive: bool, limit: usize) -> Vec<DataFileDescriptor> {
    if !dir.is_dir() {
        warn!(dir = %dir.display(), "Data directory does not exist");
        return Vec::new();
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut found = Vec::new();

    for entry in WalkDir::new(dir)
        .max_depth(max_depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        let Some(kind) = DataFileKind::from_path(path) else {
            continue;
        };

        found.push(describe(path, kind));
        if found.len() >= limit {
            warn!(limit, "Data file limit reached, stopping scan");
            break;
        }
    }

    info!(count = found.len(), dir = %dir.display(), "Data file scan complete");
    found
}

/// Describes one file, never failing
pub fn describe(path: &Path, kind: DataFileKind) -> DataFileDescriptor {
    let table = match kind {
        DataFileKind::Csv => read_csv(path),
        DataFileKind::Excel => read_workbook(path),
    };

    match table {
        Ok(table) => DataFileDescriptor {
            path: path.to_path_buf(),
            file_name: file_name_of(path),
            kind,
            description: format!(
                "{} file with {} columns and {} rows",
                kind.as_str(),
                table.columns.len(),
                table.row_count
            ),
            columns: table.columns,
            row_count: Some(table.row_count),
            sample_rows: table.samples,
        },
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read data file");
            DataFileDescriptor::unreadable(path, kind, format!("{:#}", e))
        }
    }
}

struct TableSummary {
    columns: Vec<String>,
    row_count: usize,
    samples: Vec<Map<String, Value>>,
}

fn sample_row(columns: &[String], cells: impl Iterator<Item = Value>) -> Map<String, Value> {
    columns.iter().cloned().zip(cells).collect()
}

fn read_csv(path: &Path) -> Result<TableSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    // Byte records tolerate non-UTF-8 exports
    let columns: Vec<String> = reader
        .byte_headers()
        .context("Failed to read CSV header")?
        .iter()
        .map(|h| String::from_utf8_lossy(h).trim_start_matches('\u{feff}').to_string())
        .collect();

    let mut row_count = 0;
    let mut samples = Vec::new();
    for record in reader.byte_records() {
        let record = record.context("Malformed CSV record")?;
        if samples.len() < SAMPLE_ROWS {
            let cells = record
                .iter()
                .map(|c| Value::String(String::from_utf8_lossy(c).into_owned()));
            samples.push(sample_row(&columns, cells));
        }
        row_count += 1;
    }

    Ok(TableSummary {
        columns,
        row_count,
        samples,
    })
}

fn cell_value(cell: &Data) -> Value {
    match cell {
        Data::Int(i) => Value::from(*i),
        Data::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        Data::String(s) => Value::String(s.clone()),
        Data::Bool(b) => Value::Bool(*b),
        Data::Empty => Value::Null,
        other => Value::String(other.to_string()),
    }
}

fn read_workbook(path: &Path) -> Result<TableSummary> {
    let mut workbook = open_workbook_auto(path)
        .map_err(|e| anyhow!("Failed to open {}: {}", path.display(), e))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("Workbook has no sheets")?
        .map_err(|e| anyhow!("Failed to read first sheet: {}", e))?;

    let mut rows = range.rows();
    let columns: Vec<String> = rows
        .next()
        .map(|header| header.iter().map(|c| c.to_string()).collect())
        .unwrap_or_default();

    let mut row_count = 0;
    let mut samples = Vec::new();
    for row in rows {
        if samples.len() < SAMPLE_ROWS {
            samples.push(sample_row(&columns, row.iter().map(cell_value)));
        }
        row_count += 1;
    }

    Ok(TableSummary {
        columns,
        row_count,
        samples,
    })
}
