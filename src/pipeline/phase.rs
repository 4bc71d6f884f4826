use serde::Serialize;
use std::fmt;

/// Stages of one run, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Prepare,
    Ingest,
    ScanData,
    Analyze,
    Synthesize,
    Validate,
    Assemble,
    Package,
}

impl Phase {
    pub const ALL: [Phase; 8] = [
        Phase::Prepare,
        Phase::Ingest,
        Phase::ScanData,
        Phase::Analyze,
        Phase::Synthesize,
        Phase::Validate,
        Phase::Assemble,
        Phase::Package,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Prepare => "prepare",
            Phase::Ingest => "ingest",
            Phase::ScanData => "scan_data",
            Phase::Analyze => "analyze",
            Phase::Synthesize => "synthesize",
            Phase::Validate => "validate",
            Phase::Assemble => "assemble",
            Phase::Package => "package",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
