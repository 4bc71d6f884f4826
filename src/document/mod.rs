//! Document ingestion
//!
//! Converts the input document into text through a fallback chain
//! ([`DocumentIngestor`]), structures it with the analyzer model
//! ([`DocumentStructurer`]) and scans auxiliary data files.

pub mod data_files;
mod error;
pub mod ingest;
pub mod local;
pub mod mock;
pub mod remote;
pub mod structure;
pub mod types;

pub use data_files::scan_data_files;
pub use error::ConversionError;
pub use ingest::{ConversionOutcome, DocumentIngestor};
pub use local::{LocalExtractor, PdfTextExtractor};
pub use mock::{ConversionCall, MockConversionService, MockLocalExtractor};
pub use remote::{
    ConversionService, ConversionSettings, ConvertedContent, HttpConversionService, TaskStatus,
    UploadReceipt,
};
pub use structure::DocumentStructurer;
pub use types::{
    Chapter, DataFileDescriptor, DataFileKind, DocumentSource, IngestTier, IngestedText,
    ParsedDocument, TableDescriptor,
};
