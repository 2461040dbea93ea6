//! # Ontoforge Ingest
//!
//! 入力データの形式判定とパース
//! Content-first format detection and parsing of JSON documents,
//! newline-delimited JSON and delimited text into [`RawRecord`]s.

pub mod delimited;
pub mod detector;
pub mod json;

pub use detector::{detect_format, DataFormat};

use ontoforge_core::RawRecord;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

/// Default upper bound on accepted input size
pub const DEFAULT_MAX_INPUT_BYTES: usize = 100 * 1024 * 1024;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Input errors. Fatal for the affected dataset only.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Input is empty")]
    EmptyInput,

    #[error("Input is {size} bytes, exceeding the limit of {limit} bytes")]
    TooLarge { size: usize, limit: usize },

    #[error("Input is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed JSON on line {line}: {message}")]
    JsonLine { line: usize, message: String },

    #[error("Malformed delimited text: {0}")]
    Csv(#[from] csv::Error),

    #[error("Delimited input has no usable header row")]
    MissingHeader,

    #[error("Delimited input has a header but no data rows")]
    NoDataRows,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Parsing options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOptions {
    pub max_input_bytes: usize,
    /// Forces the delimiter of delimited input instead of sniffing it
    pub csv_delimiter: Option<u8>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            csv_delimiter: None,
        }
    }
}

/// Records parsed from one input, with what was detected about it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedDataset {
    /// Originating file name (or caller-chosen label)
    pub name: String,
    pub format: DataFormat,
    pub records: Vec<RawRecord>,
    /// Header row of delimited input
    pub columns: Option<Vec<String>>,
}

impl ParsedDataset {
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Name without directory and extension
    pub fn stem(&self) -> &str {
        dataset_stem(&self.name)
    }
}

/// File stem of a dataset name: `data/hosts.json` -> `hosts`
pub fn dataset_stem(name: &str) -> &str {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    match file.rsplit_once('.') {
        Some((stem, _)) if !stem.is_empty() => stem,
        _ => file,
    }
}

/// Lowercase extension of a dataset name, if any
pub fn extension_of(name: &str) -> Option<String> {
    let file = name.rsplit(['/', '\\']).next().unwrap_or(name);
    file.rsplit_once('.')
        .filter(|(stem, _)| !stem.is_empty())
        .map(|(_, ext)| ext.to_ascii_lowercase())
}

/// Validate raw bytes and decode them as UTF-8 text (BOM stripped)
pub fn decode_input<'a>(bytes: &'a [u8], options: &IngestOptions) -> Result<&'a str, IngestError> {
    if bytes.len() > options.max_input_bytes {
        return Err(IngestError::TooLarge {
            size: bytes.len(),
            limit: options.max_input_bytes,
        });
    }
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = std::str::from_utf8(bytes)?;
    if text.trim().is_empty() {
        return Err(IngestError::EmptyInput);
    }
    Ok(text)
}

/// Detect the format of `bytes` and parse them into records
///
/// `name` is the originating file name; its extension only breaks ties
/// when the content alone is ambiguous.
pub fn ingest(name: &str, bytes: &[u8], options: &IngestOptions) -> Result<ParsedDataset, IngestError> {
    let text = decode_input(bytes, options)?;
    let extension = extension_of(name);
    let format = detect_format(text, extension.as_deref(), options.csv_delimiter)?;
    debug!(dataset = name, ?format, "detected input format");

    let (records, columns) = match format {
        DataFormat::Json => (json::parse_document(text)?, None),
        DataFormat::JsonLines => (json::parse_lines(text)?, None),
        DataFormat::Csv { delimiter } => {
            let table = delimited::parse_delimited(text, delimiter)?;
            (table.records, Some(table.columns))
        }
    };

    info!(dataset = name, records = records.len(), "parsed input");
    Ok(ParsedDataset {
        name: name.to_string(),
        format,
        records,
        columns,
    })
}

/// Read and ingest a file from disk
pub fn ingest_path(path: &std::path::Path, options: &IngestOptions) -> Result<ParsedDataset, IngestError> {
    let bytes = std::fs::read(path)?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    ingest(&name, &bytes, options)
}
