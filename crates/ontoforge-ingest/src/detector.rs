//! Content-first format detection
//!
//! Order: JSON document, newline-delimited JSON, delimited text. The file
//! extension is consulted only when the content is ambiguous.

use crate::IngestError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Candidate delimiters, in preference order
pub const CANDIDATE_DELIMITERS: [u8; 4] = [b',', b'\t', b';', b'|'];

/// Lines inspected when sniffing a delimiter
const SNIFF_LINES: usize = 20;

/// Detected input format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum DataFormat {
    Json,
    JsonLines,
    Csv { delimiter: u8 },
}

impl std::fmt::Display for DataFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataFormat::Json => f.write_str("json"),
            DataFormat::JsonLines => f.write_str("ndjson"),
            DataFormat::Csv { delimiter: b'\t' } => f.write_str("tsv"),
            DataFormat::Csv { delimiter } => write!(f, "csv (delimiter '{}')", *delimiter as char),
        }
    }
}

fn is_delimited_extension(extension: Option<&str>) -> bool {
    matches!(extension, Some("csv" | "tsv" | "txt"))
}

fn is_json_lines_extension(extension: Option<&str>) -> bool {
    matches!(extension, Some("jsonl" | "ndjson"))
}

/// Classify decoded text
pub fn detect_format(
    text: &str,
    extension: Option<&str>,
    delimiter_override: Option<u8>,
) -> Result<DataFormat, IngestError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(IngestError::EmptyInput);
    }

    match serde_json::from_str::<Value>(trimmed) {
        // a bare scalar is valid JSON but also a one-cell table
        Ok(value) if value.is_object() || value.is_array() || !is_delimited_extension(extension) => {
            return Ok(DataFormat::Json)
        }
        Ok(_) => {}
        Err(e) => {
            if looks_like_json_lines(trimmed, extension) {
                return Ok(DataFormat::JsonLines);
            }
            // malformed JSON should be reported as such, not parsed as a table
            let structured = trimmed.starts_with('{') || trimmed.starts_with('[');
            if structured && !is_delimited_extension(extension) {
                return Err(IngestError::Json(e));
            }
        }
    }

    let delimiter = match delimiter_override {
        Some(delimiter) => delimiter,
        None => sniff_delimiter(trimmed, extension),
    };
    Ok(DataFormat::Csv { delimiter })
}

/// Every non-blank line is a JSON value; objects unless the extension says otherwise
fn looks_like_json_lines(text: &str, extension: Option<&str>) -> bool {
    let mut lines = 0usize;
    let mut all_objects = true;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match serde_json::from_str::<Value>(line) {
            Ok(value) => {
                all_objects &= value.is_object();
                lines += 1;
            }
            Err(_) => return false,
        }
    }
    lines > 1 && (all_objects || is_json_lines_extension(extension))
}

/// Count occurrences of `delimiter` outside double quotes
fn count_unquoted(line: &str, delimiter: u8) -> usize {
    let mut in_quotes = false;
    let mut count = 0;
    for byte in line.bytes() {
        if byte == b'"' {
            in_quotes = !in_quotes;
        } else if byte == delimiter && !in_quotes {
            count += 1;
        }
    }
    count
}

/// Pick the delimiter whose column count is most consistent across the first lines
pub fn sniff_delimiter(text: &str, extension: Option<&str>) -> u8 {
    let lines: Vec<&str> = text
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(SNIFF_LINES)
        .collect();

    let mut best: Option<(u8, f64, usize)> = None;
    for delimiter in CANDIDATE_DELIMITERS {
        let header_count = match lines.first() {
            Some(header) => count_unquoted(header, delimiter),
            None => 0,
        };
        if header_count == 0 {
            continue;
        }
        let consistent = lines
            .iter()
            .filter(|l| count_unquoted(l, delimiter) == header_count)
            .count();
        let consistency = consistent as f64 / lines.len() as f64;

        let better = match best {
            None => true,
            Some((current, best_consistency, best_count)) => {
                if (consistency - best_consistency).abs() > f64::EPSILON {
                    consistency > best_consistency
                } else if header_count != best_count {
                    header_count > best_count
                } else {
                    // full tie: a .tsv extension prefers tabs
                    extension == Some("tsv") && delimiter == b'\t' && current != b'\t'
                }
            }
        };
        if better {
            best = Some((delimiter, consistency, header_count));
        }
    }

    match best {
        Some((delimiter, _, _)) => delimiter,
        None if extension == Some("tsv") => b'\t',
        None => b',',
    }
}
