//! Delimited text (CSV/TSV) parsing

use crate::IngestError;
use indexmap::IndexMap;
use ontoforge_core::RawRecord;
use serde_json::Value;
use std::collections::HashSet;
use tracing::warn;

/// Cell contents treated as missing values
pub const NULL_TOKENS: [&str; 8] = ["", "NA", "N/A", "null", "NULL", "None", "NaN", "undefined"];

/// Header and rows of a delimited input
#[derive(Debug, Clone, PartialEq)]
pub struct DelimitedTable {
    pub columns: Vec<String>,
    pub records: Vec<RawRecord>,
}

pub fn is_null_token(cell: &str) -> bool {
    NULL_TOKENS.contains(&cell.trim())
}

/// Make header names non-blank and unique
fn normalize_headers(raw: &csv::StringRecord) -> Result<Vec<String>, IngestError> {
    if raw.iter().all(|h| h.trim().is_empty()) {
        return Err(IngestError::MissingHeader);
    }

    let mut seen = HashSet::new();
    let mut columns = Vec::with_capacity(raw.len());
    for (i, header) in raw.iter().enumerate() {
        let base = match header.trim() {
            "" => format!("column_{}", i + 1),
            name => name.to_string(),
        };
        let mut name = base.clone();
        let mut counter = 2;
        while !seen.insert(name.clone()) {
            name = format!("{}_{}", base, counter);
            counter += 1;
        }
        columns.push(name);
    }
    Ok(columns)
}

/// Parse delimited text with a mandatory header row.
///
/// Rows are read leniently: short rows omit the missing cells, extra cells
/// are dropped. Each record remembers the width of its source row so the
/// schema extractor can apply the ragged-row tolerance.
pub fn parse_delimited(text: &str, delimiter: u8) -> Result<DelimitedTable, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let columns = normalize_headers(reader.headers()?)?;

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        if row.len() > columns.len() {
            warn!(
                row = records.len(),
                width = row.len(),
                columns = columns.len(),
                "dropping cells beyond the header width"
            );
        }

        let fields: IndexMap<String, Value> = columns
            .iter()
            .zip(row.iter())
            .map(|(column, cell)| {
                let value = if is_null_token(cell) {
                    Value::Null
                } else {
                    Value::String(cell.to_string())
                };
                (column.clone(), value)
            })
            .collect();

        records.push(RawRecord::new(records.len(), fields).with_source_width(row.len()));
    }

    if records.is_empty() {
        return Err(IngestError::NoDataRows);
    }
    Ok(DelimitedTable { columns, records })
}
