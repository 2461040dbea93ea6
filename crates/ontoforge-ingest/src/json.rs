//! JSON document and newline-delimited JSON parsing

use crate::IngestError;
use indexmap::IndexMap;
use ontoforge_core::RawRecord;
use serde_json::Value;

/// Field name used to wrap non-object values
pub const SCALAR_FIELD: &str = "value";

fn to_record(index: usize, value: Value) -> RawRecord {
    let fields = match value {
        Value::Object(map) => map.into_iter().collect::<IndexMap<_, _>>(),
        other => {
            let mut fields = IndexMap::new();
            fields.insert(SCALAR_FIELD.to_string(), other);
            fields
        }
    };
    RawRecord::new(index, fields)
}

/// Parse a single JSON document.
///
/// A top-level array yields one record per element; any other value yields
/// one record. Non-object values are wrapped as `{"value": x}`.
pub fn parse_document(text: &str) -> Result<Vec<RawRecord>, IngestError> {
    let value: Value = serde_json::from_str(text.trim())?;
    let records = match value {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| to_record(index, item))
            .collect(),
        other => vec![to_record(0, other)],
    };
    Ok(records)
}

/// Parse newline-delimited JSON; blank lines are skipped
pub fn parse_lines(text: &str) -> Result<Vec<RawRecord>, IngestError> {
    let mut records = Vec::new();
    for (line_number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line).map_err(|e| IngestError::JsonLine {
            line: line_number + 1,
            message: e.to_string(),
        })?;
        records.push(to_record(records.len(), value));
    }
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_array_of_objects_and_scalars() {
        let records = parse_document(r#"[{"b": 1, "a": 2}, "loose"]"#).unwrap();
        assert_eq!(records.len(), 2);
        let keys: Vec<&String> = records[0].fields().keys().collect();
        assert_eq!(keys, vec!["b", "a"]);
        assert_eq!(records[1].get(SCALAR_FIELD), Some(&json!("loose")));
        assert_eq!(records[1].index(), 1);
    }

    #[test]
    fn test_single_object_and_scalar_documents() {
        let records = parse_document(r#"{"hosts": [{"name": "a"}]}"#).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].get("hosts").unwrap().is_array());

        let records = parse_document("true").unwrap();
        assert_eq!(records[0].get(SCALAR_FIELD), Some(&json!(true)));
    }

    #[test]
    fn test_empty_array_yields_no_records() {
        assert!(parse_document("[]").unwrap().is_empty());
    }

    #[test]
    fn test_lines_report_line_number() {
        let err = parse_lines("{\"a\": 1}\n\n{oops}\n").unwrap_err();
        match err {
            IngestError::JsonLine { line, .. } => assert_eq!(line, 3),
            other => panic!("unexpected error: {other}"),
        }
        let records = parse_lines("{\"a\": 1}\n\n{\"a\": 2}\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].index(), 1);
    }
}
