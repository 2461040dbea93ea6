//! Value-level type detection

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use lazy_static::lazy_static;
use ontoforge_core::PrimitiveType;
use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;

lazy_static! {
    static ref INTEGER: Regex = Regex::new(r"^[+-]?\d+$").unwrap();
    static ref FLOAT: Regex = Regex::new(r"^[+-]?(\d+\.\d*|\.\d+|\d+)([eE][+-]?\d+)?$").unwrap();
    static ref ISO_DATETIME: Regex =
        Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(\.\d+)?(Z|[+-]\d{2}:?\d{2})?$").unwrap();
}

const NULL_TOKENS: [&str; 6] = ["NULL", "NONE", "N/A", "NA", "NAN", "UNDEFINED"];
const BOOLEAN_TOKENS: [&str; 6] = ["TRUE", "FALSE", "YES", "NO", "Y", "N"];

const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y", "%m/%d/%Y", "%d-%m-%Y"];
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Type of a raw JSON value; strings are inspected with [`infer_str`]
pub fn infer_value(value: &Value) -> PrimitiveType {
    match value {
        Value::Null => PrimitiveType::Null,
        Value::Bool(_) => PrimitiveType::Boolean,
        Value::Number(n) if n.is_i64() || n.is_u64() => PrimitiveType::Integer,
        Value::Number(_) => PrimitiveType::Float,
        Value::String(s) => infer_str(s),
        Value::Array(_) | Value::Object(_) => PrimitiveType::Composite,
    }
}

/// Most specific type a textual value denotes
pub fn infer_str(raw: &str) -> PrimitiveType {
    let value = raw.trim();
    if value.is_empty() {
        return PrimitiveType::Null;
    }

    let upper = value.to_uppercase();
    if NULL_TOKENS.contains(&upper.as_str()) {
        return PrimitiveType::Null;
    }
    if BOOLEAN_TOKENS.contains(&upper.as_str()) {
        return PrimitiveType::Boolean;
    }
    if INTEGER.is_match(value) {
        return PrimitiveType::Integer;
    }
    if FLOAT.is_match(value) {
        return PrimitiveType::Float;
    }
    if is_datetime(value) {
        return PrimitiveType::DateTime;
    }
    if is_date(value) {
        return PrimitiveType::Date;
    }
    PrimitiveType::String
}

pub fn is_date(value: &str) -> bool {
    DATE_FORMATS
        .iter()
        .any(|fmt| NaiveDate::parse_from_str(value, fmt).is_ok())
}

pub fn is_datetime(value: &str) -> bool {
    if DATETIME_FORMATS
        .iter()
        .any(|fmt| NaiveDateTime::parse_from_str(value, fmt).is_ok())
    {
        return true;
    }
    DateTime::parse_from_rfc3339(value).is_ok() || ISO_DATETIME.is_match(value)
}

/// Resolve every non-null type observed for a field.
///
/// Returns the most specific type consistent with all of them and whether
/// the values disagreed. Integer widens to float and date to date-time;
/// any other disagreement is string (or composite when objects were seen)
/// with the mixed flag set.
pub fn resolve_types(observed: &HashSet<PrimitiveType>) -> (PrimitiveType, bool) {
    let non_null: Vec<PrimitiveType> = observed
        .iter()
        .copied()
        .filter(|t| *t != PrimitiveType::Null)
        .collect();

    match non_null.as_slice() {
        [] => (PrimitiveType::Null, false),
        [single] => (*single, false),
        many => {
            if many.contains(&PrimitiveType::Composite) {
                (PrimitiveType::Composite, true)
            } else if many.iter().all(|t| t.is_numeric()) {
                (PrimitiveType::Float, false)
            } else if many
                .iter()
                .all(|t| matches!(t, PrimitiveType::Date | PrimitiveType::DateTime))
            {
                (PrimitiveType::DateTime, false)
            } else {
                (PrimitiveType::String, true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_infer_strings() {
        assert_eq!(infer_str("  "), PrimitiveType::Null);
        assert_eq!(infer_str("N/A"), PrimitiveType::Null);
        assert_eq!(infer_str("undefined"), PrimitiveType::Null);
        assert_eq!(infer_str("Yes"), PrimitiveType::Boolean);
        assert_eq!(infer_str("n"), PrimitiveType::Boolean);
        assert_eq!(infer_str("1"), PrimitiveType::Integer);
        assert_eq!(infer_str("-42"), PrimitiveType::Integer);
        assert_eq!(infer_str("3.14"), PrimitiveType::Float);
        assert_eq!(infer_str("1e5"), PrimitiveType::Float);
        assert_eq!(infer_str("2024-01-15"), PrimitiveType::Date);
        assert_eq!(infer_str("15/01/2024"), PrimitiveType::Date);
        assert_eq!(infer_str("2024/01/15"), PrimitiveType::Date);
        assert_eq!(infer_str("2024-01-15T09:30:00Z"), PrimitiveType::DateTime);
        assert_eq!(infer_str("2024-01-15T09:30:00.123Z"), PrimitiveType::DateTime);
        assert_eq!(infer_str("2024-01-15T09:30:00+09:00"), PrimitiveType::DateTime);
        assert_eq!(infer_str("2024-01-15 09:30:00"), PrimitiveType::DateTime);
        assert_eq!(infer_str("192.168.1.1"), PrimitiveType::String);
        assert_eq!(infer_str("linux"), PrimitiveType::String);
        assert_eq!(infer_str("2024-13-45"), PrimitiveType::String);
    }

    #[test]
    fn test_infer_json_values() {
        assert_eq!(infer_value(&json!(null)), PrimitiveType::Null);
        assert_eq!(infer_value(&json!(true)), PrimitiveType::Boolean);
        assert_eq!(infer_value(&json!(7)), PrimitiveType::Integer);
        assert_eq!(infer_value(&json!(7.5)), PrimitiveType::Float);
        assert_eq!(infer_value(&json!({"a": 1})), PrimitiveType::Composite);
        assert_eq!(infer_value(&json!("443")), PrimitiveType::Integer);
    }

    #[test]
    fn test_resolve_types() {
        let set = |types: &[PrimitiveType]| types.iter().copied().collect::<HashSet<_>>();
        use PrimitiveType::*;
        assert_eq!(resolve_types(&set(&[])), (Null, false));
        assert_eq!(resolve_types(&set(&[Null, Integer])), (Integer, false));
        assert_eq!(resolve_types(&set(&[Integer, Float])), (Float, false));
        assert_eq!(resolve_types(&set(&[Date, DateTime])), (DateTime, false));
        assert_eq!(resolve_types(&set(&[Integer, String])), (String, true));
        assert_eq!(resolve_types(&set(&[Boolean, Integer])), (String, true));
        assert_eq!(resolve_types(&set(&[Composite, String])), (Composite, true));
    }

    proptest! {
        #[test]
        fn prop_resolution_is_order_independent(values in proptest::collection::vec(
            prop_oneof![
                Just("12".to_string()),
                Just("1.5".to_string()),
                Just("yes".to_string()),
                Just("2024-01-01".to_string()),
                Just("2024-01-01T00:00:00Z".to_string()),
                Just("text".to_string()),
                Just("".to_string()),
            ],
            0..12,
        )) {
            let forward: HashSet<_> = values.iter().map(|v| infer_str(v)).collect();
            let backward: HashSet<_> = values.iter().rev().map(|v| infer_str(v)).collect();
            prop_assert_eq!(resolve_types(&forward), resolve_types(&backward));
        }
    }
}
