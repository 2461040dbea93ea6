//! Schema extraction from parsed records

use crate::type_inference::{infer_value, resolve_types};
use indexmap::IndexMap;
use ontoforge_core::{Cardinality, FieldPath, FieldStats, PrimitiveType, RawRecord, Schema, SchemaField};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const DEFAULT_SAMPLE_SIZE: usize = 50;
pub const DEFAULT_MAX_NESTING_DEPTH: usize = 16;

/// Fatal schema extraction failures for one dataset
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SchemaInferenceError {
    #[error("Dataset '{dataset}' contains no records")]
    EmptyDataset { dataset: String },

    #[error("Dataset '{dataset}' has no fields in records {first}..={last}")]
    NoFields {
        dataset: String,
        first: usize,
        last: usize,
    },

    #[error(
        "Dataset '{dataset}' has {ragged} of {total} rows with a column count different from the header \
         ({expected}); offending records {first}..={last} exceed the tolerance of {tolerance}"
    )]
    RaggedRows {
        dataset: String,
        expected: usize,
        ragged: usize,
        total: usize,
        first: usize,
        last: usize,
        tolerance: f64,
    },
}

/// Per-field state collected while walking records
#[derive(Debug, Default)]
struct FieldAccumulator {
    types: HashSet<PrimitiveType>,
    occurrences: usize,
    null_count: usize,
    repeated: bool,
    nested: bool,
    distinct: HashSet<String>,
    samples: Vec<String>,
}

impl FieldAccumulator {
    fn record_scalar(&mut self, value: &Value, sample_size: usize) {
        let ty = infer_value(value);
        if ty == PrimitiveType::Null {
            self.null_count += 1;
            return;
        }
        self.types.insert(ty);

        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        if self.distinct.insert(rendered.clone()) && self.samples.len() < sample_size {
            self.samples.push(rendered);
        }
    }
}

/// Infers a structural schema from a record stream
#[derive(Debug, Clone)]
pub struct SchemaExtractor {
    sample_size: usize,
    ragged_row_tolerance: f64,
    max_nesting_depth: usize,
}

impl Default for SchemaExtractor {
    fn default() -> Self {
        Self::new()
    }
}

struct Walk<'a> {
    extractor: &'a SchemaExtractor,
    fields: IndexMap<FieldPath, FieldAccumulator>,
    /// Objects observed per container path (`None` is the record root)
    contexts: IndexMap<Option<FieldPath>, usize>,
}

impl<'a> Walk<'a> {
    fn acc(&mut self, path: &FieldPath) -> &mut FieldAccumulator {
        self.fields.entry(path.clone()).or_default()
    }

    fn walk_object<'v>(
        &mut self,
        container: Option<&FieldPath>,
        entries: impl Iterator<Item = (&'v String, &'v Value)>,
    ) {
        *self.contexts.entry(container.cloned()).or_insert(0) += 1;
        for (name, value) in entries {
            let path = match container {
                Some(c) => c.child(name),
                None => FieldPath::root_field(name),
            };
            self.acc(&path).occurrences += 1;
            self.observe(&path, value);
        }
    }

    fn observe(&mut self, path: &FieldPath, value: &Value) {
        match value {
            Value::Null => self.acc(path).null_count += 1,
            Value::Array(items) => {
                self.acc(path).repeated = true;
                for item in items {
                    self.observe_element(path, item);
                }
            }
            Value::Object(map) => self.observe_object(path, &path.clone(), map),
            scalar => {
                let sample_size = self.extractor.sample_size;
                self.acc(path).record_scalar(scalar, sample_size);
            }
        }
    }

    /// Elements of an array at `path`; nested arrays are flattened
    fn observe_element(&mut self, path: &FieldPath, item: &Value) {
        match item {
            Value::Null => {}
            Value::Array(inner) => {
                for nested in inner {
                    self.observe_element(path, nested);
                }
            }
            Value::Object(map) => self.observe_object(path, &path.element(), map),
            scalar => {
                let sample_size = self.extractor.sample_size;
                self.acc(path).record_scalar(scalar, sample_size);
            }
        }
    }

    fn observe_object(&mut self, path: &FieldPath, container: &FieldPath, map: &serde_json::Map<String, Value>) {
        let within_depth = path.depth() + 1 < self.extractor.max_nesting_depth;
        {
            let acc = self.acc(path);
            acc.types.insert(PrimitiveType::Composite);
            acc.nested |= within_depth;
        }
        if within_depth {
            self.walk_object(Some(container), map.iter());
        } else {
            warn!(field = %path, "nesting depth limit reached, children are not extracted");
        }
    }
}

impl SchemaExtractor {
    pub fn new() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            ragged_row_tolerance: 0.0,
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }

    pub fn with_sample_size(mut self, sample_size: usize) -> Self {
        self.sample_size = sample_size;
        self
    }

    /// Fraction of delimited rows allowed to differ from the header width
    pub fn with_ragged_row_tolerance(mut self, tolerance: f64) -> Self {
        self.ragged_row_tolerance = tolerance.clamp(0.0, 1.0);
        self
    }

    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth.max(1);
        self
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Infer the schema of `records`.
    ///
    /// `header_width` is the column count of the header row for delimited
    /// inputs; rows whose source width differs count against the ragged-row
    /// tolerance.
    pub fn extract(
        &self,
        dataset: &str,
        records: &[RawRecord],
        header_width: Option<usize>,
    ) -> Result<Schema, SchemaInferenceError> {
        if records.is_empty() {
            return Err(SchemaInferenceError::EmptyDataset {
                dataset: dataset.to_string(),
            });
        }
        if let Some(expected) = header_width {
            self.check_ragged_rows(dataset, records, expected)?;
        }

        let mut walk = Walk {
            extractor: self,
            fields: IndexMap::new(),
            contexts: IndexMap::new(),
        };
        for record in records {
            walk.walk_object(None, record.fields().iter());
        }

        if walk.fields.is_empty() {
            return Err(SchemaInferenceError::NoFields {
                dataset: dataset.to_string(),
                first: records.first().map(RawRecord::index).unwrap_or(0),
                last: records.last().map(RawRecord::index).unwrap_or(0),
            });
        }

        let mut schema = Schema::new(dataset, records.len());
        for (path, acc) in walk.fields {
            let contexts = walk.contexts.get(&path.container()).copied().unwrap_or(0);
            let (primitive_type, mixed_type) = resolve_types(&acc.types);
            if mixed_type {
                warn!(dataset, field = %path, "values disagree on type, widening to string");
            }

            let cardinality = if acc.repeated {
                Cardinality::Repeated
            } else if acc.occurrences < contexts || acc.null_count > 0 {
                Cardinality::Optional
            } else {
                Cardinality::Single
            };

            let field = SchemaField {
                depth: path.depth(),
                primitive_type,
                cardinality,
                mixed_type,
                nested_entity: acc.nested,
                stats: FieldStats {
                    occurrences: acc.occurrences,
                    contexts,
                    null_count: acc.null_count,
                    distinct_count: acc.distinct.len(),
                },
                path,
            };
            debug!(
                dataset,
                field = %field.path,
                ty = %field.primitive_type,
                cardinality = ?field.cardinality,
                "extracted field"
            );
            schema.insert(field, acc.samples);
        }

        info!(dataset, records = records.len(), fields = schema.len(), "schema extracted");
        Ok(schema)
    }

    fn check_ragged_rows(
        &self,
        dataset: &str,
        records: &[RawRecord],
        expected: usize,
    ) -> Result<(), SchemaInferenceError> {
        let ragged: Vec<usize> = records
            .iter()
            .filter(|r| r.source_width().map_or(false, |w| w != expected))
            .map(RawRecord::index)
            .collect();
        if ragged.is_empty() {
            return Ok(());
        }

        let fraction = ragged.len() as f64 / records.len() as f64;
        if fraction > self.ragged_row_tolerance {
            return Err(SchemaInferenceError::RaggedRows {
                dataset: dataset.to_string(),
                expected,
                ragged: ragged.len(),
                total: records.len(),
                first: ragged[0],
                last: ragged[ragged.len() - 1],
                tolerance: self.ragged_row_tolerance,
            });
        }
        warn!(dataset, ragged = ragged.len(), "ragged rows within tolerance");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn records(values: Vec<Value>) -> Vec<RawRecord> {
        values
            .into_iter()
            .enumerate()
            .map(|(i, v)| {
                let fields = v
                    .as_object()
                    .map(|m| m.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default();
                RawRecord::new(i, fields)
            })
            .collect()
    }

    #[test]
    fn test_flat_records() {
        let data = records(vec![
            json!({"host_id": "h1", "os": "linux", "port": 22}),
            json!({"host_id": "h2", "os": "windows", "port": 443}),
        ]);
        let schema = SchemaExtractor::new().extract("hosts.json", &data, None).unwrap();
        assert_eq!(schema.len(), 3);
        let port = schema.get(&FieldPath::root_field("port")).unwrap();
        assert_eq!(port.primitive_type, PrimitiveType::Integer);
        assert_eq!(port.cardinality, Cardinality::Single);
        assert_eq!(schema.samples(&FieldPath::root_field("os")), ["linux", "windows"]);
    }

    #[test]
    fn test_mixed_types_are_flagged() {
        let data = records(vec![json!({"v": 1}), json!({"v": "one"}), json!({"v": 2.5})]);
        let schema = SchemaExtractor::new().extract("d", &data, None).unwrap();
        let v = schema.get(&FieldPath::root_field("v")).unwrap();
        assert_eq!(v.primitive_type, PrimitiveType::String);
        assert!(v.mixed_type);
    }

    #[test]
    fn test_optional_and_repeated() {
        let data = records(vec![
            json!({"a": 1, "tags": ["x", "y"]}),
            json!({"tags": []}),
            json!({"a": null, "tags": ["z"]}),
        ]);
        let schema = SchemaExtractor::new().extract("d", &data, None).unwrap();
        let a = schema.get(&FieldPath::root_field("a")).unwrap();
        assert_eq!(a.cardinality, Cardinality::Optional);
        assert_eq!(a.stats.null_count, 1);
        let tags = schema.get(&FieldPath::root_field("tags")).unwrap();
        assert_eq!(tags.cardinality, Cardinality::Repeated);
        assert_eq!(tags.primitive_type, PrimitiveType::String);
        assert_eq!(tags.stats.distinct_count, 3);
    }

    #[test]
    fn test_nested_objects_and_arrays_of_objects() {
        let data = records(vec![json!({
            "name": "web",
            "location": {"city": "Tokyo"},
            "interfaces": [{"ip": "10.0.0.1"}, {"ip": "10.0.0.2", "mac": "aa"}]
        })]);
        let schema = SchemaExtractor::new().extract("d", &data, None).unwrap();

        let location = schema.get(&FieldPath::root_field("location")).unwrap();
        assert!(location.nested_entity);
        assert_eq!(location.primitive_type, PrimitiveType::Composite);
        assert_eq!(location.cardinality, Cardinality::Single);

        let interfaces = schema.get(&FieldPath::root_field("interfaces")).unwrap();
        assert!(interfaces.nested_entity);
        assert_eq!(interfaces.cardinality, Cardinality::Repeated);

        let ip = schema.get(&FieldPath::parse("interfaces[].ip")).unwrap();
        assert_eq!(ip.depth, 1);
        assert_eq!(ip.stats.contexts, 2);
        assert_eq!(ip.cardinality, Cardinality::Single);

        let mac = schema.get(&FieldPath::parse("interfaces[].mac")).unwrap();
        assert_eq!(mac.cardinality, Cardinality::Optional);

        assert!(schema.get(&FieldPath::parse("location.city")).is_some());
        let children = schema.children_of(Some(&FieldPath::root_field("interfaces")));
        assert_eq!(children.len(), 2);
    }

    #[test]
    fn test_depth_limit() {
        let data = records(vec![json!({"a": {"b": {"c": 1}}})]);
        let schema = SchemaExtractor::new()
            .with_max_nesting_depth(2)
            .extract("d", &data, None)
            .unwrap();
        assert!(schema.get(&FieldPath::parse("a.b")).is_some());
        assert!(!schema.get(&FieldPath::parse("a.b")).unwrap().nested_entity);
        assert!(schema.get(&FieldPath::parse("a.b.c")).is_none());
    }

    #[test]
    fn test_sample_size_bound() {
        let data = records((0..10).map(|i| json!({ "n": i })).collect());
        let schema = SchemaExtractor::new().with_sample_size(3).extract("d", &data, None).unwrap();
        assert_eq!(schema.samples(&FieldPath::root_field("n")).len(), 3);
        assert_eq!(schema.get(&FieldPath::root_field("n")).unwrap().stats.distinct_count, 10);
    }

    #[test]
    fn test_empty_dataset_is_fatal() {
        let err = SchemaExtractor::new().extract("empty.json", &[], None).unwrap_err();
        assert_eq!(
            err,
            SchemaInferenceError::EmptyDataset {
                dataset: "empty.json".to_string()
            }
        );
        let err = SchemaExtractor::new()
            .extract("d", &records(vec![json!({}), json!({})]), None)
            .unwrap_err();
        assert!(matches!(err, SchemaInferenceError::NoFields { first: 0, last: 1, .. }));
    }

    #[test]
    fn test_ragged_rows_tolerance() {
        let rows: Vec<RawRecord> = (0..4)
            .map(|i| {
                let width = if i == 2 { 2 } else { 3 };
                let mut fields = indexmap::IndexMap::new();
                fields.insert("a".to_string(), json!("1"));
                RawRecord::new(i, fields).with_source_width(width)
            })
            .collect();

        let err = SchemaExtractor::new().extract("t.csv", &rows, Some(3)).unwrap_err();
        assert!(matches!(err, SchemaInferenceError::RaggedRows { first: 2, last: 2, ragged: 1, .. }));

        let schema = SchemaExtractor::new()
            .with_ragged_row_tolerance(0.25)
            .extract("t.csv", &rows, Some(3))
            .unwrap();
        assert_eq!(schema.record_count, 4);
    }
}
