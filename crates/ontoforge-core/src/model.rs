//! Dataset, schema and annotation models

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;

/// Path of a field inside a record.
///
/// Rendered in dot/bracket notation: `hosts[].interfaces[].ip`. Each segment
/// is a field name followed by one `[]` marker per array level.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Path of a top-level field
    pub fn root_field(name: &str) -> Self {
        Self {
            segments: vec![name.to_string()],
        }
    }

    /// Path of a named child of this path
    pub fn child(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }

    /// Path of the elements of the array located at this path
    pub fn element(&self) -> Self {
        let mut segments = self.segments.clone();
        if let Some(last) = segments.last_mut() {
            last.push_str("[]");
        }
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Field name of the last segment, without array markers
    pub fn leaf(&self) -> &str {
        self.segments
            .last()
            .map(|s| s.trim_end_matches("[]"))
            .unwrap_or("")
    }

    /// Nesting depth: top-level fields have depth 0
    pub fn depth(&self) -> usize {
        self.segments.len().saturating_sub(1)
    }

    /// The field that holds this one, with array markers removed
    ///
    /// `hosts[].name` has parent `hosts`; top-level fields have none.
    pub fn parent(&self) -> Option<FieldPath> {
        if self.segments.len() < 2 {
            return None;
        }
        let mut segments = self.segments[..self.segments.len() - 1].to_vec();
        if let Some(last) = segments.last_mut() {
            let trimmed = last.trim_end_matches("[]").to_string();
            *last = trimmed;
        }
        Some(Self { segments })
    }

    /// Path of the object that holds this field, array markers kept
    ///
    /// `hosts[].name` is held by `hosts[]`.
    pub fn container(&self) -> Option<FieldPath> {
        if self.segments.len() < 2 {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// All ancestors, nearest first
    pub fn ancestors(&self) -> Vec<FieldPath> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(path) = current {
            current = path.parent();
            out.push(path);
        }
        out
    }

    pub fn parse(s: &str) -> Self {
        Self {
            segments: s.split('.').map(str::to_string).collect(),
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}

impl Serialize for FieldPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(FieldPath::parse(&s))
    }
}

/// Field path qualified with the dataset it was observed in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldRef {
    pub dataset: String,
    pub path: FieldPath,
}

impl FieldRef {
    pub fn new(dataset: impl Into<String>, path: FieldPath) -> Self {
        Self {
            dataset: dataset.into(),
            path,
        }
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.dataset, self.path)
    }
}

impl Serialize for FieldRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for FieldRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.rsplit_once(':') {
            Some((dataset, path)) => Ok(FieldRef::new(dataset, FieldPath::parse(path))),
            None => Ok(FieldRef::new("", FieldPath::parse(&s))),
        }
    }
}

/// One parsed record: ordered mapping from top-level field name to raw value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    index: usize,
    fields: IndexMap<String, serde_json::Value>,
    /// Column count of the source row, for delimited inputs
    source_width: Option<usize>,
}

impl RawRecord {
    pub fn new(index: usize, fields: IndexMap<String, serde_json::Value>) -> Self {
        Self {
            index,
            fields,
            source_width: None,
        }
    }

    pub fn with_source_width(mut self, width: usize) -> Self {
        self.source_width = Some(width);
        self
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fields(&self) -> &IndexMap<String, serde_json::Value> {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&serde_json::Value> {
        self.fields.get(name)
    }

    pub fn source_width(&self) -> Option<usize> {
        self.source_width
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Primitive type inferred for a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrimitiveType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    DateTime,
    Null,
    Composite,
}

impl PrimitiveType {
    pub fn is_numeric(self) -> bool {
        matches!(self, PrimitiveType::Integer | PrimitiveType::Float)
    }
}

impl fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Float => "float",
            PrimitiveType::Boolean => "boolean",
            PrimitiveType::Date => "date",
            PrimitiveType::DateTime => "datetime",
            PrimitiveType::Null => "null",
            PrimitiveType::Composite => "composite",
        };
        f.write_str(s)
    }
}

/// Observed cardinality of a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    Single,
    Repeated,
    Optional,
}

/// Occurrence statistics collected while extracting the schema
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStats {
    /// Number of containing objects in which the field was present
    pub occurrences: usize,
    /// Number of containing objects observed for the field's parent
    pub contexts: usize,
    pub null_count: usize,
    pub distinct_count: usize,
}

/// Structural description of one field of a dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaField {
    pub path: FieldPath,
    pub primitive_type: PrimitiveType,
    pub cardinality: Cardinality,
    pub depth: usize,
    /// Values disagreed on type and the field was widened to string
    pub mixed_type: bool,
    /// Nested object or array of objects: candidate nested entity
    pub nested_entity: bool,
    pub stats: FieldStats,
}

impl SchemaField {
    pub fn name(&self) -> &str {
        self.path.leaf()
    }

    pub fn parent(&self) -> Option<FieldPath> {
        self.path.parent()
    }

    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }
}

/// Inferred schema of one dataset, with bounded per-field value samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub dataset: String,
    pub record_count: usize,
    fields: IndexMap<FieldPath, SchemaField>,
    samples: IndexMap<FieldPath, Vec<String>>,
}

impl Schema {
    pub fn new(dataset: impl Into<String>, record_count: usize) -> Self {
        Self {
            dataset: dataset.into(),
            record_count,
            fields: IndexMap::new(),
            samples: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, field: SchemaField, samples: Vec<String>) {
        self.samples.insert(field.path.clone(), samples);
        self.fields.insert(field.path.clone(), field);
    }

    pub fn fields(&self) -> impl Iterator<Item = &SchemaField> {
        self.fields.values()
    }

    pub fn get(&self, path: &FieldPath) -> Option<&SchemaField> {
        self.fields.get(path)
    }

    pub fn samples(&self, path: &FieldPath) -> &[String] {
        self.samples.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Direct children of the given field (or of the root when `None`)
    pub fn children_of(&self, parent: Option<&FieldPath>) -> Vec<&SchemaField> {
        self.fields
            .values()
            .filter(|f| f.parent().as_ref() == parent)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Semantic classification of a schema field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Classification {
    #[serde(alias = "entity")]
    EntityCandidate,
    #[serde(alias = "attribute")]
    AttributeCandidate,
    #[serde(alias = "relationship")]
    RelationshipCandidate,
    #[serde(alias = "unclassified")]
    Unclassified,
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Classification::EntityCandidate => "ENTITY_CANDIDATE",
            Classification::AttributeCandidate => "ATTRIBUTE_CANDIDATE",
            Classification::RelationshipCandidate => "RELATIONSHIP_CANDIDATE",
            Classification::Unclassified => "UNCLASSIFIED",
        };
        f.write_str(s)
    }
}

/// How a lexical or value rule matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Synonym,
    Regex,
    Prefix,
    Suffix,
    ValuePattern,
}

/// A domain rule that contributed to an annotation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleMatch {
    pub concept_id: String,
    pub priority: i32,
    /// Position of the concept in the knowledge base (first registered = 0)
    pub registration_order: usize,
    pub kinds: Vec<MatchKind>,
}

/// Origin of an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnotationSource {
    DomainRule,
    StructuralHeuristic,
    NoMatch,
}

/// Semantic hint attached to a schema field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticAnnotation {
    pub field: FieldPath,
    pub classification: Classification,
    /// Confidence in `[0, 1]`, used as an ordinal
    pub confidence: f64,
    pub rule: Option<RuleMatch>,
    pub source: AnnotationSource,
}

impl SemanticAnnotation {
    pub fn unclassified(field: FieldPath) -> Self {
        Self {
            field,
            classification: Classification::Unclassified,
            confidence: 0.0,
            rule: None,
            source: AnnotationSource::NoMatch,
        }
    }

    pub fn structural(field: FieldPath, classification: Classification, confidence: f64) -> Self {
        Self {
            field,
            classification,
            confidence,
            rule: None,
            source: AnnotationSource::StructuralHeuristic,
        }
    }

    pub fn concept_id(&self) -> Option<&str> {
        self.rule.as_ref().map(|r| r.concept_id.as_str())
    }

    /// Tie-break ordering: confidence, then rule priority, then first registered.
    ///
    /// `Ordering::Greater` means `self` wins over `other`.
    pub fn rank(&self, other: &SemanticAnnotation) -> Ordering {
        let priority = |a: &SemanticAnnotation| a.rule.as_ref().map(|r| r.priority).unwrap_or(i32::MIN);
        let order = |a: &SemanticAnnotation| {
            a.rule
                .as_ref()
                .map(|r| r.registration_order)
                .unwrap_or(usize::MAX)
        };

        self.confidence
            .partial_cmp(&other.confidence)
            .unwrap_or(Ordering::Equal)
            .then_with(|| priority(self).cmp(&priority(other)))
            .then_with(|| order(other).cmp(&order(self)))
    }
}

/// Final destination of a schema field in the ontology model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldDestination {
    /// The field became (part of) the identity of a class
    ClassIdentity { class: String },
    /// The field became a datatype property
    DatatypeProperty { property: String },
    /// The field is the source endpoint of an object property
    ObjectPropertyEndpoint { property: String },
    /// Recorded for audit only
    Residual { reason: String },
}

impl FieldDestination {
    pub fn target(&self) -> Option<&str> {
        match self {
            FieldDestination::ClassIdentity { class } => Some(class),
            FieldDestination::DatatypeProperty { property }
            | FieldDestination::ObjectPropertyEndpoint { property } => Some(property),
            FieldDestination::Residual { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_path_navigation() {
        let hosts = FieldPath::root_field("hosts");
        let name = hosts.element().child("name");
        assert_eq!(name.to_string(), "hosts[].name");
        assert_eq!(name.leaf(), "name");
        assert_eq!(name.depth(), 1);
        assert_eq!(name.parent(), Some(hosts.clone()));
        assert_eq!(name.container(), Some(hosts.element()));
        assert_eq!(hosts.parent(), None);
        assert_eq!(hosts.element().leaf(), "hosts");
    }

    #[test]
    fn test_field_path_ancestors() {
        let path = FieldPath::parse("a.b[].c.d");
        let ancestors: Vec<String> = path.ancestors().iter().map(|p| p.to_string()).collect();
        assert_eq!(ancestors, vec!["a.b[].c", "a.b", "a"]);
    }

    #[test]
    fn test_field_ref_serializes_as_string() {
        let field = FieldRef::new("hosts.json", FieldPath::parse("hosts[].ip"));
        let json = serde_json::to_string(&field).unwrap();
        assert_eq!(json, "\"hosts.json:hosts[].ip\"");
        let back: FieldRef = serde_json::from_str(&json).unwrap();
        assert_eq!(back, field);
    }

    #[test]
    fn test_annotation_rank_tie_break() {
        let rule = |priority, order| RuleMatch {
            concept_id: "c".to_string(),
            priority,
            registration_order: order,
            kinds: vec![MatchKind::Exact],
        };
        let mut a = SemanticAnnotation::unclassified(FieldPath::root_field("x"));
        a.confidence = 0.8;
        a.rule = Some(rule(1, 3));
        let mut b = a.clone();
        b.rule = Some(rule(5, 4));
        assert_eq!(b.rank(&a), Ordering::Greater);

        let mut c = a.clone();
        c.rule = Some(rule(1, 0));
        assert_eq!(c.rank(&a), Ordering::Greater);

        let mut d = a.clone();
        d.confidence = 0.9;
        assert_eq!(d.rank(&b), Ordering::Greater);
    }

    #[test]
    fn test_classification_accepts_short_aliases() {
        let c: Classification = serde_json::from_str("\"entity\"").unwrap();
        assert_eq!(c, Classification::EntityCandidate);
        let c: Classification = serde_json::from_str("\"RELATIONSHIP_CANDIDATE\"").unwrap();
        assert_eq!(c, Classification::RelationshipCandidate);
    }
}
