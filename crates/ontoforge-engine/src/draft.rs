//! Per-dataset ontology fragments
//!
//! Entity identification, attribute classification and relationship
//! detection build a [`Fragment`] whose classes are keyed by domain concept
//! (or normalised name when no concept matched), never by final local name.
//! Local names are assigned by the constructor once every fragment has been
//! merged.

use indexmap::IndexMap;
use ontoforge_core::{
    class_name, AuditEvent, Classification, FieldRef, ProvenanceLog, RelationOrigin, Stage, XsdDatatype,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use tracing::debug;

/// Identity of a class across fragments
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum ClassKey {
    /// Knowledge base concept identifier
    Concept(String),
    /// Lowercase class name of a class without a concept
    Name(String),
}

impl ClassKey {
    pub fn for_name(raw: &str) -> Self {
        ClassKey::Name(class_name(raw).to_lowercase())
    }

    pub fn for_class(concept: Option<&str>, raw_name: &str) -> Self {
        match concept {
            Some(id) => ClassKey::Concept(id.to_string()),
            None => Self::for_name(raw_name),
        }
    }

    pub fn concept(&self) -> Option<&str> {
        match self {
            ClassKey::Concept(id) => Some(id),
            ClassKey::Name(_) => None,
        }
    }
}

impl fmt::Display for ClassKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassKey::Concept(id) => write!(f, "concept:{}", id),
            ClassKey::Name(name) => write!(f, "name:{}", name),
        }
    }
}

/// Class candidate before naming
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftClass {
    pub key: ClassKey,
    /// Proposed UpperCamelCase name
    pub name: String,
    pub label: String,
    pub concept: Option<String>,
    /// Confidence of the annotation that proposed the name
    pub confidence: f64,
    /// Fields that became the identity of this class
    pub identity: BTreeSet<FieldRef>,
    /// Created for a dataset root rather than from a field
    pub synthesized: bool,
    /// Names of the candidates folded into this class
    pub aliases: BTreeSet<String>,
}

impl DraftClass {
    pub fn new(key: ClassKey, name: impl Into<String>, label: impl Into<String>, confidence: f64) -> Self {
        Self {
            concept: key.concept().map(str::to_string),
            key,
            name: name.into(),
            label: label.into(),
            confidence,
            identity: BTreeSet::new(),
            synthesized: false,
            aliases: BTreeSet::new(),
        }
    }

    pub fn with_identity(mut self, field: FieldRef) -> Self {
        self.identity.insert(field);
        self
    }

    pub fn synthesized(mut self) -> Self {
        self.synthesized = true;
        self
    }

    /// Fold another candidate with the same key into this one.
    ///
    /// Provenance is unioned and the higher-confidence name is kept; equal
    /// confidence keeps the name seen first.
    pub fn absorb(&mut self, other: DraftClass) {
        self.identity.extend(other.identity);
        self.aliases.extend(other.aliases);
        self.synthesized &= other.synthesized;
        if self.concept.is_none() {
            self.concept = other.concept;
        }

        if other.confidence > self.confidence {
            let previous = std::mem::replace(&mut self.name, other.name);
            self.label = other.label;
            self.confidence = other.confidence;
            self.aliases.insert(previous);
        } else {
            self.aliases.insert(other.name);
        }
        self.aliases.remove(&self.name);
    }
}

/// Datatype property candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftDatatype {
    /// Proposed snake_case name
    pub name: String,
    pub owner: ClassKey,
    pub range: XsdDatatype,
    pub functional: bool,
    pub field: FieldRef,
    pub classification: Classification,
    pub concept: Option<String>,
    pub lossy: bool,
    pub unresolved_reference: bool,
}

/// Object property candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftRelation {
    pub domain: ClassKey,
    pub range: ClassKey,
    pub functional: bool,
    /// Field the relation was derived from
    pub field: FieldRef,
    /// The field is the relation's endpoint (a reference), not a class identity
    pub endpoint: bool,
    pub origin: RelationOrigin,
    /// Relationship concept that matched the field
    pub concept: Option<String>,
}

/// Reference field whose target class is not known yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingReference {
    pub owner: ClassKey,
    pub field: FieldRef,
    /// Field name without its `_id` suffix
    pub stem: String,
    pub concept: Option<String>,
    pub target_concept: Option<String>,
    pub functional: bool,
    pub range: XsdDatatype,
    pub lossy: bool,
    pub classification: Classification,
}

impl PendingReference {
    /// Give up on resolution and keep the field as a flagged datatype property
    pub fn into_datatype(self) -> DraftDatatype {
        DraftDatatype {
            name: ontoforge_core::property_name(self.field.path.leaf()),
            owner: self.owner,
            range: self.range,
            functional: self.functional,
            field: self.field,
            classification: self.classification,
            concept: self.concept,
            lossy: self.lossy,
            unresolved_reference: true,
        }
    }
}

/// Summary of one processed dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub name: String,
    pub format: String,
    pub records: usize,
    pub fields: usize,
}

/// Independent arena of classes and properties built for one dataset
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fragment {
    pub datasets: Vec<DatasetSummary>,
    pub classes: IndexMap<ClassKey, DraftClass>,
    pub datatypes: Vec<DraftDatatype>,
    pub relations: Vec<DraftRelation>,
    pub pending: Vec<PendingReference>,
    /// Every schema field seen, for coverage checks
    pub fields: Vec<FieldRef>,
    pub log: ProvenanceLog,
}

impl Fragment {
    pub fn new(summary: DatasetSummary) -> Self {
        Self {
            datasets: vec![summary],
            ..Self::default()
        }
    }

    /// Name of the (first) dataset of this fragment
    pub fn dataset(&self) -> &str {
        self.datasets.first().map(|d| d.name.as_str()).unwrap_or("")
    }

    pub fn class(&self, key: &ClassKey) -> Option<&DraftClass> {
        self.classes.get(key)
    }

    pub fn contains(&self, key: &ClassKey) -> bool {
        self.classes.contains_key(key)
    }

    /// Insert a class, merging it into an existing class with the same key
    pub fn add_class(&mut self, stage: Stage, class: DraftClass) -> ClassKey {
        let key = class.key.clone();
        let dataset = self.dataset().to_string();
        match self.classes.get_mut(&key) {
            Some(existing) => {
                let merged_name = class.name.clone();
                existing.absorb(class);
                debug!(class = %key, merged = %merged_name, "merged entity candidate");
                let event = AuditEvent::EntityMerged {
                    canonical: existing.name.clone(),
                    merged: vec![merged_name],
                    concept: existing.concept.clone(),
                };
                self.log.append(stage, &dataset, None, event);
            }
            None => {
                self.classes.insert(key.clone(), class);
            }
        }
        key
    }

    /// Class a reference points at: by target concept first, then by name stem
    pub fn find_target(&self, target_concept: Option<&str>, stem: &str) -> Option<ClassKey> {
        if let Some(concept) = target_concept {
            let key = ClassKey::Concept(concept.to_string());
            if self.contains(&key) {
                return Some(key);
            }
        }
        let by_name = ClassKey::for_name(stem);
        if self.contains(&by_name) {
            return Some(by_name);
        }
        let wanted = class_name(stem).to_lowercase();
        self.classes
            .values()
            .find(|c| c.name.to_lowercase() == wanted || c.aliases.iter().any(|a| a.to_lowercase() == wanted))
            .map(|c| c.key.clone())
    }

    /// Fold another fragment into this one
    pub fn absorb(&mut self, other: Fragment) {
        let Fragment {
            datasets,
            classes,
            datatypes,
            relations,
            pending,
            fields,
            log,
        } = other;

        self.log.absorb(log);
        for class in classes.into_values() {
            self.add_class(Stage::FragmentMerge, class);
        }
        self.datasets.extend(datasets);
        self.datatypes.extend(datatypes);
        self.relations.extend(relations);
        self.pending.extend(pending);
        self.fields.extend(fields);
    }
}
