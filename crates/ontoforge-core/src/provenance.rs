//! Provenance and audit trail of automatic decisions
//!
//! The log is append-only: later stages add superseding entries instead of
//! rewriting earlier ones, so every decision stays traceable.

use crate::model::{FieldDestination, FieldPath, SemanticAnnotation};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Pipeline stage that produced an audit entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SchemaExtraction,
    SemanticAnalysis,
    EntityIdentification,
    AttributeClassification,
    RelationshipDetection,
    OntologyConstruction,
    FragmentMerge,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Stage::SchemaExtraction => "schema-extraction",
            Stage::SemanticAnalysis => "semantic-analysis",
            Stage::EntityIdentification => "entity-identification",
            Stage::AttributeClassification => "attribute-classification",
            Stage::RelationshipDetection => "relationship-detection",
            Stage::OntologyConstruction => "ontology-construction",
            Stage::FragmentMerge => "fragment-merge",
        };
        f.write_str(s)
    }
}

/// Flags raised for human review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditFlag {
    UnresolvedReference,
    LossyMixedType,
    AnonymousClass,
    UnclassifiedField,
    ValidationOverride,
}

/// What happened
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    Annotated {
        annotation: SemanticAnnotation,
    },
    Superseded {
        annotation: SemanticAnnotation,
        reason: String,
    },
    EntityMerged {
        canonical: String,
        merged: Vec<String>,
        concept: Option<String>,
    },
    Renamed {
        from: String,
        to: String,
        reason: String,
    },
    Mapped {
        destination: FieldDestination,
    },
    Flagged {
        flag: AuditFlag,
        message: String,
    },
}

/// Audit trail entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub sequence: usize,
    pub stage: Stage,
    pub dataset: String,
    pub field: Option<FieldPath>,
    pub event: AuditEvent,
}

/// Append-only audit log keyed by field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvenanceLog {
    entries: Vec<AuditEntry>,
}

impl ProvenanceLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry and return its sequence number
    pub fn append(
        &mut self,
        stage: Stage,
        dataset: &str,
        field: Option<FieldPath>,
        event: AuditEvent,
    ) -> usize {
        let sequence = self.entries.len();
        self.entries.push(AuditEntry {
            sequence,
            stage,
            dataset: dataset.to_string(),
            field,
            event,
        });
        sequence
    }

    pub fn annotate(&mut self, stage: Stage, dataset: &str, annotation: SemanticAnnotation) -> usize {
        let field = Some(annotation.field.clone());
        self.append(stage, dataset, field, AuditEvent::Annotated { annotation })
    }

    pub fn supersede(
        &mut self,
        stage: Stage,
        dataset: &str,
        annotation: SemanticAnnotation,
        reason: impl Into<String>,
    ) -> usize {
        let field = Some(annotation.field.clone());
        self.append(
            stage,
            dataset,
            field,
            AuditEvent::Superseded {
                annotation,
                reason: reason.into(),
            },
        )
    }

    pub fn flag(
        &mut self,
        stage: Stage,
        dataset: &str,
        field: Option<FieldPath>,
        flag: AuditFlag,
        message: impl Into<String>,
    ) -> usize {
        self.append(
            stage,
            dataset,
            field,
            AuditEvent::Flagged {
                flag,
                message: message.into(),
            },
        )
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn for_field<'a, 'b>(
        &'a self,
        dataset: &'b str,
        field: &'b FieldPath,
    ) -> impl Iterator<Item = &'a AuditEntry> + 'b
    where
        'a: 'b,
    {
        self.entries
            .iter()
            .filter(move |e| e.dataset == dataset && e.field.as_ref() == Some(field))
    }

    /// All annotations recorded for a field, in append order
    pub fn annotations_for<'a>(&'a self, dataset: &str, field: &FieldPath) -> Vec<&'a SemanticAnnotation> {
        self.for_field(dataset, field)
            .filter_map(|e| match &e.event {
                AuditEvent::Annotated { annotation } | AuditEvent::Superseded { annotation, .. } => {
                    Some(annotation)
                }
                _ => None,
            })
            .collect()
    }

    /// The annotation currently in force for a field.
    ///
    /// The latest superseding entry wins; otherwise the best-ranked of the
    /// original annotations.
    pub fn effective_annotation(&self, dataset: &str, field: &FieldPath) -> Option<&SemanticAnnotation> {
        let mut superseding = None;
        let mut best: Option<&SemanticAnnotation> = None;

        for entry in self.for_field(dataset, field) {
            match &entry.event {
                AuditEvent::Superseded { annotation, .. } => superseding = Some(annotation),
                AuditEvent::Annotated { annotation } => {
                    best = match best {
                        Some(current) if current.rank(annotation) != Ordering::Less => Some(current),
                        _ => Some(annotation),
                    };
                }
                _ => {}
            }
        }

        superseding.or(best)
    }

    pub fn flags(&self, flag: AuditFlag) -> impl Iterator<Item = &AuditEntry> {
        self.entries.iter().filter(move |e| {
            matches!(&e.event, AuditEvent::Flagged { flag: f, .. } if *f == flag)
        })
    }

    /// Append every entry of another log, renumbering sequences
    pub fn absorb(&mut self, other: ProvenanceLog) {
        for mut entry in other.entries {
            entry.sequence = self.entries.len();
            self.entries.push(entry);
        }
    }
}
