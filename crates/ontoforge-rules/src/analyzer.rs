//! Domain-aware semantic analyzer
//!
//! Evaluates every concept of the knowledge base against every schema field.
//! Per-field evaluation is independent and runs on rayon when enabled.

use crate::knowledge::{Concept, KnowledgeBase, KnowledgeBaseError};
use crate::matcher::CompiledConcept;
use indexmap::IndexMap;
use ontoforge_core::{
    AnnotationSource, Classification, FieldPath, RuleMatch, Schema, SchemaField, SemanticAnnotation,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, info};

pub const DEFAULT_MIN_CONFIDENCE: f64 = 0.5;

/// Annotations produced for one schema, best first per field
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub dataset: String,
    annotations: IndexMap<FieldPath, Vec<SemanticAnnotation>>,
}

impl Analysis {
    pub fn annotations(&self, path: &FieldPath) -> &[SemanticAnnotation] {
        self.annotations.get(path).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Winning annotation of a field
    pub fn best(&self, path: &FieldPath) -> Option<&SemanticAnnotation> {
        self.annotations.get(path).and_then(|a| a.first())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldPath, &Vec<SemanticAnnotation>)> {
        self.annotations.iter()
    }

    pub fn unclassified(&self) -> impl Iterator<Item = &FieldPath> {
        self.annotations
            .iter()
            .filter(|(_, a)| a.first().map_or(true, |b| b.classification == Classification::Unclassified))
            .map(|(path, _)| path)
    }

    pub fn len(&self) -> usize {
        self.annotations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.annotations.is_empty()
    }
}

/// Rule engine over a compiled knowledge base
#[derive(Debug, Clone)]
pub struct SemanticAnalyzer {
    knowledge_base: Arc<KnowledgeBase>,
    compiled: Vec<CompiledConcept>,
    min_confidence: f64,
    parallel: bool,
}

impl SemanticAnalyzer {
    pub fn new(knowledge_base: Arc<KnowledgeBase>) -> Result<Self, KnowledgeBaseError> {
        knowledge_base.validate()?;
        let compiled = knowledge_base
            .concepts()
            .iter()
            .enumerate()
            .map(|(order, concept)| CompiledConcept::compile(concept.clone(), order))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            knowledge_base,
            compiled,
            min_confidence: DEFAULT_MIN_CONFIDENCE,
            parallel: true,
        })
    }

    pub fn with_min_confidence(mut self, min_confidence: f64) -> Self {
        self.min_confidence = min_confidence.clamp(0.0, 1.0);
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        &self.knowledge_base
    }

    /// All annotations for one field, best first.
    ///
    /// A field no rule matches gets a single UNCLASSIFIED annotation with
    /// confidence 0; absence of a match is not an error.
    pub fn annotate_field(&self, field: &SchemaField, samples: &[String]) -> Vec<SemanticAnnotation> {
        let mut annotations: Vec<SemanticAnnotation> = self
            .compiled
            .iter()
            .filter_map(|compiled| {
                let m = compiled.evaluate(field.name(), samples)?;
                if m.confidence < self.min_confidence {
                    return None;
                }
                Some(SemanticAnnotation {
                    field: field.path.clone(),
                    classification: compiled.concept.classification,
                    confidence: m.confidence,
                    rule: Some(RuleMatch {
                        concept_id: compiled.concept.id.clone(),
                        priority: compiled.concept.priority,
                        registration_order: compiled.registration_order,
                        kinds: m.kinds,
                    }),
                    source: AnnotationSource::DomainRule,
                })
            })
            .collect();

        if annotations.is_empty() {
            debug!(field = %field.path, "no domain rule matched");
            return vec![SemanticAnnotation::unclassified(field.path.clone())];
        }

        annotations.sort_by(|a, b| b.rank(a));
        if let Some(best) = annotations.first() {
            debug!(
                field = %field.path,
                classification = %best.classification,
                concept = best.concept_id().unwrap_or("-"),
                confidence = best.confidence,
                "annotated field"
            );
        }
        annotations
    }

    /// Annotate every field of a schema
    pub fn analyze(&self, schema: &Schema) -> Analysis {
        let fields: Vec<&SchemaField> = schema.fields().collect();
        let annotate = |field: &&SchemaField| {
            let annotations = self.annotate_field(field, schema.samples(&field.path));
            (field.path.clone(), annotations)
        };

        let annotations: IndexMap<FieldPath, Vec<SemanticAnnotation>> = if self.parallel {
            fields.par_iter().map(annotate).collect::<Vec<_>>().into_iter().collect()
        } else {
            fields.iter().map(annotate).collect()
        };

        let analysis = Analysis {
            dataset: schema.dataset.clone(),
            annotations,
        };
        info!(
            dataset = %schema.dataset,
            fields = analysis.len(),
            unclassified = analysis.unclassified().count(),
            "semantic analysis complete"
        );
        analysis
    }

    /// Best ENTITY concept whose patterns match a name (used for `*_id` stems)
    pub fn entity_concept_for_name(&self, name: &str) -> Option<&Concept> {
        self.compiled
            .iter()
            .filter(|c| c.concept.is_entity())
            .filter_map(|c| c.match_name(name).map(|(score, _)| (score, c)))
            .filter(|(score, _)| *score >= self.min_confidence)
            .max_by(|(sa, a), (sb, b)| {
                sa.partial_cmp(sb)
                    .unwrap_or(Ordering::Equal)
                    .then_with(|| a.concept.priority.cmp(&b.concept.priority))
                    .then_with(|| b.registration_order.cmp(&a.registration_order))
            })
            .map(|(_, c)| &c.concept)
    }
}
