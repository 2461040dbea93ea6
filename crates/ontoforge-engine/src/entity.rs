//! Entity identification
//!
//! Promotes ENTITY_CANDIDATE fields and nested-object fields to class
//! candidates, and synthesizes the class that owns a dataset's root fields.

use crate::draft::{ClassKey, DraftClass, Fragment};
use crate::relationship::{id_stem, is_reference_candidate};
use ontoforge_core::{
    class_name, AuditFlag, Classification, FieldPath, FieldRef, Schema, SchemaField, SemanticAnnotation, Stage,
};
use ontoforge_ingest::dataset_stem;
use ontoforge_rules::{Analysis, SemanticAnalyzer};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Confidence of the structural "nested object is an entity" heuristic
pub const NESTED_ENTITY_CONFIDENCE: f64 = 0.5;

/// Structural parent/child link between two class candidates
#[derive(Debug, Clone, PartialEq)]
pub struct NestingLink {
    pub parent: ClassKey,
    pub child: ClassKey,
    pub field: FieldRef,
    /// The child came from an array
    pub repeated: bool,
}

/// Entity fields of one dataset and their classes
#[derive(Debug, Clone)]
pub struct EntityMap {
    pub root: ClassKey,
    owners: HashMap<FieldPath, ClassKey>,
    pub links: Vec<NestingLink>,
}

impl EntityMap {
    pub fn new(root: ClassKey) -> Self {
        Self {
            root,
            owners: HashMap::new(),
            links: Vec::new(),
        }
    }

    /// Class a field was promoted to
    pub fn class_of(&self, path: &FieldPath) -> Option<&ClassKey> {
        self.owners.get(path)
    }

    pub fn is_entity(&self, path: &FieldPath) -> bool {
        self.owners.contains_key(path)
    }

    /// Nearest ancestor entity of a field, else the root class
    pub fn owner_of(&self, path: &FieldPath) -> &ClassKey {
        path.ancestors()
            .iter()
            .find_map(|ancestor| self.owners.get(ancestor))
            .unwrap_or(&self.root)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

pub struct EntityIdentifier<'a> {
    analyzer: &'a SemanticAnalyzer,
    root_class_fallback: &'a str,
}

impl<'a> EntityIdentifier<'a> {
    pub fn new(analyzer: &'a SemanticAnalyzer, root_class_fallback: &'a str) -> Self {
        Self {
            analyzer,
            root_class_fallback,
        }
    }

    pub fn identify(&self, schema: &Schema, analysis: &Analysis, fragment: &mut Fragment) -> EntityMap {
        let dataset = schema.dataset.as_str();
        let root = fragment.add_class(Stage::EntityIdentification, self.root_class(schema, analysis));
        let mut map = EntityMap::new(root);

        // parents before children so owners are known when children are visited
        let mut fields: Vec<&SchemaField> = schema.fields().collect();
        fields.sort_by_key(|f| f.depth);

        for field in fields {
            let best = analysis
                .best(&field.path)
                .filter(|a| a.classification == Classification::EntityCandidate);

            if field.nested_entity {
                let annotation = match best {
                    Some(annotation) => annotation.clone(),
                    None => {
                        let structural = SemanticAnnotation::structural(
                            field.path.clone(),
                            Classification::EntityCandidate,
                            NESTED_ENTITY_CONFIDENCE,
                        );
                        fragment.log.supersede(
                            Stage::EntityIdentification,
                            dataset,
                            structural.clone(),
                            "nested object structure",
                        );
                        structural
                    }
                };
                self.promote(dataset, field, &annotation, &mut map, fragment);
                if field.mixed_type {
                    warn!(dataset, field = %field.path, "scalar values beside nested objects are dropped");
                    fragment.log.flag(
                        Stage::EntityIdentification,
                        dataset,
                        Some(field.path.clone()),
                        AuditFlag::LossyMixedType,
                        "scalar values mixed with objects are not represented by the class",
                    );
                }
            } else if let Some(annotation) = best {
                // a scalar naming the class that already owns it is one of its attributes
                let key = ClassKey::for_class(annotation.concept_id(), field.name());
                if &key == map.owner_of(&field.path) {
                    debug!(dataset, field = %field.path, "entity-like field names its own owner");
                    continue;
                }
                self.promote(dataset, field, annotation, &mut map, fragment);
            }
        }

        info!(
            dataset,
            entities = map.len(),
            classes = fragment.classes.len(),
            "entity identification complete"
        );
        map
    }

    /// Class for the records of a dataset.
    ///
    /// The entity concept named by the dataset wins. Otherwise records that
    /// carry a single top-level `<x>_id` reference, where `<x>` is no known
    /// entity, describe `<x>` itself. Failing both, the class is named after
    /// the dataset.
    fn root_class(&self, schema: &Schema, analysis: &Analysis) -> DraftClass {
        let dataset = schema.dataset.as_str();
        let stem = dataset_stem(dataset);
        if let Some(concept) = self.analyzer.entity_concept_for_name(stem) {
            debug!(dataset, concept = %concept.id, "dataset names an entity concept");
            return DraftClass::new(
                ClassKey::Concept(concept.id.clone()),
                class_name(concept.label()),
                concept.label(),
                1.0,
            );
        }

        let name = match self.identified_subject(schema, analysis) {
            Some(subject) => {
                debug!(dataset, subject = %subject, "records carry their own identifier");
                class_name(&subject)
            }
            None => class_name(stem),
        };
        let name = if name == "Unnamed" || name == "unnamed" {
            self.root_class_fallback.to_string()
        } else {
            name
        };
        DraftClass::new(ClassKey::for_name(&name), name.clone(), name, 0.0).synthesized()
    }

    /// Stem of the only top-level identifier reference, when no entity concept claims it
    fn identified_subject(&self, schema: &Schema, analysis: &Analysis) -> Option<String> {
        let mut stems: Vec<String> = schema
            .fields()
            .filter(|f| f.depth == 0 && is_reference_candidate(f, analysis.best(&f.path)))
            .filter_map(|f| id_stem(f.name()))
            .collect();
        stems.sort();
        stems.dedup();
        match stems.as_slice() {
            [stem] if self.analyzer.entity_concept_for_name(stem).is_none() => Some(stem.clone()),
            _ => None,
        }
    }

    fn promote(
        &self,
        dataset: &str,
        field: &SchemaField,
        annotation: &SemanticAnnotation,
        map: &mut EntityMap,
        fragment: &mut Fragment,
    ) {
        let concept = annotation
            .concept_id()
            .and_then(|id| self.analyzer.knowledge_base().concept(id))
            .filter(|c| c.is_entity());
        let (name, label) = match concept {
            Some(c) => (class_name(c.label()), c.label().to_string()),
            None => (class_name(field.name()), field.name().to_string()),
        };
        let key = ClassKey::for_class(concept.map(|c| c.id.as_str()), field.name());
        let field_ref = FieldRef::new(dataset, field.path.clone());
        let parent = map.owner_of(&field.path).clone();

        debug!(dataset, field = %field.path, class = %name, key = %key, "promoted field to class");
        let class = DraftClass::new(key, name, label, annotation.confidence).with_identity(field_ref.clone());
        let key = fragment.add_class(Stage::EntityIdentification, class);

        map.owners.insert(field.path.clone(), key.clone());
        map.links.push(NestingLink {
            parent,
            child: key,
            field: field_ref,
            repeated: field.is_repeated(),
        });
    }
}
