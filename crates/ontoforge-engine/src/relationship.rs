//! Relationship detection
//!
//! Two sources of object properties: structural nesting recorded during
//! entity identification, and reference fields (RELATIONSHIP_CANDIDATE
//! annotations or the `*_id` naming heuristic). References whose target is
//! not known yet are parked in the fragment and retried once every dataset
//! has been merged.

use crate::attribute::{is_lossy, range_for, UnresolvedOwnerError};
use crate::draft::{ClassKey, DraftRelation, Fragment, PendingReference};
use crate::entity::EntityMap;
use ontoforge_core::{
    class_name, AuditFlag, Classification, FieldRef, RelationOrigin, Schema, SchemaField, SemanticAnnotation,
    Stage,
};
use ontoforge_rules::{normalize_name, Analysis, SemanticAnalyzer};
use tracing::{debug, info, warn};

/// Confidence of the `*_id` naming heuristic
pub const ID_HEURISTIC_CONFIDENCE: f64 = 0.4;

/// Stem of an identifier-like name: `host_id` and `hostId` give `host`
pub fn id_stem(name: &str) -> Option<String> {
    normalize_name(name)
        .strip_suffix("_id")
        .filter(|stem| !stem.is_empty())
        .map(str::to_string)
}

/// True when the relationship detector, not the attribute classifier, owns a field
pub fn is_reference_candidate(field: &SchemaField, best: Option<&SemanticAnnotation>) -> bool {
    if field.nested_entity {
        return false;
    }
    match best.map(|a| a.classification) {
        Some(Classification::RelationshipCandidate) => true,
        Some(Classification::Unclassified) | None => id_stem(field.name()).is_some(),
        Some(_) => false,
    }
}

pub struct RelationshipDetector<'a> {
    analyzer: &'a SemanticAnalyzer,
}

impl<'a> RelationshipDetector<'a> {
    pub fn new(analyzer: &'a SemanticAnalyzer) -> Self {
        Self { analyzer }
    }

    pub fn detect(
        &self,
        schema: &Schema,
        analysis: &Analysis,
        entities: &EntityMap,
        fragment: &mut Fragment,
    ) -> Result<(), UnresolvedOwnerError> {
        let dataset = schema.dataset.as_str();

        for link in &entities.links {
            fragment.relations.push(DraftRelation {
                domain: link.parent.clone(),
                range: link.child.clone(),
                functional: !link.repeated,
                field: link.field.clone(),
                endpoint: false,
                origin: RelationOrigin::Nesting,
                concept: None,
            });
        }

        let mut resolved = 0;
        let mut deferred = 0;
        for field in schema.fields() {
            let best = analysis.best(&field.path);
            if entities.is_entity(&field.path) || !is_reference_candidate(field, best) {
                continue;
            }

            let field_ref = FieldRef::new(dataset, field.path.clone());
            let owner = entities.owner_of(&field.path).clone();
            if !fragment.contains(&owner) {
                return Err(UnresolvedOwnerError {
                    field: field_ref,
                    owner: owner.to_string(),
                });
            }

            let annotation = match best {
                Some(a) if a.classification == Classification::RelationshipCandidate => a.clone(),
                _ => {
                    let structural = SemanticAnnotation::structural(
                        field.path.clone(),
                        Classification::RelationshipCandidate,
                        ID_HEURISTIC_CONFIDENCE,
                    );
                    fragment.log.supersede(
                        Stage::RelationshipDetection,
                        dataset,
                        structural.clone(),
                        "identifier-like field name",
                    );
                    structural
                }
            };

            let concept = annotation.concept_id().map(str::to_string);
            let target_concept = concept
                .as_deref()
                .and_then(|id| self.analyzer.knowledge_base().concept(id))
                .and_then(|c| c.target.clone());
            let stem = id_stem(field.name()).unwrap_or_else(|| normalize_name(field.name()));

            let reference = PendingReference {
                owner,
                field: field_ref,
                stem,
                concept,
                target_concept,
                functional: !field.is_repeated(),
                range: range_for(field.primitive_type),
                lossy: is_lossy(field),
                classification: Classification::RelationshipCandidate,
            };

            if self.names_owner(&reference, fragment) {
                // the class's own identifier, never a self-relationship
                debug!(dataset, field = %field.path, "identifier of its owning class");
                fragment.log.flag(
                    Stage::RelationshipDetection,
                    dataset,
                    Some(field.path.clone()),
                    AuditFlag::UnresolvedReference,
                    format!("'{}' identifies its own class; kept as a datatype property", field.name()),
                );
                fragment.datatypes.push(reference.into_datatype());
                continue;
            }

            match fragment.find_target(reference.target_concept.as_deref(), &reference.stem) {
                Some(target) => {
                    debug!(dataset, field = %field.path, target = %target, "resolved reference");
                    fragment.relations.push(relation_for(reference, target));
                    resolved += 1;
                }
                None => {
                    debug!(dataset, field = %field.path, stem = %reference.stem, "deferring unresolved reference");
                    fragment.pending.push(reference);
                    deferred += 1;
                }
            }
        }

        info!(
            dataset,
            nested = entities.links.len(),
            resolved,
            deferred,
            "relationship detection complete"
        );
        Ok(())
    }

    /// Retry parked references against the merged class set.
    ///
    /// What is still unresolved becomes a flagged datatype property. Returns
    /// the number of references that stayed unresolved.
    pub fn resolve_pending(&self, fragment: &mut Fragment) -> usize {
        let pending = std::mem::take(&mut fragment.pending);
        let mut unresolved = 0;

        for reference in pending {
            match fragment.find_target(reference.target_concept.as_deref(), &reference.stem) {
                Some(target) => {
                    debug!(field = %reference.field, target = %target, "resolved reference after merge");
                    fragment.relations.push(relation_for(reference, target));
                }
                None => {
                    warn!(field = %reference.field, "reference target not found; keeping a flagged datatype property");
                    let dataset = reference.field.dataset.clone();
                    let path = reference.field.path.clone();
                    let message = match &reference.target_concept {
                        Some(target) => format!("no class for target concept '{}'", target),
                        None => format!("no class named after '{}'", reference.stem),
                    };
                    fragment.log.flag(
                        Stage::RelationshipDetection,
                        &dataset,
                        Some(path),
                        AuditFlag::UnresolvedReference,
                        message,
                    );
                    fragment.datatypes.push(reference.into_datatype());
                    unresolved += 1;
                }
            }
        }
        unresolved
    }

    /// A `<stem>_id` field whose stem names the class that owns it
    fn names_owner(&self, reference: &PendingReference, fragment: &Fragment) -> bool {
        if ClassKey::for_name(&reference.stem) == reference.owner {
            return true;
        }
        let Some(owner) = fragment.class(&reference.owner) else {
            return false;
        };
        if class_name(&reference.stem).eq_ignore_ascii_case(&owner.name) {
            return true;
        }
        match (self.analyzer.entity_concept_for_name(&reference.stem), owner.concept.as_deref()) {
            (Some(named), Some(own)) => named.id == own,
            _ => false,
        }
    }
}

fn relation_for(reference: PendingReference, target: ClassKey) -> DraftRelation {
    DraftRelation {
        domain: reference.owner,
        range: target,
        functional: reference.functional,
        field: reference.field,
        endpoint: true,
        origin: RelationOrigin::Reference,
        concept: reference.concept,
    }
}
