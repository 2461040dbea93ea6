//! Attribute classification
//!
//! Every field that is neither an entity nor a reference becomes a datatype
//! property of its nearest ancestor entity (or of the dataset's root class).

use crate::draft::{DraftDatatype, Fragment};
use crate::entity::EntityMap;
use crate::relationship::is_reference_candidate;
use ontoforge_core::{
    property_name, AuditFlag, Classification, FieldRef, PrimitiveType, Schema, SchemaField, SemanticAnnotation,
    Stage, XsdDatatype,
};
use ontoforge_rules::Analysis;
use thiserror::Error;
use tracing::{debug, info, warn};

/// No class could own a field. Indicates a defect in entity identification.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("No owning class for field '{field}' (expected {owner})")]
pub struct UnresolvedOwnerError {
    pub field: FieldRef,
    pub owner: String,
}

/// XSD range of an inferred primitive type
pub fn range_for(ty: PrimitiveType) -> XsdDatatype {
    match ty {
        PrimitiveType::Integer => XsdDatatype::Integer,
        PrimitiveType::Float => XsdDatatype::Double,
        PrimitiveType::Boolean => XsdDatatype::Boolean,
        PrimitiveType::Date => XsdDatatype::Date,
        PrimitiveType::DateTime => XsdDatatype::DateTime,
        PrimitiveType::String | PrimitiveType::Null | PrimitiveType::Composite => XsdDatatype::String,
    }
}

/// Composite values kept as literals (beyond the nesting limit) lose structure
pub fn is_lossy(field: &SchemaField) -> bool {
    field.mixed_type || (field.primitive_type == PrimitiveType::Composite && !field.nested_entity)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeClassifier;

impl AttributeClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Attach attribute fields to their owners; returns the number of properties added
    pub fn classify(
        &self,
        schema: &Schema,
        analysis: &Analysis,
        entities: &EntityMap,
        fragment: &mut Fragment,
    ) -> Result<usize, UnresolvedOwnerError> {
        let dataset = schema.dataset.as_str();
        let mut added = 0;

        for field in schema.fields() {
            let best = analysis.best(&field.path);
            if entities.is_entity(&field.path) || is_reference_candidate(field, best) {
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

            let classification = match best.map(|a| a.classification) {
                Some(Classification::AttributeCandidate) => Classification::AttributeCandidate,
                Some(Classification::Unclassified) | None => {
                    fragment.log.flag(
                        Stage::AttributeClassification,
                        dataset,
                        Some(field.path.clone()),
                        AuditFlag::UnclassifiedField,
                        "no domain rule matched; kept as a plain attribute",
                    );
                    Classification::Unclassified
                }
                Some(other) => {
                    // an entity-like scalar inside its own class
                    let structural = SemanticAnnotation::structural(
                        field.path.clone(),
                        Classification::AttributeCandidate,
                        best.map_or(0.0, |a| a.confidence),
                    );
                    fragment.log.supersede(
                        Stage::AttributeClassification,
                        dataset,
                        structural,
                        format!("{} field names its owning class", other),
                    );
                    Classification::AttributeCandidate
                }
            };
            let concept = best
                .filter(|a| a.classification == Classification::AttributeCandidate)
                .and_then(|a| a.concept_id())
                .map(str::to_string);

            let lossy = is_lossy(field);
            if lossy {
                warn!(dataset, field = %field.path, "mapping mixed or structured values to xsd:string is lossy");
                fragment.log.flag(
                    Stage::AttributeClassification,
                    dataset,
                    Some(field.path.clone()),
                    AuditFlag::LossyMixedType,
                    format!("{} values widened to xsd:string", field.primitive_type),
                );
            }

            let property = DraftDatatype {
                name: property_name(field.name()),
                owner,
                range: range_for(field.primitive_type),
                functional: !field.is_repeated(),
                field: field_ref,
                classification,
                concept,
                lossy,
                unresolved_reference: false,
            };
            debug!(
                dataset,
                field = %field.path,
                owner = %property.owner,
                range = property.range.local_name(),
                "classified attribute"
            );
            fragment.datatypes.push(property);
            added += 1;
        }

        info!(dataset, attributes = added, "attribute classification complete");
        Ok(added)
    }
}
