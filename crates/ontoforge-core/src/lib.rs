//! # Ontoforge Core
//!
//! データセットからオントロジーを生成するためのコアデータモデル
//! Records, inferred schemas, semantic annotations, the append-only
//! provenance log and the abstract OWL ontology model.

pub mod model;
pub mod naming;
pub mod ontology;
pub mod provenance;

pub use model::*;
pub use naming::{class_name, is_valid_local_name, property_name, sanitize_local_name, singularize, NamingRegistry};
pub use ontology::*;
pub use provenance::*;

use thiserror::Error;

/// Errors raised while assembling an ontology model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Duplicate local name: {0}")]
    DuplicateName(String),

    #[error("Invalid local name: {0}")]
    InvalidLocalName(String),

    #[error("Field already mapped to a different destination: {0}")]
    FieldAlreadyMapped(String),

    #[error("Invalid base IRI '{iri}': {message}")]
    InvalidIri { iri: String, message: String },
}

/// Validate that `iri` is an absolute IRI usable as an ontology namespace
pub fn validate_base_iri(iri: &str) -> Result<(), ModelError> {
    iri_string::types::IriStr::new(iri)
        .map(|_| ())
        .map_err(|e| ModelError::InvalidIri {
            iri: iri.to_string(),
            message: e.to_string(),
        })
}
