//! # Ontoforge Engine
//!
//! 意味注釈付きスキーマからオントロジーを構築するパイプライン
//! Entity identification, attribute classification, relationship detection,
//! fragment merge and ontology construction, orchestrated per dataset

pub mod attribute;
pub mod config;
pub mod constructor;
pub mod draft;
pub mod entity;
pub mod merge;
pub mod pipeline;
pub mod relationship;
pub mod report;

pub use attribute::{AttributeClassifier, UnresolvedOwnerError};
pub use config::{ConfigError, PipelineConfig, ValidationMode, DEFAULT_BASE_IRI, DEFAULT_ROOT_CLASS};
pub use constructor::{derive_inverse_name, Construction, OntologyConstructor, OntologyValidationError};
pub use draft::{ClassKey, DatasetSummary, Fragment};
pub use entity::{EntityIdentifier, EntityMap, NESTED_ENTITY_CONFIDENCE};
pub use merge::merge_fragments;
pub use pipeline::{CancellationToken, DatasetInput, EngineError, Pipeline, PipelineOutput};
pub use relationship::{RelationshipDetector, ID_HEURISTIC_CONFIDENCE};
pub use report::{DatasetOutcome, PipelineReport, UnresolvedItem};
