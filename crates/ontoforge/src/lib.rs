//! # Ontoforge - Dataset to OWL Ontology Generator
//!
//! JSON / CSV データセットからドメイン知識ベースを用いて OWL オントロジーを生成する
//!
//! Ontoforge ingests heterogeneous datasets, infers their structure, matches
//! every field against a curated knowledge base and constructs a validated
//! OWL ontology of classes, properties and relationships.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ontoforge::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let inputs = vec![
//!         DatasetInput::new("events.json", r#"[{"event_id": "e-1", "host_id": "h-1"}]"#),
//!         DatasetInput::new("hosts.csv", "host_id,hostname\nh-1,web01\n"),
//!     ];
//!     let generated = ontoforge::generate_owl(&inputs, PipelineConfig::default())?;
//!
//!     println!("{}", generated.output.report.to_text());
//!     std::fs::write("soc.owl", generated.owl)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`ontoforge-core`**: Records, schema, annotations, ontology model and provenance log
//! - **`ontoforge-ingest`**: Format detection and JSON / JSON Lines / CSV parsing
//! - **`ontoforge-schema`**: Schema inference
//! - **`ontoforge-rules`**: Knowledge base and semantic analysis
//! - **`ontoforge-domain-cyber`**: Built-in cyber security knowledge base
//! - **`ontoforge-engine`**: Entity, attribute and relationship detection, ontology construction, pipeline
//! - **`ontoforge-owl`**: RDF/XML serialization
//! - **`ontoforge-cli`**: Command-line interface
//!
//! ## Feature Flags
//!
//! - `full` (default): All crates included
//! - `core`, `ingest`, `schema`, `rules`, `cyber`, `engine`, `owl`, `cli`

#[cfg(feature = "ontoforge-core")]
pub use ontoforge_core as core;

#[cfg(feature = "ontoforge-ingest")]
pub use ontoforge_ingest as ingest;

#[cfg(feature = "ontoforge-schema")]
pub use ontoforge_schema as schema;

#[cfg(feature = "ontoforge-rules")]
pub use ontoforge_rules as rules;

#[cfg(feature = "ontoforge-domain-cyber")]
pub use ontoforge_domain_cyber as domain_cyber;

#[cfg(feature = "ontoforge-engine")]
pub use ontoforge_engine as engine;

#[cfg(feature = "ontoforge-owl")]
pub use ontoforge_owl as owl;

#[cfg(feature = "ontoforge-cli")]
pub use ontoforge_cli as cli;

// Commonly used external dependencies
pub use anyhow;
pub use serde;
pub use serde_json;

/// Prelude module for convenient imports
///
/// ```rust
/// use ontoforge::prelude::*;
/// ```
pub mod prelude {
    #[cfg(feature = "ontoforge-core")]
    pub use ontoforge_core::{
        Axiom, Classification, DatatypeProperty, FieldPath, ObjectProperty, OntologyClass, OntologyModel,
        ProvenanceLog, Schema, SchemaField, SemanticAnnotation, XsdDatatype,
    };

    #[cfg(feature = "ontoforge-ingest")]
    pub use ontoforge_ingest::{ingest, DataFormat, IngestOptions, ParsedDataset};

    #[cfg(feature = "ontoforge-schema")]
    pub use ontoforge_schema::SchemaExtractor;

    #[cfg(feature = "ontoforge-rules")]
    pub use ontoforge_rules::{Concept, KnowledgeBase, SemanticAnalyzer};

    #[cfg(feature = "ontoforge-engine")]
    pub use ontoforge_engine::{
        DatasetInput, EngineError, Pipeline, PipelineConfig, PipelineOutput, PipelineReport, ValidationMode,
    };

    #[cfg(feature = "ontoforge-owl")]
    pub use ontoforge_owl::{parse as parse_owl, serialize as serialize_owl};

    pub use anyhow::Result;
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::Value;
}

#[cfg(feature = "ontoforge-domain-cyber")]
pub mod cyber {
    //! Cyber security knowledge base
    pub use ontoforge_domain_cyber::*;
}

/// Current version of Ontoforge
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(all(
    feature = "ontoforge-engine",
    feature = "ontoforge-owl",
    feature = "ontoforge-rules",
    feature = "ontoforge-domain-cyber"
))]
mod generate {
    use ontoforge_engine::{DatasetInput, EngineError, Pipeline, PipelineConfig, PipelineOutput};
    use ontoforge_owl::OwlError;
    use ontoforge_rules::KnowledgeBaseError;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum GenerateError {
        #[error(transparent)]
        KnowledgeBase(#[from] KnowledgeBaseError),

        #[error(transparent)]
        Engine(#[from] EngineError),

        #[error("Serialization failed: {0}")]
        Owl(#[from] OwlError),
    }

    /// Pipeline output together with its RDF/XML rendering
    #[derive(Debug, Clone)]
    pub struct GeneratedOntology {
        pub output: PipelineOutput,
        pub owl: String,
    }

    /// Run the pipeline with the built-in cyber knowledge base and serialize the model
    pub fn generate_owl(inputs: &[DatasetInput], config: PipelineConfig) -> Result<GeneratedOntology, GenerateError> {
        let kb = ontoforge_domain_cyber::shared_knowledge_base()?;
        let output = Pipeline::new(config, kb)?.run(inputs)?;
        let owl = ontoforge_owl::serialize(&output.model)?;
        Ok(GeneratedOntology { output, owl })
    }
}

#[cfg(all(
    feature = "ontoforge-engine",
    feature = "ontoforge-owl",
    feature = "ontoforge-rules",
    feature = "ontoforge-domain-cyber"
))]
pub use generate::{generate_owl, GenerateError, GeneratedOntology};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constant() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.chars().all(|c| c.is_ascii_digit() || c == '.'));
    }

    #[cfg(feature = "full")]
    #[test]
    fn test_generate_owl_with_builtin_knowledge_base() {
        use prelude::*;

        let inputs = vec![DatasetInput::new("hosts.csv", "host_id,hostname,os\nh-1,web01,linux\n")];
        let generated = generate_owl(&inputs, PipelineConfig::default()).unwrap();

        assert!(generated.output.model.class("Host").is_some());
        let document = parse_owl(&generated.owl).unwrap();
        assert_eq!(document.classes.len(), generated.output.model.class_count());
    }

    #[cfg(feature = "full")]
    #[test]
    fn test_generate_owl_propagates_dataset_errors() {
        use prelude::*;

        let inputs = vec![DatasetInput::new("empty.json", "[]")];
        assert!(matches!(
            generate_owl(&inputs, PipelineConfig::default()),
            Err(GenerateError::Engine(_))
        ));
    }
}
