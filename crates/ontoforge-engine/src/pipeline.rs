//! Pipeline orchestration
//!
//! Each dataset is turned into a private [`Fragment`] (stages 1 to 7, in
//! parallel across datasets when enabled); the fragments are merged,
//! pending references are retried and the ontology is constructed once on
//! the union.

use crate::attribute::{AttributeClassifier, UnresolvedOwnerError};
use crate::config::{ConfigError, PipelineConfig, ValidationMode};
use crate::constructor::{Construction, OntologyConstructor, OntologyValidationError};
use crate::draft::{DatasetSummary, Fragment};
use crate::entity::EntityIdentifier;
use crate::merge::merge_fragments;
use crate::relationship::RelationshipDetector;
use crate::report::{PipelineReport, RunInfo};
use ontoforge_core::{AuditFlag, FieldRef, ModelError, OntologyModel, ProvenanceLog, Stage};
use ontoforge_ingest::{ingest, IngestError};
use ontoforge_rules::{KnowledgeBase, KnowledgeBaseError, SemanticAnalyzer};
use ontoforge_schema::{SchemaExtractor, SchemaInferenceError};
use rayon::prelude::*;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Pipeline errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Knowledge base error: {0}")]
    KnowledgeBase(#[from] KnowledgeBaseError),

    #[error("Failed to read dataset '{dataset}': {source}")]
    Ingest {
        dataset: String,
        #[source]
        source: IngestError,
    },

    #[error("Schema inference failed: {0}")]
    Schema(#[from] SchemaInferenceError),

    #[error("Entity identification defect: {0}")]
    UnresolvedOwner(#[from] UnresolvedOwnerError),

    #[error("{0}")]
    Validation(#[from] OntologyValidationError),

    #[error("Model construction failed: {0}")]
    Model(#[from] ModelError),

    #[error("Run cancelled before {stage}")]
    Cancelled { stage: Stage },

    #[error("No input datasets")]
    NoInput,

    #[error("All {} dataset(s) failed: {}", .failures.len(), .failures.join("; "))]
    AllDatasetsFailed { failures: Vec<String> },
}

impl EngineError {
    /// Errors confined to one dataset; other datasets of the run continue
    pub fn is_dataset_local(&self) -> bool {
        matches!(self, EngineError::Ingest { .. } | EngineError::Schema(_))
    }
}

/// Cooperative cancellation flag, checked only between stages
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// One dataset to process: a name (file name or label) and its raw bytes
#[derive(Debug, Clone)]
pub struct DatasetInput {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl DatasetInput {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file; the dataset is named after the file name
    pub fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { name, bytes })
    }
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub model: OntologyModel,
    pub report: PipelineReport,
    pub log: ProvenanceLog,
}

pub struct Pipeline {
    config: PipelineConfig,
    analyzer: SemanticAnalyzer,
    extractor: SchemaExtractor,
    cancellation: CancellationToken,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, knowledge_base: Arc<KnowledgeBase>) -> Result<Self, EngineError> {
        config.validate()?;
        let analyzer = SemanticAnalyzer::new(knowledge_base)?
            .with_min_confidence(config.min_confidence)
            .with_parallel(config.parallel);
        let extractor = config.schema_extractor();
        Ok(Self {
            config,
            analyzer,
            extractor,
            cancellation: CancellationToken::new(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn knowledge_base(&self) -> &KnowledgeBase {
        self.analyzer.knowledge_base()
    }

    fn checkpoint(&self, next: Stage) -> Result<(), EngineError> {
        if self.cancellation.is_cancelled() {
            warn!(stage = %next, "run cancelled");
            return Err(EngineError::Cancelled { stage: next });
        }
        Ok(())
    }

    /// Stages 1 to 7 for one dataset
    pub fn build_fragment(&self, input: &DatasetInput) -> Result<Fragment, EngineError> {
        let started = Instant::now();
        self.checkpoint(Stage::SchemaExtraction)?;

        let parsed = ingest(&input.name, &input.bytes, &self.config.ingest_options()).map_err(|source| {
            EngineError::Ingest {
                dataset: input.name.clone(),
                source,
            }
        })?;
        let header_width = parsed.columns.as_ref().map(Vec::len);
        let schema = self.extractor.extract(&parsed.name, &parsed.records, header_width)?;
        let dataset = schema.dataset.clone();

        self.checkpoint(Stage::SemanticAnalysis)?;
        let analysis = self.analyzer.analyze(&schema);

        let mut fragment = Fragment::new(DatasetSummary {
            name: dataset.clone(),
            format: parsed.format.to_string(),
            records: parsed.record_count(),
            fields: schema.len(),
        });
        for (_, annotations) in analysis.iter() {
            for annotation in annotations {
                fragment
                    .log
                    .annotate(Stage::SemanticAnalysis, &dataset, annotation.clone());
            }
        }
        fragment.fields = schema
            .fields()
            .map(|f| FieldRef::new(dataset.as_str(), f.path.clone()))
            .collect();

        self.checkpoint(Stage::EntityIdentification)?;
        let entities = EntityIdentifier::new(&self.analyzer, &self.config.root_class_fallback).identify(
            &schema,
            &analysis,
            &mut fragment,
        );

        self.checkpoint(Stage::AttributeClassification)?;
        AttributeClassifier::new().classify(&schema, &analysis, &entities, &mut fragment)?;

        self.checkpoint(Stage::RelationshipDetection)?;
        RelationshipDetector::new(&self.analyzer).detect(&schema, &analysis, &entities, &mut fragment)?;

        debug!(
            dataset = %dataset,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "fragment built"
        );
        Ok(fragment)
    }

    /// Run the whole pipeline over one dataset
    pub fn run_one(&self, name: &str, bytes: &[u8]) -> Result<PipelineOutput, EngineError> {
        self.run(&[DatasetInput::new(name, bytes)])
    }

    /// Run the whole pipeline over several datasets and merge the results.
    ///
    /// Input and schema errors are confined to their dataset and listed in
    /// the report; the run fails only when no dataset survives. A single
    /// failing dataset propagates its own error.
    pub fn run(&self, inputs: &[DatasetInput]) -> Result<PipelineOutput, EngineError> {
        if inputs.is_empty() {
            return Err(EngineError::NoInput);
        }
        let run = RunInfo::start(self.knowledge_base().name.clone(), self.config.validation_mode);
        info!(run_id = %run.run_id, datasets = inputs.len(), "pipeline started");

        let results: Vec<(String, Result<Fragment, EngineError>)> = if self.config.parallel && inputs.len() > 1 {
            inputs
                .par_iter()
                .map(|input| (input.name.clone(), self.build_fragment(input)))
                .collect()
        } else {
            inputs
                .iter()
                .map(|input| (input.name.clone(), self.build_fragment(input)))
                .collect()
        };

        let mut fragments = Vec::new();
        let mut failures: Vec<(String, EngineError)> = Vec::new();
        for (name, result) in results {
            match result {
                Ok(fragment) => fragments.push(fragment),
                Err(err) if err.is_dataset_local() => {
                    error!(dataset = %name, error = %err, "dataset failed");
                    failures.push((name, err));
                }
                Err(err) => return Err(err),
            }
        }

        if fragments.is_empty() {
            if failures.len() == 1 {
                if let Some((_, err)) = failures.pop() {
                    return Err(err);
                }
            }
            return Err(EngineError::AllDatasetsFailed {
                failures: failures
                    .iter()
                    .map(|(name, err)| format!("{}: {}", name, err))
                    .collect(),
            });
        }

        self.checkpoint(Stage::FragmentMerge)?;
        let mut merged = merge_fragments(fragments).ok_or(EngineError::NoInput)?;
        let unresolved = RelationshipDetector::new(&self.analyzer).resolve_pending(&mut merged);
        debug!(unresolved, "pending references retried");

        self.checkpoint(Stage::OntologyConstruction)?;
        let Construction {
            result,
            mut log,
            datasets,
        } = OntologyConstructor::new(self.knowledge_base(), &self.config.base_iri).construct(merged)?;

        let model = match result {
            Ok(model) => model,
            Err(err) => match self.config.validation_mode {
                ValidationMode::Strict => {
                    error!(violations = err.violations.len(), "model rejected in strict mode");
                    return Err(EngineError::Validation(err));
                }
                ValidationMode::Lenient => {
                    for violation in &err.violations {
                        warn!(%violation, "emitting partial model despite violation");
                        log.flag(
                            Stage::OntologyConstruction,
                            "",
                            None,
                            AuditFlag::ValidationOverride,
                            violation.to_string(),
                        );
                    }
                    *err.model
                }
            },
        };

        let failures = failures
            .into_iter()
            .map(|(name, err)| (name, err.to_string()))
            .collect();
        let report = PipelineReport::build(run, &model, &log, datasets, failures);
        info!(
            run_id = %report.run_id,
            classes = report.classes.len(),
            datatype_properties = report.datatype_property_count,
            object_properties = report.object_property_count,
            unresolved = report.unresolved.len(),
            partial = report.partial,
            "pipeline finished"
        );
        Ok(PipelineOutput { model, report, log })
    }
}
