//! Pipeline configuration
//!
//! Every field is optional in configuration files and falls back to the
//! default below.

use ontoforge_core::validate_base_iri;
use ontoforge_ingest::{IngestOptions, DEFAULT_MAX_INPUT_BYTES};
use ontoforge_schema::{SchemaExtractor, DEFAULT_MAX_NESTING_DEPTH, DEFAULT_SAMPLE_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub const DEFAULT_BASE_IRI: &str = "http://ontoforge.dev/ontology/generated";
pub const DEFAULT_ROOT_CLASS: &str = "Record";

/// Configuration loading and validation errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for '{field}': {message}")]
    Invalid { field: &'static str, message: String },
}

/// What to do with a model that still violates invariants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Abort the run
    Strict,
    /// Emit the partial model and list the violations in the report
    #[default]
    Lenient,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Distinct sample values kept per field for value-pattern matching
    pub sample_size: usize,
    /// Fraction of delimited rows allowed to differ from the header width
    pub ragged_row_tolerance: f64,
    pub csv_delimiter: Option<char>,
    pub max_input_bytes: usize,
    pub base_iri: String,
    pub min_confidence: f64,
    pub validation_mode: ValidationMode,
    pub parallel: bool,
    pub root_class_fallback: String,
    pub max_nesting_depth: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sample_size: DEFAULT_SAMPLE_SIZE,
            ragged_row_tolerance: 0.0,
            csv_delimiter: None,
            max_input_bytes: DEFAULT_MAX_INPUT_BYTES,
            base_iri: DEFAULT_BASE_IRI.to_string(),
            min_confidence: ontoforge_rules::DEFAULT_MIN_CONFIDENCE,
            validation_mode: ValidationMode::Lenient,
            parallel: true,
            root_class_fallback: DEFAULT_ROOT_CLASS.to_string(),
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        // an empty document is a valid, all-default configuration
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn strict(mut self) -> Self {
        self.validation_mode = ValidationMode::Strict;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_base_iri(&self.base_iri).map_err(|e| ConfigError::Invalid {
            field: "base_iri",
            message: e.to_string(),
        })?;
        if !(0.0..=1.0).contains(&self.ragged_row_tolerance) {
            return Err(ConfigError::Invalid {
                field: "ragged_row_tolerance",
                message: format!("{} is not within [0, 1]", self.ragged_row_tolerance),
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::Invalid {
                field: "min_confidence",
                message: format!("{} is not within [0, 1]", self.min_confidence),
            });
        }
        if self.sample_size == 0 {
            return Err(ConfigError::Invalid {
                field: "sample_size",
                message: "must be at least 1".to_string(),
            });
        }
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "max_nesting_depth",
                message: "must be at least 1".to_string(),
            });
        }
        if let Some(delimiter) = self.csv_delimiter {
            if !delimiter.is_ascii() || delimiter == '"' || delimiter == '\n' {
                return Err(ConfigError::Invalid {
                    field: "csv_delimiter",
                    message: format!("{:?} cannot delimit columns", delimiter),
                });
            }
        }
        if !ontoforge_core::is_valid_local_name(&self.root_class_fallback) {
            return Err(ConfigError::Invalid {
                field: "root_class_fallback",
                message: format!("'{}' is not a valid local name", self.root_class_fallback),
            });
        }
        Ok(())
    }

    pub fn ingest_options(&self) -> IngestOptions {
        IngestOptions {
            max_input_bytes: self.max_input_bytes,
            csv_delimiter: self.csv_delimiter.map(|c| c as u8),
        }
    }

    pub fn schema_extractor(&self) -> SchemaExtractor {
        SchemaExtractor::new()
            .with_sample_size(self.sample_size)
            .with_ragged_row_tolerance(self.ragged_row_tolerance)
            .with_max_nesting_depth(self.max_nesting_depth)
    }
}
