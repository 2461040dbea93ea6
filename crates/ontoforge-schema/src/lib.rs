//! # Ontoforge Schema
//!
//! レコード列からの構造スキーマ推論
//! Infers field paths, primitive types, cardinality and nesting from parsed
//! records, with bounded per-field value samples for rule matching.

pub mod extractor;
pub mod type_inference;

pub use extractor::{SchemaExtractor, SchemaInferenceError, DEFAULT_MAX_NESTING_DEPTH, DEFAULT_SAMPLE_SIZE};
pub use type_inference::{infer_str, infer_value, resolve_types};
