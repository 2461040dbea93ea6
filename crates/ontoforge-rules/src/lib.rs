//! # Ontoforge Rules
//!
//! ドメイン知識ベースとルールベースの意味解析
//! Domain knowledge base (concepts as data), compiled lexical and value
//! matchers, and the semantic analyzer that annotates schema fields.

pub mod analyzer;
pub mod knowledge;
pub mod matcher;

pub use analyzer::{Analysis, SemanticAnalyzer, DEFAULT_MIN_CONFIDENCE};
pub use knowledge::{Concept, InverseDeclaration, KnowledgeBase, KnowledgeBaseError, LexicalPatterns};
pub use matcher::{normalize_name, CompiledConcept, ConceptMatch};
