//! Domain knowledge base
//!
//! Concepts are data, not code: each one carries lexical patterns, value
//! patterns and a target classification, and is evaluated by the generic
//! matcher. Loaded from YAML or JSON.

use ontoforge_core::Classification;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use thiserror::Error;

/// Knowledge base loading and validation errors
#[derive(Error, Debug)]
pub enum KnowledgeBaseError {
    #[error("I/O error reading knowledge base: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML knowledge base: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid JSON knowledge base: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Duplicate concept identifier: {0}")]
    DuplicateConcept(String),

    #[error("{context} references unknown concept '{id}'")]
    UnknownConcept { context: String, id: String },

    #[error("Concept '{concept}' has an invalid pattern '{pattern}': {message}")]
    InvalidPattern {
        concept: String,
        pattern: String,
        message: String,
    },

    #[error("Concept '{concept}': {message}")]
    InvalidConcept { concept: String, message: String },
}

/// Lexical patterns matched against field names
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexicalPatterns {
    pub exact: Vec<String>,
    pub synonyms: Vec<String>,
    pub prefixes: Vec<String>,
    pub suffixes: Vec<String>,
    pub regex: Vec<String>,
}

impl LexicalPatterns {
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
            && self.synonyms.is_empty()
            && self.prefixes.is_empty()
            && self.suffixes.is_empty()
            && self.regex.is_empty()
    }
}

/// A named domain concept
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Concept {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
    pub classification: Classification,
    /// Higher wins confidence ties
    #[serde(default)]
    pub priority: i32,
    /// Superclass concept (ENTITY concepts only)
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub patterns: LexicalPatterns,
    /// Regular expressions matched against sample values
    #[serde(default)]
    pub value_patterns: Vec<String>,
    /// Entity concept a RELATIONSHIP concept points at
    #[serde(default)]
    pub target: Option<String>,
    /// Generate an inverse object property for this relation
    #[serde(default)]
    pub bidirectional: bool,
    #[serde(default)]
    pub inverse_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Concept {
    pub fn new(id: impl Into<String>, classification: Classification) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            classification,
            priority: 0,
            parent: None,
            patterns: LexicalPatterns::default(),
            value_patterns: Vec::new(),
            target: None,
            bidirectional: false,
            inverse_name: None,
            description: None,
        }
    }

    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.id)
    }

    pub fn is_entity(&self) -> bool {
        self.classification == Classification::EntityCandidate
    }
}

/// Explicit inverse declaration between two relation concepts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InverseDeclaration {
    pub relation: String,
    pub inverse: String,
}

/// Configurable set of domain concepts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub concepts: Vec<Concept>,
    /// Groups of mutually exclusive concepts
    #[serde(default)]
    pub disjoint: Vec<Vec<String>>,
    #[serde(default)]
    pub inverses: Vec<InverseDeclaration>,
}

impl KnowledgeBase {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, KnowledgeBaseError> {
        let kb: KnowledgeBase = serde_yaml::from_str(text)?;
        kb.validate()?;
        Ok(kb)
    }

    pub fn from_json_str(text: &str) -> Result<Self, KnowledgeBaseError> {
        let kb: KnowledgeBase = serde_json::from_str(text)?;
        kb.validate()?;
        Ok(kb)
    }

    /// Parse by extension (`json`, `yaml`, `yml`), sniffing content otherwise
    pub fn from_str_with_hint(text: &str, extension: Option<&str>) -> Result<Self, KnowledgeBaseError> {
        match extension.map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::from_json_str(text),
            Some("yaml") | Some("yml") => Self::from_yaml_str(text),
            _ if text.trim_start().starts_with('{') => Self::from_json_str(text),
            _ => Self::from_yaml_str(text),
        }
    }

    pub fn load(path: &Path) -> Result<Self, KnowledgeBaseError> {
        let text = std::fs::read_to_string(path)?;
        let extension = path.extension().and_then(|e| e.to_str());
        let mut kb = Self::from_str_with_hint(&text, extension)?;
        if kb.name.is_empty() {
            kb.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }
        Ok(kb)
    }

    /// Check identifiers, cross references and regular expressions
    pub fn validate(&self) -> Result<(), KnowledgeBaseError> {
        let mut ids = HashSet::new();
        for concept in &self.concepts {
            if concept.id.trim().is_empty() {
                return Err(KnowledgeBaseError::InvalidConcept {
                    concept: concept.id.clone(),
                    message: "empty identifier".to_string(),
                });
            }
            if !ids.insert(concept.id.as_str()) {
                return Err(KnowledgeBaseError::DuplicateConcept(concept.id.clone()));
            }
        }

        let known = |context: String, id: &str| -> Result<(), KnowledgeBaseError> {
            if ids.contains(id) {
                Ok(())
            } else {
                Err(KnowledgeBaseError::UnknownConcept {
                    context,
                    id: id.to_string(),
                })
            }
        };

        for concept in &self.concepts {
            if let Some(parent) = &concept.parent {
                known(format!("parent of '{}'", concept.id), parent)?;
            }
            if let Some(target) = &concept.target {
                known(format!("target of '{}'", concept.id), target)?;
                if concept.classification != Classification::RelationshipCandidate {
                    return Err(KnowledgeBaseError::InvalidConcept {
                        concept: concept.id.clone(),
                        message: "only RELATIONSHIP concepts may declare a target".to_string(),
                    });
                }
            }
            for pattern in concept.patterns.regex.iter().chain(&concept.value_patterns) {
                regex::Regex::new(pattern).map_err(|e| KnowledgeBaseError::InvalidPattern {
                    concept: concept.id.clone(),
                    pattern: pattern.clone(),
                    message: e.to_string(),
                })?;
            }
        }

        for group in &self.disjoint {
            for id in group {
                known("disjointness declaration".to_string(), id)?;
            }
        }
        for declaration in &self.inverses {
            known("inverse declaration".to_string(), &declaration.relation)?;
            known("inverse declaration".to_string(), &declaration.inverse)?;
        }
        Ok(())
    }

    /// Layer `other` on top of this knowledge base.
    ///
    /// Concepts with the same identifier are replaced in place (keeping their
    /// registration order); new concepts are appended.
    pub fn merge(&mut self, other: KnowledgeBase) {
        let positions: HashMap<String, usize> = self
            .concepts
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        for concept in other.concepts {
            match positions.get(&concept.id) {
                Some(&i) => self.concepts[i] = concept,
                None => self.concepts.push(concept),
            }
        }
        for group in other.disjoint {
            if !self.disjoint.contains(&group) {
                self.disjoint.push(group);
            }
        }
        for declaration in other.inverses {
            if !self.inverses.contains(&declaration) {
                self.inverses.push(declaration);
            }
        }
        if self.name.is_empty() {
            self.name = other.name;
        } else if !other.name.is_empty() && other.name != self.name {
            self.name = format!("{}+{}", self.name, other.name);
        }
    }

    pub fn concepts(&self) -> &[Concept] {
        &self.concepts
    }

    pub fn concept(&self, id: &str) -> Option<&Concept> {
        self.concepts.iter().find(|c| c.id == id)
    }

    /// Position of a concept; earlier registration wins final ties
    pub fn registration_order(&self, id: &str) -> Option<usize> {
        self.concepts.iter().position(|c| c.id == id)
    }

    pub fn len(&self) -> usize {
        self.concepts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty()
    }

    pub fn are_disjoint(&self, a: &str, b: &str) -> bool {
        a != b
            && self
                .disjoint
                .iter()
                .any(|group| group.iter().any(|id| id == a) && group.iter().any(|id| id == b))
    }

    /// All disjoint concept pairs, each once, in declaration order
    pub fn disjoint_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::new();
        for group in &self.disjoint {
            for (i, a) in group.iter().enumerate() {
                for b in &group[i + 1..] {
                    let pair = if a <= b { (a.as_str(), b.as_str()) } else { (b.as_str(), a.as_str()) };
                    if a != b && !pairs.contains(&pair) {
                        pairs.push(pair);
                    }
                }
            }
        }
        pairs
    }

    /// Inverse relation concept declared for `relation`, in either direction
    pub fn declared_inverse(&self, relation: &str) -> Option<&str> {
        self.inverses.iter().find_map(|d| {
            if d.relation == relation {
                Some(d.inverse.as_str())
            } else if d.inverse == relation {
                Some(d.relation.as_str())
            } else {
                None
            }
        })
    }

    /// True when the concept should get an inverse property
    pub fn is_bidirectional(&self, relation: &str) -> bool {
        self.concept(relation).map_or(false, |c| c.bidirectional) || self.declared_inverse(relation).is_some()
    }

    /// Superclass chain of a concept, nearest first; stops at a repeated id
    pub fn ancestors(&self, id: &str) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self.concept(id).and_then(|c| c.parent.as_deref());
        while let Some(parent) = current {
            if parent == id || chain.contains(&parent) {
                break;
            }
            chain.push(parent);
            current = self.concept(parent).and_then(|c| c.parent.as_deref());
        }
        chain
    }
}
