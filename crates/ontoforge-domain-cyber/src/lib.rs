//! # Ontoforge Cyber Domain
//!
//! サイバーセキュリティ領域の組み込み知識ベース
//! Assets, hosts, vulnerabilities, security events, users, processes,
//! network connections and software, with their reference fields and
//! common attributes. Shipped as embedded YAML so new domains can be added
//! as data without code changes.

use lazy_static::lazy_static;
use ontoforge_rules::{KnowledgeBase, KnowledgeBaseError};
use std::sync::Arc;

/// Source of the built-in knowledge base
pub const CYBER_KNOWLEDGE_BASE_YAML: &str = include_str!("../data/cyber.yaml");

lazy_static! {
    static ref SHARED: Result<Arc<KnowledgeBase>, String> = KnowledgeBase::from_yaml_str(CYBER_KNOWLEDGE_BASE_YAML)
        .map(Arc::new)
        .map_err(|e| e.to_string());
}

/// Parse a fresh copy of the built-in knowledge base
pub fn knowledge_base() -> Result<KnowledgeBase, KnowledgeBaseError> {
    let kb = KnowledgeBase::from_yaml_str(CYBER_KNOWLEDGE_BASE_YAML)?;
    tracing::debug!(concepts = kb.len(), "loaded built-in cyber knowledge base");
    Ok(kb)
}

/// Process-wide shared copy of the built-in knowledge base
pub fn shared_knowledge_base() -> Result<Arc<KnowledgeBase>, KnowledgeBaseError> {
    (*SHARED).clone().map_err(|message| KnowledgeBaseError::InvalidConcept {
        concept: "cyber".to_string(),
        message,
    })
}

/// Built-in knowledge base with an optional user knowledge base layered on top
pub fn with_overlay(overlay: Option<KnowledgeBase>) -> Result<KnowledgeBase, KnowledgeBaseError> {
    let mut kb = knowledge_base()?;
    if let Some(overlay) = overlay {
        kb.merge(overlay);
        kb.validate()?;
    }
    Ok(kb)
}
