//! Compiled concept matchers and confidence scoring
//!
//! Confidence is the maximum over lexical matches (exact 1.0, synonym 0.9,
//! regex 0.8, prefix/suffix 0.7), plus 0.1 when the value patterns match
//! at least 80% of the samples. A match on values alone scores
//! `0.6 * matched fraction`.

use crate::knowledge::{Concept, KnowledgeBaseError};
use heck::ToSnakeCase;
use ontoforge_core::MatchKind;
use regex::{Regex, RegexBuilder};
use std::collections::HashSet;

pub const EXACT_SCORE: f64 = 1.0;
pub const SYNONYM_SCORE: f64 = 0.9;
pub const REGEX_SCORE: f64 = 0.8;
pub const AFFIX_SCORE: f64 = 0.7;
pub const VALUE_BONUS: f64 = 0.1;
pub const VALUE_BONUS_THRESHOLD: f64 = 0.8;
pub const VALUE_ONLY_WEIGHT: f64 = 0.6;

/// Canonical form used for name comparisons: snake_case, lowercase
pub fn normalize_name(name: &str) -> String {
    name.trim().to_snake_case().to_lowercase()
}

/// Outcome of evaluating one concept against one field
#[derive(Debug, Clone, PartialEq)]
pub struct ConceptMatch {
    pub confidence: f64,
    pub kinds: Vec<MatchKind>,
}

/// A concept with its patterns compiled
#[derive(Debug, Clone)]
pub struct CompiledConcept {
    pub concept: Concept,
    pub registration_order: usize,
    exact: HashSet<String>,
    synonyms: HashSet<String>,
    prefixes: Vec<String>,
    suffixes: Vec<String>,
    regexes: Vec<Regex>,
    value_regexes: Vec<Regex>,
}

fn compile(concept: &Concept, pattern: &str) -> Result<Regex, KnowledgeBaseError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| KnowledgeBaseError::InvalidPattern {
            concept: concept.id.clone(),
            pattern: pattern.to_string(),
            message: e.to_string(),
        })
}

impl CompiledConcept {
    pub fn compile(concept: Concept, registration_order: usize) -> Result<Self, KnowledgeBaseError> {
        let patterns = &concept.patterns;
        let regexes = patterns
            .regex
            .iter()
            .map(|p| compile(&concept, p))
            .collect::<Result<Vec<_>, _>>()?;
        let value_regexes = concept
            .value_patterns
            .iter()
            .map(|p| compile(&concept, p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            exact: patterns.exact.iter().map(|s| normalize_name(s)).collect(),
            synonyms: patterns.synonyms.iter().map(|s| normalize_name(s)).collect(),
            prefixes: patterns.prefixes.iter().map(|s| s.trim().to_lowercase()).collect(),
            suffixes: patterns.suffixes.iter().map(|s| s.trim().to_lowercase()).collect(),
            regexes,
            value_regexes,
            registration_order,
            concept,
        })
    }

    pub fn id(&self) -> &str {
        &self.concept.id
    }

    /// Best lexical match of a field name
    pub fn match_name(&self, name: &str) -> Option<(f64, MatchKind)> {
        let normalized = normalize_name(name);
        if normalized.is_empty() {
            return None;
        }
        // the concept identifier itself counts as an exact name
        if self.exact.contains(&normalized) || normalize_name(&self.concept.id) == normalized {
            return Some((EXACT_SCORE, MatchKind::Exact));
        }
        if self.synonyms.contains(&normalized) {
            return Some((SYNONYM_SCORE, MatchKind::Synonym));
        }
        if self.regexes.iter().any(|r| r.is_match(&normalized) || r.is_match(name)) {
            return Some((REGEX_SCORE, MatchKind::Regex));
        }
        if self.prefixes.iter().any(|p| normalized.starts_with(p.as_str()) && normalized != *p) {
            return Some((AFFIX_SCORE, MatchKind::Prefix));
        }
        if self.suffixes.iter().any(|s| normalized.ends_with(s.as_str()) && normalized != *s) {
            return Some((AFFIX_SCORE, MatchKind::Suffix));
        }
        None
    }

    /// Fraction of samples matched by any value pattern
    pub fn value_fraction(&self, samples: &[String]) -> Option<f64> {
        if self.value_regexes.is_empty() || samples.is_empty() {
            return None;
        }
        let matched = samples
            .iter()
            .filter(|s| self.value_regexes.iter().any(|r| r.is_match(s.trim())))
            .count();
        Some(matched as f64 / samples.len() as f64)
    }

    /// Evaluate the concept against a field; pure in (name, samples, concept)
    pub fn evaluate(&self, name: &str, samples: &[String]) -> Option<ConceptMatch> {
        let lexical = self.match_name(name);
        let fraction = self.value_fraction(samples).unwrap_or(0.0);

        match lexical {
            Some((score, kind)) => {
                let mut kinds = vec![kind];
                let mut confidence = score;
                if fraction >= VALUE_BONUS_THRESHOLD {
                    confidence = (confidence + VALUE_BONUS).min(1.0);
                    kinds.push(MatchKind::ValuePattern);
                }
                Some(ConceptMatch { confidence, kinds })
            }
            None if fraction > 0.0 => Some(ConceptMatch {
                confidence: VALUE_ONLY_WEIGHT * fraction,
                kinds: vec![MatchKind::ValuePattern],
            }),
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::LexicalPatterns;
    use ontoforge_core::Classification;

    fn ip_concept() -> CompiledConcept {
        let mut concept = Concept::new("ip_address", Classification::AttributeCandidate);
        concept.patterns = LexicalPatterns {
            exact: vec!["ip".into(), "IPAddress".into()],
            synonyms: vec!["addr".into()],
            prefixes: vec!["ip_".into()],
            suffixes: vec!["_ip".into()],
            regex: vec![r"^ipv[46]".into()],
        };
        concept.value_patterns = vec![r"^\d{1,3}(\.\d{1,3}){3}$".into()];
        CompiledConcept::compile(concept, 0).unwrap()
    }

    fn samples(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_normalize_name() {
        assert_eq!(normalize_name("HostName"), "host_name");
        assert_eq!(normalize_name("host-name"), "host_name");
        assert_eq!(normalize_name("IPAddress"), "ip_address");
    }

    #[test]
    fn test_lexical_scores() {
        let c = ip_concept();
        assert_eq!(c.match_name("IP"), Some((EXACT_SCORE, MatchKind::Exact)));
        assert_eq!(c.match_name("ip_address"), Some((EXACT_SCORE, MatchKind::Exact)));
        assert_eq!(c.match_name("addr"), Some((SYNONYM_SCORE, MatchKind::Synonym)));
        assert_eq!(c.match_name("ipv4"), Some((REGEX_SCORE, MatchKind::Regex)));
        assert_eq!(c.match_name("ip_src"), Some((AFFIX_SCORE, MatchKind::Prefix)));
        assert_eq!(c.match_name("source_ip"), Some((AFFIX_SCORE, MatchKind::Suffix)));
        assert_eq!(c.match_name("hostname"), None);
    }

    #[test]
    fn test_value_bonus_and_value_only() {
        let c = ip_concept();
        let ips = samples(&["10.0.0.1", "192.168.1.1", "8.8.8.8", "1.1.1.1", "oops"]);

        let m = c.evaluate("source_ip", &ips).unwrap();
        assert!((m.confidence - 0.8).abs() < 1e-9);
        assert_eq!(m.kinds, vec![MatchKind::Suffix, MatchKind::ValuePattern]);

        let m = c.evaluate("peer", &ips).unwrap();
        assert!((m.confidence - 0.48).abs() < 1e-9);
        assert_eq!(m.kinds, vec![MatchKind::ValuePattern]);

        assert!(c.evaluate("peer", &samples(&["x"])).is_none());
        let m = c.evaluate("ip", &ips).unwrap();
        assert!((m.confidence - 1.0).abs() < 1e-9);
    }
}
