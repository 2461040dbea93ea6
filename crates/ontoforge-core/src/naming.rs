//! Local-name sanitisation and the model-wide naming registry

use heck::{ToSnakeCase, ToUpperCamelCase};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use unicode_normalization::UnicodeNormalization;

/// Reduce arbitrary text to an IRI-fragment-safe identifier.
///
/// Output contains only ASCII alphanumerics and `_`, never starts with a
/// digit and is never empty. Accented letters are transliterated to their
/// base letter; everything else becomes `_`.
pub fn sanitize_local_name(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.nfkd() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if c.is_ascii() {
            if !out.ends_with('_') {
                out.push('_');
            }
        }
        // non-ASCII code points (combining marks after NFKD, symbols) are dropped
    }

    let trimmed = out.trim_matches('_');
    let mut name = if trimmed.is_empty() {
        "unnamed".to_string()
    } else {
        trimmed.to_string()
    };

    if name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert(0, '_');
    }
    name
}

/// UpperCamelCase singular class name for a field or dataset name
pub fn class_name(raw: &str) -> String {
    let words = sanitize_local_name(raw).to_snake_case();
    let singular = match words.rsplit_once('_') {
        Some((head, last)) => format!("{}_{}", head, singularize(last)),
        None => singularize(&words),
    };
    sanitize_local_name(&singular.to_upper_camel_case())
}

/// snake_case property name
pub fn property_name(raw: &str) -> String {
    sanitize_local_name(&sanitize_local_name(raw).to_snake_case())
}

/// Best-effort English singular of one lowercase word
pub fn singularize(word: &str) -> String {
    const INVARIANT: &[&str] = &["data", "status", "series", "species", "news", "metadata", "analysis"];
    const IRREGULAR: &[(&str, &str)] = &[
        ("people", "person"),
        ("children", "child"),
        ("indices", "index"),
        ("matrices", "matrix"),
        ("vertices", "vertex"),
        ("addresses", "address"),
        ("aliases", "alias"),
    ];

    let lower = word.to_lowercase();
    if lower.len() <= 2 || INVARIANT.contains(&lower.as_str()) {
        return word.to_string();
    }
    if let Some((_, singular)) = IRREGULAR.iter().find(|(plural, _)| *plural == lower) {
        return singular.to_string();
    }
    if let Some(stem) = lower.strip_suffix("ies") {
        return format!("{}y", stem);
    }
    for suffix in ["sses", "shes", "ches", "xes", "zes"] {
        if lower.ends_with(suffix) {
            return lower[..lower.len() - 2].to_string();
        }
    }
    if lower.ends_with("ss") || lower.ends_with("us") || lower.ends_with("is") {
        return lower;
    }
    match lower.strip_suffix('s') {
        Some(stem) => stem.to_string(),
        None => lower,
    }
}

/// Registry guaranteeing case-insensitive uniqueness of local names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NamingRegistry {
    /// lowercase key -> name as registered
    names: BTreeMap<String, String>,
}

impl NamingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_taken(&self, name: &str) -> bool {
        self.names.contains_key(&name.to_lowercase())
    }

    /// Name registered under the same case-insensitive key, if any
    pub fn existing(&self, name: &str) -> Option<&str> {
        self.names.get(&name.to_lowercase()).map(String::as_str)
    }

    /// Register a name exactly; returns false when it collides
    pub fn try_reserve(&mut self, name: &str) -> bool {
        let key = name.to_lowercase();
        if self.names.contains_key(&key) {
            return false;
        }
        self.names.insert(key, name.to_string());
        true
    }

    /// Register `base`, appending `_<suffix>` and then a counter until unique
    pub fn reserve_unique(&mut self, base: &str, suffix: &str) -> String {
        let base = sanitize_local_name(base);
        if self.try_reserve(&base) {
            return base;
        }

        let suffix = sanitize_local_name(suffix);
        let with_suffix = format!("{}_{}", base, suffix);
        if self.try_reserve(&with_suffix) {
            return with_suffix;
        }

        let mut counter = 2usize;
        loop {
            let candidate = format!("{}_{}", with_suffix, counter);
            if self.try_reserve(&candidate) {
                return candidate;
            }
            counter += 1;
        }
    }

    pub fn release(&mut self, name: &str) {
        self.names.remove(&name.to_lowercase());
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.values().map(String::as_str)
    }
}

/// True when `name` is usable as an identifier fragment as-is
pub fn is_valid_local_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(|c: char| c.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}
