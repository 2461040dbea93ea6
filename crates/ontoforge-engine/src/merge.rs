//! Cross-fragment merge
//!
//! Fragments built concurrently are reduced in dataset-name order, so the
//! merged result does not depend on which dataset finished first. Classes
//! are unified by concept key; naming and invariants are reapplied by the
//! constructor on the union.

use crate::draft::Fragment;
use tracing::info;

/// Deterministic reduction of fragments; `None` when there are none
pub fn merge_fragments(mut fragments: Vec<Fragment>) -> Option<Fragment> {
    fragments.sort_by(|a, b| a.dataset().cmp(b.dataset()));
    let count = fragments.len();

    let mut iter = fragments.into_iter();
    let mut merged = iter.next()?;
    for fragment in iter {
        merged.absorb(fragment);
    }

    info!(
        fragments = count,
        classes = merged.classes.len(),
        datatype_properties = merged.datatypes.len(),
        relations = merged.relations.len(),
        pending = merged.pending.len(),
        "fragments merged"
    );
    Some(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{ClassKey, DatasetSummary, DraftClass};
    use ontoforge_core::{AuditEvent, FieldPath, FieldRef, Stage};

    fn fragment(dataset: &str, classes: &[(&str, &str)]) -> Fragment {
        let mut fragment = Fragment::new(DatasetSummary {
            name: dataset.to_string(),
            format: "json".to_string(),
            records: 1,
            fields: 1,
        });
        for (concept, field) in classes {
            let class = DraftClass::new(ClassKey::Concept(concept.to_string()), "Host", "Host", 1.0)
                .with_identity(FieldRef::new(dataset, FieldPath::root_field(field)));
            fragment.add_class(Stage::EntityIdentification, class);
        }
        fragment
    }

    #[test]
    fn test_shared_concepts_merge_into_one_class() {
        let merged = merge_fragments(vec![
            fragment("b.json", &[("host", "machines")]),
            fragment("a.json", &[("host", "hosts")]),
        ])
        .unwrap();
        assert_eq!(merged.classes.len(), 1);
        let host = merged.class(&ClassKey::Concept("host".into())).unwrap();
        assert_eq!(host.identity.len(), 2);
        assert_eq!(merged.datasets[0].name, "a.json");
        assert!(merged
            .log
            .entries()
            .iter()
            .any(|e| e.stage == Stage::FragmentMerge && matches!(e.event, AuditEvent::EntityMerged { .. })));
    }

    #[test]
    fn test_merge_is_order_independent() {
        let forward = merge_fragments(vec![fragment("a.json", &[("host", "x")]), fragment("b.json", &[("user", "y")])]).unwrap();
        let backward = merge_fragments(vec![fragment("b.json", &[("user", "y")]), fragment("a.json", &[("host", "x")])]).unwrap();
        let keys = |f: &Fragment| f.classes.keys().cloned().collect::<Vec<_>>();
        assert_eq!(keys(&forward), keys(&backward));
    }

    #[test]
    fn test_empty_input() {
        assert!(merge_fragments(Vec::new()).is_none());
    }
}
