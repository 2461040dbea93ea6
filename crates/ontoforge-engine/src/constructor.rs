//! Ontology construction
//!
//! Turns a merged [`Fragment`] into a frozen [`OntologyModel`]: collapses
//! homonymous classes, assigns unique local names, links superclasses from
//! the knowledge base, generates inverse properties, records the
//! destination of every field and emits the axioms. Invariant violations
//! that survive every automatic resolution produce an
//! [`OntologyValidationError`] carrying the best-effort model.

use crate::draft::{ClassKey, DatasetSummary, DraftClass, Fragment};
use crate::relationship::id_stem;
use indexmap::IndexMap;
use ontoforge_core::{
    property_name, reaches, AuditEvent, AuditFlag, Axiom, Classification, DatatypeProperty, FieldDestination,
    FieldRef, InvariantViolation, ModelError, ModelStatus, ObjectProperty, OntologyClass, OntologyModel,
    OntologyModelBuilder, ProvenanceLog, RelationOrigin, Stage, XsdDatatype,
};
use ontoforge_rules::{normalize_name, KnowledgeBase};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use thiserror::Error;
use tracing::{debug, info, warn};

/// The model still violates invariants after automatic resolution
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Ontology model violates {} invariant(s)", .violations.len())]
pub struct OntologyValidationError {
    pub violations: Vec<InvariantViolation>,
    /// Best-effort model, status [`ModelStatus::Partial`]
    pub model: Box<OntologyModel>,
}

/// Result of construction together with the audit trail
#[derive(Debug, Clone)]
pub struct Construction {
    pub result: Result<OntologyModel, OntologyValidationError>,
    pub log: ProvenanceLog,
    pub datasets: Vec<DatasetSummary>,
}

pub struct OntologyConstructor<'a> {
    knowledge_base: &'a KnowledgeBase,
    base_iri: &'a str,
}

#[derive(Debug)]
struct DatatypeGroup {
    owner: ClassKey,
    name: String,
    label: String,
    ranges: BTreeSet<XsdDatatype>,
    functional: bool,
    classification: Classification,
    concept: Option<String>,
    lossy: bool,
    unresolved_reference: bool,
    fields: Vec<FieldRef>,
}

#[derive(Debug)]
struct RelationGroup {
    domain: ClassKey,
    range: ClassKey,
    origin: RelationOrigin,
    concept: Option<String>,
    functional: bool,
    leaf: String,
    stem: String,
    endpoints: Vec<FieldRef>,
}

/// Destination bookkeeping shared by the naming passes
struct Naming<'l> {
    builder: OntologyModelBuilder,
    log: &'l mut ProvenanceLog,
    dataset: String,
}

impl Naming<'_> {
    /// Reserve a unique name, auditing any deviation from `base`
    fn reserve(&mut self, base: &str, suffix: &str, reason: &str) -> String {
        let name = self.builder.reserve_name(base, suffix);
        if name != base {
            debug!(from = base, to = %name, "renamed to keep local names unique");
            self.log.append(
                Stage::OntologyConstruction,
                &self.dataset,
                None,
                AuditEvent::Renamed {
                    from: base.to_string(),
                    to: name.clone(),
                    reason: reason.to_string(),
                },
            );
        }
        name
    }
}

impl<'a> OntologyConstructor<'a> {
    pub fn new(knowledge_base: &'a KnowledgeBase, base_iri: &'a str) -> Self {
        Self {
            knowledge_base,
            base_iri,
        }
    }

    pub fn construct(&self, mut fragment: Fragment) -> Result<Construction, ModelError> {
        let mut log = std::mem::take(&mut fragment.log);
        let dataset = fragment.dataset().to_string();
        collapse_homonyms(&mut fragment, &mut log);

        let mut naming = Naming {
            builder: OntologyModelBuilder::new(self.base_iri),
            log: &mut log,
            dataset,
        };

        // classes
        let mut class_names: HashMap<ClassKey, String> = HashMap::new();
        let mut classes: BTreeMap<String, OntologyClass> = BTreeMap::new();
        for draft in fragment.classes.values() {
            let suffix = class_suffix(draft);
            let name = naming.reserve(&draft.name, &suffix, "class name shared by unrelated concepts");
            let mut class = OntologyClass::new(name.clone(), draft.label.clone());
            class.concept = draft.concept.clone();
            class.provenance = draft.identity.clone();
            class.synthesized = draft.synthesized;
            class_names.insert(draft.key.clone(), name.clone());
            classes.insert(name, class);
        }

        let mut violations = self.link_superclasses(&fragment, &class_names, &mut classes);

        // datatype properties, one per (owner, name)
        let mut datatype_groups: IndexMap<(ClassKey, String), DatatypeGroup> = IndexMap::new();
        for draft in &fragment.datatypes {
            let group = datatype_groups
                .entry((draft.owner.clone(), draft.name.clone()))
                .or_insert_with(|| DatatypeGroup {
                    owner: draft.owner.clone(),
                    name: draft.name.clone(),
                    label: draft.field.path.leaf().to_string(),
                    ranges: BTreeSet::new(),
                    functional: true,
                    classification: draft.classification,
                    concept: draft.concept.clone(),
                    lossy: false,
                    unresolved_reference: false,
                    fields: Vec::new(),
                });
            group.ranges.insert(draft.range);
            group.functional &= draft.functional;
            group.lossy |= draft.lossy;
            group.unresolved_reference |= draft.unresolved_reference;
            group.fields.push(draft.field.clone());
        }

        let mut datatypes: Vec<(DatatypeProperty, Vec<FieldRef>)> = Vec::new();
        for group in datatype_groups.into_values() {
            let domain = lookup(&class_names, &group.owner);
            let name = naming.reserve(&group.name, &property_name(&domain), "property name shared across classes");
            let (range, widened) = match group.ranges.len() {
                1 => (group.ranges.iter().next().copied().unwrap_or(XsdDatatype::String), false),
                _ => (XsdDatatype::String, true),
            };
            if widened {
                warn!(property = %name, "datasets disagree on the range; widened to xsd:string");
            }
            let property = DatatypeProperty {
                name,
                label: group.label,
                domain,
                range,
                functional: group.functional,
                source_field: group.fields.first().cloned(),
                classification: group.classification,
                concept: group.concept,
                unresolved_reference: group.unresolved_reference,
                lossy: group.lossy || widened,
            };
            datatypes.push((property, group.fields));
        }

        // object properties, one per (domain, range, field name)
        let mut relation_groups: IndexMap<(ClassKey, ClassKey, String), RelationGroup> = IndexMap::new();
        for draft in &fragment.relations {
            let leaf = property_name(draft.field.path.leaf());
            let group = relation_groups
                .entry((draft.domain.clone(), draft.range.clone(), leaf.clone()))
                .or_insert_with(|| RelationGroup {
                    domain: draft.domain.clone(),
                    range: draft.range.clone(),
                    origin: draft.origin,
                    concept: draft.concept.clone(),
                    functional: true,
                    stem: id_stem(draft.field.path.leaf()).unwrap_or_else(|| normalize_name(draft.field.path.leaf())),
                    leaf,
                    endpoints: Vec::new(),
                });
            group.functional &= draft.functional;
            if draft.endpoint {
                group.endpoints.push(draft.field.clone());
            }
        }

        let mut objects: Vec<(ObjectProperty, Vec<FieldRef>)> = Vec::new();
        for group in relation_groups.into_values() {
            let domain = lookup(&class_names, &group.domain);
            let range = lookup(&class_names, &group.range);
            let (base, suffix) = match group.origin {
                RelationOrigin::Reference => (format!("has_{}", group.stem), property_name(&domain)),
                _ => (format!("has_{}", property_name(&range)), group.leaf.clone()),
            };
            let name = naming.reserve(&base, &suffix, "relationship name shared by several relations");
            let property = ObjectProperty {
                label: name.replace('_', " "),
                name,
                domain,
                range,
                functional: group.functional,
                inverse_of: None,
                source_field: group.endpoints.first().cloned(),
                origin: group.origin,
                concept: group.concept,
            };
            objects.push((property, group.endpoints));
        }
        let inverses = self.inverse_properties(&mut objects, &mut naming);
        objects.extend(inverses.into_iter().map(|p| (p, Vec::new())));

        // classes without datatype properties stay as structural endpoints
        for class in classes.values_mut() {
            if !datatypes.iter().any(|(p, _)| p.domain == class.name) {
                class.anonymous = true;
                let dataset = class
                    .provenance
                    .iter()
                    .next()
                    .map(|f| f.dataset.clone())
                    .unwrap_or_else(|| naming.dataset.clone());
                naming.log.flag(
                    Stage::OntologyConstruction,
                    &dataset,
                    None,
                    AuditFlag::AnonymousClass,
                    format!("class '{}' has no datatype property", class.name),
                );
            }
        }

        let Naming {
            mut builder,
            log: audit,
            dataset,
        } = naming;

        for class in classes.into_values() {
            for field in &class.provenance {
                map_field(
                    &mut builder,
                    audit,
                    field,
                    FieldDestination::ClassIdentity {
                        class: class.name.clone(),
                    },
                )?;
            }
            for superclass in &class.superclasses {
                builder.add_axiom(Axiom::SubClassOf {
                    sub: class.name.clone(),
                    sup: superclass.clone(),
                });
            }
            builder.add_class(class)?;
        }

        for (property, fields) in datatypes {
            for field in &fields {
                map_field(
                    &mut builder,
                    audit,
                    field,
                    FieldDestination::DatatypeProperty {
                        property: property.name.clone(),
                    },
                )?;
            }
            builder.add_axiom(Axiom::PropertyDomain {
                property: property.name.clone(),
                class: property.domain.clone(),
            });
            builder.add_axiom(Axiom::DatatypePropertyRange {
                property: property.name.clone(),
                datatype: property.range,
            });
            if property.functional {
                builder.add_axiom(Axiom::FunctionalProperty {
                    property: property.name.clone(),
                });
            }
            builder.add_datatype_property(property)?;
        }

        for (property, endpoints) in objects {
            for field in &endpoints {
                map_field(
                    &mut builder,
                    audit,
                    field,
                    FieldDestination::ObjectPropertyEndpoint {
                        property: property.name.clone(),
                    },
                )?;
            }
            builder.add_axiom(Axiom::PropertyDomain {
                property: property.name.clone(),
                class: property.domain.clone(),
            });
            builder.add_axiom(Axiom::ObjectPropertyRange {
                property: property.name.clone(),
                class: property.range.clone(),
            });
            if property.functional {
                builder.add_axiom(Axiom::FunctionalProperty {
                    property: property.name.clone(),
                });
            }
            if let Some(forward) = &property.inverse_of {
                builder.add_axiom(Axiom::InverseOf {
                    property: property.name.clone(),
                    inverse: forward.clone(),
                });
            }
            builder.add_object_property(property)?;
        }

        for (first, second) in self.knowledge_base.disjoint_pairs() {
            let first = class_names.get(&ClassKey::Concept(first.to_string()));
            let second = class_names.get(&ClassKey::Concept(second.to_string()));
            if let (Some(a), Some(b)) = (first, second) {
                if a != b {
                    let (first, second) = if a < b { (a, b) } else { (b, a) };
                    builder.add_axiom(Axiom::DisjointClasses {
                        first: first.clone(),
                        second: second.clone(),
                    });
                }
            }
        }

        // fields that reached no destination are kept for audit
        for field in &fragment.fields {
            if !builder.field_mapping().contains_key(field) {
                warn!(field = %field, "field reached no destination");
                map_field(
                    &mut builder,
                    audit,
                    field,
                    FieldDestination::Residual {
                        reason: "no ontology element derived from this field".to_string(),
                    },
                )?;
            }
        }

        violations.extend(builder.validate());
        violations.sort();
        violations.dedup();

        info!(
            dataset = %dataset,
            classes = builder.classes().count(),
            datatype_properties = builder.datatype_properties().count(),
            object_properties = builder.object_properties().count(),
            axioms = builder.axioms().len(),
            violations = violations.len(),
            "ontology constructed"
        );

        let result = if violations.is_empty() {
            Ok(builder.freeze(ModelStatus::Complete))
        } else {
            let model = builder.freeze(ModelStatus::Partial {
                violations: violations.clone(),
            });
            Err(OntologyValidationError {
                violations,
                model: Box::new(model),
            })
        };

        Ok(Construction {
            result,
            log,
            datasets: fragment.datasets,
        })
    }

    /// Subclass edges from `parent` declarations, to the nearest ancestor
    /// concept that has a class. Edges closing a cycle are rejected.
    fn link_superclasses(
        &self,
        fragment: &Fragment,
        class_names: &HashMap<ClassKey, String>,
        classes: &mut BTreeMap<String, OntologyClass>,
    ) -> Vec<InvariantViolation> {
        let mut violations = Vec::new();
        for draft in fragment.classes.values() {
            let Some(concept) = draft.concept.as_deref() else {
                continue;
            };
            let parent = self
                .knowledge_base
                .ancestors(concept)
                .into_iter()
                .find_map(|ancestor| class_names.get(&ClassKey::Concept(ancestor.to_string())));
            let (Some(parent), Some(child)) = (parent, class_names.get(&draft.key)) else {
                continue;
            };
            if parent == child {
                continue;
            }
            if reaches(classes, parent, child) {
                warn!(class = %child, superclass = %parent, "rejected subclass edge closing a cycle");
                violations.push(InvariantViolation::HierarchyCycle {
                    class: child.clone(),
                    superclass: parent.clone(),
                });
                continue;
            }
            if let Some(class) = classes.get_mut(child) {
                class.superclasses.insert(parent.clone());
            }
        }
        violations
    }

    /// Inverse properties for relations the knowledge base marks bidirectional
    fn inverse_properties(
        &self,
        objects: &mut [(ObjectProperty, Vec<FieldRef>)],
        naming: &mut Naming<'_>,
    ) -> Vec<ObjectProperty> {
        let kb = self.knowledge_base;
        let mut paired: BTreeSet<String> = BTreeSet::new();
        let mut pairs: Vec<(usize, usize)> = Vec::new();
        let mut created = Vec::new();

        // forward relations that already exist in both directions are paired
        for i in 0..objects.len() {
            let Some(concept) = objects[i].0.concept.clone() else {
                continue;
            };
            if paired.contains(&objects[i].0.name) || !kb.is_bidirectional(&concept) {
                continue;
            }
            if let Some(declared) = kb.declared_inverse(&concept) {
                let partner = (0..objects.len()).find(|&j| {
                    j != i
                        && !paired.contains(&objects[j].0.name)
                        && objects[j].0.concept.as_deref() == Some(declared)
                        && objects[j].0.domain == objects[i].0.range
                        && objects[j].0.range == objects[i].0.domain
                });
                if let Some(j) = partner {
                    paired.insert(objects[i].0.name.clone());
                    paired.insert(objects[j].0.name.clone());
                    pairs.push((i, j));
                    continue;
                }
            }

            let forward = &objects[i].0;
            let base = match kb.concept(&concept).and_then(|c| c.inverse_name.clone()) {
                Some(name) => property_name(&name),
                None => match kb.declared_inverse(&concept) {
                    Some(declared) => property_name(declared),
                    None => derive_inverse_name(&forward.name),
                },
            };
            let suffix = forward.name.clone();
            let name = naming.reserve(&base, &suffix, "inverse name shared by several relations");
            debug!(forward = %forward.name, inverse = %name, "generated inverse property");
            paired.insert(forward.name.clone());
            created.push(ObjectProperty {
                label: name.replace('_', " "),
                name,
                domain: forward.range.clone(),
                range: forward.domain.clone(),
                functional: false,
                inverse_of: Some(forward.name.clone()),
                source_field: None,
                origin: RelationOrigin::Inverse,
                concept: Some(concept),
            });
        }

        for (i, j) in pairs {
            let forward = objects[i].0.name.clone();
            objects[j].0.inverse_of = Some(forward);
        }
        created
    }
}

/// `has_host` -> `host_of`; anything else -> `inverse_of_<name>`
pub fn derive_inverse_name(forward: &str) -> String {
    match forward.strip_prefix("has_") {
        Some(rest) if !rest.is_empty() => format!("{}_of", rest),
        _ => format!("inverse_of_{}", forward),
    }
}

fn lookup(class_names: &HashMap<ClassKey, String>, key: &ClassKey) -> String {
    // a missing key surfaces as a dangling domain/range violation
    class_names.get(key).cloned().unwrap_or_else(|| key.to_string())
}

/// Disambiguating suffix derived from the first identity field path
fn class_suffix(draft: &DraftClass) -> String {
    match draft.identity.iter().next() {
        Some(field) => property_name(&field.path.to_string()),
        None => match &draft.concept {
            Some(concept) => property_name(concept),
            None => property_name(&draft.label),
        },
    }
}

fn map_field(
    builder: &mut OntologyModelBuilder,
    log: &mut ProvenanceLog,
    field: &FieldRef,
    destination: FieldDestination,
) -> Result<(), ModelError> {
    builder.map_field(field.clone(), destination.clone())?;
    log.append(
        Stage::OntologyConstruction,
        &field.dataset,
        Some(field.path.clone()),
        AuditEvent::Mapped { destination },
    );
    Ok(())
}

/// Fold concept-less classes into a concept class with the same name
fn collapse_homonyms(fragment: &mut Fragment, log: &mut ProvenanceLog) {
    let mut groups: IndexMap<String, Vec<ClassKey>> = IndexMap::new();
    for class in fragment.classes.values() {
        groups.entry(class.name.to_lowercase()).or_default().push(class.key.clone());
    }

    let mut redirects: Vec<(ClassKey, ClassKey)> = Vec::new();
    for keys in groups.values() {
        let Some(canonical) = keys.iter().find(|k| k.concept().is_some()) else {
            continue;
        };
        for key in keys {
            if key != canonical && key.concept().is_none() {
                redirects.push((key.clone(), canonical.clone()));
            }
        }
    }
    if redirects.is_empty() {
        return;
    }

    let dataset = fragment.dataset().to_string();
    for (from, to) in &redirects {
        let Some(class) = fragment.classes.shift_remove(from) else {
            continue;
        };
        if let Some(target) = fragment.classes.get_mut(to) {
            let merged = class.name.clone();
            target.absorb(class);
            debug!(from = %from, to = %to, "merged homonymous class into concept class");
            log.append(
                Stage::OntologyConstruction,
                &dataset,
                None,
                AuditEvent::EntityMerged {
                    canonical: target.name.clone(),
                    merged: vec![merged],
                    concept: target.concept.clone(),
                },
            );
        }
    }

    let redirect = |key: &mut ClassKey| {
        if let Some((_, to)) = redirects.iter().find(|(from, _)| from == key) {
            *key = to.clone();
        }
    };
    for property in &mut fragment.datatypes {
        redirect(&mut property.owner);
    }
    for relation in &mut fragment.relations {
        redirect(&mut relation.domain);
        redirect(&mut relation.range);
    }
    for reference in &mut fragment.pending {
        redirect(&mut reference.owner);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::draft::{DraftDatatype, DraftRelation};
    use ontoforge_core::FieldPath;

    const KB: &str = r#"
concepts:
  - id: asset
    display_name: Asset
    classification: ENTITY_CANDIDATE
  - id: host
    display_name: Host
    classification: ENTITY_CANDIDATE
    parent: asset
  - id: user
    display_name: User
    classification: ENTITY_CANDIDATE
  - id: host_reference
    classification: RELATIONSHIP_CANDIDATE
    target: host
    bidirectional: true
disjoint:
  - [host, user]
"#;

    fn kb() -> KnowledgeBase {
        KnowledgeBase::from_yaml_str(KB).unwrap()
    }

    fn field(dataset: &str, path: &str) -> FieldRef {
        FieldRef::new(dataset, FieldPath::parse(path))
    }

    fn summary(name: &str) -> DatasetSummary {
        DatasetSummary {
            name: name.to_string(),
            format: "json".to_string(),
            records: 1,
            fields: 1,
        }
    }

    fn datatype(owner: ClassKey, f: FieldRef) -> DraftDatatype {
        DraftDatatype {
            name: property_name(f.path.leaf()),
            owner,
            range: XsdDatatype::String,
            functional: true,
            field: f,
            classification: Classification::AttributeCandidate,
            concept: None,
            lossy: false,
            unresolved_reference: false,
        }
    }

    fn concept_class(id: &str, name: &str) -> DraftClass {
        DraftClass::new(ClassKey::Concept(id.into()), name, name, 1.0)
    }

    #[test]
    fn test_derive_inverse_name() {
        assert_eq!(derive_inverse_name("has_host"), "host_of");
        assert_eq!(derive_inverse_name("owns"), "inverse_of_owns");
    }

    #[test]
    fn test_construct_valid_model_with_axioms() {
        let kb = kb();
        let mut fragment = Fragment::new(summary("events.json"));
        let host = ClassKey::Concept("host".into());
        let event = ClassKey::for_name("Event");
        fragment.add_class(Stage::EntityIdentification, concept_class("asset", "Asset"));
        fragment.add_class(Stage::EntityIdentification, concept_class("host", "Host"));
        fragment.add_class(Stage::EntityIdentification, concept_class("user", "User"));
        fragment.add_class(
            Stage::EntityIdentification,
            DraftClass::new(event.clone(), "Event", "Event", 0.0).synthesized(),
        );
        for (owner, path) in [(&host, "os"), (&event, "message"), (&host, "name")] {
            let f = field("events.json", path);
            fragment.fields.push(f.clone());
            fragment.datatypes.push(datatype(owner.clone(), f));
        }
        let reference = field("events.json", "host_id");
        fragment.fields.push(reference.clone());
        fragment.relations.push(DraftRelation {
            domain: event,
            range: host,
            functional: true,
            field: reference.clone(),
            endpoint: true,
            origin: RelationOrigin::Reference,
            concept: Some("host_reference".into()),
        });

        let construction = OntologyConstructor::new(&kb, "http://example.org/onto")
            .construct(fragment)
            .unwrap();
        let model = construction.result.unwrap();

        assert_eq!(model.class_count(), 4);
        assert!(model.class("Host").unwrap().superclasses.contains("Asset"));
        assert!(model.class("Asset").unwrap().anonymous);
        assert!(model.object_property("has_host").is_some());
        let inverse = model.object_property("host_of").unwrap();
        assert_eq!(inverse.domain, "Host");
        assert_eq!(inverse.inverse_of.as_deref(), Some("has_host"));

        let axioms = model.axioms();
        assert!(axioms.contains(&Axiom::SubClassOf {
            sub: "Host".into(),
            sup: "Asset".into()
        }));
        assert!(axioms.contains(&Axiom::DisjointClasses {
            first: "Host".into(),
            second: "User".into()
        }));
        assert!(axioms.contains(&Axiom::InverseOf {
            property: "host_of".into(),
            inverse: "has_host".into()
        }));
        assert!(!axioms.contains(&Axiom::InverseOf {
            property: "has_host".into(),
            inverse: "host_of".into()
        }));
        assert_eq!(
            model.field_mapping().get(&reference),
            Some(&FieldDestination::ObjectPropertyEndpoint {
                property: "has_host".into()
            })
        );
        // `name` is unique; `os` keeps its name
        assert!(model.datatype_property("os").is_some());
        assert_eq!(construction.log.flags(AuditFlag::AnonymousClass).count(), 2);
    }

    #[test]
    fn test_concept_less_homonym_merges_into_concept_class() {
        let kb = kb();
        let mut fragment = Fragment::new(summary("a.json"));
        fragment.add_class(Stage::EntityIdentification, concept_class("host", "Host"));
        let stray = ClassKey::for_name("host");
        let f = field("a.json", "nodes");
        fragment.add_class(
            Stage::EntityIdentification,
            DraftClass::new(stray.clone(), "Host", "host", 0.5).with_identity(f.clone()),
        );
        fragment.fields.push(f);
        fragment.datatypes.push(datatype(stray, field("a.json", "nodes[].os")));

        let model = OntologyConstructor::new(&kb, "urn:test")
            .construct(fragment)
            .unwrap()
            .result
            .unwrap();
        assert_eq!(model.class_count(), 1);
        assert_eq!(model.datatype_property("os").unwrap().domain, "Host");
        assert_eq!(model.class("Host").unwrap().provenance.len(), 1);
    }

    #[test]
    fn test_shared_property_names_get_owner_suffix() {
        let kb = kb();
        let mut fragment = Fragment::new(summary("a.json"));
        let host = fragment.add_class(Stage::EntityIdentification, concept_class("host", "Host"));
        let user = fragment.add_class(Stage::EntityIdentification, concept_class("user", "User"));
        fragment.datatypes.push(datatype(host, field("a.json", "hosts[].name")));
        fragment.datatypes.push(datatype(user, field("a.json", "users[].name")));

        let construction = OntologyConstructor::new(&kb, "urn:test").construct(fragment).unwrap();
        let model = construction.result.unwrap();
        assert_eq!(model.datatype_property("name").unwrap().domain, "Host");
        assert_eq!(model.datatype_property("name_user").unwrap().domain, "User");
        assert!(construction
            .log
            .entries()
            .iter()
            .any(|e| matches!(&e.event, AuditEvent::Renamed { to, .. } if to == "name_user")));
    }

    #[test]
    fn test_superclass_cycle_is_rejected_and_reported() {
        let kb = KnowledgeBase::from_yaml_str(
            r#"
concepts:
  - {id: a, classification: ENTITY_CANDIDATE, parent: b}
  - {id: b, classification: ENTITY_CANDIDATE, parent: a}
"#,
        )
        .unwrap();
        let mut fragment = Fragment::new(summary("x.json"));
        let a = fragment.add_class(Stage::EntityIdentification, concept_class("a", "A"));
        let b = fragment.add_class(Stage::EntityIdentification, concept_class("b", "B"));
        fragment.datatypes.push(datatype(a, field("x.json", "p")));
        fragment.datatypes.push(datatype(b, field("x.json", "q")));

        let err = OntologyConstructor::new(&kb, "urn:test")
            .construct(fragment)
            .unwrap()
            .result
            .unwrap_err();
        assert_eq!(
            err.violations,
            vec![InvariantViolation::HierarchyCycle {
                class: "B".into(),
                superclass: "A".into()
            }]
        );
        assert!(err.model.is_partial());
        assert!(err.model.class("A").unwrap().superclasses.contains("B"));
    }
}
