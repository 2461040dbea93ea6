//! Abstract OWL ontology model
//!
//! Built incrementally through [`OntologyModelBuilder`] and frozen with
//! [`OntologyModelBuilder::freeze`]; a frozen [`OntologyModel`] exposes no
//! mutation and is what the serializer consumes.

use crate::model::{Classification, FieldDestination, FieldRef};
use crate::naming::{is_valid_local_name, NamingRegistry};
use crate::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// XML Schema datatypes used as datatype-property ranges
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum XsdDatatype {
    String,
    Integer,
    Double,
    Boolean,
    Date,
    DateTime,
}

impl XsdDatatype {
    pub const NAMESPACE: &'static str = "http://www.w3.org/2001/XMLSchema#";

    pub fn local_name(self) -> &'static str {
        match self {
            XsdDatatype::String => "string",
            XsdDatatype::Integer => "integer",
            XsdDatatype::Double => "double",
            XsdDatatype::Boolean => "boolean",
            XsdDatatype::Date => "date",
            XsdDatatype::DateTime => "dateTime",
        }
    }

    pub fn iri(self) -> String {
        format!("{}{}", Self::NAMESPACE, self.local_name())
    }

    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(XsdDatatype::String),
            "integer" => Some(XsdDatatype::Integer),
            "double" => Some(XsdDatatype::Double),
            "boolean" => Some(XsdDatatype::Boolean),
            "date" => Some(XsdDatatype::Date),
            "dateTime" => Some(XsdDatatype::DateTime),
            _ => None,
        }
    }
}

/// OWL class
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyClass {
    /// IRI-safe local name, unique within the model
    pub name: String,
    pub label: String,
    /// Knowledge-base concept the class was derived from
    pub concept: Option<String>,
    /// Direct "subclass-of" edges (a DAG over the model's classes)
    pub superclasses: BTreeSet<String>,
    /// Schema fields that form the class identity
    pub provenance: BTreeSet<FieldRef>,
    /// Structural class without datatype properties
    pub anonymous: bool,
    /// Created for dataset-root fields when no root entity exists
    pub synthesized: bool,
}

impl OntologyClass {
    pub fn new(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            concept: None,
            superclasses: BTreeSet::new(),
            provenance: BTreeSet::new(),
            anonymous: false,
            synthesized: false,
        }
    }
}

/// OWL datatype property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatatypeProperty {
    pub name: String,
    pub label: String,
    pub domain: String,
    pub range: XsdDatatype,
    pub functional: bool,
    pub source_field: Option<FieldRef>,
    pub classification: Classification,
    pub concept: Option<String>,
    /// Cross-reference whose target class could not be resolved
    pub unresolved_reference: bool,
    /// Mixed-type values were widened to string
    pub lossy: bool,
}

/// How an object property was discovered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationOrigin {
    Nesting,
    Reference,
    Inverse,
}

/// OWL object property
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectProperty {
    pub name: String,
    pub label: String,
    pub domain: String,
    pub range: String,
    pub functional: bool,
    pub inverse_of: Option<String>,
    pub source_field: Option<FieldRef>,
    pub origin: RelationOrigin,
    pub concept: Option<String>,
}

/// Axioms emitted for the serializer
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "axiom", rename_all = "snake_case")]
pub enum Axiom {
    SubClassOf { sub: String, sup: String },
    DisjointClasses { first: String, second: String },
    PropertyDomain { property: String, class: String },
    ObjectPropertyRange { property: String, class: String },
    DatatypePropertyRange { property: String, datatype: XsdDatatype },
    FunctionalProperty { property: String },
    /// `property owl:inverseOf inverse`; `property` is the derived inverse
    InverseOf { property: String, inverse: String },
}

/// Invariant violations detected on a model
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum InvariantViolation {
    DanglingDomain { property: String, class: String },
    DanglingRange { property: String, class: String },
    DuplicateName { name: String, existing: String },
    InvalidLocalName { name: String },
    HierarchyCycle { class: String, superclass: String },
    MissingSuperclass { class: String, superclass: String },
    UnmappedField { field: String },
    DanglingFieldMapping { field: String, target: String },
    EmptyClass { class: String },
}

impl std::fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InvariantViolation::DanglingDomain { property, class } => {
                write!(f, "property '{}' has unknown domain class '{}'", property, class)
            }
            InvariantViolation::DanglingRange { property, class } => {
                write!(f, "property '{}' has unknown range class '{}'", property, class)
            }
            InvariantViolation::DuplicateName { name, existing } => {
                write!(f, "local name '{}' collides with '{}'", name, existing)
            }
            InvariantViolation::InvalidLocalName { name } => {
                write!(f, "'{}' is not a valid local name", name)
            }
            InvariantViolation::HierarchyCycle { class, superclass } => {
                write!(f, "subclass edge {} -> {} closes a cycle", class, superclass)
            }
            InvariantViolation::MissingSuperclass { class, superclass } => {
                write!(f, "class '{}' names unknown superclass '{}'", class, superclass)
            }
            InvariantViolation::UnmappedField { field } => {
                write!(f, "field '{}' has no destination", field)
            }
            InvariantViolation::DanglingFieldMapping { field, target } => {
                write!(f, "field '{}' maps to unknown element '{}'", field, target)
            }
            InvariantViolation::EmptyClass { class } => {
                write!(f, "class '{}' has no datatype property and is not flagged anonymous", class)
            }
        }
    }
}

/// Completeness of a frozen model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ModelStatus {
    Complete,
    /// Best-effort model emitted in lenient mode
    Partial { violations: Vec<InvariantViolation> },
}

/// Frozen ontology model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OntologyModel {
    iri: String,
    classes: BTreeMap<String, OntologyClass>,
    datatype_properties: BTreeMap<String, DatatypeProperty>,
    object_properties: BTreeMap<String, ObjectProperty>,
    axioms: Vec<Axiom>,
    field_mapping: BTreeMap<FieldRef, FieldDestination>,
    status: ModelStatus,
}

impl OntologyModel {
    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn classes(&self) -> impl Iterator<Item = &OntologyClass> {
        self.classes.values()
    }

    pub fn class(&self, name: &str) -> Option<&OntologyClass> {
        self.classes.get(name)
    }

    pub fn datatype_properties(&self) -> impl Iterator<Item = &DatatypeProperty> {
        self.datatype_properties.values()
    }

    pub fn datatype_property(&self, name: &str) -> Option<&DatatypeProperty> {
        self.datatype_properties.get(name)
    }

    pub fn object_properties(&self) -> impl Iterator<Item = &ObjectProperty> {
        self.object_properties.values()
    }

    pub fn object_property(&self, name: &str) -> Option<&ObjectProperty> {
        self.object_properties.get(name)
    }

    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }

    pub fn field_mapping(&self) -> &BTreeMap<FieldRef, FieldDestination> {
        &self.field_mapping
    }

    pub fn status(&self) -> &ModelStatus {
        &self.status
    }

    pub fn is_partial(&self) -> bool {
        matches!(self.status, ModelStatus::Partial { .. })
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    pub fn property_count(&self) -> usize {
        self.datatype_properties.len() + self.object_properties.len()
    }

    /// Datatype properties whose domain is the given class
    pub fn properties_of<'a>(&'a self, class: &'a str) -> impl Iterator<Item = &'a DatatypeProperty> + 'a {
        self.datatype_properties.values().filter(move |p| p.domain == class)
    }

    /// Case-insensitive lookup across classes and properties
    pub fn find_name(&self, name: &str) -> Option<&str> {
        let lower = name.to_lowercase();
        self.classes
            .keys()
            .chain(self.datatype_properties.keys())
            .chain(self.object_properties.keys())
            .find(|n| n.to_lowercase() == lower)
            .map(String::as_str)
    }

    /// Reopen the model for further construction, keeping its reserved names
    pub fn into_builder(self) -> OntologyModelBuilder {
        let mut registry = NamingRegistry::new();
        for name in self
            .classes
            .keys()
            .chain(self.datatype_properties.keys())
            .chain(self.object_properties.keys())
        {
            registry.try_reserve(name);
        }
        OntologyModelBuilder {
            iri: self.iri,
            classes: self.classes,
            datatype_properties: self.datatype_properties,
            object_properties: self.object_properties,
            axioms: self.axioms,
            field_mapping: self.field_mapping,
            registry,
        }
    }

    /// Check every model invariant and return what is violated
    pub fn validate(&self) -> Vec<InvariantViolation> {
        check_invariants(
            &self.classes,
            &self.datatype_properties,
            &self.object_properties,
            &self.field_mapping,
        )
    }
}

/// Incremental construction of an [`OntologyModel`]
#[derive(Debug, Clone)]
pub struct OntologyModelBuilder {
    iri: String,
    classes: BTreeMap<String, OntologyClass>,
    datatype_properties: BTreeMap<String, DatatypeProperty>,
    object_properties: BTreeMap<String, ObjectProperty>,
    axioms: Vec<Axiom>,
    field_mapping: BTreeMap<FieldRef, FieldDestination>,
    registry: NamingRegistry,
}

impl OntologyModelBuilder {
    pub fn new(iri: impl Into<String>) -> Self {
        Self {
            iri: iri.into(),
            classes: BTreeMap::new(),
            datatype_properties: BTreeMap::new(),
            object_properties: BTreeMap::new(),
            axioms: Vec::new(),
            field_mapping: BTreeMap::new(),
            registry: NamingRegistry::new(),
        }
    }

    pub fn iri(&self) -> &str {
        &self.iri
    }

    pub fn registry(&self) -> &NamingRegistry {
        &self.registry
    }

    /// Reserve a unique local name for a new element
    pub fn reserve_name(&mut self, base: &str, suffix: &str) -> String {
        self.registry.reserve_unique(base, suffix)
    }

    pub fn add_class(&mut self, class: OntologyClass) -> Result<(), ModelError> {
        self.claim(&class.name)?;
        self.classes.insert(class.name.clone(), class);
        Ok(())
    }

    pub fn add_datatype_property(&mut self, property: DatatypeProperty) -> Result<(), ModelError> {
        self.claim(&property.name)?;
        self.datatype_properties.insert(property.name.clone(), property);
        Ok(())
    }

    pub fn add_object_property(&mut self, property: ObjectProperty) -> Result<(), ModelError> {
        self.claim(&property.name)?;
        self.object_properties.insert(property.name.clone(), property);
        Ok(())
    }

    /// Accept a name already reserved through [`Self::reserve_name`] or claim a new one
    fn claim(&mut self, name: &str) -> Result<(), ModelError> {
        if !is_valid_local_name(name) {
            return Err(ModelError::InvalidLocalName(name.to_string()));
        }
        let taken_by_element = self.classes.contains_key(name)
            || self.datatype_properties.contains_key(name)
            || self.object_properties.contains_key(name);
        if taken_by_element {
            return Err(ModelError::DuplicateName(name.to_string()));
        }
        match self.registry.existing(name) {
            Some(existing) if existing == name => Ok(()),
            Some(existing) => Err(ModelError::DuplicateName(existing.to_string())),
            None => {
                self.registry.try_reserve(name);
                Ok(())
            }
        }
    }

    pub fn class_mut(&mut self, name: &str) -> Option<&mut OntologyClass> {
        self.classes.get_mut(name)
    }

    pub fn class(&self, name: &str) -> Option<&OntologyClass> {
        self.classes.get(name)
    }

    pub fn classes(&self) -> impl Iterator<Item = &OntologyClass> {
        self.classes.values()
    }

    pub fn datatype_property_mut(&mut self, name: &str) -> Option<&mut DatatypeProperty> {
        self.datatype_properties.get_mut(name)
    }

    pub fn object_property_mut(&mut self, name: &str) -> Option<&mut ObjectProperty> {
        self.object_properties.get_mut(name)
    }

    pub fn datatype_properties(&self) -> impl Iterator<Item = &DatatypeProperty> {
        self.datatype_properties.values()
    }

    pub fn object_properties(&self) -> impl Iterator<Item = &ObjectProperty> {
        self.object_properties.values()
    }

    pub fn remove_class(&mut self, name: &str) -> Option<OntologyClass> {
        let removed = self.classes.remove(name);
        if removed.is_some() {
            self.registry.release(name);
        }
        removed
    }

    pub fn remove_datatype_property(&mut self, name: &str) -> Option<DatatypeProperty> {
        let removed = self.datatype_properties.remove(name);
        if removed.is_some() {
            self.registry.release(name);
        }
        removed
    }

    pub fn remove_object_property(&mut self, name: &str) -> Option<ObjectProperty> {
        let removed = self.object_properties.remove(name);
        if removed.is_some() {
            self.registry.release(name);
        }
        removed
    }

    /// Record the destination of a field; a field maps to exactly one place
    pub fn map_field(&mut self, field: FieldRef, destination: FieldDestination) -> Result<(), ModelError> {
        if let Some(existing) = self.field_mapping.get(&field) {
            if *existing != destination {
                return Err(ModelError::FieldAlreadyMapped(field.to_string()));
            }
        }
        self.field_mapping.insert(field, destination);
        Ok(())
    }

    /// Replace a mapping (used when a later pass relocates a field)
    pub fn remap_field(&mut self, field: FieldRef, destination: FieldDestination) {
        self.field_mapping.insert(field, destination);
    }

    pub fn field_mapping(&self) -> &BTreeMap<FieldRef, FieldDestination> {
        &self.field_mapping
    }

    pub fn add_axiom(&mut self, axiom: Axiom) {
        if !self.axioms.contains(&axiom) {
            self.axioms.push(axiom);
        }
    }

    pub fn clear_axioms(&mut self) {
        self.axioms.clear();
    }

    pub fn axioms(&self) -> &[Axiom] {
        &self.axioms
    }

    /// Rewrite every reference to a class (after merging or renaming)
    pub fn redirect_class(&mut self, from: &str, to: &str) {
        for class in self.classes.values_mut() {
            if class.superclasses.remove(from) && class.name != to {
                class.superclasses.insert(to.to_string());
            }
        }
        for property in self.datatype_properties.values_mut() {
            if property.domain == from {
                property.domain = to.to_string();
            }
        }
        for property in self.object_properties.values_mut() {
            if property.domain == from {
                property.domain = to.to_string();
            }
            if property.range == from {
                property.range = to.to_string();
            }
        }
        for destination in self.field_mapping.values_mut() {
            if let FieldDestination::ClassIdentity { class } = destination {
                if class == from {
                    *class = to.to_string();
                }
            }
        }
    }

    pub fn validate(&self) -> Vec<InvariantViolation> {
        check_invariants(
            &self.classes,
            &self.datatype_properties,
            &self.object_properties,
            &self.field_mapping,
        )
    }

    /// Freeze the model; axioms are sorted for deterministic output
    pub fn freeze(mut self, status: ModelStatus) -> OntologyModel {
        self.axioms.sort();
        self.axioms.dedup();
        OntologyModel {
            iri: self.iri,
            classes: self.classes,
            datatype_properties: self.datatype_properties,
            object_properties: self.object_properties,
            axioms: self.axioms,
            field_mapping: self.field_mapping,
            status,
        }
    }
}

fn check_invariants(
    classes: &BTreeMap<String, OntologyClass>,
    datatype_properties: &BTreeMap<String, DatatypeProperty>,
    object_properties: &BTreeMap<String, ObjectProperty>,
    field_mapping: &BTreeMap<FieldRef, FieldDestination>,
) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();

    // naming: validity and case-insensitive uniqueness
    let mut seen: HashMap<String, &str> = HashMap::new();
    for name in classes
        .keys()
        .chain(datatype_properties.keys())
        .chain(object_properties.keys())
    {
        if !is_valid_local_name(name) {
            violations.push(InvariantViolation::InvalidLocalName { name: name.clone() });
        }
        if let Some(existing) = seen.insert(name.to_lowercase(), name) {
            violations.push(InvariantViolation::DuplicateName {
                name: name.clone(),
                existing: existing.to_string(),
            });
        }
    }

    // domain/range closure
    for property in datatype_properties.values() {
        if !classes.contains_key(&property.domain) {
            violations.push(InvariantViolation::DanglingDomain {
                property: property.name.clone(),
                class: property.domain.clone(),
            });
        }
    }
    for property in object_properties.values() {
        if !classes.contains_key(&property.domain) {
            violations.push(InvariantViolation::DanglingDomain {
                property: property.name.clone(),
                class: property.domain.clone(),
            });
        }
        if !classes.contains_key(&property.range) {
            violations.push(InvariantViolation::DanglingRange {
                property: property.name.clone(),
                class: property.range.clone(),
            });
        }
    }

    // superclass edges: present and acyclic
    for class in classes.values() {
        for superclass in &class.superclasses {
            if !classes.contains_key(superclass) {
                violations.push(InvariantViolation::MissingSuperclass {
                    class: class.name.clone(),
                    superclass: superclass.clone(),
                });
            }
        }
    }
    violations.extend(find_hierarchy_cycles(classes));

    // every class has a datatype property or is flagged anonymous
    for class in classes.values() {
        let has_property = datatype_properties.values().any(|p| p.domain == class.name);
        if !has_property && !class.anonymous {
            violations.push(InvariantViolation::EmptyClass {
                class: class.name.clone(),
            });
        }
    }

    // field mappings point at existing elements; identity fields are in provenance
    for (field, destination) in field_mapping {
        let exists = match destination {
            FieldDestination::ClassIdentity { class } => classes.contains_key(class),
            FieldDestination::DatatypeProperty { property } => datatype_properties.contains_key(property),
            FieldDestination::ObjectPropertyEndpoint { property } => object_properties.contains_key(property),
            FieldDestination::Residual { .. } => true,
        };
        if !exists {
            violations.push(InvariantViolation::DanglingFieldMapping {
                field: field.to_string(),
                target: destination.target().unwrap_or_default().to_string(),
            });
        }
    }
    let provenance_fields = classes
        .values()
        .flat_map(|c| c.provenance.iter())
        .chain(datatype_properties.values().filter_map(|p| p.source_field.as_ref()))
        .chain(object_properties.values().filter_map(|p| p.source_field.as_ref()));
    for field in provenance_fields {
        if !field_mapping.contains_key(field) {
            violations.push(InvariantViolation::UnmappedField {
                field: field.to_string(),
            });
        }
    }

    violations.sort();
    violations.dedup();
    violations
}

/// Edges of the subclass graph that lie on a cycle
fn find_hierarchy_cycles(classes: &BTreeMap<String, OntologyClass>) -> Vec<InvariantViolation> {
    let mut violations = Vec::new();
    for class in classes.values() {
        for superclass in &class.superclasses {
            if superclass == &class.name || reaches(classes, superclass, &class.name) {
                violations.push(InvariantViolation::HierarchyCycle {
                    class: class.name.clone(),
                    superclass: superclass.clone(),
                });
            }
        }
    }
    violations
}

/// True when `target` is an ancestor-or-self of `start`
pub fn reaches(classes: &BTreeMap<String, OntologyClass>, start: &str, target: &str) -> bool {
    let mut stack = vec![start.to_string()];
    let mut visited = BTreeSet::new();
    while let Some(current) = stack.pop() {
        if current == target {
            return true;
        }
        if !visited.insert(current.clone()) {
            continue;
        }
        if let Some(class) = classes.get(&current) {
            stack.extend(class.superclasses.iter().cloned());
        }
    }
    false
}
