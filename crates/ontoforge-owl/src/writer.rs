//! RDF/XML serialization of a frozen ontology model

use crate::vocabulary::{element_iri, tag, OWL, OWL_FUNCTIONAL_PROPERTY, RDF, RDFS, XSD};
use crate::OwlError;
use ontoforge_core::{Axiom, ModelStatus, OntologyModel};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::collections::BTreeMap;
use tracing::debug;

/// Axiom counts, comparable between a model and a parsed document
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OntologySummary {
    pub classes: usize,
    pub datatype_properties: usize,
    pub object_properties: usize,
    pub subclass_axioms: usize,
    pub disjoint_axioms: usize,
    pub domain_axioms: usize,
    pub range_axioms: usize,
    pub functional_properties: usize,
    pub inverse_axioms: usize,
}

impl OntologySummary {
    pub fn of_model(model: &OntologyModel) -> Self {
        let mut summary = Self {
            classes: model.class_count(),
            datatype_properties: model.datatype_properties().count(),
            object_properties: model.object_properties().count(),
            ..Self::default()
        };
        for axiom in model.axioms() {
            match axiom {
                Axiom::SubClassOf { .. } => summary.subclass_axioms += 1,
                Axiom::DisjointClasses { .. } => summary.disjoint_axioms += 1,
                Axiom::PropertyDomain { .. } => summary.domain_axioms += 1,
                Axiom::ObjectPropertyRange { .. } | Axiom::DatatypePropertyRange { .. } => summary.range_axioms += 1,
                Axiom::FunctionalProperty { .. } => summary.functional_properties += 1,
                Axiom::InverseOf { .. } => summary.inverse_axioms += 1,
            }
        }
        summary
    }
}

/// Statements attached to one subject
#[derive(Default)]
struct Statements {
    resources: Vec<(&'static str, String)>,
}

impl Statements {
    fn push(&mut self, tag: &'static str, iri: String) {
        self.resources.push((tag, iri));
    }
}

/// Serialize a model as an RDF/XML OWL document
pub fn serialize(model: &OntologyModel) -> Result<String, OwlError> {
    let mut buffer = Vec::new();
    write_to(model, &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

/// Serialize into any writer. On error nothing about the model changes.
pub fn write_to<W: std::io::Write>(model: &OntologyModel, sink: W) -> Result<(), OwlError> {
    let base = model.iri();
    let iri = |name: &str| element_iri(base, name);
    let statements = group_axioms(model, &iri);

    let mut writer = Writer::new_with_indent(sink, b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut root = BytesStart::new(tag::RDF_ROOT);
    root.push_attribute(("xmlns:rdf", RDF));
    root.push_attribute(("xmlns:rdfs", RDFS));
    root.push_attribute(("xmlns:owl", OWL));
    root.push_attribute(("xmlns:xsd", XSD));
    root.push_attribute(("xml:base", base));
    writer.write_event(Event::Start(root))?;

    let mut ontology = BytesStart::new(tag::ONTOLOGY);
    ontology.push_attribute(("rdf:about", base));
    match model.status() {
        ModelStatus::Complete => writer.write_event(Event::Empty(ontology))?,
        ModelStatus::Partial { violations } => {
            writer.write_event(Event::Start(ontology))?;
            literal(
                &mut writer,
                tag::COMMENT,
                &format!("partial model: {} invariant violation(s)", violations.len()),
            )?;
            writer.write_event(Event::End(BytesEnd::new(tag::ONTOLOGY)))?;
        }
    }

    for class in model.classes() {
        let subject = iri(&class.name);
        write_subject(
            &mut writer,
            tag::CLASS,
            &subject,
            &class.label,
            statements.get(subject.as_str()),
        )?;
    }
    for property in model.datatype_properties() {
        let subject = iri(&property.name);
        write_subject(
            &mut writer,
            tag::DATATYPE_PROPERTY,
            &subject,
            &property.label,
            statements.get(subject.as_str()),
        )?;
    }
    for property in model.object_properties() {
        let subject = iri(&property.name);
        write_subject(
            &mut writer,
            tag::OBJECT_PROPERTY,
            &subject,
            &property.label,
            statements.get(subject.as_str()),
        )?;
    }

    writer.write_event(Event::End(BytesEnd::new(tag::RDF_ROOT)))?;
    debug!(
        iri = base,
        classes = model.class_count(),
        properties = model.property_count(),
        "ontology serialized"
    );
    Ok(())
}

fn group_axioms(model: &OntologyModel, iri: &dyn Fn(&str) -> String) -> BTreeMap<String, Statements> {
    let mut statements: BTreeMap<String, Statements> = BTreeMap::new();
    for axiom in model.axioms() {
        let (subject, tag, object) = match axiom {
            Axiom::SubClassOf { sub, sup } => (sub, tag::SUBCLASS_OF, iri(sup)),
            Axiom::DisjointClasses { first, second } => (first, tag::DISJOINT_WITH, iri(second)),
            Axiom::PropertyDomain { property, class } => (property, tag::DOMAIN, iri(class)),
            Axiom::ObjectPropertyRange { property, class } => (property, tag::RANGE, iri(class)),
            Axiom::DatatypePropertyRange { property, datatype } => (property, tag::RANGE, datatype.iri()),
            Axiom::FunctionalProperty { property } => {
                (property, tag::RDF_TYPE, OWL_FUNCTIONAL_PROPERTY.to_string())
            }
            Axiom::InverseOf { property, inverse } => (property, tag::INVERSE_OF, iri(inverse)),
        };
        statements.entry(iri(subject)).or_default().push(tag, object);
    }
    statements
}

fn write_subject<W: std::io::Write>(
    writer: &mut Writer<W>,
    kind: &str,
    subject: &str,
    label: &str,
    statements: Option<&Statements>,
) -> Result<(), OwlError> {
    let mut start = BytesStart::new(kind);
    start.push_attribute(("rdf:about", subject));
    writer.write_event(Event::Start(start))?;

    literal(writer, tag::LABEL, label)?;
    for (tag, object) in statements.map(|s| s.resources.as_slice()).unwrap_or_default() {
        let mut element = BytesStart::new(*tag);
        element.push_attribute(("rdf:resource", object.as_str()));
        writer.write_event(Event::Empty(element))?;
    }

    writer.write_event(Event::End(BytesEnd::new(kind)))?;
    Ok(())
}

fn literal<W: std::io::Write>(writer: &mut Writer<W>, element: &str, text: &str) -> Result<(), OwlError> {
    writer.write_event(Event::Start(BytesStart::new(element)))?;
    writer.write_event(Event::Text(BytesText::new(text)))?;
    writer.write_event(Event::End(BytesEnd::new(element)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::sample_model;

    #[test]
    fn test_serialize_document_structure() {
        let xml = serialize(&sample_model()).unwrap();
        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("<owl:Ontology rdf:about=\"http://example.org/net\"/>"));
        assert!(xml.contains("<owl:Class rdf:about=\"http://example.org/net#Host\">"));
        assert!(xml.contains("<rdfs:subClassOf rdf:resource=\"http://example.org/net#Asset\"/>"));
        assert!(xml.contains("<owl:disjointWith rdf:resource=\"http://example.org/net#User\"/>"));
        assert!(xml.contains("<rdfs:range rdf:resource=\"http://www.w3.org/2001/XMLSchema#string\"/>"));
        assert!(xml.contains("<rdf:type rdf:resource=\"http://www.w3.org/2002/07/owl#FunctionalProperty\"/>"));
        assert!(xml.contains("<owl:inverseOf rdf:resource=\"http://example.org/net#has_user\"/>"));
        assert_eq!(xml.matches("owl:inverseOf").count(), 1);
        // labels are escaped
        assert!(xml.contains("Host &amp; Server"));
    }

    #[test]
    fn test_partial_model_is_marked() {
        let model = sample_model()
            .into_builder()
            .freeze(ModelStatus::Partial { violations: vec![] });
        let xml = serialize(&model).unwrap();
        assert!(xml.contains("partial model: 0 invariant violation(s)"));
    }

    #[test]
    fn test_summary_of_model() {
        let summary = OntologySummary::of_model(&sample_model());
        assert_eq!(summary.classes, 3);
        assert_eq!(summary.datatype_properties, 3);
        assert_eq!(summary.object_properties, 2);
        assert_eq!(summary.subclass_axioms, 1);
        assert_eq!(summary.disjoint_axioms, 1);
        assert_eq!(summary.domain_axioms, 5);
        assert_eq!(summary.range_axioms, 5);
        assert_eq!(summary.functional_properties, 3);
        assert_eq!(summary.inverse_axioms, 1);
    }
}
