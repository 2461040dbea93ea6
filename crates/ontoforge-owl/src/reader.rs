//! Reader for the RDF/XML documents written by [`crate::serialize`]

use crate::vocabulary::{local_name, tag, OWL_FUNCTIONAL_PROPERTY};
use crate::writer::OntologySummary;
use crate::OwlError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedClass {
    pub label: Option<String>,
    pub subclass_of: Vec<String>,
    pub disjoint_with: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedProperty {
    pub label: Option<String>,
    pub domain: Vec<String>,
    pub range: Vec<String>,
    pub functional: bool,
    pub inverse_of: Option<String>,
}

/// Parsed OWL document, keyed by local name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwlDocument {
    pub ontology_iri: String,
    pub classes: BTreeMap<String, ParsedClass>,
    pub datatype_properties: BTreeMap<String, ParsedProperty>,
    pub object_properties: BTreeMap<String, ParsedProperty>,
}

impl OwlDocument {
    pub fn summary(&self) -> OntologySummary {
        let properties = || self.datatype_properties.values().chain(self.object_properties.values());
        OntologySummary {
            classes: self.classes.len(),
            datatype_properties: self.datatype_properties.len(),
            object_properties: self.object_properties.len(),
            subclass_axioms: self.classes.values().map(|c| c.subclass_of.len()).sum(),
            disjoint_axioms: self.classes.values().map(|c| c.disjoint_with.len()).sum(),
            domain_axioms: properties().map(|p| p.domain.len()).sum(),
            range_axioms: properties().map(|p| p.range.len()).sum(),
            functional_properties: properties().filter(|p| p.functional).count(),
            inverse_axioms: properties().filter(|p| p.inverse_of.is_some()).count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Class,
    DatatypeProperty,
    ObjectProperty,
}

impl Kind {
    fn from_tag(name: &[u8]) -> Option<Self> {
        match name {
            n if n == tag::CLASS.as_bytes() => Some(Kind::Class),
            n if n == tag::DATATYPE_PROPERTY.as_bytes() => Some(Kind::DatatypeProperty),
            n if n == tag::OBJECT_PROPERTY.as_bytes() => Some(Kind::ObjectProperty),
            _ => None,
        }
    }
}

fn attribute(element: &BytesStart<'_>, key: &str) -> Result<Option<String>, OwlError> {
    for attr in element.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == key.as_bytes() {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

/// Parse an RDF/XML OWL document
pub fn parse(xml: &str) -> Result<OwlDocument, OwlError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut document = OwlDocument::default();
    let mut saw_root = false;
    let mut subject: Option<(Kind, String)> = None;
    let mut in_label = false;

    loop {
        let event = reader.read_event()?;
        match &event {
            Event::Start(e) | Event::Empty(e) => {
                let empty = matches!(event, Event::Empty(_));
                let name = e.name();
                let name = name.as_ref();

                if name == tag::RDF_ROOT.as_bytes() {
                    saw_root = true;
                    if let Some(base) = attribute(e, "xml:base")? {
                        document.ontology_iri = base;
                    }
                } else if name == tag::ONTOLOGY.as_bytes() {
                    if let Some(about) = attribute(e, "rdf:about")? {
                        document.ontology_iri = about;
                    }
                } else if let Some(kind) = Kind::from_tag(name) {
                    let about = attribute(e, "rdf:about")?
                        .ok_or_else(|| OwlError::Malformed("element without rdf:about".to_string()))?;
                    let local = local_name(&document.ontology_iri, &about).to_string();
                    match kind {
                        Kind::Class => {
                            document.classes.entry(local.clone()).or_default();
                        }
                        Kind::DatatypeProperty => {
                            document.datatype_properties.entry(local.clone()).or_default();
                        }
                        Kind::ObjectProperty => {
                            document.object_properties.entry(local.clone()).or_default();
                        }
                    }
                    if !empty {
                        subject = Some((kind, local));
                    }
                } else if name == tag::LABEL.as_bytes() {
                    in_label = !empty && subject.is_some();
                } else if let Some((kind, local)) = &subject {
                    if let Some(resource) = attribute(e, "rdf:resource")? {
                        statement(&mut document, *kind, local, name, resource)?;
                    }
                }
            }
            Event::Text(text) if in_label => {
                let label = text.unescape()?.into_owned();
                if let Some((kind, local)) = &subject {
                    match kind {
                        Kind::Class => {
                            if let Some(class) = document.classes.get_mut(local) {
                                class.label = Some(label);
                            }
                        }
                        Kind::DatatypeProperty | Kind::ObjectProperty => {
                            if let Some(property) = property_mut(&mut document, *kind, local) {
                                property.label = Some(label);
                            }
                        }
                    }
                }
            }
            Event::End(e) => {
                let name = e.name();
                if name.as_ref() == tag::LABEL.as_bytes() {
                    in_label = false;
                } else if Kind::from_tag(name.as_ref()).is_some() {
                    subject = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !saw_root {
        return Err(OwlError::Malformed("missing rdf:RDF root element".to_string()));
    }
    Ok(document)
}

fn property_mut<'d>(document: &'d mut OwlDocument, kind: Kind, local: &str) -> Option<&'d mut ParsedProperty> {
    match kind {
        Kind::DatatypeProperty => document.datatype_properties.get_mut(local),
        Kind::ObjectProperty => document.object_properties.get_mut(local),
        Kind::Class => None,
    }
}

fn statement(
    document: &mut OwlDocument,
    kind: Kind,
    local: &str,
    predicate: &[u8],
    resource: String,
) -> Result<(), OwlError> {
    let base = document.ontology_iri.clone();
    let object = local_name(&base, &resource).to_string();

    if kind == Kind::Class {
        let Some(class) = document.classes.get_mut(local) else {
            return Ok(());
        };
        match predicate {
            p if p == tag::SUBCLASS_OF.as_bytes() => class.subclass_of.push(object),
            p if p == tag::DISJOINT_WITH.as_bytes() => class.disjoint_with.push(object),
            _ => {}
        }
        return Ok(());
    }

    let Some(property) = property_mut(document, kind, local) else {
        return Ok(());
    };
    match predicate {
        p if p == tag::DOMAIN.as_bytes() => property.domain.push(object),
        p if p == tag::RANGE.as_bytes() => property.range.push(object),
        p if p == tag::INVERSE_OF.as_bytes() => property.inverse_of = Some(object),
        p if p == tag::RDF_TYPE.as_bytes() => {
            if resource == OWL_FUNCTIONAL_PROPERTY {
                property.functional = true;
            } else {
                return Err(OwlError::Malformed(format!("unsupported property type '{}'", resource)));
            }
        }
        _ => {}
    }
    Ok(())
}
