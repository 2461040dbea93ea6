//! # Ontoforge OWL
//!
//! OntologyModel を RDF/XML 形式の OWL 文書に書き出す
//! Serializer and a reader for the RDF/XML flavour of OWL produced from an
//! [`ontoforge_core::OntologyModel`]. The reader understands exactly what
//! the serializer writes and is used to check round trips.

pub mod reader;
pub mod vocabulary;
pub mod writer;

pub use reader::{parse, OwlDocument, ParsedClass, ParsedProperty};
pub use vocabulary::element_iri;
pub use writer::{serialize, write_to, OntologySummary};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum OwlError {
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Invalid XML attribute: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialized document is not UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("Malformed OWL document: {0}")]
    Malformed(String),
}
