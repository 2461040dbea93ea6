//! RDF, RDFS and OWL vocabulary

pub const RDF: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#";
pub const RDFS: &str = "http://www.w3.org/2000/01/rdf-schema#";
pub const OWL: &str = "http://www.w3.org/2002/07/owl#";
pub const XSD: &str = "http://www.w3.org/2001/XMLSchema#";

pub const OWL_FUNCTIONAL_PROPERTY: &str = "http://www.w3.org/2002/07/owl#FunctionalProperty";

/// Element tags as written (qualified names)
pub mod tag {
    pub const RDF_ROOT: &str = "rdf:RDF";
    pub const RDF_TYPE: &str = "rdf:type";
    pub const ONTOLOGY: &str = "owl:Ontology";
    pub const CLASS: &str = "owl:Class";
    pub const DATATYPE_PROPERTY: &str = "owl:DatatypeProperty";
    pub const OBJECT_PROPERTY: &str = "owl:ObjectProperty";
    pub const LABEL: &str = "rdfs:label";
    pub const COMMENT: &str = "rdfs:comment";
    pub const SUBCLASS_OF: &str = "rdfs:subClassOf";
    pub const DOMAIN: &str = "rdfs:domain";
    pub const RANGE: &str = "rdfs:range";
    pub const DISJOINT_WITH: &str = "owl:disjointWith";
    pub const INVERSE_OF: &str = "owl:inverseOf";
}

/// IRI of a model element: `base#name`, or `base` + `name` when the base
/// already ends with a separator
pub fn element_iri(base: &str, name: &str) -> String {
    if base.ends_with('#') || base.ends_with('/') {
        format!("{}{}", base, name)
    } else {
        format!("{}#{}", base, name)
    }
}

/// Inverse of [`element_iri`]; falls back to the text after the last separator
pub fn local_name<'a>(base: &str, iri: &'a str) -> &'a str {
    if let Some(rest) = iri.strip_prefix(base) {
        let rest = rest.strip_prefix('#').unwrap_or(rest);
        if !rest.is_empty() {
            return rest;
        }
    }
    iri.rsplit(['#', '/']).next().unwrap_or(iri)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_iri() {
        assert_eq!(element_iri("http://x.org/onto", "Host"), "http://x.org/onto#Host");
        assert_eq!(element_iri("http://x.org/onto#", "Host"), "http://x.org/onto#Host");
        assert_eq!(element_iri("http://x.org/onto/", "Host"), "http://x.org/onto/Host");
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name("http://x.org/onto", "http://x.org/onto#has_host"), "has_host");
        assert_eq!(local_name("http://x.org/onto/", "http://x.org/onto/Host"), "Host");
        assert_eq!(local_name("urn:other", "http://www.w3.org/2001/XMLSchema#string"), "string");
    }
}
