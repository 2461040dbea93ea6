//! Round-trip tests: pipeline output serialized and read back

use ontoforge_engine::{DatasetInput, Pipeline, PipelineConfig};
use ontoforge_owl::{parse, serialize, OntologySummary};

fn generated_model() -> ontoforge_core::OntologyModel {
    let kb = ontoforge_domain_cyber::shared_knowledge_base().unwrap();
    let config = PipelineConfig {
        base_iri: "http://example.org/soc/".to_string(),
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(config, kb).unwrap();
    pipeline
        .run(&[
            DatasetInput::new(
                "vulnerabilities.json",
                r#"[{"cve_id": "CVE-2024-0001", "cvss_score": 9.8, "host_id": "h-1", "published": "2024-01-02"}]"#,
            ),
            DatasetInput::new("hosts.csv", "host_id,hostname,os\nh-1,db01,linux\n"),
        ])
        .unwrap()
        .model
}

#[test]
fn test_generated_model_round_trips() {
    let model = generated_model();
    let xml = serialize(&model).unwrap();
    let document = parse(&xml).unwrap();

    assert_eq!(document.summary(), OntologySummary::of_model(&model));
    assert_eq!(document.ontology_iri, "http://example.org/soc/");
    for class in model.classes() {
        assert!(document.classes.contains_key(&class.name), "class {} lost", class.name);
    }
    for property in model.object_properties() {
        let parsed = &document.object_properties[&property.name];
        assert_eq!(parsed.inverse_of, property.inverse_of);
    }
}

#[test]
fn test_iris_use_slash_base_without_fragment() {
    let xml = serialize(&generated_model()).unwrap();
    assert!(xml.contains("rdf:about=\"http://example.org/soc/Vulnerability\""));
    assert!(xml.contains("rdf:about=\"http://example.org/soc/has_host\""));
    assert!(!xml.contains("soc/#"));
}

/// Body of the `owl:ObjectProperty` element describing `iri`
fn object_property_element<'x>(xml: &'x str, iri: &str) -> &'x str {
    let open = format!("<owl:ObjectProperty rdf:about=\"{}\">", iri);
    let start = xml.find(&open).unwrap_or_else(|| panic!("no element for {}", iri));
    let end = xml[start..].find("</owl:ObjectProperty>").unwrap();
    &xml[start..start + end]
}

#[test]
fn test_inverse_of_is_written_on_the_inverse_property() {
    let model = generated_model();
    let forward = model.object_property("has_host").unwrap();
    assert!(forward.inverse_of.is_none());
    let inverse = model.object_property("host_of").unwrap();
    assert_eq!(inverse.inverse_of.as_deref(), Some("has_host"));

    let xml = serialize(&model).unwrap();
    let inverse_element = object_property_element(&xml, "http://example.org/soc/host_of");
    assert!(inverse_element.contains("<owl:inverseOf rdf:resource=\"http://example.org/soc/has_host\"/>"));
    let forward_element = object_property_element(&xml, "http://example.org/soc/has_host");
    assert!(!forward_element.contains("owl:inverseOf"));

    let document = parse(&xml).unwrap();
    assert_eq!(document.object_properties["host_of"].inverse_of.as_deref(), Some("has_host"));
    assert_eq!(document.object_properties["has_host"].inverse_of, None);
}
