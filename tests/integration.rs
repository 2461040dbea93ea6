// Integration tests for Ontoforge components
// These tests drive datasets through ingestion, analysis, construction and OWL serialization

#![cfg(test)]

use ontoforge_core::{Classification, FieldRef, InvariantViolation, OntologyModel, XsdDatatype};
use ontoforge_engine::{DatasetInput, EngineError, Pipeline, PipelineConfig, PipelineOutput};
use ontoforge_ingest::{ingest, IngestError};
use ontoforge_owl::{parse, serialize, OntologySummary};
use ontoforge_rules::KnowledgeBase;
use ontoforge_schema::SchemaInferenceError;
use proptest::prelude::*;
use std::sync::Arc;

const EVENTS: &str = r#"[
  {"event_id": "evt-1", "timestamp": "2024-03-01T12:00:00Z", "severity": "high", "host_id": "h-1",
   "process": {"pid": 4242, "command_line": "powershell.exe -enc AAAA"}},
  {"event_id": "evt-2", "timestamp": "2024-03-01T12:05:00Z", "severity": "low", "host_id": "h-2",
   "process": {"pid": 77, "command_line": "cmd.exe /c whoami"}}
]"#;

const HOSTS: &str = "host_id,hostname,ip,os\nh-1,srv1.corp.local,10.0.0.1,linux\nh-2,srv2.corp.local,10.0.0.2,windows\n";

fn cyber_pipeline() -> Pipeline {
    Pipeline::new(
        PipelineConfig::default(),
        ontoforge_domain_cyber::shared_knowledge_base().unwrap(),
    )
    .unwrap()
}

fn empty_kb_pipeline() -> Pipeline {
    Pipeline::new(PipelineConfig::default(), Arc::new(KnowledgeBase::new("empty"))).unwrap()
}

/// Serialize, parse back and compare counts
fn assert_round_trips(model: &OntologyModel) {
    let document = parse(&serialize(model).unwrap()).unwrap();
    assert_eq!(document.summary(), OntologySummary::of_model(model));
}

fn assert_sound(output: &PipelineOutput) {
    assert_eq!(output.model.validate(), Vec::<InvariantViolation>::new());
    assert!(!output.report.partial);
}

#[test]
fn test_host_records_scenario() {
    let output = cyber_pipeline()
        .run_one(
            "hosts.json",
            br#"[{"host_id": "h1", "os": "linux"}, {"host_id":"h2","os":"windows"}]"#,
        )
        .unwrap();
    let model = &output.model;
    assert_sound(&output);

    assert_eq!(model.class_count(), 1);
    assert!(model.class("Host").is_some());

    let os = model.datatype_property("os").unwrap();
    assert_eq!(os.domain, "Host");
    assert_eq!(os.range, XsdDatatype::String);

    let host_id = model.datatype_property("host_id").unwrap();
    assert!(host_id.unresolved_reference);
    assert!(output.report.has_unresolved());

    let document = parse(&serialize(model).unwrap()).unwrap();
    assert_eq!(document.classes.keys().collect::<Vec<_>>(), vec!["Host"]);
    assert_eq!(document.datatype_properties["os"].domain, vec!["Host".to_string()]);
    assert_eq!(
        document.datatype_properties["os"].range,
        vec![XsdDatatype::String.local_name().to_string()]
    );
}

const HOST_RULES: &str = r#"
name: host-rules
concepts:
  - id: host_reference
    display_name: Host Reference
    classification: RELATIONSHIP_CANDIDATE
    patterns: {exact: [host_id]}
  - id: operating_system
    display_name: Operating System
    classification: ATTRIBUTE_CANDIDATE
    patterns: {exact: [os]}
"#;

#[test]
fn test_host_records_with_two_rules_and_neutral_name() {
    let kb = Arc::new(KnowledgeBase::from_yaml_str(HOST_RULES).unwrap());
    let output = Pipeline::new(PipelineConfig::default(), kb)
        .unwrap()
        .run_one(
            "records.json",
            br#"[{"host_id": "h1", "os": "linux"}, {"host_id":"h2","os":"windows"}]"#,
        )
        .unwrap();
    let model = &output.model;
    assert_sound(&output);

    assert_eq!(model.class_count(), 1);
    assert!(model.class("Host").is_some());
    assert_eq!(model.object_properties().count(), 0);
    assert_eq!(model.datatype_properties().count(), 2);

    let os = model.datatype_property("os").unwrap();
    assert_eq!((os.domain.as_str(), os.range), ("Host", XsdDatatype::String));
    assert_eq!(os.classification, Classification::AttributeCandidate);
    assert!(!os.unresolved_reference);

    let host_id = model.datatype_property("host_id").unwrap();
    assert_eq!(host_id.domain, "Host");
    assert!(host_id.unresolved_reference);
    assert!(output.report.has_unresolved());
    assert_round_trips(model);
}

#[test]
fn test_unmatched_csv_yields_unclassified_root() {
    let output = empty_kb_pipeline()
        .run_one(
            "traffic.csv",
            b"ip,port,protocol\n10.0.0.1,443,tcp\n10.0.0.2,53,udp\n",
        )
        .unwrap();
    let model = &output.model;

    assert_eq!(model.class_count(), 1);
    let root = model.classes().next().unwrap();
    assert!(root.synthesized);
    assert_eq!(model.datatype_properties().count(), 3);
    assert_eq!(model.object_properties().count(), 0);
    for property in model.datatype_properties() {
        assert_eq!(property.classification, Classification::Unclassified, "{}", property.name);
        assert_eq!(property.domain, root.name);
    }
    assert_eq!(model.datatype_property("port").unwrap().range, XsdDatatype::Integer);

    assert!(!output.report.unresolved.is_empty());
    assert!(output.report.to_text().contains("Unresolved items: 3"));
    assert_round_trips(model);
}

#[test]
fn test_empty_inputs_are_fatal() {
    let pipeline = cyber_pipeline();

    match pipeline.run_one("empty.json", b"[]") {
        Err(EngineError::Schema(SchemaInferenceError::EmptyDataset { dataset })) => assert_eq!(dataset, "empty.json"),
        other => panic!("expected EmptyDataset, got {:?}", other.map(|o| o.report)),
    }

    match pipeline.run_one("blank.csv", b"  \n") {
        Err(EngineError::Ingest {
            source: IngestError::EmptyInput,
            ..
        }) => {}
        other => panic!("expected EmptyInput, got {:?}", other.map(|o| o.report)),
    }
}

#[test]
fn test_case_variants_share_one_class() {
    let output = empty_kb_pipeline()
        .run_one(
            "inventory.json",
            br#"[{"Widget": {"serial": "w-1"}, "widget": {"color": "red"}}]"#,
        )
        .unwrap();
    let model = &output.model;
    assert_sound(&output);

    let widgets: Vec<_> = model
        .classes()
        .filter(|c| c.name.eq_ignore_ascii_case("widget"))
        .collect();
    assert_eq!(widgets.len(), 1);
    assert_eq!(model.class_count(), 2);
    assert_eq!(model.datatype_property("serial").unwrap().domain, widgets[0].name);
    assert_eq!(model.datatype_property("color").unwrap().domain, widgets[0].name);
}

#[test]
fn test_fragments_sharing_a_concept_merge() {
    let output = cyber_pipeline()
        .run(&[
            DatasetInput::new("hosts.csv", HOSTS),
            DatasetInput::new("hosts.json", r#"[{"hostname": "srv3", "mac_address": "00:1a:2b:3c:4d:5e"}]"#),
        ])
        .unwrap();
    let model = &output.model;
    assert_sound(&output);

    assert_eq!(model.class_count(), 1);
    let host = model.class("Host").unwrap();
    assert_eq!(host.concept.as_deref(), Some("host"));
    assert!(output.report.failed_datasets().next().is_none());
    assert_eq!(model.datatype_property("hostname").unwrap().domain, "Host");
    assert_round_trips(model);
}

#[test]
fn test_every_inferred_field_is_mapped() {
    let inputs = vec![
        DatasetInput::new("events.json", EVENTS),
        DatasetInput::new("hosts.csv", HOSTS),
    ];
    let output = cyber_pipeline().run(&inputs).unwrap();
    assert_sound(&output);

    let config = PipelineConfig::default();
    for input in &inputs {
        let parsed = ingest(&input.name, &input.bytes, &config.ingest_options()).unwrap();
        let schema = config
            .schema_extractor()
            .extract(&parsed.name, &parsed.records, parsed.columns.as_ref().map(Vec::len))
            .unwrap();
        for field in schema.fields() {
            let field_ref = FieldRef::new(input.name.clone(), field.path.clone());
            assert!(
                output.model.field_mapping().contains_key(&field_ref),
                "{} has no destination",
                field_ref
            );
        }
    }

    assert!(output.model.object_property("has_host").is_some());
    assert_round_trips(&output.model);
}

#[test]
fn test_owl_is_stable_across_runs() {
    let inputs = vec![
        DatasetInput::new("events.json", EVENTS),
        DatasetInput::new("hosts.csv", HOSTS),
    ];
    let reversed: Vec<_> = inputs.iter().rev().cloned().collect();

    let first = serialize(&cyber_pipeline().run(&inputs).unwrap().model).unwrap();
    let second = serialize(&cyber_pipeline().run(&reversed).unwrap().model).unwrap();
    assert_eq!(first, second);
}

const KEYS: &[&str] = &[
    "host_id", "hostname", "os", "severity", "user_name", "port", "note", "cve_id", "src_ip",
];

fn record_strategy() -> impl Strategy<Value = serde_json::Value> {
    let value = prop_oneof![
        "[a-z]{1,8}".prop_map(serde_json::Value::from),
        (0i64..70_000).prop_map(serde_json::Value::from),
        any::<bool>().prop_map(serde_json::Value::from),
        Just(serde_json::Value::Null),
    ];
    prop::collection::btree_map(prop::sample::select(KEYS), value, 1..6).prop_map(|fields| {
        serde_json::Value::Object(fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn prop_generated_models_are_sound_and_deterministic(
        records in prop::collection::vec(record_strategy(), 1..12)
    ) {
        let bytes = serde_json::to_vec(&records).unwrap();
        let inputs = vec![
            DatasetInput::new("observations.json", bytes),
            DatasetInput::new("hosts.csv", HOSTS),
        ];
        let reversed: Vec<_> = inputs.iter().rev().cloned().collect();

        let pipeline = cyber_pipeline();
        let first = pipeline.run(&inputs).unwrap();
        let second = pipeline.run(&reversed).unwrap();

        prop_assert_eq!(first.model.validate(), Vec::<InvariantViolation>::new());
        prop_assert_eq!(&first.model, &second.model);

        let document = parse(&serialize(&first.model).unwrap()).unwrap();
        prop_assert_eq!(document.summary(), OntologySummary::of_model(&first.model));
    }
}
