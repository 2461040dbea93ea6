//! Tests for the cli crate

use clap::Parser;
use ontoforge_cli::commands::{
    collect_inputs, exit_code_for, has_dataset_extension, Cli, CommandExecutor, Commands, OutputFormat, EXIT_FAILURE,
    EXIT_USAGE,
};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const EVENTS: &str = r#"[
  {"event_id": "e-1", "timestamp": "2024-03-01T10:00:00Z", "severity": "high", "host_id": "h-1"},
  {"event_id": "e-2", "timestamp": "2024-03-01T10:05:00Z", "severity": "low", "host_id": "h-2"}
]"#;

const HOSTS: &str = "host_id,hostname,os\nh-1,web01,linux\nh-2,db01,windows\n";

const CYCLIC_KB: &str = r#"
name: cyclic
concepts:
  - {id: alpha, display_name: Alpha, classification: ENTITY_CANDIDATE, parent: beta, patterns: {exact: [alphas]}}
  - {id: beta, display_name: Beta, classification: ENTITY_CANDIDATE, parent: alpha, patterns: {exact: [betas]}}
"#;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn generate(input: PathBuf, output: PathBuf) -> Commands {
    Commands::Generate {
        input,
        output,
        knowledge_base: None,
        config: None,
        report: None,
        format: OutputFormat::Text,
        strict: false,
        no_builtin_kb: false,
    }
}

#[test]
fn test_cli_parsing_generate() {
    let args = vec![
        "ontoforge",
        "generate",
        "--input",
        "data/",
        "--output",
        "out.owl",
        "--knowledge-base",
        "kb.yaml",
        "--format",
        "json",
        "--strict",
    ];
    let cli = Cli::try_parse_from(args).unwrap();
    assert_eq!(cli.verbose, 0);

    match cli.command {
        Commands::Generate {
            input,
            output,
            knowledge_base,
            config,
            report,
            format,
            strict,
            no_builtin_kb,
        } => {
            assert_eq!(input, PathBuf::from("data/"));
            assert_eq!(output, PathBuf::from("out.owl"));
            assert_eq!(knowledge_base, Some(PathBuf::from("kb.yaml")));
            assert_eq!(config, None);
            assert_eq!(report, None);
            assert_eq!(format, OutputFormat::Json);
            assert!(strict);
            assert!(!no_builtin_kb);
        }
        _ => panic!("Expected Generate command"),
    }
}

#[test]
fn test_cli_parsing_verbosity_is_global() {
    let cli = Cli::try_parse_from(vec!["ontoforge", "-vv", "inspect", "-i", "events.json"]).unwrap();
    assert_eq!(cli.verbose, 2);
    match cli.command {
        Commands::Inspect { input, format } => {
            assert_eq!(input, PathBuf::from("events.json"));
            assert_eq!(format, OutputFormat::Text);
        }
        _ => panic!("Expected Inspect command"),
    }

    let cli = Cli::try_parse_from(vec!["ontoforge", "kb", "--no-builtin-kb", "-k", "kb.json", "-v"]).unwrap();
    assert_eq!(cli.verbose, 1);
    assert!(matches!(cli.command, Commands::Kb { no_builtin_kb: true, .. }));
}

#[test]
fn test_cli_parsing_rejects_missing_output() {
    assert!(Cli::try_parse_from(vec!["ontoforge", "generate", "--input", "a.json"]).is_err());
    assert!(Cli::try_parse_from(vec!["ontoforge", "generate", "-i", "a.json", "-o", "b.owl", "-f", "xml"]).is_err());
}

#[test]
fn test_dataset_extensions() {
    assert!(has_dataset_extension(Path::new("events.json")));
    assert!(has_dataset_extension(Path::new("HOSTS.CSV")));
    assert!(has_dataset_extension(Path::new("log.ndjson")));
    assert!(!has_dataset_extension(Path::new("notes.txt")));
    assert!(!has_dataset_extension(Path::new("README")));
}

#[tokio::test]
async fn test_collect_inputs_sorts_directory_entries() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "zeta.csv", HOSTS);
    write(dir.path(), "alpha.json", EVENTS);
    write(dir.path(), "notes.md", "ignored");
    std::fs::create_dir(dir.path().join("nested.json")).unwrap();

    let inputs = collect_inputs(dir.path()).await.unwrap();
    let names: Vec<_> = inputs.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, vec!["alpha.json", "zeta.csv"]);
}

#[tokio::test]
async fn test_generate_from_directory() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    write(&data, "events.json", EVENTS);
    write(&data, "hosts.csv", HOSTS);
    let output = dir.path().join("soc.owl");
    let report = dir.path().join("report.json");

    let executor = CommandExecutor::new();
    let result = executor
        .execute(Commands::Generate {
            input: data,
            output: output.clone(),
            knowledge_base: None,
            config: None,
            report: Some(report.clone()),
            format: OutputFormat::Json,
            strict: true,
            no_builtin_kb: false,
        })
        .await
        .unwrap();

    assert!(result.success, "{}", result.message);
    assert_eq!(result.exit_code(), 0);
    assert!(result.message.contains("report at"));

    let xml = std::fs::read_to_string(&output).unwrap();
    let document = ontoforge_owl::parse(&xml).unwrap();
    assert!(document.classes.contains_key("Host"));
    assert!(document.classes.contains_key("SecurityEvent"));
    assert!(document.object_properties.contains_key("has_host"));

    let report: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(report["partial"], false);
    assert_eq!(report["datasets"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_generate_prints_text_report() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "hosts.csv", HOSTS);
    let output = dir.path().join("hosts.owl");

    let result = CommandExecutor::new()
        .execute(generate(input, output.clone()))
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.message.contains("Produced"));
    assert!(output.exists());
    assert!(result.data.is_some());
}

#[tokio::test]
async fn test_generate_strict_violation_fails_without_output() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    write(&data, "alphas.json", r#"[{"p": 1}]"#);
    write(&data, "betas.json", r#"[{"q": "x"}]"#);
    let kb = write(dir.path(), "cyclic.yaml", CYCLIC_KB);
    let output = dir.path().join("cyclic.owl");

    let result = CommandExecutor::new()
        .execute(Commands::Generate {
            input: data,
            output: output.clone(),
            knowledge_base: Some(kb),
            config: None,
            report: None,
            format: OutputFormat::Text,
            strict: true,
            no_builtin_kb: true,
        })
        .await
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.exit_code(), EXIT_FAILURE);
    assert!(result.message.contains("invariant"));
    assert!(!result.data.unwrap()["violations"].as_array().unwrap().is_empty());
    assert!(!output.exists());
}

#[tokio::test]
async fn test_generate_lenient_writes_partial_model() {
    let dir = TempDir::new().unwrap();
    let data = dir.path().join("data");
    std::fs::create_dir(&data).unwrap();
    write(&data, "alphas.json", r#"[{"p": 1}]"#);
    write(&data, "betas.json", r#"[{"q": "x"}]"#);
    let kb = write(dir.path(), "cyclic.yaml", CYCLIC_KB);
    let output = dir.path().join("cyclic.owl");

    let result = CommandExecutor::new()
        .execute(Commands::Generate {
            input: data,
            output: output.clone(),
            knowledge_base: Some(kb),
            config: None,
            report: None,
            format: OutputFormat::Json,
            strict: false,
            no_builtin_kb: true,
        })
        .await
        .unwrap();

    assert!(result.success);
    assert_eq!(result.data.unwrap()["partial"], true);
    assert!(std::fs::read_to_string(&output).unwrap().contains("partial model"));
}

#[tokio::test]
async fn test_usage_errors_exit_with_two() {
    let dir = TempDir::new().unwrap();
    let executor = CommandExecutor::new();

    let missing = executor
        .execute(generate(dir.path().join("absent.json"), dir.path().join("out.owl")))
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&missing), EXIT_USAGE);

    let empty = dir.path().join("empty");
    std::fs::create_dir(&empty).unwrap();
    let no_datasets = executor
        .execute(generate(empty, dir.path().join("out.owl")))
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&no_datasets), EXIT_USAGE);

    let no_kb = executor
        .execute(Commands::Kb {
            knowledge_base: None,
            no_builtin_kb: true,
            format: OutputFormat::Text,
        })
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&no_kb), EXIT_USAGE);

    let bad_config = write(dir.path(), "config.yaml", "sample_size: 0\n");
    let input = write(dir.path(), "hosts.csv", HOSTS);
    let invalid = executor
        .execute(Commands::Generate {
            input,
            output: dir.path().join("out.owl"),
            knowledge_base: None,
            config: Some(bad_config),
            report: None,
            format: OutputFormat::Text,
            strict: false,
            no_builtin_kb: false,
        })
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&invalid), EXIT_USAGE);
}

#[tokio::test]
async fn test_generate_unparseable_dataset_fails() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "broken.json", "[{\"a\": 1},");
    let result = CommandExecutor::new()
        .execute(generate(input, dir.path().join("out.owl")))
        .await
        .unwrap();
    assert!(!result.success);
    assert_eq!(result.exit_code(), EXIT_FAILURE);
}

#[tokio::test]
async fn test_inspect_reports_schema_and_concepts() {
    let dir = TempDir::new().unwrap();
    let input = write(dir.path(), "hosts.csv", HOSTS);

    let result = CommandExecutor::new()
        .execute(Commands::Inspect {
            input,
            format: OutputFormat::Json,
        })
        .await
        .unwrap();
    assert!(result.success);

    let data = result.data.unwrap();
    assert_eq!(data["records"], 2);
    assert_eq!(data["format"], "csv (delimiter ',')");
    let fields = data["fields"].as_array().unwrap();
    assert_eq!(fields.len(), 3);
    let host_id = fields.iter().find(|f| f["path"] == "host_id").unwrap();
    assert!(host_id["concept"].is_string());
}

#[tokio::test]
async fn test_kb_lists_builtin_concepts() {
    let result = CommandExecutor::new()
        .execute(Commands::Kb {
            knowledge_base: None,
            no_builtin_kb: false,
            format: OutputFormat::Text,
        })
        .await
        .unwrap();
    assert!(result.success);
    assert!(result.message.contains("host"));
    assert!(result.message.contains("Security Event"));

    let data = result.data.unwrap();
    assert!(data["entities"].as_u64().unwrap() > 0);
    assert!(data["disjoint_pairs"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_kb_overlay_and_replacement() {
    let dir = TempDir::new().unwrap();
    let kb = write(dir.path(), "cyclic.yaml", CYCLIC_KB);

    let alone = CommandExecutor::new()
        .execute(Commands::Kb {
            knowledge_base: Some(kb.clone()),
            no_builtin_kb: true,
            format: OutputFormat::Json,
        })
        .await
        .unwrap();
    assert_eq!(alone.data.unwrap()["concepts"], 2);

    let layered = CommandExecutor::new()
        .execute(Commands::Kb {
            knowledge_base: Some(kb),
            no_builtin_kb: false,
            format: OutputFormat::Json,
        })
        .await
        .unwrap();
    assert!(layered.data.unwrap()["concepts"].as_u64().unwrap() > 2);

    let broken = write(dir.path(), "broken.yaml", "concepts:\n  - {id: a, classification: ENTITY_CANDIDATE, parent: missing}\n");
    let err = CommandExecutor::new()
        .execute(Commands::Kb {
            knowledge_base: Some(broken),
            no_builtin_kb: true,
            format: OutputFormat::Text,
        })
        .await
        .unwrap_err();
    assert_eq!(exit_code_for(&err), EXIT_USAGE);
}
