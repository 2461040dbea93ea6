//! CLI command definitions and handlers

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use ontoforge_core::{Cardinality, Classification};
use ontoforge_engine::{CancellationToken, ConfigError, DatasetInput, EngineError, Pipeline, PipelineConfig};
use ontoforge_ingest::ingest;
use ontoforge_rules::{KnowledgeBase, KnowledgeBaseError, SemanticAnalyzer};
use serde::Serialize;
use serde_json::json;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

/// Extensions picked up when the input is a directory
pub const DATASET_EXTENSIONS: &[&str] = &["json", "ndjson", "jsonl", "csv", "tsv"];

/// Main CLI structure
#[derive(Parser)]
#[command(name = "ontoforge")]
#[command(about = "Generate OWL ontologies from JSON and CSV datasets")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    /// Log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG applies otherwise
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate an OWL ontology from a dataset file or a directory of datasets
    Generate {
        /// Dataset file, or a directory scanned (non-recursively) for datasets
        #[arg(short, long)]
        input: PathBuf,

        /// Output OWL (RDF/XML) file
        #[arg(short, long)]
        output: PathBuf,

        /// Knowledge base (YAML or JSON) layered over the built-in one
        #[arg(short, long)]
        knowledge_base: Option<PathBuf>,

        /// Pipeline configuration (YAML or JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Write the run report to this file instead of stdout
        #[arg(short, long)]
        report: Option<PathBuf>,

        /// Report format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Fail instead of emitting a partial model
        #[arg(long)]
        strict: bool,

        /// Do not load the built-in cyber security knowledge base
        #[arg(long)]
        no_builtin_kb: bool,
    },

    /// Show the detected format and inferred schema of a dataset
    Inspect {
        /// Dataset file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Validate a knowledge base and list its concepts
    Kb {
        /// Knowledge base (YAML or JSON) layered over the built-in one
        #[arg(short, long)]
        knowledge_base: Option<PathBuf>,

        /// Do not load the built-in cyber security knowledge base
        #[arg(long)]
        no_builtin_kb: bool,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },
}

/// Output format options
#[derive(Clone, Copy, Debug, PartialEq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Invocation problems; reported with exit code 2
#[derive(Error, Debug)]
pub enum UsageError {
    #[error("Input path does not exist: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("No datasets ({}) found in {}", DATASET_EXTENSIONS.join(", "), .0.display())]
    NoDatasets(PathBuf),

    #[error("--no-builtin-kb requires --knowledge-base")]
    NoKnowledgeBase,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    KnowledgeBase(#[from] KnowledgeBaseError),
}

/// Exit code for an error returned by [`CommandExecutor::execute`]
pub fn exit_code_for(error: &anyhow::Error) -> i32 {
    if error.downcast_ref::<UsageError>().is_some() {
        EXIT_USAGE
    } else {
        EXIT_FAILURE
    }
}

/// Command execution result
#[derive(Debug, Clone)]
pub struct CommandResult {
    pub success: bool,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

impl CommandResult {
    pub fn exit_code(&self) -> i32 {
        if self.success {
            EXIT_SUCCESS
        } else {
            EXIT_FAILURE
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FieldInspection {
    pub path: String,
    pub primitive_type: String,
    pub cardinality: Cardinality,
    pub mixed_type: bool,
    pub nested_entity: bool,
    pub null_count: usize,
    pub distinct_count: usize,
    pub classification: Classification,
    pub concept: Option<String>,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetInspection {
    pub name: String,
    pub format: String,
    pub records: usize,
    pub fields: Vec<FieldInspection>,
}

impl DatasetInspection {
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}: {} records, format {}", self.name, self.records, self.format);
        for field in &self.fields {
            let mut flags = Vec::new();
            if field.mixed_type {
                flags.push("mixed");
            }
            if field.nested_entity {
                flags.push("nested");
            }
            let concept = field
                .concept
                .as_deref()
                .map(|c| format!(" {} ({:.2})", c, field.confidence))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "  {:<32} {:<9} {:<9} {}{}{}",
                field.path,
                field.primitive_type,
                format!("{:?}", field.cardinality).to_lowercase(),
                field.classification,
                concept,
                if flags.is_empty() {
                    String::new()
                } else {
                    format!(" [{}]", flags.join(", "))
                }
            );
        }
        out
    }
}

/// Execute CLI commands
pub struct CommandExecutor {
    cancellation: CancellationToken,
}

impl Default for CommandExecutor {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandExecutor {
    pub fn new() -> Self {
        Self {
            cancellation: CancellationToken::new(),
        }
    }

    /// Token that stops a running generation at the next stage boundary
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Execute a CLI command
    pub async fn execute(&self, command: Commands) -> Result<CommandResult> {
        match command {
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
                let options = GenerateOptions {
                    input,
                    output,
                    knowledge_base,
                    config,
                    report,
                    format,
                    strict,
                    no_builtin_kb,
                };
                self.execute_generate(options).await
            }
            Commands::Inspect { input, format } => self.execute_inspect(input, format).await,
            Commands::Kb {
                knowledge_base,
                no_builtin_kb,
                format,
            } => self.execute_kb(knowledge_base, no_builtin_kb, format).await,
        }
    }

    async fn execute_generate(&self, options: GenerateOptions) -> Result<CommandResult> {
        let mut config = load_config(options.config.as_deref()).await?;
        if options.strict {
            config = config.strict();
        }
        let kb = load_knowledge_base(options.knowledge_base.as_deref(), options.no_builtin_kb).await?;
        let inputs = collect_inputs(&options.input).await?;
        info!(
            datasets = inputs.len(),
            knowledge_base = %kb.name,
            concepts = kb.len(),
            "generating ontology"
        );

        let pipeline = Pipeline::new(config, Arc::new(kb))
            .map_err(usage_or_engine)?
            .with_cancellation(self.cancellation.clone());
        let outcome = tokio::task::spawn_blocking(move || pipeline.run(&inputs))
            .await
            .context("pipeline task panicked")?;

        let output = match outcome {
            Ok(output) => output,
            Err(err @ (EngineError::Config(_) | EngineError::KnowledgeBase(_))) => return Err(usage_or_engine(err)),
            Err(err) => {
                warn!(error = %err, "generation failed");
                let data = match &err {
                    EngineError::Validation(validation) => Some(json!({
                        "violations": validation
                            .violations
                            .iter()
                            .map(ToString::to_string)
                            .collect::<Vec<_>>(),
                    })),
                    _ => None,
                };
                return Ok(CommandResult {
                    success: false,
                    message: format!("Generation failed: {}", err),
                    data,
                });
            }
        };

        let xml = ontoforge_owl::serialize(&output.model).context("serializing ontology")?;
        tokio::fs::write(&options.output, xml)
            .await
            .with_context(|| format!("writing {}", options.output.display()))?;

        let rendered = match options.format {
            OutputFormat::Text => output.report.to_text(),
            OutputFormat::Json => output.report.to_json()?,
        };
        let message = match &options.report {
            Some(path) => {
                tokio::fs::write(path, &rendered)
                    .await
                    .with_context(|| format!("writing {}", path.display()))?;
                format!(
                    "Wrote {} ({} classes, {} properties); report at {}",
                    options.output.display(),
                    output.model.class_count(),
                    output.model.property_count(),
                    path.display()
                )
            }
            None => rendered,
        };

        Ok(CommandResult {
            success: true,
            message,
            data: Some(serde_json::to_value(&output.report)?),
        })
    }

    async fn execute_inspect(&self, input: PathBuf, format: OutputFormat) -> Result<CommandResult> {
        let bytes = tokio::fs::read(&input)
            .await
            .map_err(|_| UsageError::MissingInput(input.clone()))?;
        let name = file_name(&input);
        let analyzer = SemanticAnalyzer::new(ontoforge_domain_cyber::shared_knowledge_base()?)?;

        let inspection = tokio::task::spawn_blocking(move || inspect_dataset(&name, &bytes, &analyzer))
            .await
            .context("inspection task panicked")?;
        let inspection = match inspection {
            Ok(inspection) => inspection,
            Err(err) => {
                return Ok(CommandResult {
                    success: false,
                    message: format!("Inspection failed: {}", err),
                    data: None,
                })
            }
        };

        let message = match format {
            OutputFormat::Text => inspection.to_text(),
            OutputFormat::Json => serde_json::to_string_pretty(&inspection)?,
        };
        Ok(CommandResult {
            success: true,
            message,
            data: Some(serde_json::to_value(&inspection)?),
        })
    }

    async fn execute_kb(
        &self,
        knowledge_base: Option<PathBuf>,
        no_builtin_kb: bool,
        format: OutputFormat,
    ) -> Result<CommandResult> {
        let kb = load_knowledge_base(knowledge_base.as_deref(), no_builtin_kb).await?;

        let count = |classification: Classification| {
            kb.concepts()
                .iter()
                .filter(|c| c.classification == classification)
                .count()
        };
        let data = json!({
            "name": kb.name,
            "version": kb.version,
            "concepts": kb.len(),
            "entities": count(Classification::EntityCandidate),
            "attributes": count(Classification::AttributeCandidate),
            "relationships": count(Classification::RelationshipCandidate),
            "disjoint_pairs": kb.disjoint_pairs().len(),
            "concept_ids": kb.concepts().iter().map(|c| c.id.as_str()).collect::<Vec<_>>(),
        });

        let message = match format {
            OutputFormat::Json => serde_json::to_string_pretty(&data)?,
            OutputFormat::Text => {
                let mut out = String::new();
                let _ = writeln!(
                    out,
                    "Knowledge base '{}'{}: {} concepts",
                    kb.name,
                    kb.version.as_deref().map(|v| format!(" v{}", v)).unwrap_or_default(),
                    kb.len()
                );
                for concept in kb.concepts() {
                    let mut line = format!(
                        "  {:<28} {:<24} {}",
                        concept.id,
                        concept.classification.to_string(),
                        concept.label()
                    );
                    if let Some(parent) = &concept.parent {
                        let _ = write!(line, " (subclass of {})", parent);
                    }
                    if let Some(target) = &concept.target {
                        let _ = write!(line, " -> {}", target);
                    }
                    let _ = writeln!(out, "{}", line);
                }
                out
            }
        };

        Ok(CommandResult {
            success: true,
            message,
            data: Some(data),
        })
    }
}

struct GenerateOptions {
    input: PathBuf,
    output: PathBuf,
    knowledge_base: Option<PathBuf>,
    config: Option<PathBuf>,
    report: Option<PathBuf>,
    format: OutputFormat,
    strict: bool,
    no_builtin_kb: bool,
}

fn usage_or_engine(err: EngineError) -> anyhow::Error {
    match err {
        EngineError::Config(e) => UsageError::from(e).into(),
        EngineError::KnowledgeBase(e) => UsageError::from(e).into(),
        other => other.into(),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub fn has_dataset_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| DATASET_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Pipeline configuration from a YAML or JSON file, defaults otherwise
pub async fn load_config(path: Option<&Path>) -> Result<PipelineConfig, UsageError> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let text = tokio::fs::read_to_string(path).await.map_err(ConfigError::Io)?;
    let config = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => PipelineConfig::from_json_str(&text)?,
        _ => PipelineConfig::from_yaml_str(&text)?,
    };
    config.validate()?;
    Ok(config)
}

/// Built-in knowledge base, the user's, or the user's layered over the built-in one
pub async fn load_knowledge_base(path: Option<&Path>, no_builtin: bool) -> Result<KnowledgeBase, UsageError> {
    let overlay = match path {
        Some(path) => {
            let text = tokio::fs::read_to_string(path)
                .await
                .map_err(KnowledgeBaseError::Io)?;
            let extension = path.extension().and_then(|e| e.to_str());
            let mut kb = KnowledgeBase::from_str_with_hint(&text, extension)?;
            if kb.name.is_empty() {
                kb.name = path
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_default();
            }
            Some(kb)
        }
        None => None,
    };

    match (overlay, no_builtin) {
        (Some(kb), true) => Ok(kb),
        (None, true) => Err(UsageError::NoKnowledgeBase),
        (overlay, false) => Ok(ontoforge_domain_cyber::with_overlay(overlay)?),
    }
}

/// Read a dataset file, or every dataset file of a directory in name order
pub async fn collect_inputs(input: &Path) -> Result<Vec<DatasetInput>> {
    let metadata = tokio::fs::metadata(input)
        .await
        .map_err(|_| UsageError::MissingInput(input.to_path_buf()))?;

    let paths = if metadata.is_dir() {
        let mut entries = tokio::fs::read_dir(input).await?;
        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_file() && has_dataset_extension(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        if paths.is_empty() {
            return Err(UsageError::NoDatasets(input.to_path_buf()).into());
        }
        paths
    } else {
        vec![input.to_path_buf()]
    };

    let mut inputs = Vec::with_capacity(paths.len());
    for path in paths {
        let bytes = tokio::fs::read(&path)
            .await
            .with_context(|| format!("reading {}", path.display()))?;
        inputs.push(DatasetInput::new(file_name(&path), bytes));
    }
    Ok(inputs)
}

/// Detected format, inferred schema and best annotation per field
pub fn inspect_dataset(name: &str, bytes: &[u8], analyzer: &SemanticAnalyzer) -> Result<DatasetInspection, EngineError> {
    let config = PipelineConfig::default();
    let parsed = ingest(name, bytes, &config.ingest_options()).map_err(|source| EngineError::Ingest {
        dataset: name.to_string(),
        source,
    })?;
    let header_width = parsed.columns.as_ref().map(Vec::len);
    let schema = config
        .schema_extractor()
        .extract(&parsed.name, &parsed.records, header_width)?;
    let analysis = analyzer.analyze(&schema);

    let fields = schema
        .fields()
        .map(|field| {
            let best = analysis.best(&field.path);
            FieldInspection {
                path: field.path.to_string(),
                primitive_type: field.primitive_type.to_string(),
                cardinality: field.cardinality,
                mixed_type: field.mixed_type,
                nested_entity: field.nested_entity,
                null_count: field.stats.null_count,
                distinct_count: field.stats.distinct_count,
                classification: best.map_or(Classification::Unclassified, |a| a.classification),
                concept: best.and_then(|a| a.concept_id()).map(str::to_string),
                confidence: best.map_or(0.0, |a| a.confidence),
            }
        })
        .collect();

    Ok(DatasetInspection {
        name: parsed.name.clone(),
        format: parsed.format.to_string(),
        records: parsed.record_count(),
        fields,
    })
}
