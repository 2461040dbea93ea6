//! Run report: what was produced and every automatic decision a human
//! reviewer should look at

use crate::config::ValidationMode;
use crate::draft::DatasetSummary;
use chrono::{DateTime, Utc};
use ontoforge_core::{AuditEvent, AuditFlag, OntologyModel, ProvenanceLog, RelationOrigin};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use uuid::Uuid;

/// Outcome of one input dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DatasetOutcome {
    Processed(DatasetSummary),
    Failed { name: String, error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassSummary {
    pub name: String,
    pub label: String,
    pub concept: Option<String>,
    pub superclasses: Vec<String>,
    pub datatype_properties: Vec<String>,
    pub anonymous: bool,
    pub synthesized: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipSummary {
    pub name: String,
    pub domain: String,
    pub range: String,
    pub origin: RelationOrigin,
    pub functional: bool,
    pub inverse_of: Option<String>,
}

/// Field or class flagged for review
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnresolvedItem {
    pub dataset: String,
    pub field: Option<String>,
    pub flag: AuditFlag,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedEntity {
    pub canonical: String,
    pub merged: Vec<String>,
    pub concept: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenamedElement {
    pub from: String,
    pub to: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub knowledge_base: String,
    pub ontology_iri: String,
    pub validation_mode: ValidationMode,
    pub partial: bool,
    pub datasets: Vec<DatasetOutcome>,
    pub classes: Vec<ClassSummary>,
    pub datatype_property_count: usize,
    pub object_property_count: usize,
    pub axiom_count: usize,
    pub relationships: Vec<RelationshipSummary>,
    pub unresolved: Vec<UnresolvedItem>,
    pub merged_entities: Vec<MergedEntity>,
    pub renamed: Vec<RenamedElement>,
    pub violations: Vec<String>,
    pub validation_overrides: Vec<String>,
}

/// Inputs of [`PipelineReport::build`] that are not in the model or log
#[derive(Debug, Clone)]
pub struct RunInfo {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub knowledge_base: String,
    pub validation_mode: ValidationMode,
}

impl RunInfo {
    pub fn start(knowledge_base: impl Into<String>, validation_mode: ValidationMode) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            knowledge_base: knowledge_base.into(),
            validation_mode,
        }
    }
}

impl PipelineReport {
    pub fn build(
        run: RunInfo,
        model: &OntologyModel,
        log: &ProvenanceLog,
        processed: Vec<DatasetSummary>,
        failures: Vec<(String, String)>,
    ) -> Self {
        let mut datasets: Vec<DatasetOutcome> = processed.into_iter().map(DatasetOutcome::Processed).collect();
        datasets.extend(
            failures
                .into_iter()
                .map(|(name, error)| DatasetOutcome::Failed { name, error }),
        );

        let classes = model
            .classes()
            .map(|class| ClassSummary {
                name: class.name.clone(),
                label: class.label.clone(),
                concept: class.concept.clone(),
                superclasses: class.superclasses.iter().cloned().collect(),
                datatype_properties: model.properties_of(&class.name).map(|p| p.name.clone()).collect(),
                anonymous: class.anonymous,
                synthesized: class.synthesized,
            })
            .collect();

        let relationships = model
            .object_properties()
            .map(|p| RelationshipSummary {
                name: p.name.clone(),
                domain: p.domain.clone(),
                range: p.range.clone(),
                origin: p.origin,
                functional: p.functional,
                inverse_of: p.inverse_of.clone(),
            })
            .collect();

        let mut unresolved = Vec::new();
        let mut merged_entities = Vec::new();
        let mut renamed = Vec::new();
        let mut validation_overrides = Vec::new();
        for entry in log.entries() {
            match &entry.event {
                AuditEvent::Flagged {
                    flag: AuditFlag::ValidationOverride,
                    message,
                } => validation_overrides.push(message.clone()),
                AuditEvent::Flagged { flag, message } => unresolved.push(UnresolvedItem {
                    dataset: entry.dataset.clone(),
                    field: entry.field.as_ref().map(ToString::to_string),
                    flag: *flag,
                    message: message.clone(),
                }),
                AuditEvent::EntityMerged {
                    canonical,
                    merged,
                    concept,
                } => merged_entities.push(MergedEntity {
                    canonical: canonical.clone(),
                    merged: merged.clone(),
                    concept: concept.clone(),
                }),
                AuditEvent::Renamed { from, to, reason } => renamed.push(RenamedElement {
                    from: from.clone(),
                    to: to.clone(),
                    reason: reason.clone(),
                }),
                _ => {}
            }
        }

        let violations = match model.status() {
            ontoforge_core::ModelStatus::Complete => Vec::new(),
            ontoforge_core::ModelStatus::Partial { violations } => {
                violations.iter().map(ToString::to_string).collect()
            }
        };

        Self {
            run_id: run.run_id,
            started_at: run.started_at,
            finished_at: Utc::now(),
            knowledge_base: run.knowledge_base,
            ontology_iri: model.iri().to_string(),
            validation_mode: run.validation_mode,
            partial: model.is_partial(),
            datasets,
            classes,
            datatype_property_count: model.datatype_properties().count(),
            object_property_count: model.object_properties().count(),
            axiom_count: model.axioms().len(),
            relationships,
            unresolved,
            merged_entities,
            renamed,
            violations,
            validation_overrides,
        }
    }

    pub fn has_unresolved(&self) -> bool {
        !self.unresolved.is_empty()
    }

    pub fn failed_datasets(&self) -> impl Iterator<Item = &DatasetOutcome> {
        self.datasets
            .iter()
            .filter(|d| matches!(d, DatasetOutcome::Failed { .. }))
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Human-readable summary
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Ontoforge run {}", self.run_id);
        let _ = writeln!(out, "  knowledge base: {}", self.knowledge_base);
        let _ = writeln!(out, "  ontology:       {}", self.ontology_iri);
        let status = if self.partial { "PARTIAL" } else { "complete" };
        let _ = writeln!(out, "  status:         {}", status);

        let _ = writeln!(out, "\nDatasets");
        for dataset in &self.datasets {
            match dataset {
                DatasetOutcome::Processed(d) => {
                    let _ = writeln!(
                        out,
                        "  {} ({}): {} records, {} fields",
                        d.name, d.format, d.records, d.fields
                    );
                }
                DatasetOutcome::Failed { name, error } => {
                    let _ = writeln!(out, "  {} FAILED: {}", name, error);
                }
            }
        }

        let _ = writeln!(
            out,
            "\nProduced {} classes, {} datatype properties, {} object properties, {} axioms",
            self.classes.len(),
            self.datatype_property_count,
            self.object_property_count,
            self.axiom_count
        );
        for class in &self.classes {
            let mut notes = Vec::new();
            if let Some(concept) = &class.concept {
                notes.push(format!("concept {}", concept));
            }
            if !class.superclasses.is_empty() {
                notes.push(format!("subclass of {}", class.superclasses.join(", ")));
            }
            if class.anonymous {
                notes.push("anonymous".to_string());
            }
            if class.synthesized {
                notes.push("synthesized".to_string());
            }
            let notes = if notes.is_empty() {
                String::new()
            } else {
                format!(" [{}]", notes.join("; "))
            };
            let _ = writeln!(out, "  {}{}", class.name, notes);
            for property in &class.datatype_properties {
                let _ = writeln!(out, "    - {}", property);
            }
        }

        if !self.relationships.is_empty() {
            let _ = writeln!(out, "\nRelationships");
            for r in &self.relationships {
                let _ = writeln!(out, "  {}: {} -> {}", r.name, r.domain, r.range);
            }
        }

        let _ = writeln!(out, "\nUnresolved items: {}", self.unresolved.len());
        for item in &self.unresolved {
            let field = item.field.as_deref().unwrap_or("-");
            let _ = writeln!(out, "  [{:?}] {}:{} {}", item.flag, item.dataset, field, item.message);
        }

        if !self.merged_entities.is_empty() {
            let _ = writeln!(out, "\nMerged entities");
            for m in &self.merged_entities {
                let _ = writeln!(out, "  {} <- {}", m.canonical, m.merged.join(", "));
            }
        }
        if !self.renamed.is_empty() {
            let _ = writeln!(out, "\nRenamed");
            for r in &self.renamed {
                let _ = writeln!(out, "  {} -> {} ({})", r.from, r.to, r.reason);
            }
        }
        if !self.validation_overrides.is_empty() {
            let _ = writeln!(out, "\nValidation overrides (lenient mode)");
            for v in &self.validation_overrides {
                let _ = writeln!(out, "  {}", v);
            }
        }
        out
    }
}
