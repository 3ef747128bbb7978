// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Playbook library loading, validation and rendering.

use chrono::Utc;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{AssistError, AssistResult};
use crate::types::{short_digest, EvidencePlan, FindingDraft, FindingStatus, Impact, Likelihood};

static SEMVER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\d+\.\d+$").expect("valid semver regex"));

pub const MIN_SAFETY_CONSTRAINTS: usize = 3;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlaybookType {
    Validation,
    EvidenceCollection,
    Verification,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybookStep {
    pub step_number: u32,
    pub action: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_outcome: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidenceObject {
    pub id: String,
    /// Playbook vocabulary (request_response, screenshot, config, banner, log, timestamp)
    #[serde(rename = "type")]
    pub kind: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FindingTemplate {
    pub title: String,
    pub description: String,
    pub impact_level: String,
    pub likelihood: String,
    pub remediation: String,
    pub business_impact: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Playbook {
    pub id: String,
    pub version: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: PlaybookType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub test_types: Vec<String>,
    pub steps: Vec<PlaybookStep>,
    pub evidence_objects: Vec<EvidenceObject>,
    pub finding_template: FindingTemplate,
    pub safety_constraints: Vec<String>,
}

impl Playbook {
    /// Structural checks beyond what deserialization enforces
    pub fn validate(&self) -> AssistResult<()> {
        let invalid = |reason: String| AssistError::PlaybookInvalid {
            id: self.id.clone(),
            reason,
        };

        if !SEMVER.is_match(&self.version) {
            return Err(invalid(format!("version '{}' is not X.Y.Z", self.version)));
        }
        if self.test_types.is_empty() {
            return Err(invalid("test_types is empty".to_string()));
        }
        if self.steps.is_empty() {
            return Err(invalid("no steps".to_string()));
        }
        if self.safety_constraints.len() < MIN_SAFETY_CONSTRAINTS {
            return Err(invalid(format!(
                "insufficient safety constraints ({} < {})",
                self.safety_constraints.len(),
                MIN_SAFETY_CONSTRAINTS
            )));
        }
        if !self.safety_constraints.iter().any(|c| c.contains("DO NOT")) {
            return Err(invalid("missing 'DO NOT' safety constraint".to_string()));
        }

        Ok(())
    }
}

/// Listing entry returned by `list_playbooks`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaybookSummary {
    pub id: String,
    pub name: String,
    pub version: String,
    #[serde(rename = "type")]
    pub kind: PlaybookType,
    pub test_types: Vec<String>,
    pub description: String,
}

impl From<&Playbook> for PlaybookSummary {
    fn from(playbook: &Playbook) -> Self {
        Self {
            id: playbook.id.clone(),
            name: playbook.name.clone(),
            version: playbook.version.clone(),
            kind: playbook.kind,
            test_types: playbook.test_types.clone(),
            description: playbook.description.clone().unwrap_or_default(),
        }
    }
}

/// Map playbook evidence vocabulary onto the evidence schema's
pub fn map_evidence_type(playbook_type: &str) -> &'static str {
    match playbook_type {
        "request_response" => "request_response_pair",
        "screenshot" => "screenshot",
        "config" => "configuration_snapshot",
        "banner" => "banner_capture",
        "log" => "log_entry",
        "timestamp" => "metadata",
        _ => "other",
    }
}

fn map_impact(level: &str) -> Impact {
    match level {
        "Critical" => Impact::Critical,
        "High" => Impact::High,
        "Low" | "Informational" => Impact::Low,
        _ => Impact::Medium,
    }
}

fn map_likelihood(level: &str) -> Likelihood {
    match level {
        "High" => Likelihood::High,
        "Low" => Likelihood::Low,
        _ => Likelihood::Medium,
    }
}

pub struct PlaybookLoader {
    playbooks_dir: PathBuf,
    cache: RwLock<HashMap<String, Playbook>>,
}

impl PlaybookLoader {
    pub fn new(playbooks_dir: impl Into<PathBuf>) -> Self {
        Self {
            playbooks_dir: playbooks_dir.into(),
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub fn playbooks_dir(&self) -> &Path {
        &self.playbooks_dir
    }

    /// Parse and validate a single playbook file.
    pub fn load_file(path: &Path) -> AssistResult<Playbook> {
        let raw = std::fs::read_to_string(path).map_err(|e| AssistError::io(path, e))?;
        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let playbook: Playbook = serde_yaml::from_str(&raw).map_err(|e| AssistError::PlaybookInvalid {
            id: label,
            reason: e.to_string(),
        })?;
        playbook.validate()?;
        Ok(playbook)
    }

    /// Load a playbook by id, cached after the first hit.
    ///
    /// A file whose stem equals the id wins; otherwise every file is parsed
    /// and matched on its `id` field.
    pub fn load_playbook(&self, playbook_id: &str) -> AssistResult<Playbook> {
        if let Some(playbook) = self.cache.read().get(playbook_id) {
            return Ok(playbook.clone());
        }

        let files = self.playbook_files()?;

        let by_stem = files
            .iter()
            .find(|p| p.file_stem().map_or(false, |s| s == playbook_id));

        let playbook = match by_stem {
            Some(path) => Self::load_file(path)?,
            None => files
                .iter()
                .filter_map(|path| Self::load_file(path).ok())
                .find(|p| p.id == playbook_id)
                .ok_or_else(|| AssistError::PlaybookNotFound(playbook_id.to_string()))?,
        };

        debug!(playbook = %playbook.id, version = %playbook.version, "Playbook loaded");

        self.cache.write().insert(playbook_id.to_string(), playbook.clone());
        Ok(playbook)
    }

    /// Every valid playbook, sorted by id, optionally filtered by test type.
    /// Invalid files are skipped with a warning.
    pub fn list_playbooks(&self, test_type: Option<&str>) -> AssistResult<Vec<PlaybookSummary>> {
        let mut summaries: Vec<PlaybookSummary> = self
            .validate_all()?
            .into_iter()
            .filter_map(|(path, result)| match result {
                Ok(playbook) => Some(playbook),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping invalid playbook");
                    None
                }
            })
            .filter(|p| test_type.map_or(true, |t| p.test_types.iter().any(|tt| tt == t)))
            .map(|p| PlaybookSummary::from(&p))
            .collect();

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Load every playbook file and report each outcome, in path order.
    pub fn validate_all(&self) -> AssistResult<Vec<(PathBuf, AssistResult<Playbook>)>> {
        Ok(self
            .playbook_files()?
            .into_iter()
            .map(|path| {
                let result = Self::load_file(&path);
                (path, result)
            })
            .collect())
    }

    fn playbook_files(&self) -> AssistResult<Vec<PathBuf>> {
        let mut files = Vec::new();
        collect_yaml_files(&self.playbooks_dir, &mut files)?;
        files.sort();
        Ok(files)
    }

    /// Human-readable Markdown checklist
    pub fn render_checklist(&self, playbook: &Playbook) -> String {
        let mut lines = vec![
            format!("# {}", playbook.name),
            format!("Version: {}", playbook.version),
            String::new(),
        ];

        if let Some(description) = &playbook.description {
            lines.push(format!("**Description:** {}", description));
            lines.push(String::new());
        }

        lines.push("## Safety Constraints (DO NOT)".to_string());
        for constraint in &playbook.safety_constraints {
            lines.push(format!("- ❌ {}", constraint));
        }
        lines.push(String::new());

        lines.push("## Validation Steps".to_string());
        for step in &playbook.steps {
            lines.push(format!("### Step {}: {}", step.step_number, step.action));
            lines.push(step.description.clone());
            if let Some(outcome) = &step.expected_outcome {
                lines.push(format!("**Expected Outcome:** {}", outcome));
            }
            if let Some(tools) = &step.tools {
                lines.push(format!("**Tools:** {}", tools.join(", ")));
            }
            lines.push(String::new());
        }

        lines.push("## Evidence to Collect".to_string());
        for evidence in &playbook.evidence_objects {
            let required = if evidence.required { "✅ Required" } else { "⭕ Optional" };
            lines.push(format!("- **{}** ({}) - {}", evidence.id, evidence.kind, required));
            lines.push(format!("  {}", evidence.description));
        }
        lines.push(String::new());

        lines.join("\n")
    }

    pub fn create_evidence_plan(&self, playbook: &Playbook) -> EvidencePlan {
        let evidence_items = playbook
            .evidence_objects
            .iter()
            .map(|e| {
                json!({
                    "id": e.id,
                    "type": map_evidence_type(&e.kind),
                    "description": e.description,
                    "required": e.required,
                })
            })
            .collect();

        EvidencePlan {
            id: short_digest(&format!("{}:{}", playbook.id, playbook.version)),
            playbook_id: playbook.id.clone(),
            evidence_items,
        }
    }

    /// Finding skeleton from the playbook's template
    pub fn create_finding_draft(
        &self,
        playbook: &Playbook,
        affected_asset: &str,
        evidence_refs: Vec<String>,
    ) -> FindingDraft {
        let template = &playbook.finding_template;
        let id = short_digest(&format!("{}:{}:{}", playbook.id, affected_asset, Utc::now().to_rfc3339()));

        let mut metadata = Map::new();
        metadata.insert("playbook_version".to_string(), Value::String(playbook.version.clone()));
        metadata.insert("generated_by".to_string(), Value::String("bhd-assist".to_string()));

        FindingDraft {
            id,
            title: template.title.clone(),
            affected_asset: affected_asset.to_string(),
            description: template.description.clone(),
            impact: map_impact(&template.impact_level),
            likelihood: map_likelihood(&template.likelihood),
            evidence_refs,
            remediation: template.remediation.clone(),
            business_impact: template.business_impact.clone(),
            risk_tags: Vec::new(),
            status: FindingStatus::Draft,
            playbook_id: Some(playbook.id.clone()),
            metadata,
        }
    }
}

fn collect_yaml_files(dir: &Path, out: &mut Vec<PathBuf>) -> AssistResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| AssistError::io(dir, e))?;

    for entry in entries {
        let path = entry.map_err(|e| AssistError::io(dir, e))?.path();
        if path.is_dir() {
            collect_yaml_files(&path, out)?;
        } else if matches!(path.extension().and_then(|e| e.to_str()), Some("yaml" | "yml")) {
            out.push(path);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evidence_type_mapping() {
        assert_eq!(map_evidence_type("request_response"), "request_response_pair");
        assert_eq!(map_evidence_type("config"), "configuration_snapshot");
        assert_eq!(map_evidence_type("timestamp"), "metadata");
        assert_eq!(map_evidence_type("pcap"), "other");
    }

    #[test]
    fn test_impact_mapping() {
        assert_eq!(map_impact("Informational"), Impact::Low);
        assert_eq!(map_impact("Critical"), Impact::Critical);
        assert_eq!(map_impact("Severe"), Impact::Medium);
        assert_eq!(map_likelihood("Very High"), Likelihood::Medium);
    }

    #[test]
    fn test_semver() {
        assert!(SEMVER.is_match("1.0.0"));
        assert!(!SEMVER.is_match("1.0"));
        assert!(!SEMVER.is_match("v1.0.0"));
    }
}
