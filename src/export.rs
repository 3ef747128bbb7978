// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! bhd-cli import format.
//!
//! The engagement tracker expects capitalized impact/likelihood labels,
//! `affected_target` instead of `affected_asset`, and evidence as one
//! newline-joined string. Output keys are sorted.

use serde::{Deserialize, Serialize};

use crate::errors::AssistResult;
use crate::types::{canonicalize, FindingDraft};

pub const GENERATED_BY: &str = "bhd-assist";
pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantMetadata {
    pub playbook_id: Option<String>,
    pub generated_by: String,
    /// Playbook version, "unknown" when the draft does not record one
    pub version: String,
}

/// One finding as bhd-cli imports it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BhdCliFinding {
    pub title: String,
    pub description: String,
    pub affected_target: String,
    pub evidence: String,
    pub impact_level: String,
    pub likelihood: String,
    pub remediation: String,
    pub business_impact: String,
    #[serde(rename = "_assistant_metadata")]
    pub assistant_metadata: AssistantMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportMetadata {
    pub generated_by: String,
    pub format_version: String,
    pub bhd_cli_compatible: bool,
}

/// Export file: findings plus export metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BhdCliExport {
    pub findings: Vec<BhdCliFinding>,
    pub export_metadata: ExportMetadata,
}

impl BhdCliExport {
    pub fn new(drafts: &[FindingDraft]) -> Self {
        Self {
            findings: drafts.iter().map(finding_draft_to_bhd_cli).collect(),
            export_metadata: ExportMetadata {
                generated_by: GENERATED_BY.to_string(),
                format_version: FORMAT_VERSION.to_string(),
                bhd_cli_compatible: true,
            },
        }
    }

    /// Pretty JSON with sorted keys
    pub fn render(&self) -> AssistResult<String> {
        render_sorted(self)
    }
}

pub fn finding_draft_to_bhd_cli(draft: &FindingDraft) -> BhdCliFinding {
    let version = draft
        .metadata
        .get("playbook_version")
        .and_then(|v| v.as_str())
        .unwrap_or("unknown")
        .to_string();

    BhdCliFinding {
        title: draft.title.clone(),
        description: draft.description.clone(),
        affected_target: draft.affected_asset.clone(),
        evidence: draft.evidence_refs.join("\n"),
        impact_level: draft.impact.label().to_string(),
        likelihood: draft.likelihood.label().to_string(),
        remediation: draft.remediation.clone(),
        business_impact: draft.business_impact.clone(),
        assistant_metadata: AssistantMetadata {
            playbook_id: draft.playbook_id.clone(),
            generated_by: GENERATED_BY.to_string(),
            version,
        },
    }
}

/// `{"findings": [...]}` only, for piping straight into `bhd-cli import`
pub fn to_bhd_cli_import_format(drafts: &[FindingDraft]) -> AssistResult<String> {
    let findings: Vec<BhdCliFinding> = drafts.iter().map(finding_draft_to_bhd_cli).collect();
    render_sorted(&serde_json::json!({ "findings": findings }))
}

fn render_sorted<T: Serialize>(value: &T) -> AssistResult<String> {
    let value = canonicalize(&serde_json::to_value(value)?);
    Ok(serde_json::to_string_pretty(&value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FindingStatus, Impact, Likelihood};
    use serde_json::{Map, Value};

    fn draft(impact: Impact, likelihood: Likelihood) -> FindingDraft {
        FindingDraft {
            id: "f-1".to_string(),
            title: "Modbus exposed".to_string(),
            affected_asset: "plc-1:502".to_string(),
            description: "Unauthenticated Modbus/TCP".to_string(),
            impact,
            likelihood,
            evidence_refs: vec!["ev-1".to_string(), "ev-2".to_string()],
            remediation: "Segment the OT network".to_string(),
            business_impact: "Process disruption".to_string(),
            risk_tags: vec![],
            status: FindingStatus::Draft,
            playbook_id: None,
            metadata: Map::new(),
        }
    }

    #[test]
    fn test_label_mapping() {
        let cases = [
            (Impact::Low, Likelihood::Low, "Low", "Low"),
            (Impact::Medium, Likelihood::Medium, "Medium", "Medium"),
            (Impact::High, Likelihood::High, "High", "High"),
            (Impact::Critical, Likelihood::VeryHigh, "Critical", "Very High"),
        ];
        for (impact, likelihood, impact_label, likelihood_label) in cases {
            let finding = finding_draft_to_bhd_cli(&draft(impact, likelihood));
            assert_eq!(finding.impact_level, impact_label);
            assert_eq!(finding.likelihood, likelihood_label);
        }
    }

    #[test]
    fn test_missing_playbook_fields() {
        let finding = finding_draft_to_bhd_cli(&draft(Impact::High, Likelihood::Low));
        assert_eq!(finding.assistant_metadata.playbook_id, None);
        assert_eq!(finding.assistant_metadata.version, "unknown");
        assert_eq!(finding.evidence, "ev-1\nev-2");

        let rendered = to_bhd_cli_import_format(&[draft(Impact::High, Likelihood::Low)]).unwrap();
        let value: Value = serde_json::from_str(&rendered).unwrap();
        assert!(value["findings"][0]["_assistant_metadata"]["playbook_id"].is_null());
        assert!(value.get("export_metadata").is_none());
    }
}
