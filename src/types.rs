// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::errors::{AssistError, AssistResult};

/// First 16 hex characters of the SHA-256 of `input`.
/// Used for every content-derived identifier in the pipeline.
pub fn short_digest(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    hex::encode(digest)[..16].to_string()
}

/// Serialize with object keys sorted at every level, independent of serde_json features.
pub fn canonical_json(value: &Value) -> String {
    serde_json::to_string(&canonicalize(value)).unwrap_or_default()
}

pub(crate) fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let mut sorted = Map::new();
            for key in keys {
                sorted.insert(key.clone(), canonicalize(&map[key]));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Observation category (closed set shared with observation.schema.json)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum ObservationCategory {
    Service,
    Port,
    Technology,
    Authentication,
    Authorization,
    Exposure,
    Configuration,
    Protocol,
    Other,
}

impl ObservationCategory {
    pub const ALL: [ObservationCategory; 9] = [
        ObservationCategory::Service,
        ObservationCategory::Port,
        ObservationCategory::Technology,
        ObservationCategory::Authentication,
        ObservationCategory::Authorization,
        ObservationCategory::Exposure,
        ObservationCategory::Configuration,
        ObservationCategory::Protocol,
        ObservationCategory::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationCategory::Service => "service",
            ObservationCategory::Port => "port",
            ObservationCategory::Technology => "technology",
            ObservationCategory::Authentication => "authentication",
            ObservationCategory::Authorization => "authorization",
            ObservationCategory::Exposure => "exposure",
            ObservationCategory::Configuration => "configuration",
            ObservationCategory::Protocol => "protocol",
            ObservationCategory::Other => "other",
        }
    }
}

impl std::fmt::Display for ObservationCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ObservationCategory {
    type Err = AssistError;

    fn from_str(s: &str) -> AssistResult<Self> {
        ObservationCategory::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| AssistError::InvalidInput(format!("Unknown observation category '{}'", s)))
    }
}

/// A single normalized fact extracted from tool output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Observation {
    pub id: String,
    pub source_artifact: String,
    pub category: ObservationCategory,
    pub tags: Vec<String>,
    pub confidence: f64,
    pub data: Map<String, Value>,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
}

impl Observation {
    /// Create an observation with a content-derived id.
    pub fn new(
        source_artifact: impl Into<String>,
        category: ObservationCategory,
        tags: Vec<String>,
        confidence: f64,
        data: Map<String, Value>,
    ) -> AssistResult<Self> {
        let source_artifact = source_artifact.into();
        let id = Self::derive_id(&source_artifact, category, &data);

        let observation = Self {
            id,
            source_artifact,
            category,
            tags: dedup_preserving_order(tags),
            confidence,
            data,
            created_at: Utc::now(),
        };
        observation.validate()?;
        Ok(observation)
    }

    /// Replace the derived id with a caller-supplied one.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Stable id over the artifact, the category and the canonical (key-sorted) data.
    pub fn derive_id(source_artifact: &str, category: ObservationCategory, data: &Map<String, Value>) -> String {
        let canonical = canonical_json(&Value::Object(data.clone()));
        short_digest(&format!("{}|{}|{}", source_artifact, category.as_str(), canonical))
    }

    pub fn validate(&self) -> AssistResult<()> {
        if self.id.trim().is_empty() {
            return Err(AssistError::InvalidInput("Observation id cannot be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.confidence) {
            return Err(AssistError::InvalidInput(format!(
                "Observation {} confidence {} must be between 0.0 and 1.0",
                self.id, self.confidence
            )));
        }
        Ok(())
    }

    /// Host the observation refers to: `data.host`, then `data.hostname`, else "unknown".
    pub fn host(&self) -> String {
        self.data
            .get("host")
            .or_else(|| self.data.get("hostname"))
            .map(value_as_text)
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Render a JSON value the way a person would read it: strings without quotes.
pub fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn dedup_preserving_order(tags: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    tags.into_iter().filter(|t| seen.insert(t.clone())).collect()
}

/// A schema-validated, policy-checked candidate security concern.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hypothesis {
    pub id: String,
    pub related_observations: Vec<String>,
    pub title: String,
    pub description: String,
    pub risk_tags: Vec<String>,
    pub confidence: f64,
    pub rationale: String,
    #[serde(default = "default_true")]
    pub requires_validation: bool,
}

fn default_true() -> bool {
    true
}

impl Hypothesis {
    /// Deterministic id for a set of observation ids (order-insensitive).
    pub fn candidate_id<S: AsRef<str>>(observation_ids: &[S]) -> String {
        let mut ids: Vec<&str> = observation_ids.iter().map(|s| s.as_ref()).collect();
        ids.sort_unstable();
        short_digest(&ids.join("-"))
    }
}

/// Policy guard tier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssistanceLevel {
    /// Validation and evidence collection only
    #[default]
    ValidationOnly,
    /// Broader lab/training guidance, requires an explicit profile
    LabTraining,
}

impl AssistanceLevel {
    pub fn as_number(&self) -> u8 {
        match self {
            AssistanceLevel::ValidationOnly => 0,
            AssistanceLevel::LabTraining => 1,
        }
    }

    pub fn from_number(level: u8) -> AssistResult<Self> {
        match level {
            0 => Ok(AssistanceLevel::ValidationOnly),
            1 => Ok(AssistanceLevel::LabTraining),
            other => Err(AssistError::Config(format!(
                "Unsupported assistance level {} (supported: 0, 1)",
                other
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AssistanceLevel::ValidationOnly => "VALIDATION_ONLY",
            AssistanceLevel::LabTraining => "LAB_TRAINING",
        }
    }
}

/// Decision log event kinds
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecisionEvent {
    PolicyBlocked,
    HypothesisDrafted,
    PlaybookSelected,
}

/// One line of the append-only decision log.
/// Fields are declared in key order so the serialized line is already sorted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecisionLogEntry {
    pub assistance_level: AssistanceLevel,
    pub details: Map<String, Value>,
    pub event_type: DecisionEvent,
    #[serde(default)]
    pub redacted: bool,
    pub timestamp: DateTime<Utc>,
}

impl DecisionLogEntry {
    pub fn new(event_type: DecisionEvent, assistance_level: AssistanceLevel, details: Map<String, Value>) -> Self {
        Self {
            assistance_level,
            details,
            event_type,
            redacted: false,
            timestamp: Utc::now(),
        }
    }

    pub fn redacted(mut self) -> Self {
        self.redacted = true;
        self
    }
}

/// Evidence collection plan derived from a playbook
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EvidencePlan {
    pub id: String,
    pub playbook_id: String,
    pub evidence_items: Vec<Value>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Low,
    Medium,
    High,
    Critical,
}

impl Impact {
    /// Capitalized label used by the engagement tracker
    pub fn label(&self) -> &'static str {
        match self {
            Impact::Low => "Low",
            Impact::Medium => "Medium",
            Impact::High => "High",
            Impact::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Likelihood {
    Low,
    Medium,
    High,
    VeryHigh,
}

impl Likelihood {
    pub fn label(&self) -> &'static str {
        match self {
            Likelihood::Low => "Low",
            Likelihood::Medium => "Medium",
            Likelihood::High => "High",
            Likelihood::VeryHigh => "Very High",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FindingStatus {
    #[default]
    Draft,
    Validated,
    Closed,
}

/// Draft finding handed to the reporting collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FindingDraft {
    pub id: String,
    pub title: String,
    pub affected_asset: String,
    pub description: String,
    pub impact: Impact,
    pub likelihood: Likelihood,
    pub evidence_refs: Vec<String>,
    pub remediation: String,
    pub business_impact: String,
    #[serde(default)]
    pub risk_tags: Vec<String>,
    #[serde(default)]
    pub status: FindingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub playbook_id: Option<String>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

/// Export bundle consumed by the engagement tracker
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExportBundle {
    pub bundle_version: String,
    pub engagement_id: String,
    pub generated_at: DateTime<Utc>,
    pub findings: Vec<FindingDraft>,
    #[serde(default)]
    pub artifacts_manifest: Vec<Value>,
}

impl ExportBundle {
    pub fn new(engagement_id: impl Into<String>, findings: Vec<FindingDraft>) -> Self {
        Self {
            bundle_version: "1.0".to_string(),
            engagement_id: engagement_id.into(),
            generated_at: Utc::now(),
            findings,
            artifacts_manifest: Vec::new(),
        }
    }
}
