// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! JSON Schema validation for every structured entity that crosses a boundary.
//!
//! The five schemas ship inside the binary. A directory override replaces
//! individual schemas by file name (`<name>.schema.json`); anything not found
//! there falls back to the embedded copy.

use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

use crate::errors::{AssistError, AssistResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SchemaKind {
    Observation,
    Hypothesis,
    Evidence,
    FindingDraft,
    Bundle,
}

impl SchemaKind {
    pub const ALL: [SchemaKind; 5] = [
        SchemaKind::Observation,
        SchemaKind::Hypothesis,
        SchemaKind::Evidence,
        SchemaKind::FindingDraft,
        SchemaKind::Bundle,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SchemaKind::Observation => "observation",
            SchemaKind::Hypothesis => "hypothesis",
            SchemaKind::Evidence => "evidence",
            SchemaKind::FindingDraft => "finding_draft",
            SchemaKind::Bundle => "bundle",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.schema.json", self.name())
    }

    fn embedded(&self) -> &'static str {
        match self {
            SchemaKind::Observation => include_str!("../schemas/observation.schema.json"),
            SchemaKind::Hypothesis => include_str!("../schemas/hypothesis.schema.json"),
            SchemaKind::Evidence => include_str!("../schemas/evidence.schema.json"),
            SchemaKind::FindingDraft => include_str!("../schemas/finding_draft.schema.json"),
            SchemaKind::Bundle => include_str!("../schemas/bundle.schema.json"),
        }
    }
}

impl std::fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

struct CompiledSchema {
    raw: Value,
    validator: jsonschema::Validator,
}

pub struct SchemaValidator {
    schemas: HashMap<SchemaKind, CompiledSchema>,
}

impl SchemaValidator {
    /// Validator over the schemas compiled into the binary
    pub fn embedded() -> AssistResult<Self> {
        let mut schemas = HashMap::new();
        for kind in SchemaKind::ALL {
            schemas.insert(kind, compile(kind, kind.embedded(), "embedded")?);
        }
        Ok(Self { schemas })
    }

    /// Validator preferring `<dir>/<name>.schema.json` over the embedded copy.
    /// A schema file that is unreadable, not JSON, or not a valid schema is invalid input.
    pub fn from_dir(dir: &Path) -> AssistResult<Self> {
        let mut schemas = HashMap::new();

        for kind in SchemaKind::ALL {
            let path = dir.join(kind.file_name());
            let compiled = if path.is_file() {
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    AssistError::InvalidInput(format!("Cannot read schema {}: {}", path.display(), e))
                })?;
                debug!(schema = kind.name(), path = %path.display(), "Loading schema override");
                compile(kind, &raw, &path.display().to_string())?
            } else {
                compile(kind, kind.embedded(), "embedded")?
            };
            schemas.insert(kind, compiled);
        }

        Ok(Self { schemas })
    }

    fn get(&self, kind: SchemaKind) -> AssistResult<&CompiledSchema> {
        self.schemas
            .get(&kind)
            .ok_or_else(|| AssistError::Config(format!("Schema {} not loaded", kind)))
    }

    /// Raw schema document, e.g. for embedding in a prompt
    pub fn schema(&self, kind: SchemaKind) -> AssistResult<&Value> {
        Ok(&self.get(kind)?.raw)
    }

    /// Every violation as `"<instance path>: <message>"`. Empty when valid.
    pub fn errors(&self, kind: SchemaKind, instance: &Value) -> AssistResult<Vec<String>> {
        let compiled = self.get(kind)?;
        Ok(compiled
            .validator
            .iter_errors(instance)
            .map(|err| {
                let path = err.instance_path.to_string();
                if path.is_empty() {
                    err.to_string()
                } else {
                    format!("{}: {}", path, err)
                }
            })
            .collect())
    }

    pub fn validate(&self, kind: SchemaKind, instance: &Value) -> AssistResult<()> {
        let errors = self.errors(kind, instance)?;
        if errors.is_empty() {
            Ok(())
        } else {
            Err(AssistError::SchemaValidation {
                schema: kind.name().to_string(),
                message: errors.join("; "),
            })
        }
    }

    /// Serialize `value` and validate it
    pub fn validate_entity<T: Serialize>(&self, kind: SchemaKind, value: &T) -> AssistResult<()> {
        self.validate(kind, &serde_json::to_value(value)?)
    }
}

fn compile(kind: SchemaKind, raw: &str, origin: &str) -> AssistResult<CompiledSchema> {
    let raw: Value = serde_json::from_str(raw)
        .map_err(|e| AssistError::InvalidInput(format!("Schema {} ({}) is not JSON: {}", kind, origin, e)))?;

    let validator = jsonschema::validator_for(&raw)
        .map_err(|e| AssistError::InvalidInput(format!("Schema {} ({}) is invalid: {}", kind, origin, e)))?;

    Ok(CompiledSchema { raw, validator })
}
