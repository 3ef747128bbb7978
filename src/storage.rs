// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Append-only JSON-Lines store for observations and finding drafts.

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::errors::{AssistError, AssistResult};
use crate::types::{canonical_json, ExportBundle, FindingDraft, Observation};

pub const OBSERVATIONS_FILE: &str = "observations.jsonl";
pub const FINDINGS_FILE: &str = "findings.jsonl";

pub struct JsonlStore {
    storage_dir: PathBuf,
    observations_file: PathBuf,
    findings_file: PathBuf,
}

impl JsonlStore {
    /// Open (and create if needed) a store rooted at `storage_dir`
    pub fn new(storage_dir: impl Into<PathBuf>) -> AssistResult<Self> {
        let storage_dir = storage_dir.into();
        std::fs::create_dir_all(&storage_dir).map_err(|e| AssistError::io(&storage_dir, e))?;

        Ok(Self {
            observations_file: storage_dir.join(OBSERVATIONS_FILE),
            findings_file: storage_dir.join(FINDINGS_FILE),
            storage_dir,
        })
    }

    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    pub fn save_observation(&self, observation: &Observation) -> AssistResult<String> {
        observation.validate()?;
        append_line(&self.observations_file, &serde_json::to_value(observation)?)?;
        debug!(observation = %observation.id, "Observation stored");
        Ok(observation.id.clone())
    }

    /// Persist the observations whose id is not stored yet, including
    /// repeats within `observations`. Returns how many were written.
    pub fn import_observations(&self, observations: &[Observation]) -> AssistResult<usize> {
        let mut known: HashSet<String> = self.load_observations()?.into_iter().map(|o| o.id).collect();
        let mut written = 0;

        for observation in observations {
            if !known.insert(observation.id.clone()) {
                warn!(observation = %observation.id, "Observation already stored");
                continue;
            }
            self.save_observation(observation)?;
            written += 1;
        }

        Ok(written)
    }

    /// Every stored observation, oldest first. Out-of-range confidence is rejected.
    pub fn load_observations(&self) -> AssistResult<Vec<Observation>> {
        let observations: Vec<Observation> = read_lines(&self.observations_file)?;
        for obs in &observations {
            obs.validate()?;
        }
        Ok(observations)
    }

    /// Store a draft, stamping `created_at`
    pub fn save_finding_draft(&self, draft: &FindingDraft) -> AssistResult<String> {
        let mut value = serde_json::to_value(draft)?;
        if let Value::Object(map) = &mut value {
            map.insert("created_at".to_string(), Value::String(Utc::now().to_rfc3339()));
        }
        append_line(&self.findings_file, &value)?;
        debug!(finding = %draft.id, "Finding draft stored");
        Ok(draft.id.clone())
    }

    pub fn load_finding_drafts(&self) -> AssistResult<Vec<FindingDraft>> {
        read_lines(&self.findings_file)
    }

    /// Bundle every stored draft for hand-off to the engagement tracker
    pub fn export_bundle(&self, engagement_id: &str) -> AssistResult<ExportBundle> {
        if engagement_id.trim().is_empty() {
            return Err(AssistError::InvalidInput("engagement_id cannot be empty".to_string()));
        }
        Ok(ExportBundle::new(engagement_id, self.load_finding_drafts()?))
    }
}

fn append_line<T: Serialize>(path: &Path, value: &T) -> AssistResult<()> {
    let line = canonical_json(&serde_json::to_value(value)?);

    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AssistError::io(path, e))?;

    writeln!(file, "{}", line).map_err(|e| AssistError::io(path, e))
}

fn read_lines<T: DeserializeOwned>(path: &Path) -> AssistResult<Vec<T>> {
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = std::fs::File::open(path).map_err(|e| AssistError::io(path, e))?;
    let mut items = Vec::new();

    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.map_err(|e| AssistError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let item = serde_json::from_str(&line).map_err(|e| {
            AssistError::InvalidInput(format!("{} line {}: {}", path.display(), index + 1, e))
        })?;
        items.push(item);
    }

    Ok(items)
}
