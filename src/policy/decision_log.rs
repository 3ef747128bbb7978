// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Append-only JSON-Lines decision log.
//!
//! One `DecisionLogEntry` per line, keys sorted. Redacted entries have every
//! detail value except `reason` and `event` replaced before they are written,
//! so blocked content never reaches the file.

use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use crate::errors::{AssistError, AssistResult};
use crate::types::{canonical_json, DecisionLogEntry};

pub const REDACTION_MARKER: &str = "[REDACTED]";

/// Detail keys that survive redaction
const UNREDACTED_KEYS: [&str; 2] = ["reason", "event"];

pub struct DecisionLog {
    path: PathBuf,
    /// Serialises appends from this process
    write_lock: Mutex<()>,
}

impl DecisionLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one entry. The entry is redacted first when `entry.redacted` is set.
    pub fn append(&self, entry: &DecisionLogEntry) -> AssistResult<()> {
        let entry = if entry.redacted {
            redact(entry)
        } else {
            entry.clone()
        };

        let line = canonical_json(&serde_json::to_value(&entry)?);

        let _guard = self.write_lock.lock();

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| AssistError::io(parent, e))?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| AssistError::io(&self.path, e))?;

        writeln!(file, "{}", line).map_err(|e| AssistError::io(&self.path, e))?;

        Ok(())
    }

    /// Read every entry back, oldest first. A missing file is an empty log.
    pub fn read_all(&self) -> AssistResult<Vec<DecisionLogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let file = std::fs::File::open(&self.path).map_err(|e| AssistError::io(&self.path, e))?;
        let mut entries = Vec::new();

        for line in BufReader::new(file).lines() {
            let line = line.map_err(|e| AssistError::io(&self.path, e))?;
            if line.trim().is_empty() {
                continue;
            }
            entries.push(serde_json::from_str(&line)?);
        }

        Ok(entries)
    }
}

fn redact(entry: &DecisionLogEntry) -> DecisionLogEntry {
    let details: Map<String, Value> = entry
        .details
        .iter()
        .map(|(key, value)| {
            if UNREDACTED_KEYS.contains(&key.as_str()) {
                (key.clone(), value.clone())
            } else {
                (key.clone(), Value::String(REDACTION_MARKER.to_string()))
            }
        })
        .collect();

    DecisionLogEntry {
        details,
        ..entry.clone()
    }
}
