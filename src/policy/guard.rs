// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Policy guard.
//!
//! The authoritative content filter. Two case-insensitive pattern tiers:
//! the always-blocked tier applies at every assistance level, the
//! validation-only tier applies only at `VALIDATION_ONLY`. A block never
//! raises; it returns `false` and appends a redacted `policy_blocked`
//! entry to the decision log.

use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use super::decision_log::DecisionLog;
use crate::errors::{AssistError, AssistResult};
use crate::types::{AssistanceLevel, DecisionEvent, DecisionLogEntry};

pub const DEFAULT_DECISION_LOG: &str = "decision_log.jsonl";

const ALWAYS_BLOCKED_SOURCES: [&str; 15] = [
    r"\bexploit\s+code\b",
    r"\bpayload\s+generation\b",
    r"\bbypass\s+(authentication|authorization)\b",
    r"\bpersistence\s+mechanism\b",
    r"\bprivilege\s+escalation\s+step",
    r"\bexfiltration\s+method\b",
    r"\bweaponized?\s+(script|tool|payload)\b",
    r"\breverser?\s+shell\b",
    r"\bbackdoor\b",
    r"\bmalware\b",
    r"\bransomware\b",
    r"\bcrypto\s?locker\b",
    r"\bdenial\s+of\s+service\b",
    r"\bdos\s+attack\b",
    r"\bddos\b",
];

// Narrow on purpose: "test for injection" must pass at level 0
const VALIDATION_ONLY_SOURCES: [&str; 4] = [
    r"\bhow\s+to\s+exploit.*step-by-step\b",
    r"\bexecution\s+step.*exploit.*code\b",
    r"\battack\s+vector.*implement.*payload\b",
    r"\binjection\s+payload.*example\b",
];

fn compile(sources: &[&'static str]) -> Vec<(&'static str, Regex)> {
    sources
        .iter()
        .map(|src| {
            let regex = RegexBuilder::new(src)
                .case_insensitive(true)
                .build()
                .expect("policy pattern must compile");
            (*src, regex)
        })
        .collect()
}

static ALWAYS_BLOCKED: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| compile(&ALWAYS_BLOCKED_SOURCES));

static VALIDATION_ONLY_BLOCKED: Lazy<Vec<(&'static str, Regex)>> =
    Lazy::new(|| compile(&VALIDATION_ONLY_SOURCES));

/// Compiled always-blocked tier, `(source, regex)` in declaration order.
pub fn always_blocked_patterns() -> &'static [(&'static str, Regex)] {
    &ALWAYS_BLOCKED
}

/// Compiled validation-only tier, `(source, regex)` in declaration order.
pub fn validation_only_patterns() -> &'static [(&'static str, Regex)] {
    &VALIDATION_ONLY_BLOCKED
}

/// Which tier matched and on what pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    pub reason: &'static str,
    pub pattern: &'static str,
}

pub struct PolicyGuard {
    assistance_level: AssistanceLevel,
    profile_path: Option<PathBuf>,
    log: DecisionLog,
}

impl PolicyGuard {
    /// Build a guard for `assistance_level`.
    ///
    /// `LAB_TRAINING` requires a readable JSON profile that sets
    /// `"assistance_level": 1`; anything else is a configuration error.
    pub fn new(
        assistance_level: AssistanceLevel,
        profile_path: Option<&Path>,
        decision_log_path: Option<&Path>,
    ) -> AssistResult<Self> {
        if assistance_level == AssistanceLevel::LabTraining {
            let path = profile_path.ok_or_else(|| {
                AssistError::Config(
                    "LAB_TRAINING level requires explicit profile file. \
                     Create a profile.json with 'assistance_level': 1"
                        .to_string(),
                )
            })?;
            validate_profile(path)?;
        }

        let log_path = decision_log_path
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DECISION_LOG));

        info!(
            level = assistance_level.name(),
            decision_log = %log_path.display(),
            "Policy guard initialised"
        );

        Ok(Self {
            assistance_level,
            profile_path: profile_path.map(Path::to_path_buf),
            log: DecisionLog::new(log_path),
        })
    }

    pub fn assistance_level(&self) -> AssistanceLevel {
        self.assistance_level
    }

    pub fn profile_path(&self) -> Option<&Path> {
        self.profile_path.as_deref()
    }

    pub fn decision_log(&self) -> &DecisionLog {
        &self.log
    }

    /// First pattern `content` trips at this guard's level, without logging.
    pub fn first_violation(&self, content: &str) -> Option<PolicyViolation> {
        if let Some((pattern, _)) = ALWAYS_BLOCKED.iter().find(|(_, re)| re.is_match(content)) {
            return Some(PolicyViolation {
                reason: "always_blocked_pattern",
                pattern: *pattern,
            });
        }

        if self.assistance_level == AssistanceLevel::ValidationOnly {
            if let Some((pattern, _)) = VALIDATION_ONLY_BLOCKED.iter().find(|(_, re)| re.is_match(content)) {
                return Some(PolicyViolation {
                    reason: "validation_only_blocked_pattern",
                    pattern: *pattern,
                });
            }
        }

        None
    }

    /// Returns `true` when `content` may be shown.
    /// A block is logged (redacted) together with `context`.
    pub fn check_content(&self, content: &str, context: &Map<String, Value>) -> bool {
        let Some(violation) = self.first_violation(content) else {
            return true;
        };

        debug!(reason = violation.reason, "Content blocked by policy guard");

        let mut details = Map::new();
        details.insert("reason".to_string(), json!(violation.reason));
        details.insert("pattern".to_string(), json!(violation.pattern));
        details.insert("context".to_string(), Value::Object(context.clone()));

        let entry = DecisionLogEntry::new(DecisionEvent::PolicyBlocked, self.assistance_level, details).redacted();
        if let Err(e) = self.log_decision(&entry) {
            // Blocking still stands when the audit write fails
            warn!(error = %e, "Failed to record policy block");
        }

        false
    }

    pub fn log_decision(&self, entry: &DecisionLogEntry) -> AssistResult<()> {
        self.log.append(entry)
    }
}

fn validate_profile(path: &Path) -> AssistResult<()> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        AssistError::Config(format!(
            "LAB_TRAINING level requires explicit profile file ({}): {}",
            path.display(),
            e
        ))
    })?;

    let profile: Value = serde_json::from_str(&raw)
        .map_err(|e| AssistError::Config(format!("Invalid profile file {}: {}", path.display(), e)))?;

    if profile.get("assistance_level").and_then(Value::as_u64) != Some(1) {
        return Err(AssistError::Config(format!(
            "Invalid profile file {}: profile must explicitly set assistance_level: 1",
            path.display()
        )));
    }

    Ok(())
}
