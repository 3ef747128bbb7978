// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Adaptive assistance level evaluation.
//!
//! Decides how much guidance a request may receive. `deep_lab` is only granted
//! for an authorized test against the tester's own lab or CTF target; anything
//! else is clamped to `standard` with a reason naming the failed check.

use serde::{Deserialize, Serialize};

use crate::errors::{AssistError, AssistResult};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Environment {
    ProdClient,
    Lab,
    Ctf,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::ProdClient => "prod_client",
            Environment::Lab => "lab",
            Environment::Ctf => "ctf",
        }
    }
}

impl std::str::FromStr for Environment {
    type Err = AssistError;

    fn from_str(s: &str) -> AssistResult<Self> {
        match s.to_lowercase().as_str() {
            "prod_client" | "prod" | "production" => Ok(Environment::ProdClient),
            "lab" => Ok(Environment::Lab),
            "ctf" => Ok(Environment::Ctf),
            _ => Err(AssistError::InvalidInput(format!(
                "Unknown environment '{}'. Use prod_client, lab or ctf.",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TargetOwner {
    #[serde(rename = "self")]
    Own,
    Client,
    Unknown,
}

impl TargetOwner {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetOwner::Own => "self",
            TargetOwner::Client => "client",
            TargetOwner::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for TargetOwner {
    type Err = AssistError;

    fn from_str(s: &str) -> AssistResult<Self> {
        match s.to_lowercase().as_str() {
            "self" | "own" => Ok(TargetOwner::Own),
            "client" => Ok(TargetOwner::Client),
            "unknown" => Ok(TargetOwner::Unknown),
            _ => Err(AssistError::InvalidInput(format!(
                "Unknown target owner '{}'. Use self, client or unknown.",
                s
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum EffectiveAssistLevel {
    /// Validation/evidence only, safe testing guidance
    #[default]
    Standard,
    /// Broader guidance in lab environments
    DeepLab,
}

impl EffectiveAssistLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EffectiveAssistLevel::Standard => "standard",
            EffectiveAssistLevel::DeepLab => "deep_lab",
        }
    }
}

impl std::fmt::Display for EffectiveAssistLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EffectiveAssistLevel {
    type Err = AssistError;

    fn from_str(s: &str) -> AssistResult<Self> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(EffectiveAssistLevel::Standard),
            "deep_lab" | "deep-lab" => Ok(EffectiveAssistLevel::DeepLab),
            _ => Err(AssistError::InvalidInput(format!(
                "Unknown assistance level '{}'. Use standard or deep_lab.",
                s
            ))),
        }
    }
}

/// Per-request context supplied by the caller. Not persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistContext {
    pub environment: Environment,
    /// Caller's assertion of written authorization
    pub authorization: bool,
    pub target_owner: TargetOwner,
    #[serde(default)]
    pub requested_level: EffectiveAssistLevel,
}

impl AssistContext {
    pub fn new(environment: Environment, authorization: bool, target_owner: TargetOwner) -> Self {
        Self {
            environment,
            authorization,
            target_owner,
            requested_level: EffectiveAssistLevel::Standard,
        }
    }

    pub fn requesting(mut self, level: EffectiveAssistLevel) -> Self {
        self.requested_level = level;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AssistEvaluation {
    pub effective_level: EffectiveAssistLevel,
    /// Why the level was granted or clamped, in evaluation order
    pub reasons: Vec<String>,
    pub context: AssistContext,
}

/// Evaluate the effective assistance level for a request.
///
/// Checks run in a fixed order (environment, authorization, ownership) and
/// stop at the first failure.
pub fn evaluate_assist_level(context: &AssistContext) -> AssistEvaluation {
    let clamp = |reason: String| AssistEvaluation {
        effective_level: EffectiveAssistLevel::Standard,
        reasons: vec![reason],
        context: context.clone(),
    };

    if context.requested_level == EffectiveAssistLevel::Standard {
        return clamp("requested_level=standard".to_string());
    }

    if !matches!(context.environment, Environment::Lab | Environment::Ctf) {
        return clamp(format!(
            "clamped: environment={} (requires lab or ctf)",
            context.environment.as_str()
        ));
    }

    if !context.authorization {
        return clamp("clamped: authorization=false".to_string());
    }

    if context.target_owner != TargetOwner::Own {
        return clamp(format!(
            "clamped: target_owner={} (requires self)",
            context.target_owner.as_str()
        ));
    }

    AssistEvaluation {
        effective_level: EffectiveAssistLevel::DeepLab,
        reasons: vec!["deep_lab_enabled: environment=lab/ctf, authorized=true, target_owner=self".to_string()],
        context: context.clone(),
    }
}
