// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - bhd-assist Library
 * Assistant reasoning for authorized penetration tests: observations in,
 * safety-gated hypotheses and validation playbooks out
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

// Core data model and error taxonomy
pub mod errors;
pub mod types;

// Configuration (file + environment)
pub mod config;

// Assistance level evaluation and policy enforcement
pub mod adaptive;
pub mod policy;

// JSON Schema validation of entities and LLM output
pub mod schema;

// LLM providers and fallback routing
pub mod llm;

// Hypothesis drafting with repair loop
pub mod drafter;

// Playbook selection, loading and rendering
pub mod playbooks;

// JSONL persistence and tracker export
pub mod export;
pub mod storage;

pub use adaptive::{evaluate_assist_level, AssistContext, AssistEvaluation, EffectiveAssistLevel, Environment, TargetOwner};
pub use drafter::{DraftOutcome, HypothesisDrafter};
pub use errors::{AssistError, AssistResult, ProviderError};
pub use export::{BhdCliExport, BhdCliFinding};
pub use llm::{LlmProvider, LlmRouter};
pub use playbooks::{Playbook, PlaybookLoader, PlaybookSelector};
pub use policy::PolicyGuard;
pub use schema::{SchemaKind, SchemaValidator};
pub use storage::JsonlStore;
pub use types::{
    AssistanceLevel, DecisionEvent, DecisionLogEntry, EvidencePlan, ExportBundle, FindingDraft, Hypothesis,
    Observation, ObservationCategory,
};
