// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Hypothesis drafting.
//!
//! Observations are grouped by (category, host). Each group becomes one
//! prompt; the model's answer is schema-checked with a bounded repair loop,
//! screened by the policy guard, and only then turned into a `Hypothesis`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::adaptive::{evaluate_assist_level, AssistContext, EffectiveAssistLevel};
use crate::errors::{AssistError, AssistResult};
use crate::llm::LlmRouter;
use crate::policy::PolicyGuard;
use crate::schema::{SchemaKind, SchemaValidator};
use crate::types::{value_as_text, DecisionEvent, DecisionLogEntry, Hypothesis, Observation, ObservationCategory};

/// First attempt plus two repairs
pub const MAX_ATTEMPTS: usize = 3;

/// Observations sharing a category and host, in first-seen order
#[derive(Debug, Clone)]
pub struct ObservationCluster<'a> {
    pub category: ObservationCategory,
    pub host: String,
    pub observations: Vec<&'a Observation>,
}

impl ObservationCluster<'_> {
    pub fn observation_ids(&self) -> Vec<String> {
        self.observations.iter().map(|o| o.id.clone()).collect()
    }

    pub fn candidate_id(&self) -> String {
        Hypothesis::candidate_id(&self.observation_ids())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DraftOutcome {
    pub effective_level: EffectiveAssistLevel,
    pub reasons: Vec<String>,
    pub provider_used: Option<String>,
    pub hypotheses: Vec<Hypothesis>,
}

/// Group by (category, host). Cluster order follows first appearance.
pub fn cluster_observations(observations: &[Observation]) -> Vec<ObservationCluster<'_>> {
    let mut clusters: Vec<ObservationCluster<'_>> = Vec::new();

    for obs in observations {
        let host = obs.host();
        match clusters
            .iter_mut()
            .find(|c| c.category == obs.category && c.host == host)
        {
            Some(cluster) => cluster.observations.push(obs),
            None => clusters.push(ObservationCluster {
                category: obs.category,
                host,
                observations: vec![obs],
            }),
        }
    }

    clusters
}

fn safety_constraints(level: EffectiveAssistLevel) -> &'static str {
    match level {
        EffectiveAssistLevel::DeepLab => {
            "Safety Constraints (LAB MODE):\n\
             - Focus on validation techniques and evidence collection\n\
             - Provide testing methodologies appropriate for lab environments\n\
             - Include risk framing and threat modeling\n\
             - Suggest safe verification strategies\n\
             - DO NOT provide actual exploit code or weaponized payloads\n\
             - DO NOT provide bypass steps or persistence mechanisms\n\
             - Cite observation IDs in the rationale"
        }
        EffectiveAssistLevel::Standard => {
            "Safety Constraints (STANDARD MODE):\n\
             - Focus ONLY on validation checklists and evidence collection\n\
             - Provide safe, non-destructive testing guidance\n\
             - Include risk framing suitable for client environments\n\
             - DO NOT provide exploitation guidance\n\
             - DO NOT provide exploit code, payloads, or bypass instructions\n\
             - Cite observation IDs in the rationale"
        }
    }
}

/// Prompt for one cluster at the given level
pub fn build_prompt(cluster: &ObservationCluster<'_>, level: EffectiveAssistLevel) -> String {
    let observations = cluster
        .observations
        .iter()
        .map(|obs| {
            let data = serde_json::to_string_pretty(&obs.data).unwrap_or_else(|_| "{}".to_string());
            format!(
                "Observation {}:\n  Category: {}\n  Tags: {}\n  Data: {}\n  Confidence: {}",
                obs.id,
                obs.category,
                obs.tags.join(", "),
                data,
                obs.confidence
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let related = Value::from(cluster.observation_ids());

    format!(
        "Based on the following observations, draft a security hypothesis.\n\n\
         Observations:\n{observations}\n\n\
         {constraints}\n\n\
         Generate a JSON hypothesis with:\n\
         - id: \"{id}\"\n\
         - related_observations: {related}\n\
         - title: Short hypothesis title (max 100 chars)\n\
         - description: Technical description of the potential security issue (2-4 sentences)\n\
         - risk_tags: List of relevant risk tags (e.g., [\"exposure\", \"misconfiguration\", \"authentication\"])\n\
         - confidence: Float 0-1 representing confidence in this hypothesis\n\
         - rationale: Why this hypothesis was formed based on the observations (cite observation IDs)\n\
         - requires_validation: boolean (default true)\n\n\
         Output ONLY valid JSON matching the schema. No markdown formatting.",
        observations = observations,
        constraints = safety_constraints(level),
        id = cluster.candidate_id(),
        related = related,
    )
}

/// Base prompt plus every earlier validation failure, oldest first
pub fn repair_prompt(base: &str, errors: &[String]) -> String {
    let history = errors
        .iter()
        .enumerate()
        .map(|(i, e)| format!("Attempt {}: {}", i + 1, e))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{}\n\nPREVIOUS ATTEMPT FAILED VALIDATION:\n{}\n\n\
         Please provide a corrected JSON response that exactly matches the schema.",
        base, history
    )
}

/// Checks the schema cannot express: ids must come from the cluster and be cited
fn semantic_errors(candidate: &Value, cluster_ids: &[String]) -> Vec<String> {
    let mut errors = Vec::new();

    let related: Vec<String> = candidate["related_observations"]
        .as_array()
        .map(|ids| ids.iter().map(value_as_text).collect())
        .unwrap_or_default();

    let foreign: Vec<&String> = related.iter().filter(|id| !cluster_ids.contains(id)).collect();
    if !foreign.is_empty() {
        errors.push(format!(
            "related_observations contains ids outside this cluster: {:?} (allowed: {:?})",
            foreign, cluster_ids
        ));
    }

    let rationale = candidate["rationale"].as_str().unwrap_or_default();
    if !cluster_ids.iter().any(|id| rationale.contains(id.as_str())) {
        errors.push(format!("rationale must cite at least one observation id from {:?}", cluster_ids));
    }

    errors
}

pub struct HypothesisDrafter {
    router: Arc<LlmRouter>,
    guard: Arc<PolicyGuard>,
    schemas: SchemaValidator,
    temperature: f64,
}

impl HypothesisDrafter {
    pub fn new(router: Arc<LlmRouter>, guard: Arc<PolicyGuard>, schemas: SchemaValidator) -> Self {
        Self {
            router,
            guard,
            schemas,
            temperature: 0.0,
        }
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn router(&self) -> &LlmRouter {
        &self.router
    }

    /// Draft up to `max_hypotheses` hypotheses, one per cluster.
    ///
    /// A cluster whose output never validates, whose providers all fail, or
    /// whose text the guard blocks is dropped. Having no provider at all
    /// aborts the batch.
    pub async fn draft_hypotheses(
        &self,
        observations: &[Observation],
        context: &AssistContext,
        max_hypotheses: usize,
    ) -> AssistResult<DraftOutcome> {
        if max_hypotheses == 0 {
            return Err(AssistError::InvalidInput("max_hypotheses must be at least 1".to_string()));
        }
        for obs in observations {
            obs.validate()?;
        }

        let evaluation = evaluate_assist_level(context);
        let clusters = cluster_observations(observations);

        info!(
            observations = observations.len(),
            clusters = clusters.len(),
            max_hypotheses,
            level = %evaluation.effective_level,
            "Drafting hypotheses"
        );

        let mut hypotheses = Vec::new();
        let mut provider_used = None;

        for (index, cluster) in clusters.iter().take(max_hypotheses).enumerate() {
            match self
                .draft_single(cluster, evaluation.effective_level, &mut provider_used)
                .await
            {
                Ok(Some(hypothesis)) => hypotheses.push(hypothesis),
                Ok(None) => {}
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    error!(cluster = index, error = %e, "Failed to draft hypothesis for cluster");
                }
            }
        }

        Ok(DraftOutcome {
            effective_level: evaluation.effective_level,
            reasons: evaluation.reasons,
            provider_used,
            hypotheses,
        })
    }

    /// `provider_used` is set whenever a provider returns output for this cluster
    async fn draft_single(
        &self,
        cluster: &ObservationCluster<'_>,
        level: EffectiveAssistLevel,
        provider_used: &mut Option<String>,
    ) -> AssistResult<Option<Hypothesis>> {
        let schema = self.schemas.schema(SchemaKind::Hypothesis)?;
        let cluster_ids = cluster.observation_ids();
        let candidate_id = cluster.candidate_id();
        let prompt = build_prompt(cluster, level);

        let mut errors: Vec<String> = Vec::new();

        for attempt in 1..=MAX_ATTEMPTS {
            let attempt_prompt = if errors.is_empty() {
                prompt.clone()
            } else {
                repair_prompt(&prompt, &errors)
            };

            let generation = self.router.generate(&attempt_prompt, schema, self.temperature).await?;
            *provider_used = Some(generation.provider.clone());
            let candidate = generation.value;

            let mut problems = self.schemas.errors(SchemaKind::Hypothesis, &candidate)?;
            if problems.is_empty() {
                problems = semantic_errors(&candidate, &cluster_ids);
            }

            if !problems.is_empty() {
                let message = problems.join("; ");
                warn!(attempt, hypothesis = %candidate_id, error = %message, "Hypothesis failed validation");
                errors.push(message);
                continue;
            }

            let mut hypothesis: Hypothesis = match serde_json::from_value(candidate) {
                Ok(h) => h,
                Err(e) => {
                    warn!(attempt, hypothesis = %candidate_id, error = %e, "Hypothesis failed to decode");
                    errors.push(e.to_string());
                    continue;
                }
            };

            let text = format!("{}\n{}\n{}", hypothesis.title, hypothesis.description, hypothesis.rationale);
            let mut guard_context = Map::new();
            guard_context.insert("source".to_string(), json!("hypothesis_draft"));
            guard_context.insert("hypothesis_id".to_string(), json!(candidate_id));

            if !self.guard.check_content(&text, &guard_context) {
                warn!(hypothesis = %candidate_id, "Hypothesis blocked by policy guard");
                return Ok(None);
            }

            hypothesis.id = candidate_id.clone();

            let mut details = Map::new();
            details.insert("hypothesis_id".to_string(), json!(hypothesis.id));
            details.insert("related_observations".to_string(), json!(hypothesis.related_observations));
            details.insert("effective_level".to_string(), json!(level));
            details.insert("attempts".to_string(), json!(attempt));
            details.insert("provider".to_string(), json!(generation.provider));

            let entry = DecisionLogEntry::new(DecisionEvent::HypothesisDrafted, self.guard.assistance_level(), details);
            if let Err(e) = self.guard.log_decision(&entry) {
                warn!(error = %e, "Failed to record drafted hypothesis");
            }

            debug!(hypothesis = %hypothesis.id, attempt, "Hypothesis accepted");
            return Ok(Some(hypothesis));
        }

        error!(
            hypothesis = %candidate_id,
            attempts = MAX_ATTEMPTS,
            "Max repair attempts reached, dropping cluster"
        );
        Ok(None)
    }
}
