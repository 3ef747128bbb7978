// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Hypothesis Drafter Tests
 * Clustering, repair loop, guard screening, provider failure handling
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary
 */

mod common;

use bhd_assist::adaptive::{AssistContext, EffectiveAssistLevel, Environment, TargetOwner};
use bhd_assist::drafter::{cluster_observations, HypothesisDrafter};
use bhd_assist::errors::{AssistError, ProviderError};
use bhd_assist::llm::{LlmProvider, LlmRouter};
use bhd_assist::policy::PolicyGuard;
use bhd_assist::schema::SchemaValidator;
use bhd_assist::types::{AssistanceLevel, DecisionEvent, Hypothesis, Observation, ObservationCategory};
use common::{hypothesis_json, observation, ScriptedProvider};
use serde_json::json;
use std::sync::Arc;

fn ssh_observations() -> Vec<Observation> {
    vec![
        observation("s1", ObservationCategory::Service, json!({"host": "host1", "service": "ssh"})),
        observation("s2", ObservationCategory::Service, json!({"host": "host1", "service": "http"})),
        observation("s3", ObservationCategory::Service, json!({"host": "host2", "service": "ssh"})),
    ]
}

fn context() -> AssistContext {
    AssistContext::new(Environment::ProdClient, true, TargetOwner::Client)
}

fn drafter(dir: &tempfile::TempDir, provider: Arc<ScriptedProvider>) -> (HypothesisDrafter, Arc<PolicyGuard>) {
    let guard = Arc::new(
        PolicyGuard::new(
            AssistanceLevel::ValidationOnly,
            None,
            Some(&dir.path().join("decision_log.jsonl")),
        )
        .unwrap(),
    );
    let providers: Vec<Arc<dyn LlmProvider>> = vec![provider];
    let router = Arc::new(LlmRouter::new(providers, vec!["scripted".to_string()]));
    let drafter = HypothesisDrafter::new(router, guard.clone(), SchemaValidator::embedded().unwrap());
    (drafter, guard)
}

#[test]
fn test_clustering_by_category_and_host() {
    let observations = ssh_observations();
    let clusters = cluster_observations(&observations);

    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].host, "host1");
    assert_eq!(clusters[0].observation_ids(), vec!["s1", "s2"]);
    assert_eq!(clusters[1].observation_ids(), vec!["s3"]);
}

#[tokio::test]
async fn test_one_hypothesis_per_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .respond(hypothesis_json(&["s1", "s2"]))
            .respond(hypothesis_json(&["s3"])),
    );
    let (drafter, guard) = drafter(&dir, provider.clone());

    let outcome = drafter.draft_hypotheses(&ssh_observations(), &context(), 5).await.unwrap();

    assert_eq!(outcome.effective_level, EffectiveAssistLevel::Standard);
    assert_eq!(outcome.provider_used.as_deref(), Some("scripted"));
    assert_eq!(outcome.hypotheses.len(), 2);
    assert_eq!(outcome.hypotheses[0].id, Hypothesis::candidate_id(&["s1", "s2"]));
    assert_eq!(outcome.hypotheses[1].related_observations, vec!["s3"]);
    assert!(outcome.hypotheses.iter().all(|h| h.requires_validation));

    let entries = guard.decision_log().read_all().unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.event_type == DecisionEvent::HypothesisDrafted));
    assert_eq!(entries[0].details["attempts"], 1);
}

#[tokio::test]
async fn test_repair_loop_carries_errors() {
    let dir = tempfile::tempdir().unwrap();

    let mut uncited = hypothesis_json(&["s3"]);
    uncited["rationale"] = json!("An exposed service was reported");

    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .respond(json!({"title": "incomplete"}))
            .respond(uncited)
            .respond(hypothesis_json(&["s1"])),
    );
    let (drafter, guard) = drafter(&dir, provider.clone());

    let observations = vec![ssh_observations().remove(0)];
    let outcome = drafter.draft_hypotheses(&observations, &context(), 5).await.unwrap();

    assert_eq!(outcome.hypotheses.len(), 1);
    assert_eq!(provider.calls(), 3);

    let prompts = provider.prompts();
    assert!(!prompts[0].contains("PREVIOUS ATTEMPT FAILED VALIDATION"));
    assert!(prompts[1].contains("Attempt 1:"));
    assert!(!prompts[1].contains("Attempt 2:"));
    assert!(prompts[2].contains("Attempt 1:"));
    assert!(prompts[2].contains("Attempt 2:"));
    assert!(prompts[2].contains("rationale must cite at least one observation id"));

    // The first error is carried forward unchanged
    let first_error = prompts[1]
        .lines()
        .find(|l| l.starts_with("Attempt 1:"))
        .unwrap()
        .to_string();
    assert!(prompts[2].contains(&first_error));

    let entries = guard.decision_log().read_all().unwrap();
    assert_eq!(entries[0].details["attempts"], 3);
}

#[tokio::test]
async fn test_foreign_ids_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .respond(hypothesis_json(&["s9"]))
            .respond(hypothesis_json(&["s9"]))
            .respond(hypothesis_json(&["s9"])),
    );
    let (drafter, guard) = drafter(&dir, provider.clone());

    let observations = vec![ssh_observations().remove(0)];
    let outcome = drafter.draft_hypotheses(&observations, &context(), 5).await.unwrap();

    assert!(outcome.hypotheses.is_empty());
    assert_eq!(provider.calls(), 3);
    assert!(provider.prompts()[2].contains("outside this cluster"));
    assert!(guard.decision_log().read_all().unwrap().is_empty());
}

#[tokio::test]
async fn test_guard_block_drops_hypothesis() {
    let dir = tempfile::tempdir().unwrap();
    let mut blocked = hypothesis_json(&["s1"]);
    blocked["description"] = json!("Use the following exploit code to get a shell.");

    let provider = Arc::new(ScriptedProvider::new("scripted").respond(blocked));
    let (drafter, guard) = drafter(&dir, provider);

    let observations = vec![ssh_observations().remove(0)];
    let outcome = drafter.draft_hypotheses(&observations, &context(), 5).await.unwrap();

    assert!(outcome.hypotheses.is_empty());
    let entries = guard.decision_log().read_all().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].event_type, DecisionEvent::PolicyBlocked);
    assert!(entries[0].redacted);
}

#[tokio::test]
async fn test_no_providers_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new("scripted").unavailable());
    let (drafter, _guard) = drafter(&dir, provider);

    let err = drafter.draft_hypotheses(&ssh_observations(), &context(), 5).await.unwrap_err();
    assert!(matches!(err, AssistError::NoProvidersAvailable));
}

#[tokio::test]
async fn test_provider_failure_drops_only_that_cluster() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .fail(ProviderError::Timeout {
                timeout: std::time::Duration::from_secs(1),
            })
            .respond(hypothesis_json(&["s3"])),
    );
    let (drafter, _guard) = drafter(&dir, provider);

    let outcome = drafter.draft_hypotheses(&ssh_observations(), &context(), 5).await.unwrap();
    assert_eq!(outcome.hypotheses.len(), 1);
    assert_eq!(outcome.hypotheses[0].related_observations, vec!["s3"]);
}

#[tokio::test]
async fn test_max_hypotheses_limits_clusters() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .respond(hypothesis_json(&["s1"]))
            .respond(hypothesis_json(&["s3"])),
    );
    let (drafter, _guard) = drafter(&dir, provider.clone());

    let outcome = drafter.draft_hypotheses(&ssh_observations(), &context(), 1).await.unwrap();
    assert_eq!(outcome.hypotheses.len(), 1);
    assert_eq!(provider.calls(), 1);

    let err = drafter.draft_hypotheses(&ssh_observations(), &context(), 0).await.unwrap_err();
    assert!(matches!(err, AssistError::InvalidInput(_)));
}

#[tokio::test]
async fn test_deep_lab_prompt() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(ScriptedProvider::new("scripted").respond(hypothesis_json(&["s1"])));
    let (drafter, _guard) = drafter(&dir, provider.clone());

    let lab = AssistContext::new(Environment::Lab, true, TargetOwner::Own).requesting(EffectiveAssistLevel::DeepLab);
    let observations = vec![ssh_observations().remove(0)];
    let outcome = drafter.draft_hypotheses(&observations, &lab, 5).await.unwrap();

    assert_eq!(outcome.effective_level, EffectiveAssistLevel::DeepLab);
    assert!(provider.prompts()[0].contains("LAB MODE"));
}

#[tokio::test]
async fn test_provider_used_is_per_batch() {
    let dir = tempfile::tempdir().unwrap();
    let provider = Arc::new(
        ScriptedProvider::new("scripted")
            .respond(hypothesis_json(&["s1"]))
            .fail(ProviderError::Other("model unloaded".to_string())),
    );
    let (drafter, _guard) = drafter(&dir, provider.clone());
    let observations = vec![ssh_observations().remove(0)];

    let first = drafter.draft_hypotheses(&observations, &context(), 5).await.unwrap();
    assert_eq!(first.provider_used.as_deref(), Some("scripted"));
    assert_eq!(first.hypotheses.len(), 1);

    let second = drafter.draft_hypotheses(&observations, &context(), 5).await.unwrap();
    assert!(second.hypotheses.is_empty());
    assert_eq!(second.provider_used, None);
    assert_eq!(provider.calls(), 2);
}
