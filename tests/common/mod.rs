// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Shared fixtures for integration tests

#![allow(dead_code)]

use bhd_assist::errors::ProviderError;
use bhd_assist::llm::LlmProvider;
use bhd_assist::types::{Observation, ObservationCategory};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::VecDeque;

/// Provider that replays queued results and records every prompt it receives
pub struct ScriptedProvider {
    name: String,
    available: bool,
    responses: Mutex<VecDeque<Result<Value, ProviderError>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            available: true,
            responses: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }

    pub fn respond(self, value: Value) -> Self {
        self.responses.lock().push_back(Ok(value));
        self
    }

    pub fn fail(self, error: ProviderError) -> Self {
        self.responses.lock().push_back(Err(error));
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait::async_trait]
impl LlmProvider for ScriptedProvider {
    async fn generate_structured(
        &self,
        prompt: &str,
        _schema: &Value,
        _temperature: f64,
    ) -> Result<Value, ProviderError> {
        self.prompts.lock().push(prompt.to_string());
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(ProviderError::Other("script exhausted".to_string())))
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    fn name(&self) -> &str {
        &self.name
    }
}

pub fn observation(id: &str, category: ObservationCategory, data: Value) -> Observation {
    let data = data.as_object().cloned().expect("observation data must be an object");
    Observation::new("nmap_scan.xml", category, vec!["network".to_string()], 0.9, data)
        .unwrap()
        .with_id(id)
}

/// Schema-valid hypothesis citing `ids`
pub fn hypothesis_json(ids: &[&str]) -> Value {
    json!({
        "id": "draft",
        "related_observations": ids,
        "title": "SSH exposed on internal host",
        "description": "The host exposes an SSH service. Access controls should be reviewed.",
        "risk_tags": ["exposure"],
        "confidence": 0.7,
        "rationale": format!("Observation {} reports an open SSH service", ids[0]),
        "requires_validation": true
    })
}
