// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

// ---------------------------------------------------------------------------
// Ollama provider (local models)
// ---------------------------------------------------------------------------

use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use super::{build_client, parse_json_object, send_json, structured_system_prompt, LlmProvider};
use crate::config::OllamaConfig;
use crate::errors::ProviderError;

pub struct OllamaProvider {
    base_url: String,
    model: String,
    timeout: Duration,
    availability_timeout: Duration,
    client: reqwest::Client,
}

impl OllamaProvider {
    pub fn new(config: &OllamaConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
            availability_timeout: config.availability_timeout(),
            client: build_client(config.timeout(), "ollama")?,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait::async_trait]
impl LlmProvider for OllamaProvider {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        temperature: f64,
    ) -> Result<Value, ProviderError> {
        let body = json!({
            "model": self.model,
            "prompt": prompt,
            "system": structured_system_prompt(schema),
            "stream": false,
            "temperature": temperature,
            "format": "json",
        });

        let url = format!("{}/api/generate", self.base_url);
        let envelope = send_json(self.client.post(&url).json(&body), self.timeout).await?;

        let text = envelope
            .get("response")
            .and_then(Value::as_str)
            .ok_or_else(|| ProviderError::MissingContent("Ollama response has no 'response' field".to_string()))?;

        parse_json_object(text)
    }

    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        match self
            .client
            .get(&url)
            .timeout(self.availability_timeout)
            .send()
            .await
        {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(error = %e, url = %url, "Ollama not reachable");
                false
            }
        }
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
