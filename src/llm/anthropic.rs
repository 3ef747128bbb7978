// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

// ---------------------------------------------------------------------------
// Anthropic provider (messages API)
// ---------------------------------------------------------------------------

use serde_json::{json, Value};
use std::time::Duration;

use super::{build_client, parse_json_object, send_json, structured_system_prompt, LlmProvider};
use crate::config::AnthropicConfig;
use crate::errors::ProviderError;

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    max_tokens: u32,
    timeout: Duration,
    client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: &AnthropicConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
            client: build_client(config.timeout(), "anthropic")?,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for AnthropicProvider {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        temperature: f64,
    ) -> Result<Value, ProviderError> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            ProviderError::NotConfigured("Anthropic API key required (set ANTHROPIC_API_KEY)".to_string())
        })?;

        let body = json!({
            "model": self.model,
            "max_tokens": self.max_tokens,
            "temperature": temperature,
            "system": structured_system_prompt(schema),
            "messages": [{"role": "user", "content": prompt}],
        });

        let request = self
            .client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body);

        let envelope = send_json(request, self.timeout).await?;

        let text = envelope["content"]
            .as_array()
            .and_then(|blocks| {
                blocks
                    .iter()
                    .find(|b| b["type"].as_str() == Some("text"))
                    .and_then(|b| b["text"].as_str())
            })
            .ok_or_else(|| ProviderError::MissingContent("Anthropic response has no text block".to_string()))?;

        parse_json_object(text)
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}
