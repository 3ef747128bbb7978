// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

// ---------------------------------------------------------------------------
// OpenAI provider (chat completions, JSON mode)
// ---------------------------------------------------------------------------

use serde_json::{json, Value};
use std::time::Duration;

use super::{build_client, parse_json_object, send_json, structured_system_prompt, LlmProvider};
use crate::config::OpenAiConfig;
use crate::errors::ProviderError;

pub struct OpenAiProvider {
    api_key: Option<String>,
    base_url: String,
    model: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: &OpenAiConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            timeout: config.timeout(),
            client: build_client(config.timeout(), "openai")?,
        })
    }
}

#[async_trait::async_trait]
impl LlmProvider for OpenAiProvider {
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        temperature: f64,
    ) -> Result<Value, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("OpenAI API key required (set OPENAI_API_KEY)".to_string()))?;

        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": structured_system_prompt(schema)},
                {"role": "user", "content": prompt},
            ],
            "temperature": temperature,
            "response_format": {"type": "json_object"},
        });

        let request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(api_key)
            .json(&body);

        let envelope = send_json(request, self.timeout).await?;

        let content = envelope["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| ProviderError::MissingContent("OpenAI response has no message content".to_string()))?;

        parse_json_object(content)
    }

    async fn is_available(&self) -> bool {
        self.api_key.is_some()
    }

    fn name(&self) -> &str {
        "openai"
    }
}
