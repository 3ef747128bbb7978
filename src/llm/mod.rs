// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! LLM provider abstraction layer.
//!
//! Supports:
//! - Ollama (local) - default, offline
//! - OpenAI (cloud)
//! - Anthropic (cloud)
//!
//! Every provider returns a single JSON object for a prompt plus a schema.
//! The router tries them in a fixed preference order.

pub mod anthropic;
pub mod ollama;
pub mod openai;
pub mod router;

pub use anthropic::AnthropicProvider;
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
pub use router::{Generation, LlmRouter};

use serde_json::Value;
use std::time::Duration;

use crate::errors::ProviderError;

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Generate one JSON object intended to satisfy `schema`.
    /// Schema conformance is checked by the caller.
    async fn generate_structured(
        &self,
        prompt: &str,
        schema: &Value,
        temperature: f64,
    ) -> Result<Value, ProviderError>;

    /// Advisory safety screen. The policy guard stays authoritative.
    fn validate_safety(&self, text: &str) -> bool {
        basic_safety_check(text)
    }

    async fn is_available(&self) -> bool;

    /// Provider name used in the preference order
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

const UNSAFE_PHRASES: [&str; 6] = [
    "exploit code",
    "payload generation",
    "bypass authentication",
    "reverse shell",
    "backdoor",
    "malware",
];

pub fn basic_safety_check(text: &str) -> bool {
    let lower = text.to_lowercase();
    !UNSAFE_PHRASES.iter().any(|p| lower.contains(p))
}

/// System prompt shared by every provider
pub fn structured_system_prompt(schema: &Value) -> String {
    let schema_text = serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
    format!(
        "You are a security analysis assistant. You MUST respond with ONLY valid JSON that matches this schema:\n\n\
         {}\n\n\
         Rules:\n\
         - Output ONLY the JSON object, no markdown, no explanations\n\
         - Follow the schema exactly\n\
         - All required fields must be present\n\
         - Do not include exploit code, payloads, or bypass instructions\n\
         - Focus on validation, evidence collection, and risk assessment\n",
        schema_text
    )
}

/// Parse model text as a JSON object, tolerating a surrounding code fence.
pub fn parse_json_object(text: &str) -> Result<Value, ProviderError> {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(body).map_err(|e| ProviderError::MalformedJson(e.to_string()))?;

    if !value.is_object() {
        return Err(ProviderError::MalformedJson(format!(
            "expected a JSON object, got {}",
            json_type(&value)
        )));
    }

    Ok(value)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

pub(crate) fn build_client(timeout: Duration, provider: &str) -> Result<reqwest::Client, ProviderError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ProviderError::Other(format!("Failed to create HTTP client for {}: {}", provider, e)))
}

/// Send a request and decode a 2xx JSON body
pub(crate) async fn send_json(request: reqwest::RequestBuilder, timeout: Duration) -> Result<Value, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, timeout))?;

    let status = response.status();
    let url = response.url().to_string();

    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::Http {
            status: status.as_u16(),
            url,
            body,
        });
    }

    let text = response
        .text()
        .await
        .map_err(|e| ProviderError::from_reqwest(e, timeout))?;

    serde_json::from_str(&text).map_err(|e| ProviderError::MalformedJson(format!("response envelope: {}", e)))
}
