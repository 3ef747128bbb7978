// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

//! Provider router with ordered fallback.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{AnthropicProvider, LlmProvider, OllamaProvider, OpenAiProvider};
use crate::config::{default_provider_order, LlmConfig};
use crate::errors::{AssistError, AssistResult};

/// A structured result together with the provider that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    pub provider: String,
    pub value: Value,
}

pub struct LlmRouter {
    providers: Vec<Arc<dyn LlmProvider>>,
    provider_order: Vec<String>,
    last_used: Mutex<Option<String>>,
}

impl LlmRouter {
    /// Router over `providers`, tried in `provider_order`.
    /// Providers whose name is not in the order are never called.
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>, provider_order: Vec<String>) -> Self {
        Self {
            providers,
            provider_order,
            last_used: Mutex::new(None),
        }
    }

    /// Router over `providers` with the default order (ollama, openai, anthropic)
    pub fn with_default_order(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self::new(providers, default_provider_order())
    }

    /// Register the concrete providers the configuration enables.
    /// Cloud providers are registered only when they have an API key.
    pub fn from_config(config: &LlmConfig) -> Self {
        let mut providers: Vec<Arc<dyn LlmProvider>> = Vec::new();

        if config.ollama.enabled {
            match OllamaProvider::new(&config.ollama) {
                Ok(p) => providers.push(Arc::new(p)),
                Err(e) => debug!(error = %e, "Ollama provider not registered"),
            }
        }

        if config.openai.api_key.is_some() {
            match OpenAiProvider::new(&config.openai) {
                Ok(p) => providers.push(Arc::new(p)),
                Err(e) => debug!(error = %e, "OpenAI provider not registered"),
            }
        }

        if config.anthropic.api_key.is_some() {
            match AnthropicProvider::new(&config.anthropic) {
                Ok(p) => providers.push(Arc::new(p)),
                Err(e) => debug!(error = %e, "Anthropic provider not registered"),
            }
        }

        info!(
            registered = ?providers.iter().map(|p| p.name().to_string()).collect::<Vec<_>>(),
            order = ?config.provider_order,
            "LLM router configured"
        );

        Self::new(providers, config.provider_order.clone())
    }

    pub fn provider_order(&self) -> &[String] {
        &self.provider_order
    }

    fn provider(&self, name: &str) -> Option<&Arc<dyn LlmProvider>> {
        self.providers.iter().find(|p| p.name() == name)
    }

    /// Registered and available providers, in preference order
    pub async fn available_providers(&self) -> Vec<String> {
        let mut available = Vec::new();
        for name in &self.provider_order {
            if let Some(provider) = self.provider(name) {
                if provider.is_available().await {
                    available.push(name.clone());
                }
            }
        }
        available
    }

    /// Name of the provider that produced the most recent successful result
    pub fn last_used_provider(&self) -> Option<String> {
        self.last_used.lock().clone()
    }

    /// Try each available provider in order; the first success wins.
    pub async fn generate_structured(&self, prompt: &str, schema: &Value, temperature: f64) -> AssistResult<Value> {
        self.generate(prompt, schema, temperature).await.map(|g| g.value)
    }

    /// Same fallback as `generate_structured`, keeping the winning provider's name
    pub async fn generate(&self, prompt: &str, schema: &Value, temperature: f64) -> AssistResult<Generation> {
        let mut attempted = Vec::new();
        let mut last_error = None;

        for name in &self.provider_order {
            let Some(provider) = self.provider(name) else {
                debug!(provider = %name, "Provider not registered, skipping");
                continue;
            };

            if !provider.is_available().await {
                debug!(provider = %name, "Provider not available, skipping");
                continue;
            }

            attempted.push(name.clone());
            info!(provider = %name, "Attempting generation");

            match provider.generate_structured(prompt, schema, temperature).await {
                Ok(value) => {
                    *self.last_used.lock() = Some(name.clone());
                    info!(provider = %name, "Generation succeeded");
                    return Ok(Generation {
                        provider: name.clone(),
                        value,
                    });
                }
                Err(e) => {
                    warn!(provider = %name, error = %e, retryable = e.is_retryable(), "Provider failed");
                    last_error = Some(AssistError::Provider {
                        provider: name.clone(),
                        source: e,
                    });
                }
            }
        }

        match last_error {
            Some(err) => Err(AssistError::AllProvidersFailed {
                attempted,
                last_error: err.to_string(),
            }),
            None => Err(AssistError::NoProvidersAvailable),
        }
    }

    /// Advisory check by the first available provider; `true` when none is available.
    pub async fn validate_safety(&self, text: &str) -> bool {
        for name in &self.provider_order {
            if let Some(provider) = self.provider(name) {
                if provider.is_available().await {
                    return provider.validate_safety(text);
                }
            }
        }
        true
    }
}
