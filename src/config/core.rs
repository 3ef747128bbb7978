// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::types::AssistanceLevel;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
pub struct AssistConfig {
    #[serde(default)]
    #[validate(nested)]
    pub policy: PolicyConfig,

    #[serde(default)]
    #[validate(nested)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub paths: PathsConfig,

    #[serde(default)]
    #[validate(nested)]
    pub drafter: DrafterConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PolicyConfig {
    #[serde(default)]
    pub assistance_level: AssistanceLevel,

    /// Required for LAB_TRAINING
    #[serde(default)]
    pub profile_path: Option<PathBuf>,

    #[serde(default = "default_decision_log")]
    pub decision_log: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LlmConfig {
    #[validate(length(min = 1))]
    #[serde(default = "default_provider_order")]
    pub provider_order: Vec<String>,

    #[validate(range(min = 0.0, max = 2.0))]
    #[serde(default)]
    pub temperature: f64,

    #[serde(default)]
    #[validate(nested)]
    pub ollama: OllamaConfig,

    #[serde(default)]
    #[validate(nested)]
    pub openai: OpenAiConfig,

    #[serde(default)]
    #[validate(nested)]
    pub anthropic: AnthropicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OllamaConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[validate(url)]
    #[serde(default = "default_ollama_url")]
    pub base_url: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_ollama_model")]
    pub model: String,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_ollama_timeout")]
    pub timeout_secs: u64,

    #[validate(range(min = 1, max = 60))]
    #[serde(default = "default_availability_timeout")]
    pub availability_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct OpenAiConfig {
    /// Falls back to OPENAI_API_KEY
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[validate(url)]
    #[serde(default = "default_openai_url")]
    pub base_url: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_openai_model")]
    pub model: String,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AnthropicConfig {
    /// Falls back to ANTHROPIC_API_KEY
    #[serde(default, skip_serializing)]
    pub api_key: Option<String>,

    #[validate(url)]
    #[serde(default = "default_anthropic_url")]
    pub base_url: String,

    #[validate(length(min = 1))]
    #[serde(default = "default_anthropic_model")]
    pub model: String,

    #[validate(range(min = 1, max = 3600))]
    #[serde(default = "default_cloud_timeout")]
    pub timeout_secs: u64,

    #[validate(range(min = 1, max = 200000))]
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Overrides for the embedded schemas
    #[serde(default)]
    pub schemas_dir: Option<PathBuf>,

    #[serde(default = "default_rules_file")]
    pub selector_rules: PathBuf,

    #[serde(default = "default_playbooks_dir")]
    pub playbooks_dir: PathBuf,

    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DrafterConfig {
    #[validate(range(min = 1, max = 100))]
    #[serde(default = "default_max_hypotheses")]
    pub max_hypotheses: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default = "default_false")]
    pub log_json: bool,
}

impl OllamaConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn availability_timeout(&self) -> Duration {
        Duration::from_secs(self.availability_timeout_secs)
    }
}

impl OpenAiConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl AnthropicConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            assistance_level: AssistanceLevel::ValidationOnly,
            profile_path: None,
            decision_log: default_decision_log(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider_order: default_provider_order(),
            temperature: 0.0,
            ollama: OllamaConfig::default(),
            openai: OpenAiConfig::default(),
            anthropic: AnthropicConfig::default(),
        }
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: default_ollama_url(),
            model: default_ollama_model(),
            timeout_secs: default_ollama_timeout(),
            availability_timeout_secs: default_availability_timeout(),
        }
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_openai_url(),
            model: default_openai_model(),
            timeout_secs: default_cloud_timeout(),
        }
    }
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_anthropic_url(),
            model: default_anthropic_model(),
            timeout_secs: default_cloud_timeout(),
            max_tokens: default_max_tokens(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            schemas_dir: None,
            selector_rules: default_rules_file(),
            playbooks_dir: default_playbooks_dir(),
            storage_dir: default_storage_dir(),
        }
    }
}

impl Default for DrafterConfig {
    fn default() -> Self {
        Self {
            max_hypotheses: default_max_hypotheses(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

fn default_decision_log() -> PathBuf {
    PathBuf::from(crate::policy::DEFAULT_DECISION_LOG)
}

pub fn default_provider_order() -> Vec<String> {
    vec!["ollama".to_string(), "openai".to_string(), "anthropic".to_string()]
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_ollama_model() -> String {
    "llama3.2:1b".to_string()
}

fn default_ollama_timeout() -> u64 {
    120
}

fn default_availability_timeout() -> u64 {
    5
}

fn default_openai_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_anthropic_url() -> String {
    "https://api.anthropic.com/v1".to_string()
}

fn default_anthropic_model() -> String {
    "claude-3-5-haiku-20241022".to_string()
}

fn default_cloud_timeout() -> u64 {
    60
}

fn default_max_tokens() -> u32 {
    4096
}

fn default_rules_file() -> PathBuf {
    PathBuf::from("playbooks/selector_rules.yaml")
}

fn default_playbooks_dir() -> PathBuf {
    PathBuf::from("playbooks/library")
}

fn default_storage_dir() -> PathBuf {
    PathBuf::from(".bhd")
}

fn default_max_hypotheses() -> usize {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}
