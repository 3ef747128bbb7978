// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use validator::Validate;

use super::core::AssistConfig;
use crate::types::AssistanceLevel;

pub const KNOWN_PROVIDERS: [&str; 3] = ["ollama", "openai", "anthropic"];

pub struct ConfigValidator;

impl ConfigValidator {
    pub fn validate_assist_config(config: &AssistConfig) -> Result<()> {
        config.validate().context("Configuration validation failed")?;

        Self::validate_policy_config(config)?;
        Self::validate_llm_config(config)?;
        Self::validate_observability_config(config)?;

        Ok(())
    }

    fn validate_policy_config(config: &AssistConfig) -> Result<()> {
        if config.policy.assistance_level == AssistanceLevel::LabTraining && config.policy.profile_path.is_none() {
            return Err(anyhow::anyhow!(
                "policy.profile_path is required when assistance_level is LAB_TRAINING"
            ));
        }

        if config.policy.decision_log.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("policy.decision_log cannot be empty"));
        }

        Ok(())
    }

    fn validate_llm_config(config: &AssistConfig) -> Result<()> {
        let mut seen = Vec::new();

        for provider in &config.llm.provider_order {
            if !KNOWN_PROVIDERS.contains(&provider.as_str()) {
                return Err(anyhow::anyhow!(
                    "Unknown provider '{}' in llm.provider_order (known: {})",
                    provider,
                    KNOWN_PROVIDERS.join(", ")
                ));
            }
            if seen.contains(&provider) {
                return Err(anyhow::anyhow!("Provider '{}' listed twice in llm.provider_order", provider));
            }
            seen.push(provider);
        }

        Ok(())
    }

    fn validate_observability_config(config: &AssistConfig) -> Result<()> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&config.observability.log_level.to_lowercase().as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                config.observability.log_level,
                valid_levels
            ));
        }

        Ok(())
    }

    pub fn generate_validation_report(config: &AssistConfig) -> ValidationReport {
        let mut report = ValidationReport::new();

        if let Err(e) = Self::validate_assist_config(config) {
            report.add_error("assist_config", &format!("{:#}", e));
        }

        let has_cloud_key = config.llm.openai.api_key.is_some() || config.llm.anthropic.api_key.is_some();
        if !config.llm.ollama.enabled && !has_cloud_key {
            report.add_warning(
                "llm",
                "Ollama is disabled and no cloud API key is set; drafting will fail with no providers",
            );
        }

        if config.llm.temperature > 0.5 {
            report.add_warning("llm.temperature", "High temperature makes structured output less reliable");
        }

        if config.policy.assistance_level == AssistanceLevel::LabTraining {
            report.add_info("policy.assistance_level", "LAB_TRAINING enabled; use only in lab environments");
        }

        report
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub errors: HashMap<String, Vec<String>>,
    pub warnings: HashMap<String, Vec<String>>,
    pub info: HashMap<String, Vec<String>>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.errors.entry(field.to_string()).or_default().push(message.to_string());
    }

    pub fn add_warning(&mut self, field: &str, message: &str) {
        self.warnings.entry(field.to_string()).or_default().push(message.to_string());
    }

    pub fn add_info(&mut self, field: &str, message: &str) {
        self.info.entry(field.to_string()).or_default().push(message.to_string());
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_default_config_is_valid() {
        assert!(ConfigValidator::validate_assist_config(&AssistConfig::default()).is_ok());
    }

    #[test]
    fn test_unknown_provider_rejected() {
        let mut config = AssistConfig::default();
        config.llm.provider_order = vec!["ollama".to_string(), "gemini".to_string()];
        assert!(ConfigValidator::validate_assist_config(&config).is_err());

        config.llm.provider_order = vec!["ollama".to_string(), "ollama".to_string()];
        assert!(ConfigValidator::validate_assist_config(&config).is_err());
    }

    #[test]
    fn test_lab_training_needs_profile() {
        let mut config = AssistConfig::default();
        config.policy.assistance_level = AssistanceLevel::LabTraining;
        assert!(ConfigValidator::validate_assist_config(&config).is_err());

        config.policy.profile_path = Some(PathBuf::from("profile.json"));
        assert!(ConfigValidator::validate_assist_config(&config).is_ok());
    }

    #[test]
    fn test_report_warns_without_providers() {
        let mut config = AssistConfig::default();
        config.llm.ollama.enabled = false;
        let report = ConfigValidator::generate_validation_report(&config);
        assert!(report.is_valid());
        assert!(report.warnings.contains_key("llm"));
    }
}
