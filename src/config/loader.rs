// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use super::core::AssistConfig;
use super::validation::ConfigValidator;

pub struct ConfigLoader {
    config_path: Option<PathBuf>,
    format: ConfigFormat,
    /// Environment snapshot; overrides are read from here, not the live process
    env: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Yaml,
    Toml,
    Json,
}

impl ConfigLoader {
    pub fn new<P: AsRef<Path>>(config_path: P) -> Result<Self> {
        let path = config_path.as_ref().to_path_buf();
        let format = Self::detect_format(&path)?;

        Ok(Self {
            config_path: Some(path),
            format,
            env: std::env::vars().collect(),
        })
    }

    /// Defaults plus environment overrides, no file
    pub fn defaults() -> Self {
        Self {
            config_path: None,
            format: ConfigFormat::Yaml,
            env: std::env::vars().collect(),
        }
    }

    pub fn with_format<P: AsRef<Path>>(config_path: P, format: ConfigFormat) -> Self {
        Self {
            config_path: Some(config_path.as_ref().to_path_buf()),
            format,
            env: std::env::vars().collect(),
        }
    }

    /// Replace the environment snapshot used for overrides
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env = vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        self
    }

    pub fn detect_format(path: &Path) -> Result<ConfigFormat> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| anyhow::anyhow!("Could not determine config file format"))?;

        match extension {
            "yaml" | "yml" => Ok(ConfigFormat::Yaml),
            "toml" => Ok(ConfigFormat::Toml),
            "json" => Ok(ConfigFormat::Json),
            _ => Err(anyhow::anyhow!("Unsupported config file format: {}", extension)),
        }
    }

    pub fn load_config(&self) -> Result<AssistConfig> {
        let mut config: AssistConfig = match &self.config_path {
            Some(path) => {
                let content = std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {:?}", path))?;
                parse(&content, self.format)?
            }
            None => AssistConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;

        ConfigValidator::validate_assist_config(&config)?;

        Ok(config)
    }

    fn var(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str).filter(|v| !v.trim().is_empty())
    }

    fn apply_env_overrides(&self, config: &mut AssistConfig) -> Result<()> {
        if let Some(level) = self.var("BHD_LOG_LEVEL") {
            config.observability.log_level = level.to_string();
        }

        if let Some(path) = self.var("BHD_DECISION_LOG") {
            config.policy.decision_log = PathBuf::from(path);
        }

        if let Some(order) = self.var("BHD_PROVIDER_ORDER") {
            config.llm.provider_order = order
                .split(',')
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect();
        }

        if let Some(url) = self.var("OLLAMA_URL") {
            config.llm.ollama.base_url = url.trim_end_matches('/').to_string();
        }

        // File values win over the environment for keys
        if config.llm.openai.api_key.is_none() {
            config.llm.openai.api_key = self.var("OPENAI_API_KEY").map(str::to_string);
        }

        if config.llm.anthropic.api_key.is_none() {
            config.llm.anthropic.api_key = self.var("ANTHROPIC_API_KEY").map(str::to_string);
        }

        if let Some(max) = self.var("BHD_MAX_HYPOTHESES") {
            config.drafter.max_hypotheses = max.parse().context("Invalid BHD_MAX_HYPOTHESES")?;
        }

        Ok(())
    }
}

fn parse<T: DeserializeOwned>(content: &str, format: ConfigFormat) -> Result<T> {
    Ok(match format {
        ConfigFormat::Yaml => serde_yaml::from_str(content).context("Failed to parse YAML config")?,
        ConfigFormat::Toml => toml::from_str(content).context("Failed to parse TOML config")?,
        ConfigFormat::Json => serde_json::from_str(content).context("Failed to parse JSON config")?,
    })
}

/// Load from `path` when given, otherwise defaults; environment overrides apply either way
pub fn load_config(path: Option<&Path>) -> Result<AssistConfig> {
    match path {
        Some(path) => ConfigLoader::new(path)?.load_config(),
        None => ConfigLoader::defaults().load_config(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_detect_format() {
        assert_eq!(ConfigLoader::detect_format(Path::new("a.yml")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigLoader::detect_format(Path::new("a.toml")).unwrap(), ConfigFormat::Toml);
        assert!(ConfigLoader::detect_format(Path::new("a.ini")).is_err());
        assert!(ConfigLoader::detect_format(Path::new("noext")).is_err());
    }

    #[test]
    fn test_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[drafter]\nmax_hypotheses = 2\n\n[llm.ollama]\nmodel = \"qwen2.5:3b\"").unwrap();

        let config = ConfigLoader::new(file.path())
            .unwrap()
            .with_env(Vec::<(String, String)>::new())
            .load_config()
            .unwrap();
        assert_eq!(config.drafter.max_hypotheses, 2);
        assert_eq!(config.llm.ollama.model, "qwen2.5:3b");
    }

    #[test]
    fn test_env_overrides() {
        let config = ConfigLoader::defaults()
            .with_env([
                ("BHD_PROVIDER_ORDER", "Anthropic, openai"),
                ("OLLAMA_URL", "http://gpu-box:11434/"),
                ("ANTHROPIC_API_KEY", "key-123"),
                ("BHD_DECISION_LOG", "/tmp/audit.jsonl"),
            ])
            .load_config()
            .unwrap();

        assert_eq!(config.llm.provider_order, vec!["anthropic", "openai"]);
        assert_eq!(config.llm.ollama.base_url, "http://gpu-box:11434");
        assert_eq!(config.llm.anthropic.api_key.as_deref(), Some("key-123"));
        assert!(config.llm.openai.api_key.is_none());
        assert_eq!(config.policy.decision_log, PathBuf::from("/tmp/audit.jsonl"));
    }

    #[test]
    fn test_invalid_value_rejected() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"drafter": {{"max_hypotheses": 0}}}}"#).unwrap();

        let result = ConfigLoader::new(file.path())
            .unwrap()
            .with_env(Vec::<(String, String)>::new())
            .load_config();
        assert!(result.is_err());
    }
}
