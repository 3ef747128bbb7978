// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

pub mod core;
pub mod loader;
pub mod validation;

pub use self::core::{
    default_provider_order, AnthropicConfig, AssistConfig, DrafterConfig, LlmConfig, ObservabilityConfig,
    OllamaConfig, OpenAiConfig, PathsConfig, PolicyConfig,
};

pub use loader::{load_config, ConfigFormat, ConfigLoader};

pub use validation::{ConfigValidator, ValidationReport, KNOWN_PROVIDERS};
