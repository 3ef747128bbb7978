// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Assistant Error Types
 * Error taxonomy for the reasoning pipeline with thiserror
 *
 * @copyright 2026 Bountyy Oy
 * @license Proprietary - Enterprise Edition
 */

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main assistant error type
#[derive(Error, Debug)]
pub enum AssistError {
    /// Missing or invalid configuration (including the elevated-level profile).
    /// Fatal at construction time, never retried.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A single provider failed
    #[error("Provider '{provider}' failed: {source}")]
    Provider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    /// Every available provider was tried and every one failed
    #[error("All LLM providers failed ({attempted:?}). Last error: {last_error}")]
    AllProvidersFailed {
        attempted: Vec<String>,
        last_error: String,
    },

    /// No provider was registered or reachable
    #[error(
        "No LLM providers available. Configure at least one of: \
         Ollama (local), OpenAI API key, or Anthropic API key"
    )]
    NoProvidersAvailable,

    /// Structured output did not satisfy its schema
    #[error("Schema validation failed for {schema}: {message}")]
    SchemaValidation { schema: String, message: String },

    /// Malformed top-level input (rules file, schema file, observation batch)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Playbook not found: {0}")]
    PlaybookNotFound(String),

    #[error("Playbook {id} failed validation: {reason}")]
    PlaybookInvalid { id: String, reason: String },

    #[error("I/O error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Per-provider failures. The router treats every variant as "try next".
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Could not connect to {url}: {reason}")]
    Connection { url: String, reason: String },

    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    #[error("HTTP {status} from {url}: {body}")]
    Http {
        status: u16,
        url: String,
        body: String,
    },

    #[error("Response is not valid JSON: {0}")]
    MalformedJson(String),

    #[error("Response has no usable content: {0}")]
    MissingContent(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Provider error: {0}")]
    Other(String),
}

impl ProviderError {
    /// Check if the same provider is worth calling again later
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::Connection { .. } => true,
            ProviderError::Timeout { .. } => true,
            ProviderError::Http { status, .. } => matches!(status, 408 | 429 | 500 | 502 | 503 | 504),
            ProviderError::MalformedJson(_) => true,
            ProviderError::MissingContent(_) => true,
            ProviderError::NotConfigured(_) => false,
            ProviderError::Other(_) => false,
        }
    }
}

impl AssistError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AssistError::Io {
            path: path.into(),
            source,
        }
    }

    /// Errors that must abort a whole drafting batch rather than one cluster
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AssistError::Config(_) | AssistError::NoProvidersAvailable | AssistError::InvalidInput(_)
        )
    }
}

impl ProviderError {
    /// Classify a reqwest failure. `timeout` is the client timeout that was in force.
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        let url = err.url().map(|u| u.to_string()).unwrap_or_default();

        if err.is_timeout() {
            ProviderError::Timeout { timeout }
        } else if err.is_connect() {
            ProviderError::Connection {
                url,
                reason: err.to_string(),
            }
        } else if err.is_decode() {
            ProviderError::MalformedJson(err.to_string())
        } else if let Some(status) = err.status() {
            ProviderError::Http {
                status: status.as_u16(),
                url,
                body: err.to_string(),
            }
        } else {
            ProviderError::Other(err.to_string())
        }
    }
}

/// Result type for assistant operations
pub type AssistResult<T> = Result<T, AssistError>;
