//! Process configuration, read once at startup.
//!
//! Environment variables (a `.env` file is honoured by the binary):
//! - `AZURE_OPENAI_API_KEY`, `AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_VERSION`
//!   (all three required to enable text generation)
//! - `AZURE_OPENAI_DEPLOYMENT` (default: gpt-4o-mini)
//! - `LOG_LEVEL` (default: info)
//! - `CONFIDENCE_THRESHOLD` (default: 0.4)
//! - `LLM_TIMEOUT_SECS` (default: 30)
//! - `BATCH_WORKERS` (default: 4)

use std::time::Duration;

use crate::error::{PipelineError, Result};

pub const DEFAULT_DEPLOYMENT: &str = "gpt-4o-mini";
pub const DEFAULT_THRESHOLD: f64 = 0.4;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_WORKERS: usize = 4;

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub api_version: String,
    pub deployment: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub llm: Option<LlmConfig>,
    pub log_level: String,
    pub confidence_threshold: f64,
    pub llm_timeout: Duration,
    pub workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            llm: None,
            log_level: "info".to_string(),
            confidence_threshold: DEFAULT_THRESHOLD,
            llm_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            workers: DEFAULT_WORKERS,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let llm = match (
            non_empty("AZURE_OPENAI_API_KEY"),
            non_empty("AZURE_OPENAI_ENDPOINT"),
            non_empty("AZURE_OPENAI_API_VERSION"),
        ) {
            (Some(api_key), Some(endpoint), Some(api_version)) => Some(LlmConfig {
                endpoint,
                api_key,
                api_version,
                deployment: non_empty("AZURE_OPENAI_DEPLOYMENT")
                    .unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string()),
            }),
            _ => None,
        };

        let confidence_threshold = match non_empty("CONFIDENCE_THRESHOLD") {
            Some(raw) => parse_threshold(&raw)?,
            None => DEFAULT_THRESHOLD,
        };

        let llm_timeout = match non_empty("LLM_TIMEOUT_SECS") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or_else(|| {
                    PipelineError::Config(format!(
                        "LLM_TIMEOUT_SECS must be a positive integer, got `{raw}`"
                    ))
                })?,
            None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };

        let workers = non_empty("BATCH_WORKERS")
            .and_then(|raw| raw.parse::<usize>().ok())
            .unwrap_or(DEFAULT_WORKERS)
            .max(1);

        Ok(Self {
            llm,
            log_level: non_empty("LOG_LEVEL")
                .map(|level| level.to_lowercase())
                .unwrap_or_else(|| "info".to_string()),
            confidence_threshold,
            llm_timeout,
            workers,
        })
    }
}

pub fn parse_threshold(raw: &str) -> Result<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| (0.0..=1.0).contains(value))
        .ok_or_else(|| {
            PipelineError::Config(format!(
                "confidence threshold must be within [0, 1], got `{raw}`"
            ))
        })
}
