// src/config/llm.rs
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// "openai" | "anthropic" (case-insensitive)
    pub provider: String,
    pub model: String,
    /// Name of the env var holding the API key, e.g. "ANTHROPIC_API_KEY".
    pub api_key_env: String,
    /// Override for OpenAI-compatible gateways. Defaults per provider.
    #[serde(default)]
    pub base_url: Option<String>,
}

impl LlmConfig {
    /// Lowercased, trimmed provider name.
    pub fn provider_name(&self) -> String {
        self.provider.trim().to_ascii_lowercase()
    }

    /// Read the API key from the configured env var.
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        match env::var(&self.api_key_env) {
            Ok(v) if !v.trim().is_empty() => Ok(v),
            _ => anyhow::bail!(
                "API key not found in environment variable: {}",
                self.api_key_env
            ),
        }
    }

    pub(crate) fn validate(&self) -> anyhow::Result<()> {
        if self.provider.trim().is_empty() {
            anyhow::bail!("llm.provider must not be empty");
        }
        if self.model.trim().is_empty() {
            anyhow::bail!("llm.model must not be empty");
        }
        if self.api_key_env.trim().is_empty() {
            anyhow::bail!("llm.api_key_env must not be empty");
        }
        Ok(())
    }
}
