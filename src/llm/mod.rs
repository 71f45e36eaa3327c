// src/llm/mod.rs
//! Language-model provider abstraction.
//!
//! The pipeline only needs "messages in, text out". Providers are thin reqwest
//! wrappers; `MockLanguageModel` serves canned replies to tests.

pub mod anthropic;
pub mod openai;

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use serde::Serialize;

use crate::config::LlmConfig;

pub use anthropic::AnthropicProvider;
pub use openai::OpenAiProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct CompletionOptions {
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object when it supports a response format switch.
    pub json: bool,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 1024,
            json: false,
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage], opts: CompletionOptions) -> Result<String>;

    /// Completion that should come back as a JSON object. Callers must still parse
    /// defensively: not every provider enforces it.
    async fn complete_json(&self, messages: &[ChatMessage], temperature: f32) -> Result<String> {
        let opts = CompletionOptions {
            temperature,
            max_tokens: 2048,
            json: true,
        };
        self.complete(messages, opts).await
    }

    /// Provider name for diagnostics.
    fn name(&self) -> &'static str;
}

pub type DynLanguageModel = Arc<dyn LanguageModel>;

/// Factory: build the configured provider. Fails if the API key env var is unset.
pub fn build_provider(config: &LlmConfig) -> Result<DynLanguageModel> {
    let api_key = config.resolve_api_key()?;
    let provider = config.provider_name();
    match provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiProvider::new(
            api_key,
            &config.model,
            config.base_url.as_deref(),
        )?)),
        "anthropic" | "claude" => Ok(Arc::new(AnthropicProvider::new(
            api_key,
            &config.model,
            config.base_url.as_deref(),
        )?)),
        other => anyhow::bail!("unsupported LLM provider: {other}"),
    }
}

/// Deterministic model: pops queued replies in order, then repeats `fallback`.
pub struct MockLanguageModel {
    queued: Mutex<VecDeque<String>>,
    fallback: String,
    prompts: Mutex<Vec<String>>,
    options: Mutex<Vec<CompletionOptions>>,
}

impl MockLanguageModel {
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            queued: Mutex::new(VecDeque::new()),
            fallback: fallback.into(),
            prompts: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
        }
    }

    pub fn with_replies<I, S>(fallback: impl Into<String>, replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let m = Self::new(fallback);
        if let Ok(mut q) = m.queued.lock() {
            q.extend(replies.into_iter().map(Into::into));
        }
        m
    }

    /// Every user prompt seen so far (last message of each call).
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    /// Options passed with each call, in call order.
    pub fn options(&self) -> Vec<CompletionOptions> {
        self.options.lock().map(|o| o.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl LanguageModel for MockLanguageModel {
    async fn complete(&self, messages: &[ChatMessage], opts: CompletionOptions) -> Result<String> {
        if let (Ok(mut p), Some(last)) = (self.prompts.lock(), messages.last()) {
            p.push(last.content.clone());
        }
        if let Ok(mut o) = self.options.lock() {
            o.push(opts);
        }
        let next = self.queued.lock().ok().and_then(|mut q| q.pop_front());
        Ok(next.unwrap_or_else(|| self.fallback.clone()))
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}
