// src/llm/anthropic.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionOptions, LanguageModel};
use crate::sources::http_client;

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";

/// Anthropic Messages API provider.
pub struct AnthropicProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl AnthropicProvider {
    pub fn new(api_key: String, model: &str, base_url: Option<&str>) -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_key,
            model: model.to_string(),
            base_url: base_url.unwrap_or(DEFAULT_BASE_URL).to_string(),
        })
    }
}

#[derive(Serialize)]
struct Msg<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<Msg<'a>>,
}

#[derive(Deserialize)]
struct Resp {
    content: Vec<Block>,
}
#[derive(Deserialize)]
struct Block {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// System prompts travel in a separate field; everything else stays in order.
fn split_system(messages: &[ChatMessage]) -> (Option<String>, Vec<Msg<'_>>) {
    let mut system: Vec<&str> = Vec::new();
    let mut rest = Vec::with_capacity(messages.len());
    for m in messages {
        if m.role == "system" {
            system.push(&m.content);
        } else {
            rest.push(Msg {
                role: &m.role,
                content: &m.content,
            });
        }
    }
    let system = (!system.is_empty()).then(|| system.join("\n\n"));
    (system, rest)
}

#[async_trait]
impl LanguageModel for AnthropicProvider {
    async fn complete(&self, messages: &[ChatMessage], opts: CompletionOptions) -> Result<String> {
        let (mut system, msgs) = split_system(messages);
        if opts.json {
            // No response_format switch on this API; ask for it in the system prompt.
            let hint = "Respond with a single JSON object and nothing else.";
            system = Some(match system {
                Some(s) => format!("{s}\n\n{hint}"),
                None => hint.to_string(),
            });
        }
        let req = Req {
            model: &self.model,
            max_tokens: opts.max_tokens,
            temperature: opts.temperature,
            system,
            messages: msgs,
        };

        let url = format!("{}/messages", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&req)
            .send()
            .await
            .context("anthropic request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("anthropic returned {status}: {}", body.chars().take(200).collect::<String>());
        }
        let body: Resp = resp.json().await.context("decoding anthropic response")?;
        let text = body
            .content
            .into_iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text)
            .collect::<Vec<_>>()
            .join("");
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "anthropic"
    }
}
