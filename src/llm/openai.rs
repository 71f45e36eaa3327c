// src/llm/openai.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, CompletionOptions, LanguageModel};
use crate::sources::http_client;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI provider (Chat Completions API). Also works against compatible gateways.
pub struct OpenAiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl OpenAiProvider {
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
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct Req<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct Resp {
    choices: Vec<Choice>,
}
#[derive(Deserialize)]
struct Choice {
    message: ChoiceMsg,
}
#[derive(Deserialize)]
struct ChoiceMsg {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LanguageModel for OpenAiProvider {
    async fn complete(&self, messages: &[ChatMessage], opts: CompletionOptions) -> Result<String> {
        let req = Req {
            model: &self.model,
            messages,
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
            response_format: opts.json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let resp = self
            .http
            .post(url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .context("openai request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("openai returned {status}: {}", body.chars().take(200).collect::<String>());
        }
        let body: Resp = resp.json().await.context("decoding openai response")?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();
        Ok(content)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
