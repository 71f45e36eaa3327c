// src/analyze/relevance.rs
//! LLM-backed topic relevance with a total (never failing) response parser.
//!
//! Models are asked for a JSON object but routinely wrap it in prose or a fenced
//! block. Extraction tries, in order: the whole reply, fenced blocks, balanced brace
//! spans. If all of them fail, it falls back to a zero-score verdict.

use once_cell::sync::OnceCell;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::content::{ContentItem, RELEVANCE_SCORE};
use crate::llm::{ChatMessage, DynLanguageModel};

/// Characters of the item body included in the prompt.
pub const BODY_PREFIX_CHARS: usize = 500;
pub const RELEVANCE_TEMPERATURE: f32 = 0.3;
pub const PARSE_FAILURE_REASON: &str = "Failed to parse response";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelevanceVerdict {
    pub relevance_score: f64,
    pub reasoning: String,
    pub key_topics: Vec<String>,
}

impl Default for RelevanceVerdict {
    fn default() -> Self {
        Self {
            relevance_score: 0.0,
            reasoning: PARSE_FAILURE_REASON.to_string(),
            key_topics: Vec::new(),
        }
    }
}

type Attempt = fn(&str) -> Option<RelevanceVerdict>;

const ATTEMPTS: &[(&str, Attempt)] = &[
    ("whole", parse_whole),
    ("fenced", parse_fenced),
    ("brace_span", parse_brace_span),
];

/// Best-effort structured extraction. Always returns a verdict.
pub fn extract_verdict(raw: &str) -> RelevanceVerdict {
    for (name, attempt) in ATTEMPTS {
        if let Some(v) = attempt(raw) {
            debug!(target: "relevance", strategy = *name, score = v.relevance_score, "verdict extracted");
            return v;
        }
    }
    warn!(target: "relevance", len = raw.len(), "unparsable model response; using default verdict");
    RelevanceVerdict::default()
}

fn parse_whole(raw: &str) -> Option<RelevanceVerdict> {
    parse_object(raw.trim())
}

fn parse_fenced(raw: &str) -> Option<RelevanceVerdict> {
    static RE_FENCE: OnceCell<Regex> = OnceCell::new();
    let re = RE_FENCE.get_or_init(|| {
        Regex::new(r"(?s)```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)```").expect("fence regex")
    });
    re.captures_iter(raw)
        .filter_map(|c| c.get(1))
        .find_map(|m| parse_object(m.as_str().trim()))
}

/// First balanced `{...}` substring that parses as an object.
fn parse_brace_span(raw: &str) -> Option<RelevanceVerdict> {
    raw.char_indices()
        .filter(|&(_, c)| c == '{')
        .filter_map(|(start, _)| balanced_end(raw, start).map(|end| &raw[start..end]))
        .find_map(parse_object)
}

/// Byte index one past the brace closing the one at `start`, honoring JSON strings.
fn balanced_end(s: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;
    for (i, c) in s[start..].char_indices() {
        if in_str {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_str = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(start + i + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_object(s: &str) -> Option<RelevanceVerdict> {
    match serde_json::from_str::<Value>(s).ok()? {
        Value::Object(obj) => Some(verdict_from_object(&obj)),
        _ => None,
    }
}

fn verdict_from_object(obj: &serde_json::Map<String, Value>) -> RelevanceVerdict {
    let relevance_score = match obj.get("relevance_score") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    let reasoning = obj
        .get("reasoning")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let key_topics = obj
        .get("key_topics")
        .and_then(Value::as_array)
        .map(|a| {
            a.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    RelevanceVerdict {
        relevance_score,
        reasoning,
        key_topics,
    }
}

/// Clamp into [0,1]; NaN/inf become 0.
pub fn bound_score(x: f64) -> f64 {
    if x.is_finite() {
        x.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub struct RelevanceScorer {
    llm: DynLanguageModel,
}

impl RelevanceScorer {
    pub fn new(llm: DynLanguageModel) -> Self {
        Self { llm }
    }

    pub fn build_prompt(item: &ContentItem, topics: &[String]) -> String {
        let topics_str = topics.join(", ");
        let title = item.str_field("title").unwrap_or("N/A");
        let url = item.str_field("url").unwrap_or("N/A");
        let body: String = item
            .str_field("text")
            .unwrap_or("N/A")
            .chars()
            .take(BODY_PREFIX_CHARS)
            .collect();

        format!(
            r#"Score the relevance of this Hacker News post to topics: {topics_str}

Post Title: {title}
Post URL: {url}
Post Text: {body}

Analyze how relevant this post is to {topics_str}. Consider:
- Direct mentions or discussions of these topics
- Related concepts, tools, or techniques
- Practical applications or research
- Community interest and significance

Return a JSON object with:
{{
  "relevance_score": <float between 0.0 and 1.0>,
  "reasoning": "<brief explanation>",
  "key_topics": ["<topic1>", "<topic2>"]
}}

Score 1.0 = Highly relevant (directly about topic)
Score 0.5 = Moderately relevant (tangentially related)
Score 0.0 = Not relevant (unrelated)"#
        )
    }

    /// Relevance of one item in [0,1]. Model failures score 0.0 rather than failing the run.
    pub async fn score_item(&self, item: &ContentItem, topics: &[String]) -> f64 {
        let prompt = Self::build_prompt(item, topics);
        let messages = [ChatMessage::user(prompt)];
        match self.llm.complete_json(&messages, RELEVANCE_TEMPERATURE).await {
            Ok(raw) => bound_score(extract_verdict(&raw).relevance_score),
            Err(e) => {
                warn!(
                    target: "relevance",
                    provider = self.llm.name(),
                    id = ?item.identity(),
                    error = %e,
                    "relevance call failed; scoring 0.0"
                );
                0.0
            }
        }
    }

    /// Write `relevance_score` onto every item, sequentially.
    pub async fn score_all(&self, items: &mut [ContentItem], topics: &[String]) {
        for item in items.iter_mut() {
            let score = self.score_item(item, topics).await;
            item.set_f64(RELEVANCE_SCORE, score);
        }
    }
}
