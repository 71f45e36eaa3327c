// src/analyze/summarize.rs
//! Depth-scaled article and discussion summaries.

use anyhow::Result;
use tracing::{debug, warn};

use crate::config::AnalysisDepth;
use crate::content::ContentItem;
use crate::llm::{ChatMessage, CompletionOptions, DynLanguageModel};

pub const ARTICLE_CONTENT_CHARS: usize = 2000;
pub const COMMENT_CHARS: usize = 300;
pub const MAX_COMMENTS: usize = 10;
pub const SUMMARY_TEMPERATURE: f32 = 0.5;
pub const NO_COMMENTS: &str = "No comments available";

pub const SUMMARY_FIELD: &str = "summary";
pub const DISCUSSION_FIELD: &str = "discussion";

pub fn max_tokens(depth: AnalysisDepth) -> u32 {
    match depth {
        AnalysisDepth::Lightweight => 128,
        AnalysisDepth::Medium => 256,
        AnalysisDepth::Deep => 512,
    }
}

fn article_instruction(depth: AnalysisDepth) -> &'static str {
    match depth {
        AnalysisDepth::Lightweight => "Provide a one-sentence summary (max 50 words).",
        AnalysisDepth::Medium => {
            "Provide a concise summary (2-3 sentences, max 100 words) covering key points."
        }
        AnalysisDepth::Deep => {
            "Provide a comprehensive summary (4-5 sentences, max 200 words) including context, implications, and significance."
        }
    }
}

fn comments_instruction(depth: AnalysisDepth) -> &'static str {
    match depth {
        AnalysisDepth::Lightweight => "List 2-3 key discussion themes (one sentence).",
        AnalysisDepth::Medium => {
            "Summarize main discussion themes and notable perspectives (2-3 sentences)."
        }
        AnalysisDepth::Deep => {
            "Provide detailed analysis of discussion themes, sentiment, consensus/disagreement, and notable insights (4-5 sentences)."
        }
    }
}

pub fn article_prompt(item: &ContentItem, depth: AnalysisDepth) -> String {
    let title = item.str_field("title").unwrap_or("N/A");
    let url = item.str_field("url").unwrap_or("N/A");
    let content: String = item
        .str_field("text")
        .unwrap_or("N/A")
        .chars()
        .take(ARTICLE_CONTENT_CHARS)
        .collect();
    format!(
        "Summarize this article:\n\nTitle: {title}\nURL: {url}\nContent: {content}\n\n{}",
        article_instruction(depth)
    )
}

/// Only the first [`MAX_COMMENTS`] comments are quoted, each clipped to [`COMMENT_CHARS`].
pub fn comments_prompt(comments: &[ContentItem], depth: AnalysisDepth) -> String {
    let quoted: Vec<String> = comments
        .iter()
        .take(MAX_COMMENTS)
        .map(|c| {
            let by = c.str_field("by").unwrap_or("unknown");
            let text: String = c
                .str_field("text")
                .unwrap_or_default()
                .chars()
                .take(COMMENT_CHARS)
                .collect();
            format!("Comment by {by}: {text}")
        })
        .collect();
    format!(
        "Analyze these comments and {}\n\n{}",
        comments_instruction(depth),
        quoted.join("\n\n")
    )
}

pub struct Summarizer {
    llm: DynLanguageModel,
    depth: AnalysisDepth,
}

impl Summarizer {
    pub fn new(llm: DynLanguageModel, depth: AnalysisDepth) -> Self {
        Self { llm, depth }
    }

    pub fn depth(&self) -> AnalysisDepth {
        self.depth
    }

    fn options(&self) -> CompletionOptions {
        CompletionOptions {
            temperature: SUMMARY_TEMPERATURE,
            max_tokens: max_tokens(self.depth),
            json: false,
        }
    }

    pub async fn summarize_article(&self, item: &ContentItem) -> Result<String> {
        let messages = [ChatMessage::user(article_prompt(item, self.depth))];
        let text = self.llm.complete(&messages, self.options()).await?;
        Ok(text.trim().to_string())
    }

    /// No comments means no model call.
    pub async fn summarize_comments(&self, comments: &[ContentItem]) -> Result<String> {
        if comments.is_empty() {
            return Ok(NO_COMMENTS.to_string());
        }
        let messages = [ChatMessage::user(comments_prompt(comments, self.depth))];
        let text = self.llm.complete(&messages, self.options()).await?;
        Ok(text.trim().to_string())
    }

    /// Write `summary` and `discussion` onto `post`. A failed call leaves its field unset.
    pub async fn annotate(&self, post: &mut ContentItem, comments: &[ContentItem]) {
        match self.summarize_article(post).await {
            Ok(s) => post.insert(SUMMARY_FIELD, s),
            Err(e) => warn!(
                target: "summarize",
                provider = self.llm.name(),
                id = ?post.identity(),
                error = %e,
                "article summary failed"
            ),
        }
        match self.summarize_comments(comments).await {
            Ok(s) => post.insert(DISCUSSION_FIELD, s),
            Err(e) => warn!(
                target: "summarize",
                provider = self.llm.name(),
                id = ?post.identity(),
                error = %e,
                "discussion summary failed"
            ),
        }
        debug!(target: "summarize", id = ?post.identity(), comments = comments.len(), "post annotated");
    }
}
