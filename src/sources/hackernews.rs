// src/sources/hackernews.rs
//! Hacker News via the public Firebase API: list ids, then fetch items concurrently.

use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::{html_to_text, http_client, PostSource};
use crate::content::ContentItem;
use crate::retry::transient;

const DEFAULT_API_BASE: &str = "https://hacker-news.firebaseio.com/v0";
const DEFAULT_CONCURRENCY: usize = 16;
/// Top-level comment ids carried on each post as `comment_ids`.
pub const COMMENT_IDS_KEPT: usize = 10;

/// Map a configured endpoint to the Firebase list name.
pub fn list_name(endpoint: &str) -> Option<&'static str> {
    match endpoint.trim().to_ascii_lowercase().as_str() {
        "top" => Some("topstories"),
        "new" | "newest" => Some("newstories"),
        "best" => Some("beststories"),
        "show" => Some("showstories"),
        "ask" => Some("askstories"),
        "job" => Some("jobstories"),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct HnItem {
    id: u64,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    score: Option<i64>,
    #[serde(default)]
    by: Option<String>,
    #[serde(default)]
    time: Option<i64>,
    #[serde(default)]
    descendants: Option<i64>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    kids: Vec<u64>,
    #[serde(default)]
    deleted: bool,
    #[serde(default)]
    dead: bool,
}

impl HnItem {
    fn into_content(self) -> Option<ContentItem> {
        if self.deleted || self.dead {
            return None;
        }
        let title = self.title?;
        let mut item = ContentItem::new()
            .with("id", self.id)
            .with("title", title)
            .with(
                "hn_url",
                format!("https://news.ycombinator.com/item?id={}", self.id),
            )
            .with("score", self.score.unwrap_or(0))
            .with("comments_count", self.descendants.unwrap_or(0));
        if let Some(u) = self.url {
            item.insert("url", u);
        }
        if let Some(by) = self.by {
            item.insert("by", by);
        }
        if let Some(t) = self.time {
            item.insert("time", t);
        }
        if let Some(text) = self.text {
            item.insert("text", html_to_text(&text));
        }
        if !self.kids.is_empty() {
            let ids: Vec<u64> = self.kids.into_iter().take(COMMENT_IDS_KEPT).collect();
            item.insert("comment_ids", ids);
        }
        Some(item)
    }

    fn into_comment(self) -> Option<ContentItem> {
        if self.deleted || self.dead {
            return None;
        }
        let text = html_to_text(&self.text?);
        Some(
            ContentItem::new()
                .with("id", self.id)
                .with("by", self.by.unwrap_or_else(|| "unknown".to_string()))
                .with("text", text),
        )
    }
}

pub struct HackerNewsClient {
    http: reqwest::Client,
    api_base: String,
    concurrency: usize,
}

impl HackerNewsClient {
    pub fn new() -> Result<Self> {
        Ok(Self {
            http: http_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            concurrency: DEFAULT_CONCURRENCY,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    pub fn with_concurrency(mut self, n: usize) -> Self {
        self.concurrency = n.max(1);
        self
    }

    fn base(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    /// Fetch items concurrently; the result lines up with `ids`.
    async fn fetch_items(&self, ids: &[u64]) -> Vec<Option<HnItem>> {
        let permits = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();
        for (pos, id) in ids.iter().copied().enumerate() {
            let http = self.http.clone();
            let url = format!("{}/item/{id}.json", self.base());
            let permits = Arc::clone(&permits);
            set.spawn(async move {
                let _permit = permits.acquire_owned().await;
                (pos, fetch_item(http, url).await)
            });
        }

        let mut slots: Vec<Option<HnItem>> = ids.iter().map(|_| None).collect();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((pos, Ok(item))) => slots[pos] = item,
                // One bad item should not sink the whole listing.
                Ok((pos, Err(e))) => {
                    warn!(target: "sources", id = ids[pos], error = %e, "hn item skipped")
                }
                Err(e) => warn!(target: "sources", error = %e, "hn item task failed"),
            }
        }
        slots
    }
}

async fn fetch_item(http: reqwest::Client, url: String) -> Result<Option<HnItem>> {
    let resp = http.get(&url).send().await.context("hn item request")?;
    if !resp.status().is_success() {
        anyhow::bail!("hn item {url} returned {}", resp.status());
    }
    // Missing items come back as literal `null`.
    let item: Option<HnItem> = resp.json().await.context("decoding hn item")?;
    Ok(item)
}

#[async_trait]
impl PostSource for HackerNewsClient {
    async fn fetch_posts(&self, endpoint: &str, limit: usize) -> Result<Vec<ContentItem>> {
        let list = list_name(endpoint)
            .with_context(|| format!("unknown hacker news endpoint '{endpoint}'"))?;
        let ids_url = format!("{}/{list}.json", self.base());
        let resp = self
            .http
            .get(&ids_url)
            .send()
            .await
            .context("hn list request")?;
        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(transient(format!("hn list {list} returned {status}")));
        }
        if !status.is_success() {
            anyhow::bail!("hn list {list} returned {status}");
        }
        let ids: Vec<u64> = resp.json().await.context("decoding hn id list")?;
        let ids: Vec<u64> = ids.into_iter().take(limit).collect();

        // Keep the feed's own ordering.
        let posts: Vec<ContentItem> = self
            .fetch_items(&ids)
            .await
            .into_iter()
            .flatten()
            .filter_map(HnItem::into_content)
            .collect();
        debug!(target: "sources", endpoint, count = posts.len(), "hn posts fetched");
        Ok(posts)
    }

    async fn fetch_comments(&self, post: &ContentItem, limit: usize) -> Result<Vec<ContentItem>> {
        let ids = comment_ids(post, limit);
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let comments: Vec<ContentItem> = self
            .fetch_items(&ids)
            .await
            .into_iter()
            .flatten()
            .filter_map(HnItem::into_comment)
            .collect();
        debug!(target: "sources", post = ?post.identity(), count = comments.len(), "hn comments fetched");
        Ok(comments)
    }

    fn name(&self) -> &'static str {
        "hackernews"
    }
}

fn comment_ids(post: &ContentItem, limit: usize) -> Vec<u64> {
    post.get("comment_ids")
        .and_then(|v| v.as_array())
        .map(|a| a.iter().filter_map(|v| v.as_u64()).take(limit).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_names_map_to_lists() {
        assert_eq!(list_name("newest"), Some("newstories"));
        assert_eq!(list_name("NEW"), Some("newstories"));
        assert_eq!(list_name("show"), Some("showstories"));
        assert_eq!(list_name("frontpage"), None);
    }

    #[test]
    fn item_maps_to_content_with_clean_text() {
        let it: HnItem = serde_json::from_str(
            r#"{"id":42,"type":"story","title":"Ask HN: Rust?","score":10,"by":"pg",
                "time":1700000000,"descendants":3,"text":"Is &quot;Rust&quot;<p>good?"}"#,
        )
        .unwrap();
        let item = it.into_content().unwrap();
        assert_eq!(item.identity().as_deref(), Some("42"));
        assert_eq!(item.str_field("text"), Some("Is \"Rust\" good?"));
        assert_eq!(item.f64_field("comments_count"), Some(3.0));
        assert_eq!(
            item.str_field("hn_url"),
            Some("https://news.ycombinator.com/item?id=42")
        );
        assert!(item.get("url").is_none());
    }

    #[test]
    fn post_keeps_leading_comment_ids() {
        let kids: Vec<u64> = (100..130).collect();
        let raw = serde_json::json!({"id": 5, "title": "t", "kids": kids});
        let it: HnItem = serde_json::from_value(raw).unwrap();
        let post = it.into_content().unwrap();
        assert_eq!(comment_ids(&post, 50).len(), COMMENT_IDS_KEPT);
        assert_eq!(comment_ids(&post, 3), vec![100, 101, 102]);
        assert!(comment_ids(&ContentItem::new(), 10).is_empty());
    }

    #[test]
    fn comment_maps_with_clean_text_and_author() {
        let c: HnItem =
            serde_json::from_str(r#"{"id":9,"type":"comment","text":"I &amp; you<p>agree"}"#).unwrap();
        let item = c.into_comment().unwrap();
        assert_eq!(item.str_field("by"), Some("unknown"));
        assert_eq!(item.str_field("text"), Some("I & you agree"));
        let deleted: HnItem = serde_json::from_str(r#"{"id":10,"deleted":true}"#).unwrap();
        assert!(deleted.into_comment().is_none());
    }

    #[test]
    fn dead_or_untitled_items_are_dropped() {
        let dead: HnItem = serde_json::from_str(r#"{"id":1,"title":"x","dead":true}"#).unwrap();
        assert!(dead.into_content().is_none());
        let comment: HnItem = serde_json::from_str(r#"{"id":2,"text":"hi"}"#).unwrap();
        assert!(comment.into_content().is_none());
    }
}
