// src/sources/mod.rs
pub mod github;
pub mod hackernews;

use anyhow::Result;
use once_cell::sync::OnceCell;
use regex::Regex;
use std::time::Duration;

use crate::config::TimeRange;
use crate::content::ContentItem;

pub use github::GitHubTrendingClient;
pub use hackernews::HackerNewsClient;

/// Trending repositories feed.
#[async_trait::async_trait]
pub trait TrendingSource: Send + Sync {
    async fn fetch_trending(&self, time_range: TimeRange) -> Result<Vec<ContentItem>>;
    fn name(&self) -> &'static str;
}

/// Link-aggregator post feed, addressed by endpoint ("newest", "show", ...).
#[async_trait::async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self, endpoint: &str, limit: usize) -> Result<Vec<ContentItem>>;

    /// Up to `limit` top-level comments on `post`, each with `by` and `text`.
    /// Feeds without discussion threads have none.
    async fn fetch_comments(&self, _post: &ContentItem, _limit: usize) -> Result<Vec<ContentItem>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str;
}

pub(crate) fn http_client() -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("trend-digest/", env!("CARGO_PKG_VERSION")))
        .connect_timeout(Duration::from_secs(4))
        .timeout(Duration::from_secs(10))
        .build()?;
    Ok(client)
}

/// Decode HTML entities, strip tags and collapse whitespace.
pub fn html_to_text(s: &str) -> String {
    static RE_BREAKS: OnceCell<Regex> = OnceCell::new();
    static RE_TAGS: OnceCell<Regex> = OnceCell::new();
    static RE_WS: OnceCell<Regex> = OnceCell::new();

    let re_breaks = RE_BREAKS.get_or_init(|| Regex::new(r"(?i)<\s*(p|br)\s*/?>").unwrap());
    let re_tags = RE_TAGS.get_or_init(|| Regex::new(r"(?is)</?[^>]+>").unwrap());
    let re_ws = RE_WS.get_or_init(|| Regex::new(r"\s+").unwrap());

    // Paragraph/line breaks become spaces so words do not run together.
    let out = re_breaks.replace_all(s, " ");
    let out = re_tags.replace_all(&out, "");
    let out = html_escape::decode_html_entities(&out).to_string();
    re_ws.replace_all(&out, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_to_text_decodes_and_strips() {
        let s = "Hello&nbsp;<i>world</i><p>It&#x27;s   <a href=\"x\">here</a>";
        // \s is Unicode-aware, so the decoded NBSP collapses too.
        assert_eq!(html_to_text(s), "Hello world It's here");
    }

    #[test]
    fn html_to_text_on_plain_text_is_trim_only() {
        assert_eq!(html_to_text("  plain   text "), "plain text");
    }
}
