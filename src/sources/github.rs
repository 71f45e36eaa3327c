// src/sources/github.rs
//! GitHub "trending" via the search API: repositories created inside the time range,
//! sorted by stars. GitHub has no official trending endpoint; this is the usual proxy.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use serde::Deserialize;

use super::{http_client, TrendingSource};
use crate::retry::transient;
use crate::config::TimeRange;
use crate::content::ContentItem;

const DEFAULT_API_BASE: &str = "https://api.github.com";
const PER_PAGE: usize = 50;

#[derive(Debug, Deserialize)]
struct SearchResp {
    items: Vec<Repo>,
}

#[derive(Debug, Deserialize)]
struct Repo {
    id: u64,
    full_name: String,
    html_url: String,
    description: Option<String>,
    stargazers_count: u64,
    forks_count: u64,
    language: Option<String>,
    created_at: Option<String>,
}

impl From<Repo> for ContentItem {
    fn from(r: Repo) -> Self {
        let mut item = ContentItem::new()
            .with("id", r.id)
            .with("name", r.full_name)
            .with("url", r.html_url)
            .with("description", r.description.unwrap_or_default())
            .with("stars", r.stargazers_count)
            .with("forks", r.forks_count);
        if let Some(lang) = r.language {
            item.insert("language", lang);
        }
        if let Some(ts) = r.created_at {
            item.insert("created_at", ts);
        }
        item
    }
}

pub struct GitHubTrendingClient {
    http: reqwest::Client,
    api_base: String,
    token: Option<String>,
}

impl GitHubTrendingClient {
    /// Picks up `GITHUB_TOKEN` when present (higher rate limits); works anonymously otherwise.
    pub fn new() -> Result<Self> {
        let token = std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty());
        Ok(Self {
            http: http_client()?,
            api_base: DEFAULT_API_BASE.to_string(),
            token,
        })
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }
}

/// Search query for repositories created within `range` (relative to today, UTC).
pub fn search_query(range: TimeRange) -> String {
    let since = (Utc::now() - ChronoDuration::days(range.days())).date_naive();
    format!("created:>={}", since.format("%Y-%m-%d"))
}

#[async_trait]
impl TrendingSource for GitHubTrendingClient {
    async fn fetch_trending(&self, time_range: TimeRange) -> Result<Vec<ContentItem>> {
        let url = format!("{}/search/repositories", self.api_base.trim_end_matches('/'));
        let per_page = PER_PAGE.to_string();
        let query = search_query(time_range);
        let mut req = self
            .http
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .query(&[
                ("q", query.as_str()),
                ("sort", "stars"),
                ("order", "desc"),
                ("per_page", per_page.as_str()),
            ]);
        if let Some(t) = &self.token {
            req = req.bearer_auth(t);
        }

        let resp = req.send().await.context("github search request")?;
        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(transient(format!("github search returned {status}")));
        }
        if !status.is_success() {
            anyhow::bail!("github search returned {status}");
        }
        let body: SearchResp = resp.json().await.context("decoding github search response")?;
        tracing::debug!(target: "sources", count = body.items.len(), "github trending fetched");
        Ok(body.items.into_iter().map(ContentItem::from).collect())
    }

    fn name(&self) -> &'static str {
        "github"
    }
}
