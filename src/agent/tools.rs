// src/agent/tools.rs
//! Named, swappable capabilities the agent drives: fetch, score, rank, summarize.
//!
//! Every tool takes the same keyword-style [`ToolArgs`] bag. Fetch tools return
//! `{source: "cache"|"live", data}`. Scoring and ranking return the transformed
//! items. Tests swap any entry via [`ToolRegistry::register`].

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::analyze::ranking::Ranker;
use crate::analyze::relevance::RelevanceScorer;
use crate::analyze::summarize::{Summarizer, MAX_COMMENTS};
use crate::cache::CacheStore;
use crate::config::{Config, RetryConfig, TimeRange};
use crate::content::ContentItem;
use crate::metrics::TOOL_CALLS;
use crate::retry::retry_with_backoff;
use crate::sources::{PostSource, TrendingSource};

pub const FETCH_GITHUB_TRENDING: &str = "fetch_github_trending";
pub const FETCH_HN_POSTS: &str = "fetch_hn_posts";
pub const SCORE_RELEVANCE: &str = "score_relevance";
pub const RANK_ITEMS: &str = "rank_items";
pub const SUMMARIZE_POSTS: &str = "summarize_posts";

pub const GITHUB_CACHE_KEY: &str = "github_trending";
pub const DEFAULT_HN_ENDPOINT: &str = "newest";

pub fn hn_cache_key(endpoint: &str) -> String {
    format!("hn_{endpoint}")
}

/// Keyword-style argument bag. Tools read the fields they care about.
#[derive(Debug, Clone, Default)]
pub struct ToolArgs {
    pub no_cache: bool,
    pub endpoint: Option<String>,
    pub items: Vec<ContentItem>,
    pub topics: Vec<String>,
}

impl ToolArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn no_cache(mut self, yes: bool) -> Self {
        self.no_cache = yes;
        self
    }

    pub fn endpoint(mut self, ep: impl Into<String>) -> Self {
        self.endpoint = Some(ep.into());
        self
    }

    pub fn items(mut self, items: Vec<ContentItem>) -> Self {
        self.items = items;
        self
    }

    pub fn topics(mut self, topics: Vec<String>) -> Self {
        self.topics = topics;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOrigin {
    Cache,
    Live,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchResult {
    pub source: FetchOrigin,
    pub data: Vec<ContentItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Fetched(FetchResult),
    Items(Vec<ContentItem>),
}

impl ToolOutput {
    pub fn origin(&self) -> Option<FetchOrigin> {
        match self {
            Self::Fetched(r) => Some(r.source),
            Self::Items(_) => None,
        }
    }

    pub fn into_items(self) -> Vec<ContentItem> {
        match self {
            Self::Fetched(r) => r.data,
            Self::Items(v) => v,
        }
    }
}

#[async_trait]
pub trait Tool: Send + Sync {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput>;
}

/// Cache-first fetch. An empty cached list counts as a miss. Live results are
/// written back even under `no_cache`; a degraded (retries exhausted) fetch yields
/// empty live data and is not cached.
pub async fn cached_fetch<F, Fut>(
    cache: &CacheStore,
    retry: &RetryConfig,
    key: &str,
    no_cache: bool,
    fetch: F,
) -> Result<FetchResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Vec<ContentItem>>>,
{
    if !no_cache {
        if let Some(payload) = cache.get(key) {
            match serde_json::from_value::<Vec<ContentItem>>(payload) {
                Ok(data) if data.is_empty() => {
                    debug!(target: "tools", key, "cached list is empty; refetching")
                }
                Ok(data) => {
                    debug!(target: "tools", key, count = data.len(), "served from cache");
                    return Ok(FetchResult {
                        source: FetchOrigin::Cache,
                        data,
                    });
                }
                Err(e) => warn!(target: "tools", key, error = %e, "cached payload has unexpected shape; refetching"),
            }
        }
    }

    match retry_with_backoff(key, retry, fetch).await? {
        Some(data) => {
            cache.set(key, &data);
            Ok(FetchResult {
                source: FetchOrigin::Live,
                data,
            })
        }
        None => Ok(FetchResult {
            source: FetchOrigin::Live,
            data: Vec::new(),
        }),
    }
}

pub struct FetchGitHubTrending {
    source: Arc<dyn TrendingSource>,
    cache: Arc<CacheStore>,
    retry: RetryConfig,
    time_range: TimeRange,
}

impl FetchGitHubTrending {
    pub fn new(
        source: Arc<dyn TrendingSource>,
        cache: Arc<CacheStore>,
        retry: RetryConfig,
        time_range: TimeRange,
    ) -> Self {
        Self {
            source,
            cache,
            retry,
            time_range,
        }
    }
}

#[async_trait]
impl Tool for FetchGitHubTrending {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput> {
        let res = cached_fetch(&self.cache, &self.retry, GITHUB_CACHE_KEY, args.no_cache, || {
            self.source.fetch_trending(self.time_range)
        })
        .await
        .with_context(|| format!("fetching trending from {}", self.source.name()))?;
        Ok(ToolOutput::Fetched(res))
    }
}

pub struct FetchHnPosts {
    source: Arc<dyn PostSource>,
    cache: Arc<CacheStore>,
    retry: RetryConfig,
    limit: usize,
}

impl FetchHnPosts {
    pub fn new(
        source: Arc<dyn PostSource>,
        cache: Arc<CacheStore>,
        retry: RetryConfig,
        limit: usize,
    ) -> Self {
        Self {
            source,
            cache,
            retry,
            limit,
        }
    }
}

#[async_trait]
impl Tool for FetchHnPosts {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput> {
        let endpoint = args
            .endpoint
            .unwrap_or_else(|| DEFAULT_HN_ENDPOINT.to_string());
        let key = hn_cache_key(&endpoint);
        let res = cached_fetch(&self.cache, &self.retry, &key, args.no_cache, || {
            self.source.fetch_posts(&endpoint, self.limit)
        })
        .await
        .with_context(|| format!("fetching {endpoint} posts from {}", self.source.name()))?;
        Ok(ToolOutput::Fetched(res))
    }
}

pub struct ScoreRelevance {
    scorer: Arc<RelevanceScorer>,
}

impl ScoreRelevance {
    pub fn new(scorer: Arc<RelevanceScorer>) -> Self {
        Self { scorer }
    }
}

#[async_trait]
impl Tool for ScoreRelevance {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput> {
        let mut items = args.items;
        self.scorer.score_all(&mut items, &args.topics).await;
        Ok(ToolOutput::Items(items))
    }
}

pub struct RankItems {
    ranker: Ranker,
}

impl RankItems {
    pub fn new(ranker: Ranker) -> Self {
        Self { ranker }
    }
}

#[async_trait]
impl Tool for RankItems {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput> {
        Ok(ToolOutput::Items(self.ranker.rank(args.items)))
    }
}

/// Adds `summary` and `discussion` to each post, pulling its comments from `source`.
pub struct SummarizePosts {
    summarizer: Arc<Summarizer>,
    source: Arc<dyn PostSource>,
}

impl SummarizePosts {
    pub fn new(summarizer: Arc<Summarizer>, source: Arc<dyn PostSource>) -> Self {
        Self { summarizer, source }
    }
}

#[async_trait]
impl Tool for SummarizePosts {
    async fn call(&self, args: ToolArgs) -> Result<ToolOutput> {
        let mut items = args.items;
        for post in items.iter_mut() {
            let comments = match self.source.fetch_comments(post, MAX_COMMENTS).await {
                Ok(c) => c,
                Err(e) => {
                    warn!(
                        target: "tools",
                        source = self.source.name(),
                        id = ?post.identity(),
                        error = %e,
                        "comment fetch failed; summarizing without discussion"
                    );
                    Vec::new()
                }
            };
            self.summarizer.annotate(post, &comments).await;
        }
        Ok(ToolOutput::Items(items))
    }
}

/// Name → handler dispatch table.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<&'static str, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five standard tools wired to the given collaborators.
    pub fn standard(
        config: &Config,
        github: Arc<dyn TrendingSource>,
        hn: Arc<dyn PostSource>,
        scorer: Arc<RelevanceScorer>,
        summarizer: Arc<Summarizer>,
        cache: Arc<CacheStore>,
    ) -> Self {
        let mut reg = Self::new();
        reg.register(
            FETCH_GITHUB_TRENDING,
            FetchGitHubTrending::new(
                github,
                Arc::clone(&cache),
                config.retry.clone(),
                config.sources.github.time_range,
            ),
        );
        reg.register(
            FETCH_HN_POSTS,
            FetchHnPosts::new(
                Arc::clone(&hn),
                cache,
                config.retry.clone(),
                config.sources.hackernews.limit,
            ),
        );
        reg.register(SCORE_RELEVANCE, ScoreRelevance::new(scorer));
        reg.register(RANK_ITEMS, RankItems::new(Ranker::from_config(&config.ranking)));
        reg.register(SUMMARIZE_POSTS, SummarizePosts::new(summarizer, hn));
        reg
    }

    /// Add or replace a tool.
    pub fn register(&mut self, name: &'static str, tool: impl Tool + 'static) {
        self.tools.insert(name, Box::new(tool));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        let mut v: Vec<_> = self.tools.keys().copied().collect();
        v.sort_unstable();
        v
    }

    pub async fn call(&self, name: &str, args: ToolArgs) -> Result<ToolOutput> {
        let Some((&key, tool)) = self.tools.get_key_value(name) else {
            anyhow::bail!("unknown tool '{name}'");
        };
        counter!(TOOL_CALLS, "tool" => key).increment(1);
        let out = tool.call(args).await?;
        if let Some(origin) = out.origin() {
            info!(target: "tools", tool = key, source = ?origin, "tool call finished");
        } else {
            debug!(target: "tools", tool = key, "tool call finished");
        }
        Ok(out)
    }
}
