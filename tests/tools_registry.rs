// tests/tools_registry.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use trend_digest::agent::tools::{
    hn_cache_key, FetchGitHubTrending, FetchHnPosts, FetchOrigin, SummarizePosts, Tool, ToolArgs,
    ToolOutput, ToolRegistry, FETCH_GITHUB_TRENDING, FETCH_HN_POSTS, GITHUB_CACHE_KEY, RANK_ITEMS,
    SCORE_RELEVANCE, SUMMARIZE_POSTS,
};
use trend_digest::analyze::summarize::NO_COMMENTS;
use trend_digest::analyze::{RelevanceScorer, Summarizer};
use trend_digest::cache::CacheStore;
use trend_digest::config::{AnalysisDepth, CachingConfig, Config, RetryConfig, TimeRange};
use trend_digest::content::ContentItem;
use trend_digest::llm::MockLanguageModel;
use trend_digest::retry::transient;
use trend_digest::sources::{PostSource, TrendingSource};

#[derive(Default)]
struct CountingTrending {
    calls: AtomicUsize,
}

#[async_trait]
impl TrendingSource for CountingTrending {
    async fn fetch_trending(&self, _time_range: TimeRange) -> Result<Vec<ContentItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![ContentItem::new().with("id", 1).with("name", "live/repo")])
    }
    fn name(&self) -> &'static str {
        "CountingTrending"
    }
}

/// Answers like an API that rejects the credentials.
#[derive(Default)]
struct UnauthorizedTrending {
    calls: AtomicUsize,
}

#[async_trait]
impl TrendingSource for UnauthorizedTrending {
    async fn fetch_trending(&self, _time_range: TimeRange) -> Result<Vec<ContentItem>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("github search returned 401 Unauthorized")
    }
    fn name(&self) -> &'static str {
        "UnauthorizedTrending"
    }
}

/// Fails the first `failures` calls, then succeeds.
struct FlakyPosts {
    calls: AtomicUsize,
    failures: usize,
}

#[async_trait]
impl PostSource for FlakyPosts {
    async fn fetch_posts(&self, endpoint: &str, _limit: usize) -> Result<Vec<ContentItem>> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(transient("connection reset"));
        }
        Ok(vec![ContentItem::new().with("id", 42).with("title", endpoint)])
    }
    fn name(&self) -> &'static str {
        "FlakyPosts"
    }
}

fn cache(dir: &std::path::Path) -> Arc<CacheStore> {
    Arc::new(CacheStore::from_config(&CachingConfig {
        enabled: true,
        ttl_hours: 1,
        dir: dir.to_path_buf(),
    }))
}

fn fast_retry(max_attempts: u32, graceful: bool) -> RetryConfig {
    RetryConfig {
        max_attempts,
        backoff_multiplier: 2,
        graceful_degradation: graceful,
        backoff_unit_ms: 1,
    }
}

#[tokio::test]
async fn cached_entry_is_served_without_calling_collaborator() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache(tmp.path());
    cache.set(
        GITHUB_CACHE_KEY,
        &vec![ContentItem::new().with("id", 9).with("name", "cached/repo")],
    );

    let src = Arc::new(CountingTrending::default());
    let tool = FetchGitHubTrending::new(src.clone(), cache, fast_retry(1, false), TimeRange::Daily);

    let out = tool.call(ToolArgs::new()).await.unwrap();
    assert_eq!(out.origin(), Some(FetchOrigin::Cache));
    let items = out.into_items();
    assert_eq!(items[0].str_field("name"), Some("cached/repo"));
    assert_eq!(src.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn no_cache_fetches_live_and_still_writes() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache(tmp.path());
    cache.set(GITHUB_CACHE_KEY, &vec![ContentItem::new().with("id", 9)]);

    let src = Arc::new(CountingTrending::default());
    let tool = FetchGitHubTrending::new(
        src.clone(),
        cache.clone(),
        fast_retry(1, false),
        TimeRange::Weekly,
    );

    let out = tool.call(ToolArgs::new().no_cache(true)).await.unwrap();
    assert_eq!(out.origin(), Some(FetchOrigin::Live));
    assert_eq!(src.calls.load(Ordering::SeqCst), 1);

    let cached = cache.get(GITHUB_CACHE_KEY).unwrap();
    assert_eq!(cached[0]["name"], "live/repo");
}

#[tokio::test]
async fn empty_cached_list_is_refetched() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache(tmp.path());
    cache.set(GITHUB_CACHE_KEY, &Vec::<ContentItem>::new());

    let src = Arc::new(CountingTrending::default());
    let tool = FetchGitHubTrending::new(
        src.clone(),
        cache.clone(),
        fast_retry(1, false),
        TimeRange::Daily,
    );

    let out = tool.call(ToolArgs::new()).await.unwrap();
    assert_eq!(out.origin(), Some(FetchOrigin::Live));
    assert_eq!(out.into_items().len(), 1);
    assert_eq!(src.calls.load(Ordering::SeqCst), 1);
    assert_eq!(cache.get(GITHUB_CACHE_KEY).unwrap()[0]["name"], "live/repo");
}

#[tokio::test]
async fn fetch_output_serializes_with_source_tag() {
    let tmp = tempfile::tempdir().unwrap();
    let tool = FetchGitHubTrending::new(
        Arc::new(CountingTrending::default()),
        cache(tmp.path()),
        fast_retry(1, false),
        TimeRange::Daily,
    );
    let out = tool.call(ToolArgs::new()).await.unwrap();
    let v = serde_json::to_value(&out).unwrap();
    assert_eq!(v["source"], "live");
    assert_eq!(v["data"][0]["id"], 1);
}

#[tokio::test]
async fn hn_fetch_retries_then_caches_under_endpoint_key() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache(tmp.path());
    let src = Arc::new(FlakyPosts {
        calls: AtomicUsize::new(0),
        failures: 2,
    });
    let tool = FetchHnPosts::new(src.clone(), cache.clone(), fast_retry(3, false), 30);

    let out = tool.call(ToolArgs::new().endpoint("show")).await.unwrap();
    assert_eq!(out.origin(), Some(FetchOrigin::Live));
    assert_eq!(src.calls.load(Ordering::SeqCst), 3);
    assert!(cache.get(&hn_cache_key("show")).is_some());
    assert!(cache.get(&hn_cache_key("newest")).is_none());
}

#[tokio::test]
async fn degraded_fetch_is_empty_and_not_cached() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache(tmp.path());
    let src = Arc::new(FlakyPosts {
        calls: AtomicUsize::new(0),
        failures: usize::MAX,
    });
    let tool = FetchHnPosts::new(src.clone(), cache.clone(), fast_retry(2, true), 30);

    let out = tool.call(ToolArgs::new()).await.unwrap();
    assert_eq!(out, ToolOutput::Fetched(trend_digest::agent::tools::FetchResult {
        source: FetchOrigin::Live,
        data: vec![],
    }));
    assert_eq!(src.calls.load(Ordering::SeqCst), 2);
    assert!(cache.get(&hn_cache_key("newest")).is_none());
}

#[tokio::test]
async fn exhausted_retries_propagate_without_degradation() {
    let tmp = tempfile::tempdir().unwrap();
    let src = Arc::new(FlakyPosts {
        calls: AtomicUsize::new(0),
        failures: usize::MAX,
    });
    let tool = FetchHnPosts::new(src, cache(tmp.path()), fast_retry(2, false), 30);
    let err = tool.call(ToolArgs::new()).await.unwrap_err();
    assert!(format!("{err:#}").contains("connection reset"));
}

#[tokio::test]
async fn permanent_failure_is_neither_retried_nor_degraded() {
    let tmp = tempfile::tempdir().unwrap();
    let cache = cache(tmp.path());
    let src = Arc::new(UnauthorizedTrending::default());
    let tool = FetchGitHubTrending::new(
        src.clone(),
        cache.clone(),
        fast_retry(3, true),
        TimeRange::Daily,
    );

    let err = tool.call(ToolArgs::new()).await.unwrap_err();
    assert!(format!("{err:#}").contains("401 Unauthorized"));
    assert_eq!(src.calls.load(Ordering::SeqCst), 1);
    assert!(cache.get(GITHUB_CACHE_KEY).is_none());
}

fn summarizer(llm: Arc<MockLanguageModel>) -> Arc<Summarizer> {
    Arc::new(Summarizer::new(llm, AnalysisDepth::Medium))
}

#[tokio::test]
async fn standard_registry_exposes_five_tools_and_rejects_unknown() {
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = Config::from_toml_str(
        "[llm]\nprovider = \"openai\"\nmodel = \"m\"\napi_key_env = \"UNUSED\"\n",
    )
    .unwrap();
    cfg.caching.dir = tmp.path().to_path_buf();

    let reg = ToolRegistry::standard(
        &cfg,
        Arc::new(CountingTrending::default()),
        Arc::new(FlakyPosts {
            calls: AtomicUsize::new(0),
            failures: 0,
        }),
        Arc::new(RelevanceScorer::new(Arc::new(MockLanguageModel::new("{}")))),
        summarizer(Arc::new(MockLanguageModel::new(""))),
        cache(tmp.path()),
    );
    assert_eq!(
        reg.names(),
        vec![
            FETCH_GITHUB_TRENDING,
            FETCH_HN_POSTS,
            RANK_ITEMS,
            SCORE_RELEVANCE,
            SUMMARIZE_POSTS
        ]
    );

    let err = reg.call("fetch_reddit", ToolArgs::new()).await.unwrap_err();
    assert!(err.to_string().contains("unknown tool"));
}

struct FixedRank;

#[async_trait]
impl Tool for FixedRank {
    async fn call(&self, _args: ToolArgs) -> Result<ToolOutput> {
        Ok(ToolOutput::Items(vec![ContentItem::new().with("id", "mock")]))
    }
}

#[tokio::test]
async fn registered_tool_replaces_existing_entry() {
    let mut reg = ToolRegistry::new();
    reg.register(RANK_ITEMS, FixedRank);
    let out = reg
        .call(RANK_ITEMS, ToolArgs::new().items(vec![ContentItem::new()]))
        .await
        .unwrap();
    assert_eq!(out.into_items()[0].identity().as_deref(), Some("mock"));
}

#[tokio::test]
async fn score_and_rank_tools_transform_items() {
    let llm = Arc::new(MockLanguageModel::with_replies(
        "{}",
        [
            r#"{"relevance_score": 0.2}"#,
            "```json\n{\"relevance_score\": 0.9}\n```",
        ],
    ));
    let tmp = tempfile::tempdir().unwrap();
    let mut cfg = Config::from_toml_str(
        "[llm]\nprovider = \"openai\"\nmodel = \"m\"\napi_key_env = \"UNUSED\"\n[ranking]\nstrategy = \"relevance\"\n",
    )
    .unwrap();
    cfg.caching.dir = tmp.path().to_path_buf();
    let reg = ToolRegistry::standard(
        &cfg,
        Arc::new(CountingTrending::default()),
        Arc::new(FlakyPosts {
            calls: AtomicUsize::new(0),
            failures: 0,
        }),
        Arc::new(RelevanceScorer::new(llm)),
        summarizer(Arc::new(MockLanguageModel::new(""))),
        cache(tmp.path()),
    );

    let items = vec![
        ContentItem::new().with("id", 1).with("title", "a"),
        ContentItem::new().with("id", 2).with("title", "b"),
    ];
    let scored = reg
        .call(
            SCORE_RELEVANCE,
            ToolArgs::new().items(items).topics(vec!["AI".into()]),
        )
        .await
        .unwrap()
        .into_items();
    assert!((scored[0].relevance_score() - 0.2).abs() < 1e-9);
    assert!((scored[1].relevance_score() - 0.9).abs() < 1e-9);

    let ranked = reg
        .call(RANK_ITEMS, ToolArgs::new().items(scored))
        .await
        .unwrap()
        .into_items();
    assert_eq!(ranked[0].identity().as_deref(), Some("2"));
}

/// Post 1 has a two-comment thread, post 2 has none, post 3 fails to load comments.
struct ThreadedPosts;

#[async_trait]
impl PostSource for ThreadedPosts {
    async fn fetch_posts(&self, _endpoint: &str, _limit: usize) -> Result<Vec<ContentItem>> {
        Ok(vec![])
    }
    async fn fetch_comments(&self, post: &ContentItem, limit: usize) -> Result<Vec<ContentItem>> {
        match post.identity().as_deref() {
            Some("1") => Ok(vec![
                ContentItem::new().with("by", "alice").with("text", "Benchmarks look off"),
                ContentItem::new().with("by", "bob").with("text", "Works for me"),
            ]
            .into_iter()
            .take(limit)
            .collect()),
            Some("3") => Err(transient("hn item timed out")),
            _ => Ok(vec![]),
        }
    }
    fn name(&self) -> &'static str {
        "ThreadedPosts"
    }
}

#[tokio::test]
async fn summarize_tool_annotates_posts_with_their_threads() {
    let llm = Arc::new(MockLanguageModel::with_replies(
        "fallback",
        ["Post one summary.", "Mixed reactions to benchmarks."],
    ));
    let tool = SummarizePosts::new(summarizer(llm.clone()), Arc::new(ThreadedPosts));
    let posts = vec![
        ContentItem::new().with("id", 1).with("title", "New LLM"),
        ContentItem::new().with("id", 2).with("title", "Quiet post"),
        ContentItem::new().with("id", 3).with("title", "Flaky thread"),
    ];

    let out = tool.call(ToolArgs::new().items(posts)).await.unwrap().into_items();
    assert_eq!(out.len(), 3);
    assert_eq!(out[0].str_field("summary"), Some("Post one summary."));
    assert_eq!(out[0].str_field("discussion"), Some("Mixed reactions to benchmarks."));
    assert_eq!(out[1].str_field("discussion"), Some(NO_COMMENTS));
    assert_eq!(out[2].str_field("discussion"), Some(NO_COMMENTS));

    // One article call per post, one discussion call per non-empty thread.
    let prompts = llm.prompts();
    assert_eq!(prompts.len(), 4);
    assert!(prompts[1].contains("Comment by alice: Benchmarks look off"));
    assert!(llm.options().iter().all(|o| o.max_tokens == 256));
}
