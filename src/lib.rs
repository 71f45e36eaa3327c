// src/lib.rs
// Public library surface for the binary and integration tests.

pub mod agent;
pub mod analyze;
pub mod cache;
pub mod config;
pub mod content;
pub mod llm;
pub mod metrics;
pub mod output;
pub mod retry;
pub mod sources;

// ---- Re-exports for stable public API ----
pub use agent::tools::{FetchOrigin, Tool, ToolArgs, ToolOutput, ToolRegistry};
pub use agent::{AgentReport, NewsAgent, ReportMetadata};
pub use cache::CacheStore;
pub use config::{load_config, Config};
pub use content::ContentItem;

use std::sync::Arc;

use anyhow::Result;

use crate::analyze::{RelevanceScorer, Summarizer};
use crate::llm::build_provider;
use crate::sources::{GitHubTrendingClient, HackerNewsClient};

/// Wire the production collaborators (HTTP sources, configured LLM, on-disk cache).
pub fn build_agent(config: Config) -> Result<NewsAgent> {
    let llm = build_provider(&config.llm)?;
    let cache = Arc::new(CacheStore::from_config(&config.caching));
    let tools = ToolRegistry::standard(
        &config,
        Arc::new(GitHubTrendingClient::new()?),
        Arc::new(HackerNewsClient::new()?),
        Arc::new(RelevanceScorer::new(Arc::clone(&llm))),
        Arc::new(Summarizer::new(llm, config.analysis.depth)),
        cache,
    );
    Ok(NewsAgent::new(Arc::new(config), tools))
}
