// src/agent/mod.rs
//! Orchestration: `Init → [CollectGitHub?] → [CollectHN?] → Done`.
//!
//! The HN branch fetches, dedupes, scores, filters, ranks, truncates and, when
//! `analysis.summarize` is on, summarizes what is left.
//!
//! Each branch is gated by its source's `enabled` flag and runs through the tool
//! registry, so any step can be swapped out in tests.

pub mod tools;

use std::collections::HashSet;
use std::sync::Arc;

use anyhow::{Context, Result};
use metrics::gauge;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{AnalysisDepth, Config};
use crate::content::ContentItem;
use crate::metrics::{ensure_described, AGENT_LAST_RUN_TS};

use tools::{
    ToolArgs, ToolRegistry, FETCH_GITHUB_TRENDING, FETCH_HN_POSTS, RANK_ITEMS, SCORE_RELEVANCE,
    SUMMARIZE_POSTS,
};

/// HN posts must score strictly above this to be kept.
pub const RELEVANCE_THRESHOLD: f64 = 0.5;

pub const SOURCE_GITHUB: &str = "github";
pub const SOURCE_HACKERNEWS: &str = "hackernews";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Branches that actually ran.
    pub sources: Vec<String>,
    pub analysis_depth: AnalysisDepth,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentReport {
    pub github_repos: Vec<ContentItem>,
    pub hn_posts: Vec<ContentItem>,
    pub metadata: ReportMetadata,
}

pub struct NewsAgent {
    config: Arc<Config>,
    tools: ToolRegistry,
}

impl NewsAgent {
    pub fn new(config: Arc<Config>, tools: ToolRegistry) -> Self {
        ensure_described();
        Self { config, tools }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn tools_mut(&mut self) -> &mut ToolRegistry {
        &mut self.tools
    }

    pub async fn run(&self, no_cache: bool) -> Result<AgentReport> {
        let cfg = &self.config;
        let mut report = AgentReport {
            github_repos: Vec::new(),
            hn_posts: Vec::new(),
            metadata: ReportMetadata {
                sources: Vec::new(),
                analysis_depth: cfg.analysis.depth,
            },
        };

        if cfg.sources.github.enabled {
            report.github_repos = self
                .collect_github(no_cache)
                .await
                .context("collecting GitHub trending")?;
            report.metadata.sources.push(SOURCE_GITHUB.to_string());
        }

        if cfg.sources.hackernews.enabled {
            report.hn_posts = self
                .collect_hn(no_cache)
                .await
                .context("collecting Hacker News posts")?;
            report.metadata.sources.push(SOURCE_HACKERNEWS.to_string());
        }

        gauge!(AGENT_LAST_RUN_TS).set(chrono::Utc::now().timestamp() as f64);
        info!(
            target: "agent",
            github = report.github_repos.len(),
            hn = report.hn_posts.len(),
            depth = %report.metadata.analysis_depth,
            "run complete"
        );
        Ok(report)
    }

    async fn collect_github(&self, no_cache: bool) -> Result<Vec<ContentItem>> {
        let out = self
            .tools
            .call(FETCH_GITHUB_TRENDING, ToolArgs::new().no_cache(no_cache))
            .await?;
        let mut repos = out.into_items();
        repos.truncate(self.config.analysis.top_n);
        Ok(repos)
    }

    async fn collect_hn(&self, no_cache: bool) -> Result<Vec<ContentItem>> {
        let hn = &self.config.sources.hackernews;

        let mut posts = Vec::new();
        for endpoint in &hn.endpoints {
            let out = self
                .tools
                .call(
                    FETCH_HN_POSTS,
                    ToolArgs::new().no_cache(no_cache).endpoint(endpoint.as_str()),
                )
                .await?;
            let batch = out.into_items();
            debug!(target: "agent", endpoint = %endpoint, count = batch.len(), "endpoint fetched");
            posts.extend(batch);
        }
        let posts = dedupe_by_identity(posts);

        let scored = self
            .tools
            .call(
                SCORE_RELEVANCE,
                ToolArgs::new()
                    .items(posts)
                    .topics(hn.filter_topics.clone()),
            )
            .await?
            .into_items();
        let total = scored.len();

        let relevant: Vec<ContentItem> = scored
            .into_iter()
            .filter(|p| p.relevance_score() > RELEVANCE_THRESHOLD)
            .collect();
        info!(target: "agent", kept = relevant.len(), total, "relevance filter applied");

        let mut ranked = self
            .tools
            .call(RANK_ITEMS, ToolArgs::new().items(relevant))
            .await?
            .into_items();
        ranked.truncate(self.config.analysis.top_n);

        if !self.config.analysis.summarize || ranked.is_empty() {
            return Ok(ranked);
        }
        let summarized = self
            .tools
            .call(SUMMARIZE_POSTS, ToolArgs::new().items(ranked))
            .await?
            .into_items();
        Ok(summarized)
    }
}

/// Drop repeated ids, keeping the first occurrence. Items without an id are kept.
pub fn dedupe_by_identity(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|it| match it.identity() {
            Some(id) => seen.insert(id),
            None => true,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let items = vec![
            ContentItem::new().with("id", 1).with("title", "first"),
            ContentItem::new().with("id", 2),
            ContentItem::new().with("id", 1).with("title", "second"),
            ContentItem::new().with("title", "no id"),
            ContentItem::new().with("title", "no id either"),
        ];
        let out = dedupe_by_identity(items);
        assert_eq!(out.len(), 4);
        assert_eq!(out[0].str_field("title"), Some("first"));
    }

    #[test]
    fn report_serializes_with_expected_shape() {
        let r = AgentReport {
            github_repos: vec![],
            hn_posts: vec![ContentItem::new().with("id", 7)],
            metadata: ReportMetadata {
                sources: vec!["hackernews".into()],
                analysis_depth: AnalysisDepth::Medium,
            },
        };
        let v = serde_json::to_value(&r).unwrap();
        assert_eq!(v["metadata"]["analysis_depth"], "medium");
        assert_eq!(v["metadata"]["sources"][0], "hackernews");
        assert_eq!(v["hn_posts"][0]["id"], 7);
        assert!(v["github_repos"].as_array().unwrap().is_empty());
    }
}
