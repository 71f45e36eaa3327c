// src/config/mod.rs
//! TOML configuration: parsed once, validated once, then shared read-only.
//!
//! Every section except `[llm]` is optional and falls back to defaults. Validation
//! runs after parsing and after CLI overrides, so a bad value fails the run before
//! any network call is made.

pub mod llm;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use llm::LlmConfig;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Hacker News feeds the client knows how to list.
pub const HN_ENDPOINTS: &[&str] = &["top", "new", "newest", "best", "show", "ask", "job"];

/// Tolerance for `relevance + popularity == 1.0`.
const WEIGHT_SUM_TOLERANCE: f64 = 0.01;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub ranking: RankingConfig,
    #[serde(default)]
    pub caching: CachingConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub retry: RetryConfig,
}

/* ----------------------------
Analysis
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisDepth {
    Lightweight,
    #[default]
    Medium,
    Deep,
}

impl AnalysisDepth {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lightweight => "lightweight",
            Self::Medium => "medium",
            Self::Deep => "deep",
        }
    }
}

impl fmt::Display for AnalysisDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisDepth {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "lightweight" => Ok(Self::Lightweight),
            "medium" => Ok(Self::Medium),
            "deep" => Ok(Self::Deep),
            other => Err(format!(
                "invalid depth '{other}' (expected lightweight, medium or deep)"
            )),
        }
    }
}

fn default_top_n() -> usize {
    25
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub depth: AnalysisDepth,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    /// Summarize kept HN posts and their discussion at `depth`.
    #[serde(default = "default_true")]
    pub summarize: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            depth: AnalysisDepth::default(),
            top_n: default_top_n(),
            summarize: true,
        }
    }
}

/* ----------------------------
Sources
---------------------------- */

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeRange {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

impl TimeRange {
    pub fn days(&self) -> i64 {
        match self {
            Self::Daily => 1,
            Self::Weekly => 7,
            Self::Monthly => 30,
        }
    }
}

fn default_categories() -> Vec<String> {
    vec!["repositories".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
    #[serde(default)]
    pub time_range: TimeRange,
}

impl Default for GitHubSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: default_categories(),
            time_range: TimeRange::default(),
        }
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["newest".to_string()]
}

fn default_hn_limit() -> usize {
    30
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HackerNewsSourceConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_endpoints")]
    pub endpoints: Vec<String>,
    #[serde(default)]
    pub filter_topics: Vec<String>,
    /// Posts requested per endpoint.
    #[serde(default = "default_hn_limit")]
    pub limit: usize,
}

impl Default for HackerNewsSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoints: default_endpoints(),
            filter_topics: Vec::new(),
            limit: default_hn_limit(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub github: GitHubSourceConfig,
    #[serde(default)]
    pub hackernews: HackerNewsSourceConfig,
}

/* ----------------------------
Ranking
---------------------------- */

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RankingStrategy {
    Popularity,
    Relevance,
    #[default]
    Balanced,
}

fn default_relevance_weight() -> f64 {
    0.7
}
fn default_popularity_weight() -> f64 {
    0.3
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingWeights {
    #[serde(default = "default_relevance_weight")]
    pub relevance: f64,
    #[serde(default = "default_popularity_weight")]
    pub popularity: f64,
}

impl Default for RankingWeights {
    fn default() -> Self {
        Self {
            relevance: default_relevance_weight(),
            popularity: default_popularity_weight(),
        }
    }
}

impl RankingWeights {
    /// Checked constructor: each weight in [0,1] and the pair summing to 1.0 ± 0.01.
    pub fn new(relevance: f64, popularity: f64) -> Result<Self> {
        let w = Self {
            relevance,
            popularity,
        };
        w.validate()?;
        Ok(w)
    }

    fn validate(&self) -> Result<()> {
        for (name, v) in [
            ("relevance", self.relevance),
            ("popularity", self.popularity),
        ] {
            if !(0.0..=1.0).contains(&v) {
                anyhow::bail!("ranking.weights.{name} must be within [0.0, 1.0] (got {v})");
            }
        }
        let sum = self.relevance + self.popularity;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            anyhow::bail!("ranking.weights must sum to 1.0 (got {sum:.3})");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RankingConfig {
    #[serde(default)]
    pub strategy: RankingStrategy,
    #[serde(default)]
    pub weights: RankingWeights,
}

/* ----------------------------
Caching / output / retry
---------------------------- */

fn default_ttl_hours() -> u64 {
    1
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_ttl_hours")]
    pub ttl_hours: u64,
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

impl Default for CachingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_hours: default_ttl_hours(),
            dir: default_cache_dir(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Markdown,
}

fn default_save_path() -> PathBuf {
    PathBuf::from("./reports")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: OutputFormat,
    #[serde(default = "default_save_path")]
    pub save_path: PathBuf,
    #[serde(default = "default_true")]
    pub terminal_preview: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::default(),
            save_path: default_save_path(),
            terminal_preview: true,
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}
fn default_backoff_multiplier() -> u32 {
    2
}
fn default_backoff_unit_ms() -> u64 {
    1_000
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: u32,
    #[serde(default = "default_true")]
    pub graceful_degradation: bool,
    /// Length of one backoff step; the delay before retry `n` is `unit * multiplier^n`.
    #[serde(default = "default_backoff_unit_ms")]
    pub backoff_unit_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_multiplier: default_backoff_multiplier(),
            graceful_degradation: true,
            backoff_unit_ms: default_backoff_unit_ms(),
        }
    }
}

/* ----------------------------
Loading + validation
---------------------------- */

impl Config {
    /// Parse TOML text. Does not validate; call [`Config::validate`] afterwards.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: Config = toml::from_str(s)?;
        Ok(cfg)
    }

    /// Fail-fast checks for everything serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;

        let top_n = self.analysis.top_n;
        if !(1..=100).contains(&top_n) {
            anyhow::bail!("analysis.top_n must be between 1 and 100 (got {top_n})");
        }

        self.ranking.weights.validate()?;

        for ep in &self.sources.hackernews.endpoints {
            let norm = ep.trim().to_ascii_lowercase();
            if !HN_ENDPOINTS.contains(&norm.as_str()) {
                anyhow::bail!(
                    "sources.hackernews.endpoints: unknown endpoint '{ep}' (expected one of {})",
                    HN_ENDPOINTS.join(", ")
                );
            }
        }
        if self.sources.hackernews.limit == 0 {
            anyhow::bail!("sources.hackernews.limit must be at least 1");
        }

        let attempts = self.retry.max_attempts;
        if !(1..=10).contains(&attempts) {
            anyhow::bail!("retry.max_attempts must be between 1 and 10 (got {attempts})");
        }
        if self.retry.backoff_multiplier < 1 {
            anyhow::bail!("retry.backoff_multiplier must be at least 1");
        }
        Ok(())
    }

    /// Restrict the run to the named sources ("github", "hn"/"hackernews").
    /// Sources not named are disabled; unknown names are an error.
    pub fn apply_source_filter(&mut self, names: &[String]) -> Result<()> {
        let mut github = false;
        let mut hn = false;
        for n in names {
            match n.trim().to_ascii_lowercase().as_str() {
                "github" | "gh" => github = true,
                "hn" | "hackernews" => hn = true,
                "" => {}
                other => anyhow::bail!("unknown source '{other}' (expected github or hn)"),
            }
        }
        self.sources.github.enabled &= github;
        self.sources.hackernews.enabled &= hn;
        Ok(())
    }
}

/// Command-line values that win over the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub depth: Option<AnalysisDepth>,
    pub sources: Option<Vec<String>>,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<Config> {
    load_config_with(path, &Overrides::default())
}

/// Load, apply `overrides`, then validate.
pub fn load_config_with(path: &Path, overrides: &Overrides) -> Result<Config> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading config from {}", path.display()))?;
    let mut cfg = Config::from_toml_str(&content)
        .with_context(|| format!("parsing config {}", path.display()))?;

    if let Some(depth) = overrides.depth {
        cfg.analysis.depth = depth;
    }
    if let Some(names) = &overrides.sources {
        cfg.apply_source_filter(names)?;
    }

    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}
