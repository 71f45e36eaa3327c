// src/output/mod.rs
pub mod markdown;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::agent::AgentReport;
use crate::config::Config;

pub use markdown::{render_report, report_path};

/// Rows shown per source in the terminal preview.
pub const PREVIEW_ROWS: usize = 10;
const PREVIEW_TITLE_CHARS: usize = 60;

/// Write the rendered report, creating parent directories as needed.
pub fn write_report(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating report dir {}", parent.display()))?;
    }
    let tmp = path.with_extension("md.tmp");
    fs::write(&tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("moving report into {}", path.display()))?;
    Ok(())
}

/// Compact plain-text table of the top items per source.
pub fn render_preview(report: &AgentReport) -> String {
    let mut lines = Vec::new();
    if !report.github_repos.is_empty() {
        lines.push("GitHub Trending Repositories".to_string());
        for (i, repo) in report.github_repos.iter().take(PREVIEW_ROWS).enumerate() {
            lines.push(format!(
                "{:>3}. {:<60} {:>8} stars",
                i + 1,
                clip(repo.display_title()),
                repo.score("stars") as i64
            ));
        }
    }
    if !report.hn_posts.is_empty() {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Hacker News".to_string());
        for (i, post) in report.hn_posts.iter().take(PREVIEW_ROWS).enumerate() {
            lines.push(format!(
                "{:>3}. {:<60} {:>5} pts  rel {:.2}",
                i + 1,
                clip(post.display_title()),
                post.score("score") as i64,
                post.relevance_score()
            ));
        }
    }
    lines.join("\n")
}

/// What a run with `cfg` would do, without building any client or model.
pub fn render_plan(cfg: &Config) -> String {
    let mut lines = vec!["Dry run: nothing will be fetched.".to_string()];
    let (github, hn) = (&cfg.sources.github, &cfg.sources.hackernews);
    if github.enabled {
        lines.push(format!(
            "  github: trending repositories ({:?})",
            github.time_range
        ));
    }
    if hn.enabled {
        lines.push(format!(
            "  hackernews: endpoints [{}], {} posts each, topics [{}]",
            hn.endpoints.join(", "),
            hn.limit,
            hn.filter_topics.join(", ")
        ));
    }
    if !github.enabled && !hn.enabled {
        lines.push("  (no sources enabled)".to_string());
    }
    lines.push(format!(
        "  depth: {}, top_n: {}, summaries: {}",
        cfg.analysis.depth,
        cfg.analysis.top_n,
        if cfg.analysis.summarize { "on" } else { "off" }
    ));
    lines.join("\n")
}

fn clip(s: &str) -> String {
    if s.chars().count() > PREVIEW_TITLE_CHARS {
        let head: String = s.chars().take(PREVIEW_TITLE_CHARS - 3).collect();
        format!("{head}...")
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::ReportMetadata;
    use crate::config::AnalysisDepth;
    use crate::content::ContentItem;

    #[test]
    fn write_report_creates_parent_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested/reports/report-2024-01-01.md");
        write_report(&path, "# hi").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# hi");
        assert!(!path.with_extension("md.tmp").exists());
    }

    #[test]
    fn plan_lists_enabled_sources_only() {
        let mut cfg = Config::from_toml_str(
            "[llm]\nprovider = \"openai\"\nmodel = \"m\"\napi_key_env = \"NOT_SET_ANYWHERE\"\n\
             [sources.hackernews]\nendpoints = [\"newest\", \"show\"]\nfilter_topics = [\"AI\"]\n",
        )
        .unwrap();
        cfg.sources.github.enabled = false;
        let plan = render_plan(&cfg);
        assert!(plan.starts_with("Dry run"));
        assert!(!plan.contains("github"));
        assert!(plan.contains("endpoints [newest, show], 30 posts each, topics [AI]"));
        assert!(plan.ends_with("depth: medium, top_n: 25, summaries: on"));

        cfg.sources.hackernews.enabled = false;
        assert!(render_plan(&cfg).contains("(no sources enabled)"));
    }

    #[test]
    fn preview_clips_long_titles_and_caps_rows() {
        let posts: Vec<ContentItem> = (0..15)
            .map(|i| {
                ContentItem::new()
                    .with("id", i)
                    .with("title", "x".repeat(100))
                    .with("score", 10)
            })
            .collect();
        let r = AgentReport {
            github_repos: vec![],
            hn_posts: posts,
            metadata: ReportMetadata {
                sources: vec!["hackernews".into()],
                analysis_depth: AnalysisDepth::Lightweight,
            },
        };
        let out = render_preview(&r);
        assert!(out.starts_with("Hacker News"));
        assert_eq!(out.lines().count(), 1 + PREVIEW_ROWS);
        assert!(out.contains(&format!("{}...", "x".repeat(57))));
    }
}
