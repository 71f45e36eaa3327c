// src/output/markdown.rs
//! Markdown digest: header, GitHub section, HN section, summary, joined by `---`.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};

use crate::agent::AgentReport;
use crate::content::ContentItem;

const SECTION_SEP: &str = "\n\n---\n\n";

pub fn render_report(report: &AgentReport, generated_at: NaiveDateTime) -> String {
    let mut sections = vec![header(report, generated_at)];
    if !report.github_repos.is_empty() {
        sections.push(github_section(&report.github_repos));
    }
    if !report.hn_posts.is_empty() {
        sections.push(hn_section(&report.hn_posts));
    }
    sections.push(summary(report));
    sections.join(SECTION_SEP)
}

/// `<save_path>/report-YYYY-MM-DD.md`
pub fn report_path(save_path: &Path, date: NaiveDate) -> PathBuf {
    save_path.join(format!("report-{}.md", date.format("%Y-%m-%d")))
}

fn header(report: &AgentReport, generated_at: NaiveDateTime) -> String {
    format!(
        "# Trend Digest\n\n**Generated:** {}\n**Analysis Depth:** {}\n**Sources:** {}",
        generated_at.format("%Y-%m-%d %I:%M %p"),
        report.metadata.analysis_depth,
        report.metadata.sources.join(", ")
    )
}

pub fn github_section(repos: &[ContentItem]) -> String {
    let mut out = format!("## GitHub Trending Repositories (Top {})", repos.len());
    for (i, repo) in repos.iter().enumerate() {
        let url = repo.str_field("url").unwrap_or("#");
        let _ = write!(out, "\n\n### {}. [{}]({url})", i + 1, repo.display_title());
        let _ = write!(
            out,
            "\n**Description:** {}",
            repo.str_field("description").unwrap_or("N/A")
        );

        let mut stats = vec![
            format!("⭐ {} stars", thousands(repo.score("stars") as i64)),
            format!("🔱 {} forks", thousands(repo.score("forks") as i64)),
        ];
        if let Some(lang) = repo.str_field("language").filter(|l| !l.is_empty()) {
            stats.push(format!("💻 {lang}"));
        }
        let today = repo.score("stars_today") as i64;
        if today > 0 {
            stats.push(format!("📈 +{} stars today", thousands(today)));
        }
        let _ = write!(out, "\n**Stats:** {}", stats.join(" | "));
        if let Some(analysis) = non_empty(repo, "analysis") {
            let _ = write!(out, "\n**Analysis:** {analysis}");
        }
    }
    out
}

pub fn hn_section(posts: &[ContentItem]) -> String {
    let mut out = format!("## Hacker News (Top {})", posts.len());
    for (i, post) in posts.iter().enumerate() {
        let hn_url = post.str_field("hn_url").unwrap_or("#");
        let _ = write!(out, "\n\n### {}. [{}]({hn_url})", i + 1, post.display_title());
        if let Some(url) = post.str_field("url").filter(|u| !u.is_empty()) {
            let _ = write!(out, "\n**Link:** {url}");
        }
        let _ = write!(
            out,
            "\n**Stats:** {} points | {} comments | relevance {:.2}",
            post.score("score") as i64,
            post.score("comments_count") as i64,
            post.relevance_score()
        );
        if let Some(summary) = non_empty(post, "summary") {
            let _ = write!(out, "\n**Summary:** {summary}");
        }
        if let Some(discussion) = non_empty(post, "discussion") {
            let _ = write!(out, "\n**Discussion Highlights:** {discussion}");
        }
    }
    out
}

fn non_empty<'a>(item: &'a ContentItem, key: &str) -> Option<&'a str> {
    item.str_field(key).map(str::trim).filter(|s| !s.is_empty())
}

fn summary(report: &AgentReport) -> String {
    let mut out = String::from("## Summary");
    if !report.github_repos.is_empty() {
        let _ = write!(
            out,
            "\n- **GitHub:** {} trending repositories",
            report.github_repos.len()
        );
    }
    if !report.hn_posts.is_empty() {
        let _ = write!(out, "\n- **Hacker News:** {} relevant posts", report.hn_posts.len());
    }
    if !report.metadata.sources.is_empty() {
        let _ = write!(out, "\n- **Sources:** {}", report.metadata.sources.join(", "));
    }
    out
}

/// 1234567 -> "1,234,567"
fn thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
