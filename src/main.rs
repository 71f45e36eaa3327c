//! trend-digest: fetch trending repos and HN posts, score, rank, write a markdown digest.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use trend_digest::cache::CacheStore;
use trend_digest::config::{load_config_with, AnalysisDepth, Overrides, DEFAULT_CONFIG_PATH};
use trend_digest::output::{render_plan, render_preview, render_report, report_path, write_report};
use trend_digest::build_agent;

#[derive(Parser)]
#[command(name = "trend-digest")]
#[command(version)]
#[command(about = "Trending GitHub repositories and Hacker News posts, ranked by topic relevance")]
struct Cli {
    /// Path to configuration file
    #[arg(long, env = "TREND_DIGEST_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Output file path (default: <save_path>/report-<date>.md)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Ignore cached data; fresh results are still cached
    #[arg(long)]
    no_cache: bool,

    /// Analysis depth (overrides config)
    #[arg(long)]
    depth: Option<AnalysisDepth>,

    /// Comma-separated list of sources (e.g. github,hn)
    #[arg(long, value_delimiter = ',')]
    sources: Option<Vec<String>>,

    /// Show what would be fetched without running
    #[arg(long)]
    dry_run: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Delete every cache entry before running
    #[arg(long)]
    clear_cache: bool,
}

/// Logs go to stderr so the preview on stdout stays clean.
/// `TREND_DIGEST_LOG_FORMAT=json` switches to JSON lines.
fn init_tracing(verbose: bool) {
    let default = if verbose {
        "trend_digest=debug,info"
    } else {
        "trend_digest=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let json = std::env::var("TREND_DIGEST_LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().compact().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    let overrides = Overrides {
        depth: cli.depth,
        sources: cli.sources,
    };
    let cfg = load_config_with(&cli.config, &overrides)?;

    if cli.dry_run {
        println!("{}", render_plan(&cfg));
        return Ok(());
    }

    if cli.clear_cache {
        let cache = CacheStore::from_config(&cfg.caching);
        cache.clear(None);
        info!(dir = %cache.dir().display(), "cache cleared");
    }

    let output = cfg.output.clone();
    let agent = build_agent(cfg)?;
    let report = agent.run(cli.no_cache).await?;

    let now = chrono::Local::now().naive_local();
    let path = cli
        .output
        .unwrap_or_else(|| report_path(&output.save_path, now.date()));
    write_report(&path, &render_report(&report, now))?;

    if output.terminal_preview {
        let preview = render_preview(&report);
        if !preview.is_empty() {
            println!("{preview}\n");
        }
    }
    println!(
        "GitHub repos: {} | HN posts: {} | depth: {}",
        report.github_repos.len(),
        report.hn_posts.len(),
        report.metadata.analysis_depth
    );
    println!("Report saved: {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::FAILURE
        }
    }
}
