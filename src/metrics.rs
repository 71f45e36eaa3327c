// src/metrics.rs
//! Counter names and one-time descriptions. No exporter is installed here;
//! a host process that installs a `metrics` recorder will see them.

use metrics::{describe_counter, describe_gauge};
use once_cell::sync::OnceCell;

pub const CACHE_HITS: &str = "cache_hits_total";
pub const CACHE_MISSES: &str = "cache_misses_total";
pub const CACHE_WRITE_ERRORS: &str = "cache_write_errors_total";
pub const TOOL_CALLS: &str = "tool_calls_total";
pub const FETCH_RETRIES: &str = "fetch_retries_total";
pub const AGENT_LAST_RUN_TS: &str = "agent_last_run_ts";

/// One-time metrics registration.
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(CACHE_HITS, "Cache reads that returned a fresh entry.");
        describe_counter!(
            CACHE_MISSES,
            "Cache reads that found nothing usable (absent, expired, corrupt)."
        );
        describe_counter!(
            CACHE_WRITE_ERRORS,
            "Cache writes dropped due to serialization or I/O errors."
        );
        describe_counter!(TOOL_CALLS, "Tool registry invocations.");
        describe_counter!(FETCH_RETRIES, "Fetch attempts retried after a failure.");
        describe_gauge!(AGENT_LAST_RUN_TS, "Unix ts when the agent last finished a run.");
    });
}
