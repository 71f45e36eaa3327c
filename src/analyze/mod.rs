// src/analyze/mod.rs
// Scoring, ranking and summarizing of fetched items.

pub mod ranking;
pub mod relevance;
pub mod summarize;

pub use ranking::{normalize_scores, Ranker};
pub use relevance::{extract_verdict, RelevanceScorer, RelevanceVerdict};
pub use summarize::Summarizer;
