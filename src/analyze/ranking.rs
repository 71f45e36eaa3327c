// src/analyze/ranking.rs
//! Ranking of scored items.
//!
//! - `popularity`: by `popularity_score`
//! - `relevance` : by `relevance_score`
//! - `balanced`  : `relevance * w.relevance + popularity * w.popularity`
//!
//! Missing scores count as 0. Sorting is descending and stable: ties keep input order.

use std::cmp::Ordering;

use crate::config::{RankingConfig, RankingStrategy, RankingWeights};
use crate::content::ContentItem;

#[derive(Debug, Clone, Copy)]
pub struct Ranker {
    strategy: RankingStrategy,
    weights: RankingWeights,
}

impl Ranker {
    pub fn new(strategy: RankingStrategy, weights: RankingWeights) -> Self {
        Self { strategy, weights }
    }

    pub fn from_config(config: &RankingConfig) -> Self {
        Self::new(config.strategy, config.weights)
    }

    pub fn strategy(&self) -> RankingStrategy {
        self.strategy
    }

    /// Sort key under the configured strategy.
    pub fn rank_key(&self, item: &ContentItem) -> f64 {
        match self.strategy {
            RankingStrategy::Popularity => item.popularity_score(),
            RankingStrategy::Relevance => item.relevance_score(),
            RankingStrategy::Balanced => {
                item.relevance_score() * self.weights.relevance
                    + item.popularity_score() * self.weights.popularity
            }
        }
    }

    /// Highest ranked first.
    pub fn rank(&self, items: Vec<ContentItem>) -> Vec<ContentItem> {
        let mut keyed: Vec<(f64, ContentItem)> =
            items.into_iter().map(|it| (self.rank_key(&it), it)).collect();
        // `sort_by` is stable; `total_cmp` keeps NaN from poisoning the order.
        keyed.sort_by(|a, b| desc(a.0, b.0));
        keyed.into_iter().map(|(_, it)| it).collect()
    }
}

fn desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

/// Min-max normalize `field` into `<field>_normalized` in [0,1].
///
/// All-equal inputs get 0.5 each; an empty slice is left as is.
pub fn normalize_scores(items: &mut [ContentItem], field: &str) {
    if items.is_empty() {
        return;
    }
    let target = format!("{field}_normalized");
    let values: Vec<f64> = items.iter().map(|it| it.score(field)).collect();
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    for (item, v) in items.iter_mut().zip(values) {
        let n = if span > 0.0 { (v - min) / span } else { 0.5 };
        item.set_f64(&target, n);
    }
}
