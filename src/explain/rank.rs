//! Top-k attribution ranking for presentation.

use crate::explain::FeatureAttribution;
use serde::{Deserialize, Serialize};

/// One entry of the ranked driver list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedDriver {
    pub feature: String,
    pub contribution: f64,
}

/// Select the top-k features by absolute contribution.
///
/// Descending by |contribution|; ties resolve to the feature earlier in
/// the canonical order, so ranking is stable across calls and process
/// restarts. `k == 0` yields an empty list; `k` beyond the feature count
/// yields the full ranked list.
pub fn top_k(attribution: &FeatureAttribution, k: usize) -> Vec<RankedDriver> {
    let mut indexed: Vec<(usize, &'static str, f64)> = attribution
        .iter()
        .enumerate()
        .map(|(i, (name, contribution))| (i, name, contribution))
        .collect();

    indexed.sort_by(|a, b| {
        b.2.abs()
            .partial_cmp(&a.2.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });

    indexed
        .into_iter()
        .take(k)
        .map(|(_, name, contribution)| RankedDriver {
            feature: name.to_string(),
            contribution,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FEATURE_COUNT, FEATURE_NAMES};

    fn attribution(values: [f64; FEATURE_COUNT]) -> FeatureAttribution {
        FeatureAttribution {
            baseline: 0.3,
            contributions: values,
        }
    }

    #[test]
    fn test_sorted_by_absolute_magnitude() {
        let mut contributions = [0.0; FEATURE_COUNT];
        contributions[0] = 0.02;
        contributions[3] = -0.4;
        contributions[7] = 0.1;

        let ranked = top_k(&attribution(contributions), 3);
        assert_eq!(ranked[0].feature, FEATURE_NAMES[3]);
        assert_eq!(ranked[0].contribution, -0.4);
        assert_eq!(ranked[1].feature, FEATURE_NAMES[7]);
        assert_eq!(ranked[2].feature, FEATURE_NAMES[0]);
    }

    #[test]
    fn test_tie_breaks_on_canonical_order() {
        let mut contributions = [0.0; FEATURE_COUNT];
        contributions[5] = -0.2;
        contributions[2] = 0.2;

        let ranked = top_k(&attribution(contributions), 2);
        // equal magnitude: earlier canonical index wins
        assert_eq!(ranked[0].feature, FEATURE_NAMES[2]);
        assert_eq!(ranked[1].feature, FEATURE_NAMES[5]);
    }

    #[test]
    fn test_k_zero_is_empty() {
        let ranked = top_k(&attribution([0.1; FEATURE_COUNT]), 0);
        assert!(ranked.is_empty());
    }

    #[test]
    fn test_k_beyond_feature_count_returns_all() {
        let ranked = top_k(&attribution([0.1; FEATURE_COUNT]), 1000);
        assert_eq!(ranked.len(), FEATURE_COUNT);
    }

    #[test]
    fn test_ranking_is_idempotent() {
        let mut contributions = [0.0; FEATURE_COUNT];
        for (i, c) in contributions.iter_mut().enumerate() {
            *c = if i % 2 == 0 { 0.05 } else { -0.05 };
        }
        let attribution = attribution(contributions);

        let first = top_k(&attribution, 5);
        let second = top_k(&attribution, 5);
        assert_eq!(first, second);
    }
}
