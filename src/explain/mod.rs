//! Attribution engine capability and ranking.
//!
//! The pipeline requires only two things from attribution: conservation
//! (contributions plus baseline reconstruct the model score) and
//! determinism for a fixed (features, scorer) pair. The concrete method
//! is behind the [`Explainer`] trait.

pub mod rank;
pub mod shapley;

use crate::error::Result;
use crate::features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};

pub use rank::{top_k, RankedDriver};
pub use shapley::ShapleyExplainer;

/// Signed per-feature contributions in canonical feature order, plus the
/// baseline they are measured against.
#[derive(Debug, Clone)]
pub struct FeatureAttribution {
    /// Expected score at the background point.
    pub baseline: f64,
    /// Contribution per feature, canonical order.
    pub contributions: [f64; FEATURE_COUNT],
}

impl FeatureAttribution {
    /// Sum of all contributions.
    pub fn total(&self) -> f64 {
        self.contributions.iter().sum()
    }

    /// (name, contribution) pairs in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_NAMES
            .iter()
            .copied()
            .zip(self.contributions.iter().copied())
    }
}

/// Per-feature attribution capability against a loaded scorer.
pub trait Explainer: Send + Sync {
    /// Attribute the scorer's output on `features` to individual
    /// features. `sum(contributions) + baseline` must reconstruct the
    /// score within numeric tolerance.
    fn attribute(&self, features: &FeatureVector) -> Result<FeatureAttribution>;
}
