//! Exact interventional Shapley attribution.
//!
//! Computes exact Shapley values by enumerating every feature coalition
//! against a fixed background vector. For a coalition S, absent features
//! take their background value and present features take the applicant's
//! value. Exact enumeration makes the efficiency property hold for any
//! scorer: the contributions sum to `score(x) - score(background)`, which
//! is exactly the conservation invariant the pipeline verifies.
//!
//! All 2^n coalitions are scored through a single `predict_batch` call,
//! so a backend that serializes individual predictions (the ONNX session
//! lock) is entered once per attribution, not once per coalition.

use crate::error::{PipelineError, Result};
use crate::explain::{Explainer, FeatureAttribution};
use crate::features::{FeatureVector, FEATURE_COUNT};
use crate::scorer::Scorer;
use std::sync::Arc;
use tracing::info;

/// Largest feature count for which exact enumeration is viable; the
/// canonical vector must stay within it.
const MAX_ENUMERATED_FEATURES: usize = 20;
const _: () = assert!(
    FEATURE_COUNT <= MAX_ENUMERATED_FEATURES,
    "exact Shapley enumeration is 2^n scorer rows; shrink the feature set \
     or switch to a sampling explainer"
);

/// Exact Shapley explainer over an opaque scorer.
pub struct ShapleyExplainer {
    scorer: Arc<dyn Scorer>,
    background: FeatureVector,
    /// Shapley coalition weight by coalition size, precomputed.
    weights: Vec<f64>,
}

impl std::fmt::Debug for ShapleyExplainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShapleyExplainer")
            .field("scorer", &self.scorer.name())
            .field("background", &self.background)
            .field("weights", &self.weights)
            .finish()
    }
}

impl ShapleyExplainer {
    /// Build the explainer for a loaded scorer.
    ///
    /// `background` is the reference point attributions are measured
    /// against; it must use the same canonical feature layout. Fails with
    /// an attribution-unavailable error when the scorer cannot evaluate
    /// the background.
    pub fn new(scorer: Arc<dyn Scorer>, background: FeatureVector) -> Result<Self> {
        // A scorer that cannot produce the baseline cannot be explained
        // against it, so evaluate the background up front.
        let baseline = scorer.predict(&background).map_err(|e| {
            PipelineError::AttributionUnavailable(format!(
                "scorer cannot evaluate the background vector: {e}"
            ))
        })?;

        info!(
            scorer = scorer.name(),
            baseline, "Shapley explainer initialized"
        );

        Ok(Self {
            scorer,
            background,
            weights: coalition_weights(FEATURE_COUNT),
        })
    }

    /// Feature vector for a coalition mask: bit i set means feature i
    /// takes the applicant's value, otherwise the background value.
    fn coalition_vector(&self, features: &FeatureVector, mask: u32) -> FeatureVector {
        let mut values = *self.background.values();
        for (i, slot) in values.iter_mut().enumerate() {
            if mask & (1 << i) != 0 {
                *slot = features.get(i);
            }
        }
        FeatureVector::from_values(values)
    }
}

impl Explainer for ShapleyExplainer {
    fn attribute(&self, features: &FeatureVector) -> Result<FeatureAttribution> {
        let n = FEATURE_COUNT;
        let full: u32 = (1 << n) - 1;

        // Score every coalition in one batched call, indexed by mask.
        let coalitions: Vec<FeatureVector> = (0..=full)
            .map(|mask| self.coalition_vector(features, mask))
            .collect();
        let scores = self.scorer.predict_batch(&coalitions)?;
        if scores.len() != coalitions.len() {
            return Err(PipelineError::Internal(format!(
                "scorer returned {} probabilities for {} coalitions",
                scores.len(),
                coalitions.len()
            )));
        }

        let mut contributions = [0.0; FEATURE_COUNT];
        for i in 0..n {
            let bit = 1u32 << i;
            let mut phi = 0.0;
            for mask in 0..=full {
                if mask & bit != 0 {
                    continue;
                }
                let size = mask.count_ones() as usize;
                phi += self.weights[size]
                    * (scores[(mask | bit) as usize] - scores[mask as usize]);
            }
            contributions[i] = phi;
        }

        Ok(FeatureAttribution {
            baseline: scores[0],
            contributions,
        })
    }
}

/// Shapley weight for a coalition of size s out of n features:
/// `s! (n - s - 1)! / n!`, computed as `1 / (n * C(n-1, s))` to stay in
/// f64 range.
fn coalition_weights(n: usize) -> Vec<f64> {
    (0..n)
        .map(|s| 1.0 / (n as f64 * binomial(n - 1, s)))
        .collect()
}

fn binomial(n: usize, k: usize) -> f64 {
    let k = k.min(n - k);
    let mut acc = 1.0;
    for i in 0..k {
        acc = acc * (n - i) as f64 / (i + 1) as f64;
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureDeriver, RawApplicantInput};
    use crate::scorer::LogisticScorer;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn background() -> FeatureVector {
        FeatureDeriver::default()
            .derive(&RawApplicantInput {
                loan_amnt: 10000.0,
                int_rate: 10.0,
                annual_inc: 60000.0,
                dti: 18.0,
                revol_util: 40.0,
                installment: 300.0,
            })
            .unwrap()
    }

    fn stressed_features() -> FeatureVector {
        FeatureDeriver::default()
            .derive(&RawApplicantInput {
                loan_amnt: 55000.0,
                int_rate: 22.0,
                annual_inc: 42000.0,
                dti: 40.0,
                revol_util: 88.0,
                installment: 2100.0,
            })
            .unwrap()
    }

    /// Delegates to the logistic stub while counting calls.
    struct CountingScorer {
        inner: LogisticScorer,
        batch_calls: AtomicUsize,
    }

    impl CountingScorer {
        fn new() -> Self {
            Self {
                inner: LogisticScorer::new(),
                batch_calls: AtomicUsize::new(0),
            }
        }
    }

    impl Scorer for CountingScorer {
        fn predict(&self, features: &FeatureVector) -> Result<f64> {
            self.inner.predict(features)
        }
        fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
            self.batch_calls.fetch_add(1, Ordering::SeqCst);
            self.inner.predict_batch(features)
        }
        fn name(&self) -> &str {
            "counting"
        }
    }

    struct UnavailableScorer;

    impl Scorer for UnavailableScorer {
        fn predict(&self, _: &FeatureVector) -> Result<f64> {
            Err(PipelineError::ServiceUnavailable(
                "model artifact not loaded".to_string(),
            ))
        }
        fn name(&self) -> &str {
            "unavailable"
        }
    }

    #[test]
    fn test_conservation() {
        let scorer = Arc::new(LogisticScorer::new());
        let explainer = ShapleyExplainer::new(scorer.clone(), background()).unwrap();
        let features = stressed_features();

        let attribution = explainer.attribute(&features).unwrap();
        let score = scorer.predict(&features).unwrap();

        let reconstructed = attribution.total() + attribution.baseline;
        assert!(
            (reconstructed - score).abs() < 1e-6,
            "conservation violated: {reconstructed} vs {score}"
        );
    }

    #[test]
    fn test_determinism() {
        let scorer = Arc::new(LogisticScorer::new());
        let explainer = ShapleyExplainer::new(scorer, background()).unwrap();
        let features = stressed_features();

        let a = explainer.attribute(&features).unwrap();
        let b = explainer.attribute(&features).unwrap();
        for i in 0..FEATURE_COUNT {
            assert_eq!(a.contributions[i].to_bits(), b.contributions[i].to_bits());
        }
    }

    #[test]
    fn test_identical_to_background_attributes_nothing() {
        let scorer = Arc::new(LogisticScorer::new());
        let bg = background();
        let explainer = ShapleyExplainer::new(scorer, bg.clone()).unwrap();

        let attribution = explainer.attribute(&bg).unwrap();
        for (name, contribution) in attribution.iter() {
            assert!(
                contribution.abs() < 1e-12,
                "{name} attributed {contribution} at the background point"
            );
        }
    }

    #[test]
    fn test_attribution_uses_one_batched_scoring_call() {
        let scorer = Arc::new(CountingScorer::new());
        let explainer = ShapleyExplainer::new(scorer.clone(), background()).unwrap();

        explainer.attribute(&stressed_features()).unwrap();
        assert_eq!(scorer.batch_calls.load(Ordering::SeqCst), 1);

        explainer.attribute(&stressed_features()).unwrap();
        assert_eq!(scorer.batch_calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unready_scorer_is_attribution_unavailable() {
        let err = ShapleyExplainer::new(Arc::new(UnavailableScorer), background()).unwrap_err();
        assert_eq!(err.kind(), "attribution_unavailable");
    }

    #[test]
    fn test_coalition_weights_sum_to_one_per_feature() {
        // Sum over all coalitions S not containing i of w(|S|) equals 1.
        let n = FEATURE_COUNT;
        let weights = coalition_weights(n);
        let total: f64 = (0..n)
            .map(|s| binomial(n - 1, s) * weights[s])
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }
}
