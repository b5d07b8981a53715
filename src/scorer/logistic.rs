//! Deterministic logistic scorer.
//!
//! A fixed-coefficient logistic model used for tests and artifact-free
//! smoke deployments. Not a trained model; coefficients are chosen so
//! structurally stressed applicants score materially higher than healthy
//! ones, which is enough to exercise every pipeline path.

use crate::error::Result;
use crate::features::{idx, FeatureVector, FEATURE_COUNT};
use crate::scorer::Scorer;

/// Logistic scorer over the canonical feature vector.
#[derive(Debug, Clone)]
pub struct LogisticScorer {
    intercept: f64,
    coefficients: [f64; FEATURE_COUNT],
}

impl LogisticScorer {
    /// Scorer with the built-in stub coefficients.
    pub fn new() -> Self {
        let mut coefficients = [0.0; FEATURE_COUNT];
        // Only the scale-free derived features carry weight; raw dollar
        // amounts would swamp the logit.
        coefficients[idx::LOAN_INCOME_RATIO] = 1.2;
        coefficients[idx::EMI_INCOME_RATIO] = 8.0;
        coefficients[idx::INTEREST_LOAD] = 0.05;
        coefficients[idx::DEBT_PRESSURE] = 1.5;
        coefficients[idx::FINANCIAL_STRESS_INDEX] = 2.0;
        Self {
            intercept: -3.0,
            coefficients,
        }
    }

    /// Scorer with caller-supplied coefficients.
    pub fn with_coefficients(intercept: f64, coefficients: [f64; FEATURE_COUNT]) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    fn logit(&self, features: &FeatureVector) -> f64 {
        let mut z = self.intercept;
        for (i, &value) in features.values().iter().enumerate() {
            z += self.coefficients[i] * value;
        }
        z
    }
}

impl Default for LogisticScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl Scorer for LogisticScorer {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let z = self.logit(features);
        // sigmoid keeps the output inside (0, 1) for any finite logit
        Ok(1.0 / (1.0 + (-z).exp()))
    }

    fn name(&self) -> &str {
        "logistic_stub"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureDeriver, RawApplicantInput};

    fn healthy() -> RawApplicantInput {
        RawApplicantInput {
            loan_amnt: 5000.0,
            int_rate: 7.0,
            annual_inc: 90000.0,
            dti: 10.0,
            revol_util: 20.0,
            installment: 150.0,
        }
    }

    fn stressed() -> RawApplicantInput {
        RawApplicantInput {
            loan_amnt: 60000.0,
            int_rate: 24.0,
            annual_inc: 40000.0,
            dti: 42.0,
            revol_util: 92.0,
            installment: 2200.0,
        }
    }

    #[test]
    fn test_output_in_unit_interval() {
        let deriver = FeatureDeriver::default();
        let scorer = LogisticScorer::new();
        for input in [healthy(), stressed()] {
            let p = scorer.predict(&deriver.derive(&input).unwrap()).unwrap();
            assert!((0.0..=1.0).contains(&p), "probability out of range: {p}");
        }
    }

    #[test]
    fn test_stressed_scores_higher_than_healthy() {
        let deriver = FeatureDeriver::default();
        let scorer = LogisticScorer::new();
        let low = scorer.predict(&deriver.derive(&healthy()).unwrap()).unwrap();
        let high = scorer
            .predict(&deriver.derive(&stressed()).unwrap())
            .unwrap();
        assert!(high > low);
    }

    #[test]
    fn test_prediction_is_deterministic() {
        let deriver = FeatureDeriver::default();
        let scorer = LogisticScorer::new();
        let features = deriver.derive(&stressed()).unwrap();
        let a = scorer.predict(&features).unwrap();
        let b = scorer.predict(&features).unwrap();
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
