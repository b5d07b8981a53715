//! Structural override rule.
//!
//! A monotone safety net on top of the statistical score: when every
//! structural stress condition holds at once, the probability is raised to
//! a floor so the combination can never be classified as low risk on the
//! model's say-so alone. The rule never lowers a score.

use crate::features::{idx, FeatureVector};
use serde::Deserialize;

/// Final score plus provenance of the override rule.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreResult {
    /// Probability after any override floor was applied.
    pub probability: f64,
    /// Whether the override conjunction fired.
    pub override_applied: bool,
}

/// Thresholds of the structural override conjunction.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct OverrideRule {
    /// loan_income_ratio must exceed this
    pub loan_income_ratio_cutoff: f64,
    /// emi_income_ratio must exceed this
    pub emi_income_ratio_cutoff: f64,
    /// dti must exceed this
    pub dti_cutoff: f64,
    /// revol_util must exceed this
    pub revol_util_cutoff: f64,
    /// Probability floor enforced when all conjuncts hold
    pub floor: f64,
}

impl OverrideRule {
    /// True when every conjunct holds. Partial matches have no effect.
    pub fn matches(&self, features: &FeatureVector) -> bool {
        features.get(idx::LOAN_INCOME_RATIO) > self.loan_income_ratio_cutoff
            && features.get(idx::EMI_INCOME_RATIO) > self.emi_income_ratio_cutoff
            && features.get(idx::DTI) > self.dti_cutoff
            && features.get(idx::REVOL_UTIL) > self.revol_util_cutoff
    }

    /// Apply the override: raises the probability to the floor when the
    /// conjunction holds, otherwise passes it through unchanged.
    pub fn apply(&self, features: &FeatureVector, probability: f64) -> ScoreResult {
        if self.matches(features) {
            ScoreResult {
                probability: probability.max(self.floor),
                override_applied: true,
            }
        } else {
            ScoreResult {
                probability,
                override_applied: false,
            }
        }
    }
}

impl Default for OverrideRule {
    fn default() -> Self {
        Self {
            loan_income_ratio_cutoff: 1.2,
            emi_income_ratio_cutoff: 0.05,
            dti_cutoff: 35.0,
            revol_util_cutoff: 80.0,
            floor: 0.8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{FeatureDeriver, RawApplicantInput};

    fn matching_input() -> RawApplicantInput {
        // loan_income_ratio = 1.5, emi_income_ratio = 0.06, dti = 42,
        // revol_util = 92: all four conjuncts hold
        RawApplicantInput {
            loan_amnt: 60000.0,
            int_rate: 20.0,
            annual_inc: 40000.0,
            dti: 42.0,
            revol_util: 92.0,
            installment: 2400.0,
        }
    }

    #[test]
    fn test_override_raises_to_floor() {
        let rule = OverrideRule::default();
        let features = FeatureDeriver::default()
            .derive(&matching_input())
            .unwrap();

        let result = rule.apply(&features, 0.2);
        assert!(result.override_applied);
        assert_eq!(result.probability, 0.8);
    }

    #[test]
    fn test_override_never_lowers() {
        let rule = OverrideRule::default();
        let features = FeatureDeriver::default()
            .derive(&matching_input())
            .unwrap();

        let result = rule.apply(&features, 0.95);
        assert!(result.override_applied);
        assert_eq!(result.probability, 0.95);
    }

    #[test]
    fn test_partial_match_is_noop() {
        let rule = OverrideRule::default();
        let mut input = matching_input();
        // emi_income_ratio drops to 0.0175, below its cutoff
        input.installment = 700.0;
        let features = FeatureDeriver::default().derive(&input).unwrap();

        let result = rule.apply(&features, 0.2);
        assert!(!result.override_applied);
        assert_eq!(result.probability, 0.2);
    }

    #[test]
    fn test_cutoff_values_do_not_match() {
        // conjuncts are strict inequalities; exactly-at-cutoff fails
        let rule = OverrideRule::default();
        let input = RawApplicantInput {
            loan_amnt: 48000.0, // ratio exactly 1.2
            int_rate: 20.0,
            annual_inc: 40000.0,
            dti: 42.0,
            revol_util: 92.0,
            installment: 2400.0,
        };
        let features = FeatureDeriver::default().derive(&input).unwrap();
        assert!(!rule.matches(&features));
    }
}
