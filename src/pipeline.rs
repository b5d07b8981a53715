//! Decision pipeline orchestration.
//!
//! Wires the stages together: derive features once, score, apply the
//! structural override, classify into a tier, and independently attribute
//! the model score to features and rank the top drivers. Both branches
//! consume the same derived vector so the explanation matches the
//! decision. Everything is request-scoped except the shared scorer and
//! explainer handles.

use crate::config::AppConfig;
use crate::error::{PipelineError, Result};
use crate::explain::{top_k, Explainer, RankedDriver};
use crate::features::{FeatureDeriver, RawApplicantInput};
use crate::rules::OverrideRule;
use crate::scorer::Scorer;
use crate::tiering::{RiskTier, TierMap};
use std::sync::Arc;
use tracing::debug;

/// Tolerance for the attribution conservation check.
const CONSERVATION_TOLERANCE: f64 = 1e-6;

/// Outcome of one pipeline evaluation.
#[derive(Debug, Clone)]
pub struct Evaluation {
    /// Final probability after any override.
    pub probability: f64,
    pub tier: RiskTier,
    pub action: String,
    pub override_applied: bool,
    /// Top-k drivers of the model score, largest magnitude first.
    pub drivers: Vec<RankedDriver>,
}

/// The full derive → score → override → classify / attribute → rank
/// pipeline.
pub struct DecisionPipeline {
    deriver: FeatureDeriver,
    scorer: Arc<dyn Scorer>,
    explainer: Arc<dyn Explainer>,
    rule: OverrideRule,
    tiers: TierMap,
    top_k: usize,
}

impl DecisionPipeline {
    /// Assemble the pipeline from configuration and loaded capabilities.
    pub fn new(
        config: &AppConfig,
        scorer: Arc<dyn Scorer>,
        explainer: Arc<dyn Explainer>,
    ) -> Self {
        Self {
            deriver: FeatureDeriver::new(config.features.stress_weights),
            scorer,
            explainer,
            rule: config.rules,
            tiers: config.tiering.clone(),
            top_k: config.explain.top_k,
        }
    }

    /// Evaluate one applicant. Synchronous and CPU-bound; no state
    /// survives the call.
    pub fn evaluate(&self, raw: &RawApplicantInput) -> Result<Evaluation> {
        let features = self.deriver.derive(raw)?;

        let model_score = self.scorer.predict(&features)?;
        if !(0.0..=1.0).contains(&model_score) {
            return Err(PipelineError::Internal(format!(
                "scorer {} returned probability {model_score} outside [0, 1]",
                self.scorer.name()
            )));
        }

        let score = self.rule.apply(&features, model_score);
        let (tier, action) = self.tiers.classify(score.probability)?;

        // Explanation branch: attributions reconstruct the model score,
        // not the overridden one.
        let attribution = self.explainer.attribute(&features)?;
        let reconstructed = attribution.total() + attribution.baseline;
        if (reconstructed - model_score).abs() > CONSERVATION_TOLERANCE {
            return Err(PipelineError::Internal(format!(
                "attribution conservation violated: {reconstructed} vs model score {model_score}"
            )));
        }
        let drivers = top_k(&attribution, self.top_k);

        debug!(
            model_score,
            final_score = score.probability,
            override_applied = score.override_applied,
            tier = ?tier,
            "Pipeline evaluation complete"
        );

        Ok(Evaluation {
            probability: score.probability,
            tier,
            action: action.to_string(),
            override_applied: score.override_applied,
            drivers,
        })
    }

    /// Scorer backend name, for logs and decision payloads.
    pub fn scorer_name(&self) -> &str {
        self.scorer.name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explain::ShapleyExplainer;
    use crate::scorer::LogisticScorer;

    fn pipeline() -> DecisionPipeline {
        let config = AppConfig::default();
        let scorer: Arc<dyn Scorer> = Arc::new(LogisticScorer::new());
        let deriver = FeatureDeriver::new(config.features.stress_weights);
        let background = deriver.derive(&config.explain.background).unwrap();
        let explainer: Arc<dyn Explainer> =
            Arc::new(ShapleyExplainer::new(scorer.clone(), background).unwrap());
        DecisionPipeline::new(&config, scorer, explainer)
    }

    fn stressed() -> RawApplicantInput {
        RawApplicantInput {
            loan_amnt: 60000.0,
            int_rate: 24.0,
            annual_inc: 40000.0,
            dti: 42.0,
            revol_util: 92.0,
            installment: 2400.0,
        }
    }

    #[test]
    fn test_end_to_end_decision() {
        let evaluation = pipeline().evaluate(&stressed()).unwrap();

        assert!((0.0..=1.0).contains(&evaluation.probability));
        assert!(!evaluation.action.is_empty());
        assert_eq!(evaluation.drivers.len(), 5);
    }

    #[test]
    fn test_override_guarantees_high_tier() {
        // stressed() satisfies all four override conjuncts, so the final
        // probability is at least the 0.8 floor regardless of the model
        let evaluation = pipeline().evaluate(&stressed()).unwrap();

        assert!(evaluation.override_applied);
        assert!(evaluation.probability >= 0.8);
        assert_eq!(evaluation.tier, RiskTier::High);
        assert_eq!(
            evaluation.action,
            "Offer EMI restructuring or payment holiday"
        );
    }

    #[test]
    fn test_override_conjunction_failure_leaves_score_alone() {
        // emi_income_ratio = 0.0175 fails its conjunct, so the model
        // score stands
        let input = RawApplicantInput {
            loan_amnt: 20000.0,
            int_rate: 15.0,
            annual_inc: 40000.0,
            dti: 40.0,
            revol_util: 90.0,
            installment: 700.0,
        };
        let evaluation = pipeline().evaluate(&input).unwrap();
        assert!(!evaluation.override_applied);
    }

    #[test]
    fn test_zero_income_never_reaches_scorer() {
        let mut input = stressed();
        input.annual_inc = 0.0;

        let err = pipeline().evaluate(&input).unwrap_err();
        assert_eq!(err.kind(), "domain_error");
    }

    #[test]
    fn test_evaluation_is_deterministic() {
        let p = pipeline();
        let a = p.evaluate(&stressed()).unwrap();
        let b = p.evaluate(&stressed()).unwrap();

        assert_eq!(a.probability.to_bits(), b.probability.to_bits());
        assert_eq!(a.drivers, b.drivers);
    }

    #[test]
    fn test_out_of_range_scorer_is_internal_error() {
        struct BrokenScorer;
        impl Scorer for BrokenScorer {
            fn predict(&self, _: &crate::features::FeatureVector) -> crate::error::Result<f64> {
                Ok(1.7)
            }
            fn name(&self) -> &str {
                "broken"
            }
        }

        let config = AppConfig::default();
        let scorer: Arc<dyn Scorer> = Arc::new(LogisticScorer::new());
        let deriver = FeatureDeriver::new(config.features.stress_weights);
        let background = deriver.derive(&config.explain.background).unwrap();
        let explainer: Arc<dyn Explainer> =
            Arc::new(ShapleyExplainer::new(scorer, background).unwrap());
        let pipeline = DecisionPipeline::new(&config, Arc::new(BrokenScorer), explainer);

        let err = pipeline.evaluate(&stressed()).unwrap_err();
        assert_eq!(err.kind(), "internal_error");
    }

    #[test]
    fn test_non_conserving_attribution_is_internal_error() {
        // An explainer whose contributions do not reconstruct the model
        // score must be rejected, not silently published.
        struct DriftingExplainer;
        impl Explainer for DriftingExplainer {
            fn attribute(
                &self,
                _: &crate::features::FeatureVector,
            ) -> crate::error::Result<crate::explain::FeatureAttribution> {
                let mut contributions = [0.0; crate::features::FEATURE_COUNT];
                contributions[0] = 0.25;
                Ok(crate::explain::FeatureAttribution {
                    baseline: 0.0,
                    contributions,
                })
            }
        }

        let config = AppConfig::default();
        let scorer: Arc<dyn Scorer> = Arc::new(LogisticScorer::new());
        let pipeline = DecisionPipeline::new(&config, scorer, Arc::new(DriftingExplainer));

        let err = pipeline.evaluate(&stressed()).unwrap_err();
        assert_eq!(err.kind(), "internal_error");
        assert!(err.to_string().contains("conservation"));
    }
}
