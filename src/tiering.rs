//! Risk tiering and recommended-action mapping.
//!
//! Maps the final probability onto ordered tiers through half-open,
//! non-overlapping bands covering [0, 1]; boundary values belong to the
//! higher tier. Every tier maps to exactly one canonical action string.

use crate::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};

/// Ordered risk tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

/// Per-tier recommended actions. The table is total: every tier has an
/// action.
#[derive(Debug, Clone, Deserialize)]
pub struct ActionTable {
    pub low: String,
    pub medium: String,
    pub high: String,
}

impl ActionTable {
    pub fn action_for(&self, tier: RiskTier) -> &str {
        match tier {
            RiskTier::Low => &self.low,
            RiskTier::Medium => &self.medium,
            RiskTier::High => &self.high,
        }
    }
}

impl Default for ActionTable {
    fn default() -> Self {
        Self {
            low: "No action required".to_string(),
            medium: "Send proactive advisory message".to_string(),
            high: "Offer EMI restructuring or payment holiday".to_string(),
        }
    }
}

/// Threshold bands and action table for tier classification.
#[derive(Debug, Clone, Deserialize)]
pub struct TierMap {
    /// probability >= medium_cutoff classifies as at least MEDIUM
    pub medium_cutoff: f64,
    /// probability >= high_cutoff classifies as HIGH
    pub high_cutoff: f64,
    pub actions: ActionTable,
}

impl TierMap {
    /// Classify a final probability into a tier and its action.
    ///
    /// An out-of-range probability is an internal invariant violation,
    /// never silently clamped.
    pub fn classify(&self, probability: f64) -> Result<(RiskTier, &str)> {
        if !(0.0..=1.0).contains(&probability) {
            return Err(PipelineError::Internal(format!(
                "probability {probability} outside [0, 1] reached tier mapping"
            )));
        }
        let tier = if probability >= self.high_cutoff {
            RiskTier::High
        } else if probability >= self.medium_cutoff {
            RiskTier::Medium
        } else {
            RiskTier::Low
        };
        Ok((tier, self.actions.action_for(tier)))
    }
}

impl Default for TierMap {
    fn default() -> Self {
        Self {
            medium_cutoff: 0.35,
            high_cutoff: 0.65,
            actions: ActionTable::default(),
        }
    }
}
