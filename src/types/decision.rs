//! Published risk decision and error event payloads.

use crate::explain::RankedDriver;
use crate::pipeline::Evaluation;
use crate::tiering::RiskTier;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Final decision published for one scored application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskDecision {
    /// Unique decision identifier
    pub decision_id: String,

    /// Pseudonymized applicant token, when the request carried an id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,

    /// Final default probability in [0, 1]
    pub risk_probability: f64,

    /// Risk tier
    pub risk_level: RiskTier,

    /// Canonical recommended action for the tier
    pub recommended_action: String,

    /// Whether the structural override raised the score
    pub override_applied: bool,

    /// Top drivers of the model score, largest magnitude first
    pub top_risk_drivers: Vec<RankedDriver>,

    /// Scorer backend that produced the probability
    pub model: String,

    /// Decision timestamp
    pub timestamp: DateTime<Utc>,
}

impl RiskDecision {
    /// Build the wire decision from a pipeline evaluation.
    pub fn from_evaluation(
        evaluation: Evaluation,
        applicant: Option<String>,
        model: &str,
    ) -> Self {
        Self {
            decision_id: uuid::Uuid::new_v4().to_string(),
            applicant,
            risk_probability: evaluation.probability,
            risk_level: evaluation.tier,
            recommended_action: evaluation.action,
            override_applied: evaluation.override_applied,
            top_risk_drivers: evaluation.drivers,
            model: model.to_string(),
            timestamp: Utc::now(),
        }
    }
}

/// Structured error event published when a request cannot be decided.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    /// Stable error kind (see `PipelineError::kind`)
    pub error_kind: String,

    /// Human-readable message
    pub message: String,

    /// Pseudonymized applicant token, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ErrorEvent {
    pub fn new(error_kind: &str, message: String, applicant: Option<String>) -> Self {
        Self {
            error_kind: error_kind.to_string(),
            message,
            applicant,
            timestamp: Utc::now(),
        }
    }
}
