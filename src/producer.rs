//! NATS producer for risk decisions and error events.

use crate::types::{ErrorEvent, RiskDecision};
use anyhow::Result;
use async_nats::Client;
use tracing::debug;

/// Publishes decided applications (and failures) to the decision subject.
#[derive(Clone)]
pub struct DecisionProducer {
    client: Client,
    subject: String,
}

impl DecisionProducer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish a risk decision.
    pub async fn publish(&self, decision: &RiskDecision) -> Result<()> {
        let payload = serde_json::to_vec(decision)?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(
            decision_id = %decision.decision_id,
            risk_level = ?decision.risk_level,
            risk_probability = decision.risk_probability,
            "Published risk decision"
        );
        Ok(())
    }

    /// Publish a structured error event for a request that could not be
    /// decided.
    pub async fn publish_error(&self, event: &ErrorEvent) -> Result<()> {
        let payload = serde_json::to_vec(event)?;
        self.client
            .publish(self.subject.clone(), payload.into())
            .await?;

        debug!(error_kind = %event.error_kind, "Published error event");
        Ok(())
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
