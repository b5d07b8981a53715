//! NATS consumer for incoming scoring requests.

use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for loan-application scoring requests.
pub struct ApplicationConsumer {
    client: Client,
    subject: String,
}

impl ApplicationConsumer {
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the application subject.
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to application subject");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

#[cfg(test)]
mod tests {
    // Integration tests would require a running NATS server
}
