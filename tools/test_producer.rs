//! Test Application Producer
//!
//! Generates and publishes synthetic loan-application scoring requests to
//! NATS for pipeline testing.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

/// Request structure matching the pipeline's expected format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScoreRequest {
    applicant_id: String,
    loan_amnt: f64,
    int_rate: f64,
    annual_inc: f64,
    dti: f64,
    revol_util: f64,
    installment: f64,
}

/// Applicant generator for testing
struct ApplicantGenerator {
    rng: rand::rngs::ThreadRng,
    counter: u64,
}

impl ApplicantGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            counter: 0,
        }
    }

    /// Generate a financially healthy applicant
    fn generate_healthy(&mut self) -> ScoreRequest {
        self.counter += 1;
        let annual_inc = self.rng.gen_range(50000.0..150000.0);
        let loan_amnt = annual_inc * self.rng.gen_range(0.05..0.4);

        ScoreRequest {
            applicant_id: format!("app_{:010}", self.counter),
            loan_amnt,
            int_rate: self.rng.gen_range(5.0..12.0),
            annual_inc,
            dti: self.rng.gen_range(5.0..25.0),
            revol_util: self.rng.gen_range(5.0..50.0),
            installment: loan_amnt / self.rng.gen_range(36.0..60.0),
        }
    }

    /// Generate a structurally stressed applicant. Designed to trip the
    /// override conjunction: loan far above income, heavy installment,
    /// high dti and revolving utilization.
    fn generate_stressed(&mut self) -> ScoreRequest {
        self.counter += 1;
        let annual_inc = self.rng.gen_range(25000.0..50000.0);
        let loan_amnt = annual_inc * self.rng.gen_range(1.3..2.5);

        ScoreRequest {
            applicant_id: format!("app_{:010}", self.counter),
            loan_amnt,
            int_rate: self.rng.gen_range(18.0..30.0),
            annual_inc,
            dti: self.rng.gen_range(36.0..55.0),
            revol_util: self.rng.gen_range(81.0..100.0),
            installment: annual_inc * self.rng.gen_range(0.055..0.12),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_producer=info".parse()?),
        )
        .init();

    info!("Starting Test Application Producer");

    let args: Vec<String> = std::env::args().collect();
    let nats_url = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("applications");
    let count: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(100);
    let stressed_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.1);
    let delay_ms: u64 = args.get(5).and_then(|s| s.parse().ok()).unwrap_or(100);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        count = count,
        stressed_rate = stressed_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(count, stressed_rate, delay_ms).await;
        }
    };

    let mut generator = ApplicantGenerator::new();
    let mut rng = rand::thread_rng();

    info!("Starting to publish {} requests...", count);

    let mut healthy_count = 0;
    let mut stressed_count = 0;

    for i in 0..count {
        let request = if rng.gen_bool(stressed_rate) {
            stressed_count += 1;
            generator.generate_stressed()
        } else {
            healthy_count += 1;
            generator.generate_healthy()
        };

        let payload = serde_json::to_vec(&request)?;
        client.publish(subject.to_string(), payload.into()).await?;

        if (i + 1) % 10 == 0 {
            info!(
                "Published {}/{} requests ({} healthy, {} stressed)",
                i + 1,
                count,
                healthy_count,
                stressed_count
            );
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    info!(
        "Completed! Published {} requests ({} healthy, {} stressed)",
        count, healthy_count, stressed_count
    );

    Ok(())
}

async fn run_dry_mode(count: u64, stressed_rate: f64, delay_ms: u64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    let mut generator = ApplicantGenerator::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let request = if rng.gen_bool(stressed_rate) {
            generator.generate_stressed()
        } else {
            generator.generate_healthy()
        };

        let json = serde_json::to_string_pretty(&request)?;

        if (i + 1) % 10 == 0 || i == 0 {
            info!("Sample request {}:\n{}", i + 1, json);
        }

        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
    }

    Ok(())
}
