//! Delinquency Risk Pipeline - Main Entry Point
//!
//! Consumes loan-application scoring requests from NATS, runs the decision
//! pipeline, and publishes risk decisions. Requests are processed in
//! parallel with a bounded worker pool.

use anyhow::Result;
use delinquency_pipeline::{
    config::{AppConfig, ModelBackend},
    consumer::ApplicationConsumer,
    explain::{Explainer, ShapleyExplainer},
    features::FeatureDeriver,
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::DecisionPipeline,
    privacy::Pseudonymizer,
    producer::DecisionProducer,
    scorer::{LogisticScorer, OnnxScorer, Scorer},
    types::{ErrorEvent, RiskDecision, ScoreRequest},
};
use futures::StreamExt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("delinquency_pipeline=info".parse()?),
        )
        .init();

    info!("Starting Delinquency Risk Pipeline");

    let config = AppConfig::load()?;
    info!("Configuration loaded successfully");
    info!(
        "Tier cutoffs: medium>={:.2}, high>={:.2}; override floor {:.2}",
        config.tiering.medium_cutoff, config.tiering.high_cutoff, config.rules.floor
    );

    let metrics = Arc::new(PipelineMetrics::new());

    // Load the scorer once; fail fast if the artifact is unusable.
    let scorer: Arc<dyn Scorer> = match config.model.backend {
        ModelBackend::Onnx => Arc::new(OnnxScorer::load(
            &config.model.model_path,
            config.model.onnx_threads,
        )?),
        ModelBackend::Logistic => Arc::new(LogisticScorer::new()),
    };
    info!(scorer = scorer.name(), "Scorer loaded");

    // The explainer shares the scorer handle and the derivation logic, so
    // attributions are measured against the same canonical features.
    let deriver = FeatureDeriver::new(config.features.stress_weights);
    let background = deriver.derive(&config.explain.background)?;
    let explainer: Arc<dyn Explainer> =
        Arc::new(ShapleyExplainer::new(scorer.clone(), background)?);

    let pipeline = Arc::new(DecisionPipeline::new(&config, scorer, explainer));
    let pseudonymizer = Pseudonymizer::new(config.privacy.hmac_key.as_bytes())?;

    let client = async_nats::connect(&config.nats.url).await?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = ApplicationConsumer::new(client.clone(), &config.nats.application_subject);
    let producer = Arc::new(DecisionProducer::new(
        client.clone(),
        &config.nats.decision_subject,
    ));

    let num_workers = config.pipeline.workers;
    info!(
        "Starting request processing loop with {} parallel workers",
        num_workers
    );
    info!("Listening on subject: {}", config.nats.application_subject);
    info!("Publishing decisions to: {}", config.nats.decision_subject);

    let semaphore = Arc::new(Semaphore::new(num_workers));
    let processed_count = Arc::new(AtomicU64::new(0));

    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 30);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(p) => p,
            Err(_) => break, // semaphore closed, shutting down
        };

        let pipeline = pipeline.clone();
        let producer = producer.clone();
        let metrics = metrics.clone();
        let pseudonymizer = pseudonymizer.clone();
        let processed_count = processed_count.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();

            match serde_json::from_slice::<ScoreRequest>(&message.payload) {
                Ok(request) => {
                    let applicant = request
                        .applicant_id
                        .as_deref()
                        .map(|id| pseudonymizer.tokenize(id));

                    match pipeline.evaluate(&request.input) {
                        Ok(evaluation) => {
                            let processing_time = start_time.elapsed();
                            let decision = RiskDecision::from_evaluation(
                                evaluation,
                                applicant,
                                pipeline.scorer_name(),
                            );

                            metrics.record_decision(
                                processing_time,
                                decision.risk_probability,
                                &format!("{:?}", decision.risk_level).to_uppercase(),
                                decision.override_applied,
                            );

                            if let Err(e) = producer.publish(&decision).await {
                                error!(
                                    decision_id = %decision.decision_id,
                                    error = %e,
                                    "Failed to publish risk decision"
                                );
                            } else {
                                debug!(
                                    decision_id = %decision.decision_id,
                                    risk_probability = decision.risk_probability,
                                    risk_level = ?decision.risk_level,
                                    override_applied = decision.override_applied,
                                    processing_time_us = processing_time.as_micros(),
                                    "Risk decision published"
                                );
                            }

                            let count = processed_count.fetch_add(1, Ordering::Relaxed) + 1;
                            if count % 100 == 0 {
                                let stats = metrics.get_processing_stats();
                                info!(
                                    processed = count,
                                    throughput = format!("{:.1} req/s", metrics.get_throughput()),
                                    avg_latency_us = stats.mean_us,
                                    "Processing milestone"
                                );
                            }
                        }
                        Err(e) => {
                            metrics.record_error(e.kind());
                            error!(
                                error_kind = e.kind(),
                                error = %e,
                                "Pipeline evaluation failed"
                            );
                            let event = ErrorEvent::new(e.kind(), e.to_string(), applicant);
                            if let Err(pub_err) = producer.publish_error(&event).await {
                                error!(error = %pub_err, "Failed to publish error event");
                            }
                        }
                    }
                }
                Err(e) => {
                    metrics.record_error("validation_error");
                    warn!(error = %e, "Failed to deserialize scoring request");
                    let event = ErrorEvent::new(
                        "validation_error",
                        format!("malformed request: {e}"),
                        None,
                    );
                    if let Err(pub_err) = producer.publish_error(&event).await {
                        error!(error = %pub_err, "Failed to publish error event");
                    }
                }
            }

            drop(permit);
        });
    }

    info!("Pipeline shutting down...");
    metrics.print_summary();

    Ok(())
}
