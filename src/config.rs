//! Configuration management for the delinquency risk pipeline.

use crate::error::{PipelineError, Result as PipelineResult};
use crate::features::{RawApplicantInput, StressWeights};
use crate::rules::OverrideRule;
use crate::tiering::TierMap;
use anyhow::{Context, Result};
use config::{Config, File};
use serde::Deserialize;
use std::path::Path;

/// Scorer backend selection.
#[derive(Debug, Clone, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ModelBackend {
    /// Trained model exported to ONNX, loaded from `model_path`
    #[default]
    Onnx,
    /// Deterministic logistic stub, no artifact required
    Logistic,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub nats: NatsConfig,
    pub model: ModelConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
    #[serde(default)]
    pub rules: OverrideRule,
    #[serde(default)]
    pub tiering: TierMap,
    #[serde(default)]
    pub explain: ExplainConfig,
    pub pipeline: PipelineConfig,
    pub privacy: PrivacyConfig,
    pub logging: LoggingConfig,
}

/// NATS connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct NatsConfig {
    /// NATS server URL
    pub url: String,
    /// Subject for incoming scoring requests
    pub application_subject: String,
    /// Subject for outgoing risk decisions and error events
    pub decision_subject: String,
}

/// Scorer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub backend: ModelBackend,
    /// Path to the ONNX artifact (onnx backend only)
    #[serde(default = "default_model_path")]
    pub model_path: String,
    /// Intra-op threads for ONNX inference
    #[serde(default = "default_onnx_threads")]
    pub onnx_threads: usize,
}

fn default_model_path() -> String {
    "models/xgb_model.onnx".to_string()
}

fn default_onnx_threads() -> usize {
    1
}

/// Feature derivation configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FeaturesConfig {
    /// Weights of the financial stress index; must sum to 1
    #[serde(default)]
    pub stress_weights: StressWeights,
}

/// Explanation configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ExplainConfig {
    /// Number of top drivers included in a decision
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Background applicant the attributions are measured against
    #[serde(default = "default_background")]
    pub background: RawApplicantInput,
}

fn default_top_k() -> usize {
    5
}

/// A typical applicant profile; attributions answer "what pushes this
/// score away from a profile like this".
fn default_background() -> RawApplicantInput {
    RawApplicantInput {
        loan_amnt: 10000.0,
        int_rate: 10.0,
        annual_inc: 60000.0,
        dti: 18.0,
        revol_util: 40.0,
        installment: 300.0,
    }
}

impl Default for ExplainConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            background: default_background(),
        }
    }
}

/// Request handling configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum concurrently processed requests
    pub workers: usize,
}

/// Pseudonymization configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PrivacyConfig {
    /// HMAC key for applicant-id tokenization
    pub hmac_key: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/config.toml")
    }

    /// Load configuration from a specific path.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .build()
            .context("Failed to build configuration")?;

        let config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }

    /// Cross-field validation: band ordering, override floor placement,
    /// stress weight normalization.
    pub fn validate(&self) -> PipelineResult<()> {
        let t = &self.tiering;
        if !(0.0 < t.medium_cutoff && t.medium_cutoff < t.high_cutoff && t.high_cutoff < 1.0) {
            return Err(PipelineError::Internal(format!(
                "tier cutoffs must satisfy 0 < medium ({}) < high ({}) < 1",
                t.medium_cutoff, t.high_cutoff
            )));
        }
        if !(self.rules.floor > t.medium_cutoff && self.rules.floor <= 1.0) {
            return Err(PipelineError::Internal(format!(
                "override floor {} must lie above the medium cutoff {} so an \
                 override can never land in LOW",
                self.rules.floor, t.medium_cutoff
            )));
        }
        let weight_sum = self.features.stress_weights.sum();
        if (weight_sum - 1.0).abs() > 1e-9 {
            return Err(PipelineError::Internal(format!(
                "stress index weights must sum to 1, got {weight_sum}"
            )));
        }
        if self.pipeline.workers == 0 {
            return Err(PipelineError::Internal(
                "pipeline.workers must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            nats: NatsConfig {
                url: "nats://localhost:4222".to_string(),
                application_subject: "applications".to_string(),
                decision_subject: "risk.decisions".to_string(),
            },
            model: ModelConfig {
                backend: ModelBackend::Onnx,
                model_path: default_model_path(),
                onnx_threads: 1,
            },
            features: FeaturesConfig::default(),
            rules: OverrideRule::default(),
            tiering: TierMap::default(),
            explain: ExplainConfig::default(),
            pipeline: PipelineConfig { workers: 4 },
            privacy: PrivacyConfig {
                hmac_key: "dev-only-key".to_string(),
            },
            logging: LoggingConfig {
                level: "info".to_string(),
            },
        }
    }
}
