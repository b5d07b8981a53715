//! Delinquency Risk Pipeline Library
//!
//! Scores a loan applicant's near-term default risk from a small set of
//! financial attributes, converts the score into a tiered decision, and
//! explains the decision with per-feature attributions.

pub mod config;
pub mod consumer;
pub mod error;
pub mod explain;
pub mod features;
pub mod metrics;
pub mod pipeline;
pub mod privacy;
pub mod producer;
pub mod rules;
pub mod scorer;
pub mod tiering;
pub mod types;

pub use config::AppConfig;
pub use consumer::ApplicationConsumer;
pub use error::PipelineError;
pub use features::{FeatureDeriver, FeatureVector, RawApplicantInput};
pub use pipeline::DecisionPipeline;
pub use producer::DecisionProducer;
pub use tiering::RiskTier;
pub use types::{ErrorEvent, RiskDecision, ScoreRequest};
