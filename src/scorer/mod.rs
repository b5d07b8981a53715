//! Risk scorer capability.
//!
//! The pipeline consumes the scorer as an opaque capability: deterministic
//! for a fixed feature vector, output in [0, 1], loaded once at startup
//! and shared read-only across concurrent requests.

pub mod logistic;
pub mod onnx;

use crate::error::Result;
use crate::features::FeatureVector;

pub use logistic::LogisticScorer;
pub use onnx::OnnxScorer;

/// A loaded default-probability scorer.
///
/// Implementations must be deterministic for a fixed feature vector and
/// safe to invoke from multiple requests concurrently.
pub trait Scorer: Send + Sync {
    /// Predict the default probability for a derived feature vector.
    fn predict(&self, features: &FeatureVector) -> Result<f64>;

    /// Predict probabilities for a batch of feature vectors, one result
    /// per row in order.
    ///
    /// Attribution scores thousands of coalition vectors per request;
    /// backends that pay a per-call cost (session locking, FFI) should
    /// override this with a single batched inference.
    fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        features.iter().map(|f| self.predict(f)).collect()
    }

    /// Human-readable backend name, for logs and decisions.
    fn name(&self) -> &str;
}
