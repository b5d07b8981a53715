//! ONNX-backed risk scorer.
//!
//! Loads the trained gradient-boosted model exported to ONNX once at
//! startup and serves predictions from it. Handles both output layouts
//! seen in practice: plain probability tensors and the `seq(map)` format
//! some exporters emit for classifiers.
//!
//! `Session::run` needs `&mut self`, so the session sits behind a lock.
//! Batch prediction exists precisely to keep that lock cheap: attribution
//! scores every feature coalition in one inference call instead of taking
//! the lock per coalition.

use crate::error::{PipelineError, Result};
use crate::features::{FeatureVector, FEATURE_COUNT};
use crate::scorer::Scorer;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::{DowncastableTarget, DynMapValueType, DynSequenceValueType};
use std::path::Path;
use std::sync::RwLock;
use tracing::{debug, info};

/// Scorer backed by a single ONNX model artifact.
pub struct OnnxScorer {
    name: String,
    session: RwLock<Session>,
    input_name: String,
    output_name: String,
}

impl OnnxScorer {
    /// Load the model artifact. Fails fast if the file is missing or
    /// corrupt; callers are expected to abort startup on error.
    pub fn load<P: AsRef<Path>>(path: P, intra_threads: usize) -> Result<Self> {
        let path = path.as_ref();

        ort::init().commit();

        info!(path = %path.display(), threads = intra_threads, "Loading ONNX model");

        let session = Session::builder()
            .and_then(|b| Ok(b.with_optimization_level(GraphOptimizationLevel::Level3)?))
            .and_then(|b| Ok(b.with_intra_threads(intra_threads)?))
            .map_err(|e| PipelineError::ServiceUnavailable(format!("session builder: {e}")))?
            .commit_from_file(path)
            .map_err(|e| {
                PipelineError::ServiceUnavailable(format!(
                    "failed to load model from {}: {e}",
                    path.display()
                ))
            })?;

        let input_name = session
            .inputs()
            .first()
            .map(|i| i.name().to_string())
            .unwrap_or_else(|| "float_input".to_string());

        let output_name = session
            .outputs()
            .iter()
            .find(|o| o.name().contains("prob") || o.name().contains("output"))
            .or_else(|| session.outputs().last())
            .map(|o| o.name().to_string())
            .unwrap_or_else(|| "probabilities".to_string());

        info!(input = %input_name, output = %output_name, "Model loaded");

        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("onnx")
            .to_string();

        Ok(Self {
            name,
            session: RwLock::new(session),
            input_name,
            output_name,
        })
    }

    /// Run one inference over a batch of rows: a single `[batch, 13]`
    /// tensor, a single lock acquisition.
    fn run_batch(&self, rows: &[FeatureVector]) -> Result<Vec<f64>> {
        use ort::value::Tensor;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let mut input: Vec<f32> = Vec::with_capacity(rows.len() * FEATURE_COUNT);
        for row in rows {
            input.extend(row.values().iter().map(|&v| v as f32));
        }
        let shape = vec![rows.len() as i64, FEATURE_COUNT as i64];
        let tensor = Tensor::from_array((shape, input))
            .map_err(|e| PipelineError::Internal(format!("input tensor: {e}")))?;

        let mut session = self
            .session
            .write()
            .map_err(|e| PipelineError::Internal(format!("scorer lock poisoned: {e}")))?;

        let input_name = self.input_name.clone();
        let outputs = session
            .run(ort::inputs![input_name.as_str() => tensor])
            .map_err(|e| PipelineError::Internal(format!("inference failed: {e}")))?;

        self.extract_probabilities(&outputs, rows.len())
    }

    /// Pull per-row positive-class probabilities out of the model
    /// outputs, trying the named output first, then any non-label output.
    fn extract_probabilities(
        &self,
        outputs: &ort::session::SessionOutputs,
        batch: usize,
    ) -> Result<Vec<f64>> {
        if let Some(output) = outputs.get(&self.output_name) {
            if let Some(probs) = Self::try_extract(output, batch)? {
                return Ok(probs);
            }
        }

        for (name, output) in outputs.iter() {
            if name.contains("label") {
                continue;
            }
            if let Some(probs) = Self::try_extract(&output, batch)? {
                debug!(output = %name, "Probabilities extracted from fallback output");
                return Ok(probs);
            }
        }

        Err(PipelineError::Internal(
            "no probability output found in model results".to_string(),
        ))
    }

    fn try_extract(output: &ort::value::DynValue, batch: usize) -> Result<Option<Vec<f64>>> {
        if let Ok((shape, data)) = output.try_extract_tensor::<f32>() {
            let dims: Vec<i64> = shape.iter().copied().collect();
            return Self::positive_class_from_tensor(&dims, data, batch).map(Some);
        }
        if DynSequenceValueType::can_downcast(&output.dtype()) {
            return Self::positive_class_from_sequence_maps(output, batch).map(Some);
        }
        Ok(None)
    }

    /// Tensor outputs are `[batch, num_classes]`, `[batch]`, or, for a
    /// single row, a bare `[num_classes]`. The reported shape must agree
    /// with the submitted batch and the data length; a model whose
    /// metadata disagrees with its payload is an internal error, not a
    /// panic.
    fn positive_class_from_tensor(dims: &[i64], data: &[f32], batch: usize) -> Result<Vec<f64>> {
        let (rows_reported, per_row): (usize, usize) = match dims {
            [n, c] => (*n as usize, *c as usize),
            [c] if batch == 1 => (1, *c as usize),
            [n] => (*n as usize, 1),
            _ => {
                return Err(PipelineError::Internal(format!(
                    "unexpected probability tensor shape {dims:?}"
                )))
            }
        };
        if rows_reported != batch {
            return Err(PipelineError::Internal(format!(
                "probability tensor reports {rows_reported} rows for a batch of {batch}"
            )));
        }
        let class_idx = if per_row >= 2 { 1 } else { 0 };

        (0..batch)
            .map(|i| {
                data.get(i * per_row + class_idx)
                    .map(|&v| v as f64)
                    .ok_or_else(|| {
                        PipelineError::Internal(format!(
                            "probability tensor data ({} values) shorter than shape {dims:?}",
                            data.len()
                        ))
                    })
            })
            .collect()
    }

    /// `seq(map(int64, float))` outputs carry one class-probability map
    /// per row.
    fn positive_class_from_sequence_maps(
        output: &ort::value::DynValue,
        batch: usize,
    ) -> Result<Vec<f64>> {
        let sequence = output
            .downcast_ref::<DynSequenceValueType>()
            .map_err(|e| PipelineError::Internal(format!("sequence downcast: {e}")))?;
        let maps = sequence
            .try_extract_sequence::<DynMapValueType>()
            .map_err(|e| PipelineError::Internal(format!("sequence extract: {e}")))?;

        if maps.len() != batch {
            return Err(PipelineError::Internal(format!(
                "probability sequence has {} entries for a batch of {batch}",
                maps.len()
            )));
        }

        maps.iter()
            .map(|map| {
                let pairs = map
                    .try_extract_key_values::<i64, f32>()
                    .map_err(|e| PipelineError::Internal(format!("map extract: {e}")))?;

                for (class_id, prob) in &pairs {
                    if *class_id == 1 {
                        return Ok(*prob as f64);
                    }
                }
                for (class_id, prob) in &pairs {
                    if *class_id == 0 {
                        return Ok(1.0 - *prob as f64);
                    }
                }
                Err(PipelineError::Internal(
                    "no class probability found in map output".to_string(),
                ))
            })
            .collect()
    }
}

impl Scorer for OnnxScorer {
    fn predict(&self, features: &FeatureVector) -> Result<f64> {
        let probs = self.run_batch(std::slice::from_ref(features))?;
        probs
            .first()
            .copied()
            .ok_or_else(|| PipelineError::Internal("empty prediction batch".to_string()))
    }

    fn predict_batch(&self, features: &[FeatureVector]) -> Result<Vec<f64>> {
        self.run_batch(features)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
