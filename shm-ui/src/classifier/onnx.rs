//! ONNX-backed classifier using tract
//!
//! Expects the Keras export layout: input `[1, size, size, 3]` f32,
//! output `[1, n_labels]` softmax probabilities.

use std::path::Path;

use tract_onnx::prelude::*;
use tracing::{debug, info};

use super::{Classifier, ClassifierError, ImageTensor};

/// Soil classifier loaded from an ONNX file
pub struct OnnxClassifier {
    model: TypedRunnableModel<TypedModel>,
    input_size: u32,
    output_len: usize,
}

impl OnnxClassifier {
    /// Load, optimize and plan the model for a fixed square input size
    pub fn load(path: &Path, input_size: u32) -> Result<Self, ClassifierError> {
        if !path.exists() {
            return Err(ClassifierError::Load(format!(
                "Model file not found: {}",
                path.display()
            )));
        }

        let side = input_size as usize;
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|m| m.with_input_fact(0, f32::fact([1, side, side, 3]).into()))
            .and_then(|m| m.into_optimized())
            .map_err(|e| ClassifierError::Load(format!("{}: {}", path.display(), e)))?;

        let output_len = model
            .output_fact(0)
            .ok()
            .and_then(|fact| fact.shape.as_concrete().and_then(|dims| dims.last().copied()))
            .ok_or_else(|| {
                ClassifierError::Load("Model output shape is not concrete".to_string())
            })?;

        let model = model
            .into_runnable()
            .map_err(|e| ClassifierError::Load(e.to_string()))?;

        info!(
            path = %path.display(),
            input_size,
            output_len,
            "Loaded ONNX soil classifier"
        );

        Ok(Self {
            model,
            input_size,
            output_len,
        })
    }
}

impl Classifier for OnnxClassifier {
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError> {
        if input.size() != self.input_size {
            return Err(ClassifierError::Inference(format!(
                "Expected {0}x{0} input, got {1}x{1}",
                self.input_size,
                input.size()
            )));
        }

        let side = self.input_size as usize;
        let array = tract_ndarray::Array4::from_shape_vec((1, side, side, 3), input.data().to_vec())
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let outputs = self
            .model
            .run(tvec!(Tensor::from(array).into()))
            .map_err(|e| ClassifierError::Inference(e.to_string()))?;

        let probabilities: Vec<f32> = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| ClassifierError::InvalidOutput(e.to_string()))?
            .iter()
            .copied()
            .collect();

        debug!(outputs = probabilities.len(), "Inference complete");
        Ok(probabilities)
    }

    fn output_len(&self) -> usize {
        self.output_len
    }
}
