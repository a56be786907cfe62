//! Classifier adapter
//!
//! The soil model is an opaque, externally trained network. This module
//! fixes the narrow contract the rest of the service relies on: a normalized
//! square RGB tensor goes in, one probability per label comes out, in label
//! order.

mod onnx;

pub use onnx::OnnxClassifier;

use thiserror::Error;

/// Classifier errors
#[derive(Debug, Error)]
pub enum ClassifierError {
    /// Model file missing, unreadable or incompatible
    #[error("Model load failed: {0}")]
    Load(String),

    /// Inference run failed
    #[error("Inference failed: {0}")]
    Inference(String),

    /// Model returned something that is not a probability vector
    #[error("Invalid classifier output: {0}")]
    InvalidOutput(String),
}

/// Normalized image tensor in NHWC layout (batch of one)
///
/// `size × size × 3` values in `[0, 1]`, row-major, RGB interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageTensor {
    size: u32,
    data: Vec<f32>,
}

impl ImageTensor {
    /// Wrap pixel data; `None` when the length does not match `size`
    pub fn new(size: u32, data: Vec<f32>) -> Option<Self> {
        let expected = (size as usize) * (size as usize) * 3;
        (data.len() == expected).then_some(Self { size, data })
    }

    /// Pixels per side
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }
}

/// Single-image classifier
///
/// Implementations are invoked synchronously and may block for the duration
/// of one inference.
pub trait Classifier: Send + Sync {
    /// Probability per label, aligned to the label set
    fn classify(&self, input: &ImageTensor) -> Result<Vec<f32>, ClassifierError>;

    /// Output dimensionality (must equal the label count)
    fn output_len(&self) -> usize;
}
