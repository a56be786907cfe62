//! Prediction and report services

pub mod prediction;
pub mod preprocess;
pub mod report;

pub use prediction::{AcceptancePolicy, PredictionResult, PredictionService};
pub use report::{ReportDocument, ReportExporter, ReportRenderer};

use thiserror::Error;

use crate::classifier::ClassifierError;

/// Outcome of a prediction that did not produce an accepted result
#[derive(Debug, Error)]
pub enum PredictionError {
    /// Upload could not be decoded as an image; nothing was classified
    #[error("invalid image: {0}")]
    Decode(String),

    /// Classifier ran but the result failed the acceptance policy
    #[error("not a valid soil image")]
    Rejected { label: String, confidence: f32 },

    /// Classifier failed or returned malformed output
    #[error(transparent)]
    Classifier(#[from] ClassifierError),
}

/// Report export errors
#[derive(Debug, Error)]
pub enum ReportError {
    /// Export requested before any accepted prediction
    #[error("no prediction available to export")]
    NoPrediction,

    /// External document generation failed
    #[error("report rendering failed: {0}")]
    Rendering(String),
}

impl From<std::io::Error> for ReportError {
    fn from(err: std::io::Error) -> Self {
        ReportError::Rendering(err.to_string())
    }
}
