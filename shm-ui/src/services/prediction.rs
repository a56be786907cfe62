//! Prediction Service
//!
//! Preprocesses an uploaded photo, runs the classifier, picks the top label
//! and applies the acceptance policy. Accepted results are immutable; the
//! caller stores them in the session (see [`crate::session::SessionState`]).

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use shm_common::config::AcceptanceConfig;
use shm_common::LabelSet;
use tracing::{debug, info};

use super::preprocess::image_to_tensor;
use super::PredictionError;
use crate::classifier::{Classifier, ClassifierError};

/// Tolerance on the sum of a probability distribution
pub const DISTRIBUTION_TOLERANCE: f32 = 1e-3;

/// Accepted classification of one image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    /// Top label (never the "Unknown" sentinel while the policy is enabled)
    pub label: String,
    /// Probability of `label`, unrounded
    pub confidence: f32,
    /// One probability per label, in label-set order
    pub raw_distribution: Vec<f32>,
}

/// Rules deciding whether a classifier result is a usable soil prediction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcceptancePolicy {
    pub enabled: bool,
    pub min_confidence: f32,
}

impl AcceptancePolicy {
    /// Accept when the label is a real soil type and confident enough
    pub fn accepts(&self, label: &str, confidence: f32) -> bool {
        if !self.enabled {
            return true;
        }
        !LabelSet::is_unknown(label) && confidence >= self.min_confidence
    }
}

impl From<&AcceptanceConfig> for AcceptancePolicy {
    fn from(config: &AcceptanceConfig) -> Self {
        Self {
            enabled: config.enabled,
            min_confidence: config.min_confidence,
        }
    }
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        (&AcceptanceConfig::default()).into()
    }
}

/// Index of the largest value; ties resolve to the lowest index
pub fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        match best {
            Some((_, max)) if v <= max => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}

/// Check a classifier output and bring its sum to 1 if it drifted
pub fn normalize_distribution(
    mut values: Vec<f32>,
    expected_len: usize,
) -> Result<Vec<f32>, ClassifierError> {
    if values.len() != expected_len {
        return Err(ClassifierError::InvalidOutput(format!(
            "Expected {} probabilities, got {}",
            expected_len,
            values.len()
        )));
    }
    if values.iter().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ClassifierError::InvalidOutput(
            "Distribution contains negative or non-finite values".to_string(),
        ));
    }

    let sum: f32 = values.iter().sum();
    if sum <= 0.0 {
        return Err(ClassifierError::InvalidOutput("Distribution sums to zero".to_string()));
    }
    if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
        debug!(sum, "Renormalizing classifier output");
        values.iter_mut().for_each(|v| *v /= sum);
    }
    Ok(values)
}

/// Classifies soil photos against a fixed label set
pub struct PredictionService {
    classifier: Arc<dyn Classifier>,
    labels: LabelSet,
    policy: AcceptancePolicy,
    input_size: u32,
}

impl PredictionService {
    /// Pair a classifier with its label set
    ///
    /// Fails when the classifier's output dimensionality differs from the
    /// number of labels.
    pub fn new(
        classifier: Arc<dyn Classifier>,
        labels: LabelSet,
        policy: AcceptancePolicy,
        input_size: u32,
    ) -> Result<Self, ClassifierError> {
        if classifier.output_len() != labels.len() {
            return Err(ClassifierError::Load(format!(
                "Classifier has {} outputs but {} labels are configured",
                classifier.output_len(),
                labels.len()
            )));
        }

        Ok(Self {
            classifier,
            labels,
            policy,
            input_size,
        })
    }

    pub fn labels(&self) -> &LabelSet {
        &self.labels
    }

    pub fn policy(&self) -> AcceptancePolicy {
        self.policy
    }

    /// Classify an encoded image
    ///
    /// Blocks for the duration of the inference.
    pub fn predict(&self, image: &[u8]) -> Result<PredictionResult, PredictionError> {
        let tensor = image_to_tensor(image, self.input_size)?;

        let started = Instant::now();
        let raw = self.classifier.classify(&tensor)?;
        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "Classifier returned");

        self.evaluate(raw)
    }

    /// Pick the top label of a raw distribution and apply the policy
    pub fn evaluate(&self, raw: Vec<f32>) -> Result<PredictionResult, PredictionError> {
        let distribution = normalize_distribution(raw, self.labels.len())?;

        let index = argmax(&distribution).ok_or_else(|| {
            ClassifierError::InvalidOutput("Empty distribution".to_string())
        })?;
        let label = self
            .labels
            .get(index)
            .ok_or_else(|| ClassifierError::InvalidOutput(format!("No label at index {}", index)))?
            .to_string();
        let confidence = distribution[index];

        if !self.policy.accepts(&label, confidence) {
            info!(label = %label, confidence, "Prediction rejected");
            return Err(PredictionError::Rejected { label, confidence });
        }

        info!(label = %label, confidence, "Prediction accepted");
        Ok(PredictionResult {
            label,
            confidence,
            raw_distribution: distribution,
        })
    }
}
