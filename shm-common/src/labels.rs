//! Ordered soil label set
//!
//! Label order is positional: index `i` names output `i` of the classifier.
//! The set therefore has to match the model's output dimensionality exactly.

use crate::{Error, Result};
use serde::Serialize;
use std::collections::HashSet;

/// Sentinel label emitted by models trained with a "not soil" class
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Soil types the bundled model was trained on, in output order
pub const DEFAULT_SOIL_LABELS: [&str; 10] = [
    "Sand",
    "Silt",
    "Clay",
    "Loam",
    "Peat",
    "Chalk",
    "Alluvial Soil",
    "Black Cotton Soil (Regur)",
    "Red and Yellow Soil",
    "Laterite Soil",
];

/// Ordered, duplicate-free list of classifier labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Build a label set, rejecting empty sets, blank names and duplicates
    pub fn new<I, S>(labels: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();

        if labels.is_empty() {
            return Err(Error::InvalidInput("Label set is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(Error::InvalidInput("Label set contains a blank label".to_string()));
            }
            if !seen.insert(label.as_str()) {
                return Err(Error::InvalidInput(format!("Duplicate label: {}", label)));
            }
        }

        Ok(Self { labels })
    }

    /// Number of labels (classifier output dimensionality)
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Label at a classifier output index
    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    /// Position of a label, if present
    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.labels.iter().position(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// True for the "Unknown" sentinel
    pub fn is_unknown(label: &str) -> bool {
        label == UNKNOWN_LABEL
    }
}

impl Default for LabelSet {
    /// Ten soil types followed by the "Unknown" sentinel
    fn default() -> Self {
        let labels = DEFAULT_SOIL_LABELS
            .iter()
            .map(|s| s.to_string())
            .chain(std::iter::once(UNKNOWN_LABEL.to_string()))
            .collect();
        Self { labels }
    }
}
