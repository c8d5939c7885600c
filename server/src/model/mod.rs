pub mod manager;
pub mod onnx;
pub mod preprocess;

use std::path::Path;

use image::DynamicImage;

use crate::error::{InferenceError, LoadError};

/// Ordered class-index -> tag mapping, fixed for the lifetime of a loaded
/// model. Canonically `{0: "fake", 1: "live"}`.
#[derive(Debug, Clone)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

/// The opaque classification capability: decoded image in, probability
/// distribution over the label set out.
pub trait Classifier: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<f32>, InferenceError>;
}

pub struct LoadedClassifier {
    pub classifier: Box<dyn Classifier>,
    pub labels: LabelSet,
    pub model_type: String,
}

/// Loads classifiers and moves artifacts in and out of the local cache.
/// Injected into the manager so tests can substitute fakes.
pub trait ClassifierProvider: Send + Sync {
    /// Whether `dir` holds a complete artifact set.
    fn is_cached(&self, dir: &Path) -> bool;
    /// Downloads the artifact set for `source` into `dest`.
    fn fetch(&self, source: &str, dest: &Path) -> Result<(), LoadError>;
    /// Opens the artifact set in `dir`.
    fn load(&self, dir: &Path) -> Result<LoadedClassifier, LoadError>;
}

/// Where the loaded artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelOrigin {
    Remote,
    LocalCache,
    Local,
}

/// A completed classification, assembled from the raw probability vector.
#[derive(Debug, Clone)]
pub struct Prediction {
    pub label: String,
    pub class_index: usize,
    pub confidence: f32,
    /// Full label -> probability breakdown, in label-set order.
    pub probabilities: Vec<(String, f32)>,
    pub is_live: bool,
}

impl Prediction {
    pub fn from_probabilities(
        probs: &[f32],
        labels: &LabelSet,
        live_index: usize,
    ) -> Result<Self, InferenceError> {
        if probs.len() != labels.len() {
            return Err(InferenceError::OutputShape {
                got: probs.len(),
                expected: labels.len(),
            });
        }

        let (class_index, confidence) = probs
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .ok_or(InferenceError::OutputShape {
                got: 0,
                expected: labels.len(),
            })?;

        let label = labels
            .get(class_index)
            .unwrap_or("unknown")
            .to_string();

        Ok(Self {
            label,
            class_index,
            confidence,
            probabilities: labels
                .iter()
                .map(str::to_string)
                .zip(probs.iter().copied())
                .collect(),
            is_live: class_index == live_index,
        })
    }

    /// Probability mass at the live index; everything else counts as fake.
    /// The two returned entries always sum to the full mass, even for label
    /// sets with more than two classes.
    pub fn two_class_split(&self, live_index: usize) -> (f32, f32) {
        let live = self
            .probabilities
            .get(live_index)
            .map(|(_, p)| *p)
            .unwrap_or(0.0);
        let total: f32 = self.probabilities.iter().map(|(_, p)| *p).sum();
        (total - live, live)
    }
}
