//! Classifier port: probability estimation over a fixed-width feature vector.

use serde::{Deserialize, Serialize};

use crate::domain::{argmax, ClassPrediction, PredictionTarget};

/// A trained multi-class model.
///
/// Implementations are immutable after fitting and shared across threads.
pub trait Classifier: Send + Sync {
    /// Width of the feature vector the model was fit on.
    fn n_features(&self) -> usize;

    /// Number of probability columns returned by [`Classifier::predict_proba`].
    fn n_classes(&self) -> usize;

    /// Per-class probabilities for one vector, summing to 1.
    ///
    /// Callers check the vector width against [`Classifier::n_features`]
    /// before calling.
    fn predict_proba(&self, features: &[f64]) -> Vec<f64>;
}

/// Error type for a classifier paired with its labels.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BundleError {
    #[error("{target} bundle has {labels} labels but the classifier has {classes} classes")]
    LabelCountMismatch {
        target: PredictionTarget,
        labels: usize,
        classes: usize,
    },

    #[error("{target} bundle expects {expected} features, got {actual}")]
    WidthMismatch {
        target: PredictionTarget,
        expected: usize,
        actual: usize,
    },

    #[error("{target} classifier returned {actual} probabilities for {expected} labels")]
    ProbabilityLength {
        target: PredictionTarget,
        expected: usize,
        actual: usize,
    },
}

/// A trained classifier with its ordered class labels.
///
/// Label `i` names probability column `i`. Saved and loaded as one unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierBundle<C> {
    pub target: PredictionTarget,
    pub labels: Vec<String>,
    pub classifier: C,
}

impl<C: Classifier> ClassifierBundle<C> {
    /// Pair a classifier with its labels.
    ///
    /// # Errors
    /// Returns `BundleError::LabelCountMismatch` if the counts differ.
    pub fn new(
        target: PredictionTarget,
        classifier: C,
        labels: Vec<String>,
    ) -> Result<Self, BundleError> {
        let bundle = Self {
            target,
            labels,
            classifier,
        };
        bundle.validate()?;
        Ok(bundle)
    }

    /// Re-check the label count (used after deserialization).
    ///
    /// # Errors
    /// Returns `BundleError::LabelCountMismatch` if the counts differ.
    pub fn validate(&self) -> Result<(), BundleError> {
        let classes = self.classifier.n_classes();
        if self.labels.len() != classes || classes == 0 {
            return Err(BundleError::LabelCountMismatch {
                target: self.target,
                labels: self.labels.len(),
                classes,
            });
        }
        Ok(())
    }

    #[must_use]
    pub fn n_features(&self) -> usize {
        self.classifier.n_features()
    }

    /// Top-1 label and the full probability vector for one feature vector.
    ///
    /// # Errors
    /// Returns error on a width mismatch or a malformed probability vector.
    pub fn predict(&self, features: &[f64]) -> Result<ClassPrediction, BundleError> {
        let expected = self.classifier.n_features();
        if features.len() != expected {
            return Err(BundleError::WidthMismatch {
                target: self.target,
                expected,
                actual: features.len(),
            });
        }

        let probabilities = self.classifier.predict_proba(features);
        let length_error = BundleError::ProbabilityLength {
            target: self.target,
            expected: self.labels.len(),
            actual: probabilities.len(),
        };
        if probabilities.len() != self.labels.len() {
            return Err(length_error);
        }
        let class_index = argmax(&probabilities).ok_or(length_error)?;

        Ok(ClassPrediction {
            label: self.labels[class_index].clone(),
            class_index,
            probabilities,
        })
    }
}
