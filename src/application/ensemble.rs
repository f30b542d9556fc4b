//! Classifier ensemble: the three per-target bundles sharing one feature schema.
//!
//! An ensemble can only be built when every target has a bundle, so a missing
//! model is reported once, at assembly time, and never during a request.

use std::collections::BTreeMap;

use crate::domain::{DepartmentPrediction, EnsemblePrediction, FeatureVector, PredictionTarget};
use crate::ports::{Classifier, ClassifierBundle};
use crate::{PulsaiError, Result};

/// Diagnosis, severity and department bundles fit on the same vector width.
#[derive(Debug, Clone)]
pub struct ClassifierEnsemble<C> {
    diagnosis: ClassifierBundle<C>,
    severity: ClassifierBundle<C>,
    department: ClassifierBundle<C>,
}

impl<C: Classifier> ClassifierEnsemble<C> {
    /// Feature width every bundle was fit on.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.diagnosis.n_features()
    }

    /// Run all three classifiers on one vector.
    ///
    /// # Errors
    /// Returns `PulsaiError::SchemaMismatch` if the vector width differs from
    /// the width the classifiers were fit on.
    pub fn predict_all(&self, vector: &FeatureVector) -> Result<EnsemblePrediction> {
        let expected = self.n_features();
        if vector.len() != expected {
            return Err(PulsaiError::SchemaMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let x = vector.as_slice();
        let diagnosis = self.diagnosis.predict(x)?;
        let severity = self.severity.predict(x)?;
        let department = self.department.predict(x)?;

        tracing::debug!(
            "Ensemble prediction: diagnosis={} ({:.2}), severity={} ({:.2}), department={}",
            diagnosis.label,
            diagnosis.confidence(),
            severity.label,
            severity.confidence(),
            department.label
        );

        Ok(EnsemblePrediction {
            diagnosis,
            severity,
            department: DepartmentPrediction {
                label: department.label,
                class_index: department.class_index,
            },
        })
    }
}

/// Collects bundles until all targets are present.
#[derive(Debug)]
pub struct EnsembleBuilder<C> {
    bundles: BTreeMap<PredictionTarget, ClassifierBundle<C>>,
}

impl<C> Default for EnsembleBuilder<C> {
    fn default() -> Self {
        Self {
            bundles: BTreeMap::new(),
        }
    }
}

impl<C: Classifier> EnsembleBuilder<C> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) the bundle for its target.
    #[must_use]
    pub fn with_bundle(mut self, bundle: ClassifierBundle<C>) -> Self {
        self.bundles.insert(bundle.target, bundle);
        self
    }

    /// Assemble the ensemble.
    ///
    /// # Errors
    /// Returns `PulsaiError::ModelNotLoaded` naming the first missing target,
    /// or `PulsaiError::SchemaMismatch` if bundles disagree on feature width.
    pub fn build(mut self) -> Result<ClassifierEnsemble<C>> {
        let mut take = |target: PredictionTarget| -> Result<ClassifierBundle<C>> {
            let bundle = self
                .bundles
                .remove(&target)
                .ok_or_else(|| PulsaiError::ModelNotLoaded(format!("{target} classifier")))?;
            bundle.validate()?;
            Ok(bundle)
        };

        let diagnosis = take(PredictionTarget::Diagnosis)?;
        let severity = take(PredictionTarget::Severity)?;
        let department = take(PredictionTarget::Department)?;

        let expected = diagnosis.n_features();
        for bundle in [&severity, &department] {
            if bundle.n_features() != expected {
                return Err(PulsaiError::SchemaMismatch {
                    expected,
                    actual: bundle.n_features(),
                });
            }
        }

        Ok(ClassifierEnsemble {
            diagnosis,
            severity,
            department,
        })
    }
}

#[cfg(test)]
pub(crate) mod stub {
    use super::*;

    /// Returns fixed probabilities regardless of input.
    #[derive(Debug, Clone)]
    pub struct FixedClassifier {
        pub width: usize,
        pub probabilities: Vec<f64>,
    }

    impl Classifier for FixedClassifier {
        fn n_features(&self) -> usize {
            self.width
        }

        fn n_classes(&self) -> usize {
            self.probabilities.len()
        }

        fn predict_proba(&self, _features: &[f64]) -> Vec<f64> {
            self.probabilities.clone()
        }
    }

    pub fn bundle(
        target: PredictionTarget,
        width: usize,
        labels: &[&str],
        probabilities: Vec<f64>,
    ) -> ClassifierBundle<FixedClassifier> {
        ClassifierBundle::new(
            target,
            FixedClassifier {
                width,
                probabilities,
            },
            labels.iter().map(|l| (*l).to_string()).collect(),
        )
        .expect("Should build bundle")
    }

    pub fn ensemble(width: usize, severity: Vec<f64>) -> ClassifierEnsemble<FixedClassifier> {
        EnsembleBuilder::new()
            .with_bundle(bundle(
                PredictionTarget::Diagnosis,
                width,
                &["Grip", "Migren"],
                vec![0.6, 0.4],
            ))
            .with_bundle(bundle(
                PredictionTarget::Severity,
                width,
                &["düşük", "orta", "yüksek"],
                severity,
            ))
            .with_bundle(bundle(
                PredictionTarget::Department,
                width,
                &["Dahiliye", "Nöroloji"],
                vec![0.5, 0.5],
            ))
            .build()
            .expect("Should build ensemble")
    }
}

#[cfg(test)]
mod tests {
    use super::stub::*;
    use super::*;
    use crate::ports::BundleError;

    #[test]
    fn test_predict_all() {
        let ensemble = ensemble(4, vec![0.2, 0.3, 0.5]);
        let vector = FeatureVector::from_values(vec![1.0, 0.0, 45.0, 1.0]);

        let prediction = ensemble.predict_all(&vector).expect("Should predict");
        assert_eq!(prediction.diagnosis.label, "Grip");
        assert_eq!(prediction.severity.label, "yüksek");
        assert!((prediction.severity.confidence() - 0.5).abs() < f64::EPSILON);
        // tie goes to the first department
        assert_eq!(prediction.department.label, "Dahiliye");
    }

    #[test]
    fn test_predict_all_is_deterministic() {
        let ensemble = ensemble(3, vec![0.4, 0.4, 0.2]);
        let vector = FeatureVector::from_values(vec![0.0, 30.0, 0.0]);

        let a = ensemble.predict_all(&vector).expect("Should predict");
        let b = ensemble.predict_all(&vector).expect("Should predict");
        assert_eq!(a, b);
        assert_eq!(a.severity.class_index, 0);
    }

    #[test]
    fn test_width_mismatch_is_rejected() {
        let ensemble = ensemble(4, vec![0.2, 0.3, 0.5]);
        let vector = FeatureVector::from_values(vec![1.0, 0.0, 45.0]);

        match ensemble.predict_all(&vector) {
            Err(PulsaiError::SchemaMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (4, 3));
            }
            other => panic!("Expected schema mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_bundle_is_model_not_loaded() {
        let result = EnsembleBuilder::new()
            .with_bundle(bundle(
                PredictionTarget::Diagnosis,
                2,
                &["Grip"],
                vec![1.0],
            ))
            .build();

        match result {
            Err(PulsaiError::ModelNotLoaded(msg)) => assert!(msg.contains("severity")),
            other => panic!("Expected ModelNotLoaded, got {other:?}"),
        }
    }

    #[test]
    fn test_label_count_must_match_classes() {
        let err = ClassifierBundle::new(
            PredictionTarget::Severity,
            FixedClassifier {
                width: 2,
                probabilities: vec![0.5, 0.5],
            },
            vec!["düşük".to_string()],
        )
        .expect_err("Should reject");
        assert!(matches!(err, BundleError::LabelCountMismatch { labels: 1, classes: 2, .. }));
    }
}
