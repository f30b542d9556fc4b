//! Softmax adapter: multinomial logistic regression implementing `Classifier`.
//!
//! Features are standardized with per-column mean and inverse standard
//! deviation stored alongside the weights, so persisted models carry their own
//! scaler. Training is full-batch gradient descent from zero weights and is
//! fully deterministic for a given dataset.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ports::Classifier;

/// Error type for fitting or loading a softmax model.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SoftmaxError {
    #[error("Training set is empty")]
    EmptyTrainingSet,

    #[error("Got {rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("Row {row} has {actual} features, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Label index {label} out of range for {n_classes} classes")]
    LabelOutOfRange { label: usize, n_classes: usize },

    #[error("Invalid hyper-parameters: {0}")]
    InvalidParams(String),

    #[error("Inconsistent model parameters: {0}")]
    Inconsistent(String),
}

/// Gradient-descent settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxParams {
    pub learning_rate: f64,
    pub epochs: usize,
    /// L2 penalty on weights (bias is not penalized)
    pub l2: f64,
}

impl Default for SoftmaxParams {
    fn default() -> Self {
        Self {
            learning_rate: 0.5,
            epochs: 300,
            l2: 1e-4,
        }
    }
}

/// Trained multinomial logistic regression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftmaxClassifier {
    pub n_features: usize,
    pub n_classes: usize,
    pub scaler_mean: Vec<f64>,
    /// 1/std per column; 0 for constant columns
    pub scaler_std_inv: Vec<f64>,
    /// Row-major `n_classes x n_features`
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl SoftmaxClassifier {
    /// Fit on rows of equal width with class indices in `0..n_classes`.
    ///
    /// # Errors
    /// Returns error if the data is empty, ragged or labels are out of range.
    pub fn fit<R: AsRef<[f64]>>(
        rows: &[R],
        labels: &[usize],
        n_classes: usize,
        params: &SoftmaxParams,
    ) -> Result<Self, SoftmaxError> {
        if rows.is_empty() {
            return Err(SoftmaxError::EmptyTrainingSet);
        }
        if rows.len() != labels.len() {
            return Err(SoftmaxError::LengthMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        if n_classes == 0 {
            return Err(SoftmaxError::InvalidParams("n_classes must be > 0".into()));
        }
        if params.learning_rate.partial_cmp(&0.0) != Some(Ordering::Greater)
            || params.epochs == 0
            || params.l2 < 0.0
        {
            return Err(SoftmaxError::InvalidParams(format!(
                "learning_rate={}, epochs={}, l2={}",
                params.learning_rate, params.epochs, params.l2
            )));
        }

        let n_features = rows[0].as_ref().len();
        for (i, row) in rows.iter().enumerate() {
            if row.as_ref().len() != n_features {
                return Err(SoftmaxError::RaggedRow {
                    row: i,
                    expected: n_features,
                    actual: row.as_ref().len(),
                });
            }
        }
        if let Some(&label) = labels.iter().find(|&&l| l >= n_classes) {
            return Err(SoftmaxError::LabelOutOfRange { label, n_classes });
        }

        let (scaler_mean, scaler_std_inv) = fit_scaler(rows, n_features);
        let scaled: Vec<Vec<f64>> = rows
            .iter()
            .map(|r| standardize(r.as_ref(), &scaler_mean, &scaler_std_inv))
            .collect();

        let n = scaled.len() as f64;
        let mut weights = vec![vec![0.0; n_features]; n_classes];
        let mut bias = vec![0.0; n_classes];

        for _ in 0..params.epochs {
            let mut grad_w = vec![vec![0.0; n_features]; n_classes];
            let mut grad_b = vec![0.0; n_classes];

            for (x, &y) in scaled.iter().zip(labels) {
                let p = softmax(&logits(&weights, &bias, x));
                for k in 0..n_classes {
                    let target = if k == y { 1.0 } else { 0.0 };
                    let diff = p[k] - target;
                    grad_b[k] += diff;
                    for (g, &xj) in grad_w[k].iter_mut().zip(x) {
                        *g += diff * xj;
                    }
                }
            }

            for k in 0..n_classes {
                bias[k] -= params.learning_rate * grad_b[k] / n;
                for (w, g) in weights[k].iter_mut().zip(&grad_w[k]) {
                    *w -= params.learning_rate * (g / n + params.l2 * *w);
                }
            }
        }

        Ok(Self {
            n_features,
            n_classes,
            scaler_mean,
            scaler_std_inv,
            weights,
            bias,
        })
    }

    /// Check that all parameter arrays agree with the declared dimensions.
    ///
    /// # Errors
    /// Returns `SoftmaxError::Inconsistent` describing the first mismatch.
    pub fn validate(&self) -> Result<(), SoftmaxError> {
        let n = self.n_features;
        if self.n_classes == 0 {
            return Err(SoftmaxError::Inconsistent("model has no classes".into()));
        }
        if self.scaler_mean.len() != n || self.scaler_std_inv.len() != n {
            return Err(SoftmaxError::Inconsistent(format!(
                "scaler length does not match n_features={n}"
            )));
        }
        if self.weights.len() != self.n_classes || self.bias.len() != self.n_classes {
            return Err(SoftmaxError::Inconsistent(format!(
                "weight rows do not match n_classes={}",
                self.n_classes
            )));
        }
        if self.weights.iter().any(|row| row.len() != n) {
            return Err(SoftmaxError::Inconsistent(format!(
                "weight row width does not match n_features={n}"
            )));
        }
        let all_finite = self
            .weights
            .iter()
            .flatten()
            .chain(&self.bias)
            .chain(&self.scaler_mean)
            .chain(&self.scaler_std_inv)
            .all(|v| v.is_finite());
        if !all_finite {
            return Err(SoftmaxError::Inconsistent("non-finite parameter".into()));
        }
        Ok(())
    }
}

impl Classifier for SoftmaxClassifier {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn n_classes(&self) -> usize {
        self.n_classes
    }

    fn predict_proba(&self, features: &[f64]) -> Vec<f64> {
        let x = standardize(features, &self.scaler_mean, &self.scaler_std_inv);
        softmax(&logits(&self.weights, &self.bias, &x))
    }
}

fn fit_scaler<R: AsRef<[f64]>>(rows: &[R], n_features: usize) -> (Vec<f64>, Vec<f64>) {
    let n = rows.len() as f64;
    let mut mean = vec![0.0; n_features];
    for row in rows {
        for (m, &v) in mean.iter_mut().zip(row.as_ref()) {
            *m += v;
        }
    }
    for m in &mut mean {
        *m /= n;
    }

    let mut var = vec![0.0; n_features];
    for row in rows {
        for ((s, &v), &m) in var.iter_mut().zip(row.as_ref()).zip(&mean) {
            let d = v - m;
            *s += d * d;
        }
    }
    let std_inv = var
        .into_iter()
        .map(|s| {
            let std = (s / n).sqrt();
            if std > 1e-12 {
                1.0 / std
            } else {
                0.0
            }
        })
        .collect();

    (mean, std_inv)
}

fn standardize(x: &[f64], mean: &[f64], std_inv: &[f64]) -> Vec<f64> {
    x.iter()
        .zip(mean)
        .zip(std_inv)
        .map(|((&v, &m), &s)| (v - m) * s)
        .collect()
}

fn logits(weights: &[Vec<f64>], bias: &[f64], x: &[f64]) -> Vec<f64> {
    weights
        .iter()
        .zip(bias)
        .map(|(w, &b)| b + w.iter().zip(x).map(|(wi, xi)| wi * xi).sum::<f64>())
        .collect()
}

fn softmax(z: &[f64]) -> Vec<f64> {
    let max = z.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = z.iter().map(|&v| (v - max).exp()).collect();
    let sum: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / sum).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toy() -> (Vec<Vec<f64>>, Vec<usize>) {
        // class 0 when the first column is set, class 1 for the second, class 2 for the third
        let rows = vec![
            vec![1.0, 0.0, 0.0, 30.0],
            vec![1.0, 0.0, 0.0, 35.0],
            vec![0.0, 1.0, 0.0, 40.0],
            vec![0.0, 1.0, 0.0, 45.0],
            vec![0.0, 0.0, 1.0, 50.0],
            vec![0.0, 0.0, 1.0, 55.0],
        ];
        (rows, vec![0, 0, 1, 1, 2, 2])
    }

    #[test]
    fn test_fit_separable_data() {
        let (rows, labels) = toy();
        let model = SoftmaxClassifier::fit(&rows, &labels, 3, &SoftmaxParams::default())
            .expect("Should fit");

        model.validate().expect("Should be consistent");
        for (row, &label) in rows.iter().zip(&labels) {
            let p = model.predict_proba(row);
            assert_eq!(p.len(), 3);
            assert!((p.iter().sum::<f64>() - 1.0).abs() < 1e-9);
            assert_eq!(crate::domain::argmax(&p), Some(label));
        }
    }

    #[test]
    fn test_fit_is_deterministic() {
        let (rows, labels) = toy();
        let params = SoftmaxParams::default();
        let a = SoftmaxClassifier::fit(&rows, &labels, 3, &params).expect("Should fit");
        let b = SoftmaxClassifier::fit(&rows, &labels, 3, &params).expect("Should fit");
        assert_eq!(a, b);
    }

    #[test]
    fn test_constant_column_is_neutral() {
        let rows = vec![vec![1.0, 7.0], vec![0.0, 7.0]];
        let model = SoftmaxClassifier::fit(&rows, &[0, 1], 2, &SoftmaxParams::default())
            .expect("Should fit");
        assert_eq!(model.scaler_std_inv[1], 0.0);
        let p = model.predict_proba(&[1.0, 1000.0]);
        assert!(p[0] > p[1]);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        let params = SoftmaxParams::default();
        let empty: Vec<Vec<f64>> = Vec::new();
        assert_eq!(
            SoftmaxClassifier::fit(&empty, &[], 2, &params),
            Err(SoftmaxError::EmptyTrainingSet)
        );
        assert!(matches!(
            SoftmaxClassifier::fit(&[vec![1.0], vec![1.0, 2.0]], &[0, 1], 2, &params),
            Err(SoftmaxError::RaggedRow { row: 1, .. })
        ));
        assert!(matches!(
            SoftmaxClassifier::fit(&[vec![1.0]], &[3], 2, &params),
            Err(SoftmaxError::LabelOutOfRange { label: 3, .. })
        ));
    }

    #[test]
    fn test_validate_catches_truncated_weights() {
        let (rows, labels) = toy();
        let mut model = SoftmaxClassifier::fit(&rows, &labels, 3, &SoftmaxParams::default())
            .expect("Should fit");
        model.weights.pop();
        assert!(model.validate().is_err());
    }
}
