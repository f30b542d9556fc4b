//! Prediction targets and per-target classifier outputs.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The three things the ensemble predicts from one feature vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionTarget {
    Diagnosis,
    Severity,
    Department,
}

impl PredictionTarget {
    /// All targets, in artifact order.
    pub const ALL: [Self; 3] = [Self::Diagnosis, Self::Severity, Self::Department];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Diagnosis => "diagnosis",
            Self::Severity => "severity",
            Self::Department => "department",
        }
    }

    /// File name of this target's persisted bundle.
    #[must_use]
    pub fn artifact_name(self) -> String {
        format!("{}_model.json", self.as_str())
    }
}

impl fmt::Display for PredictionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredictionTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "diagnosis" => Ok(Self::Diagnosis),
            "severity" => Ok(Self::Severity),
            "department" => Ok(Self::Department),
            other => Err(format!("Unknown prediction target: {other}")),
        }
    }
}

/// Index of the highest probability; ties go to the lowest index.
///
/// Returns `None` for an empty slice.
#[must_use]
pub fn argmax(probabilities: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        match best {
            Some((_, best_p)) if p.is_nan() || p <= best_p => {}
            _ => best = Some((i, p)),
        }
    }
    best.map(|(i, _)| i)
}

/// Top-1 label with the full probability vector it was chosen from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassPrediction {
    /// Selected label
    pub label: String,

    /// Column index of the label in the bundle's label list
    pub class_index: usize,

    /// Probability per class, aligned with the bundle's label list
    pub probabilities: Vec<f64>,
}

impl ClassPrediction {
    /// Probability of the selected label.
    #[must_use]
    pub fn confidence(&self) -> f64 {
        self.probabilities
            .get(self.class_index)
            .copied()
            .unwrap_or(0.0)
    }
}

/// Department routing: a plain top-1 choice, no confidence surfaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentPrediction {
    pub label: String,
    pub class_index: usize,
}

/// Outputs of all three classifiers for one vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsemblePrediction {
    pub diagnosis: ClassPrediction,
    pub severity: ClassPrediction,
    pub department: DepartmentPrediction,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_tie_breaks_to_lowest_index() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some(1));
        assert_eq!(argmax(&[0.5, 0.5]), Some(0));
        assert_eq!(argmax(&[0.1, 0.3, 0.6]), Some(2));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_target_names() {
        for target in PredictionTarget::ALL {
            let parsed: PredictionTarget = target.as_str().parse().expect("Should parse");
            assert_eq!(parsed, target);
        }
        assert_eq!(PredictionTarget::Severity.artifact_name(), "severity_model.json");
        assert!("triage".parse::<PredictionTarget>().is_err());
    }

    #[test]
    fn test_confidence_reads_selected_column() {
        let p = ClassPrediction {
            label: "Grip".into(),
            class_index: 1,
            probabilities: vec![0.25, 0.75],
        };
        assert!((p.confidence() - 0.75).abs() < f64::EPSILON);
    }
}
