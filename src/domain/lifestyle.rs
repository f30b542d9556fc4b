//! Lifestyle risk weights.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Diet, LifestyleChoices};

/// Lifestyle factors that carry a numeric weight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifestyleFactor {
    Smoking,
    Exercise,
}

impl fmt::Display for LifestyleFactor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Smoking => write!(f, "smoking"),
            Self::Exercise => write!(f, "exercise"),
        }
    }
}

/// Weight of each answer. Exercise is inverse: exercising lowers the weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LifestyleWeights {
    pub smoker: f64,
    pub non_smoker: f64,
    pub exercises: f64,
    pub sedentary: f64,
}

impl Default for LifestyleWeights {
    fn default() -> Self {
        Self {
            smoker: 0.9,
            non_smoker: 0.1,
            exercises: 0.2,
            sedentary: 0.8,
        }
    }
}

/// Factor -> risk weight in [0, 1], plus the diet answer for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifestyleProfile {
    pub factors: BTreeMap<LifestyleFactor, f64>,

    /// Recorded but not scored.
    pub diet: Diet,
}

impl LifestyleProfile {
    #[must_use]
    pub fn get(&self, factor: LifestyleFactor) -> Option<f64> {
        self.factors.get(&factor).copied()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.factors.values().copied()
    }
}

/// Score lifestyle answers with the default weights.
#[must_use]
pub fn score(choices: &LifestyleChoices) -> LifestyleProfile {
    score_with(choices, &LifestyleWeights::default())
}

/// Score lifestyle answers with explicit weights.
#[must_use]
pub fn score_with(choices: &LifestyleChoices, weights: &LifestyleWeights) -> LifestyleProfile {
    let smoking = if choices.smoking {
        weights.smoker
    } else {
        weights.non_smoker
    };
    let exercise = if choices.exercise {
        weights.exercises
    } else {
        weights.sedentary
    };

    LifestyleProfile {
        factors: BTreeMap::from([
            (LifestyleFactor::Smoking, smoking),
            (LifestyleFactor::Exercise, exercise),
        ]),
        diet: choices.diet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smoker_without_exercise() {
        let profile = score(&LifestyleChoices {
            smoking: true,
            exercise: false,
            diet: Diet::Unhealthy,
        });

        assert_eq!(profile.get(LifestyleFactor::Smoking), Some(0.9));
        assert_eq!(profile.get(LifestyleFactor::Exercise), Some(0.8));
        assert_eq!(profile.factors.len(), 2);
    }

    #[test]
    fn test_exercise_lowers_risk() {
        let profile = score(&LifestyleChoices {
            smoking: false,
            exercise: true,
            diet: Diet::Healthy,
        });

        assert_eq!(profile.get(LifestyleFactor::Smoking), Some(0.1));
        assert_eq!(profile.get(LifestyleFactor::Exercise), Some(0.2));
    }

    #[test]
    fn test_diet_does_not_change_scores() {
        let healthy = score(&LifestyleChoices {
            diet: Diet::Healthy,
            ..Default::default()
        });
        let unhealthy = score(&LifestyleChoices {
            diet: Diet::Unhealthy,
            ..Default::default()
        });

        assert_eq!(healthy.factors, unhealthy.factors);
        assert_ne!(healthy.diet, unhealthy.diet);
    }
}
