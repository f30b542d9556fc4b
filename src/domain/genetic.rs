//! Family-history risk scoring and drug-gene interaction checks.
//!
//! The per-disease score is a weighted-average proximity score:
//! `(first_degree * 0.5 + second_degree * 0.25) / relatives`. It ranks how
//! close affected relatives are; it is NOT a calibrated probability and must
//! not be presented as one.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::{FamilyHistory, MetabolizerStatus, RelativeEntry};

/// Malformed genetic or lifestyle input.
///
/// Never fatal: the offending entry is logged and treated as absent.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FusionInputError {
    #[error("Invalid relationship degree {degree} for '{disease}' (expected 1 or 2)")]
    InvalidDegree { disease: String, degree: i32 },

    #[error("Negative relative count for '{disease}' (first={first}, second={second})")]
    NegativeRelativeCount {
        disease: String,
        first: i64,
        second: i64,
    },

    #[error("Risk value {value} for '{factor}' is outside [0, 1]")]
    OutOfRange { factor: String, value: f64 },
}

/// Relationship degree of an affected relative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Degree {
    /// Parent, sibling or child
    First,
    /// Grandparent, aunt or uncle
    Second,
}

impl Degree {
    #[must_use]
    pub fn weight(self, weights: &DegreeWeights) -> f64 {
        match self {
            Self::First => weights.first,
            Self::Second => weights.second,
        }
    }

    fn from_entry(disease: &str, entry: RelativeEntry) -> Result<Self, FusionInputError> {
        match entry.degree {
            1 => Ok(Self::First),
            2 => Ok(Self::Second),
            degree => Err(FusionInputError::InvalidDegree {
                disease: disease.to_string(),
                degree,
            }),
        }
    }
}

/// Contribution of one relative, by degree.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DegreeWeights {
    pub first: f64,
    pub second: f64,
}

impl Default for DegreeWeights {
    fn default() -> Self {
        Self {
            first: 0.5,
            second: 0.25,
        }
    }
}

/// Disease -> proximity risk score in [0, 1].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GeneticProfile(pub BTreeMap<String, f64>);

impl GeneticProfile {
    #[must_use]
    pub fn get(&self, disease: &str) -> Option<f64> {
        self.0.get(disease).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &f64)> {
        self.0.iter()
    }

    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.0.values().copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Pharmacogenetic warning for one drug and gene.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrugGeneWarning {
    pub drug: String,
    pub gene: String,
    pub status: MetabolizerStatus,
}

impl DrugGeneWarning {
    #[must_use]
    pub fn message(&self) -> String {
        let kind = match self.status {
            MetabolizerStatus::PoorMetabolizer => "poor",
            MetabolizerStatus::RapidMetabolizer => "rapid",
            MetabolizerStatus::NormalMetabolizer => "normal",
        };
        format!(
            "Genetic risk for {}: {} gene is a {kind} metabolizer.",
            self.drug, self.gene
        )
    }
}

/// Scores family history against a fixed registry of heritable disease groups.
#[derive(Debug, Clone)]
pub struct GeneticRiskScorer {
    registered_diseases: BTreeSet<String>,
    drug_interactions: BTreeMap<String, Vec<String>>,
    weights: DegreeWeights,
}

impl Default for GeneticRiskScorer {
    fn default() -> Self {
        let drug_interactions = [
            ("warfarin", &["CYP2C9", "VKORC1"][..]),
            ("clopidogrel", &["CYP2C19"][..]),
            ("simvastatin", &["SLCO1B1"][..]),
            ("codeine", &["CYP2D6"][..]),
        ];

        Self {
            registered_diseases: ["diyabet", "kalp_hastaliklari", "kanser", "norolojik"]
                .into_iter()
                .map(str::to_string)
                .collect(),
            drug_interactions: to_owned_map(&drug_interactions),
            weights: DegreeWeights::default(),
        }
    }
}

fn to_owned_map(entries: &[(&str, &[&str])]) -> BTreeMap<String, Vec<String>> {
    entries
        .iter()
        .map(|(k, vs)| ((*k).to_string(), vs.iter().map(|v| (*v).to_string()).collect()))
        .collect()
}

impl GeneticRiskScorer {
    #[must_use]
    pub fn with_weights(mut self, weights: DegreeWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Compute a proximity score per registered disease.
    ///
    /// Unregistered diseases, malformed entries and diseases with no valid
    /// relatives are left out of the profile.
    #[must_use]
    pub fn score(&self, family_history: &FamilyHistory) -> GeneticProfile {
        let mut profile = BTreeMap::new();

        for (disease, relatives) in family_history.iter() {
            if !self.registered_diseases.contains(disease) {
                tracing::debug!("Ignoring family history for unregistered disease '{disease}'");
                continue;
            }

            let degrees: Vec<Degree> = relatives
                .iter()
                .filter_map(|&entry| match Degree::from_entry(disease, entry) {
                    Ok(degree) => Some(degree),
                    Err(e) => {
                        tracing::warn!("Skipping relative entry: {e}");
                        None
                    }
                })
                .collect();

            if degrees.is_empty() {
                continue;
            }

            let weighted: f64 = degrees.iter().map(|d| d.weight(&self.weights)).sum();
            let risk = weighted / degrees.len() as f64;
            profile.insert(disease.clone(), risk);
        }

        GeneticProfile(profile)
    }

    /// Warn about drugs whose metabolizing genes are poor or rapid in the profile.
    #[must_use]
    pub fn check_drug_interactions(
        &self,
        genetic_profile: &BTreeMap<String, MetabolizerStatus>,
        medications: &[String],
    ) -> Vec<DrugGeneWarning> {
        let mut warnings = Vec::new();
        for drug in medications {
            let Some(genes) = self.drug_interactions.get(&drug.to_lowercase()) else {
                continue;
            };
            for gene in genes {
                let Some(&status) = genetic_profile.get(gene) else {
                    continue;
                };
                if matches!(
                    status,
                    MetabolizerStatus::PoorMetabolizer | MetabolizerStatus::RapidMetabolizer
                ) {
                    warnings.push(DrugGeneWarning {
                        drug: drug.clone(),
                        gene: gene.clone(),
                        status,
                    });
                }
            }
        }
        warnings
    }
}
