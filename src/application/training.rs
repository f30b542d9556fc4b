//! Training pipeline: tabular records -> schema, labels and fitted bundles.
//!
//! Rows are expanded with the same `FeatureSchema::encode` used at inference,
//! so training and serving can never disagree on column order or gender
//! encoding.

use std::collections::{BTreeMap, BTreeSet};

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde::{Deserialize, Serialize};

use crate::adapters::softmax::{SoftmaxClassifier, SoftmaxParams};
use crate::domain::{argmax, FeatureSchema, FeatureVector, Gender, PredictionTarget};
use crate::ports::{Classifier, ClassifierBundle};
use crate::{PulsaiError, Result};

/// Marker for "no chronic conditions" in source datasets.
const NONE_MARKERS: [&str; 2] = ["yok", "none"];

/// One labelled intake from the training dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub symptoms: Vec<String>,
    pub age: u32,
    pub gender: Gender,
    pub diagnosis: String,
    pub severity: String,
    pub department: String,
    #[serde(default)]
    pub chronic_conditions: Vec<String>,
}

impl TrainingRecord {
    fn label(&self, target: PredictionTarget) -> &str {
        match target {
            PredictionTarget::Diagnosis => &self.diagnosis,
            PredictionTarget::Severity => &self.severity,
            PredictionTarget::Department => &self.department,
        }
    }

    fn symptom_set(&self) -> BTreeSet<String> {
        clean_names(&self.symptoms)
    }

    fn chronic_set(&self) -> BTreeSet<String> {
        clean_names(&self.chronic_conditions)
    }
}

fn clean_names(names: &[String]) -> BTreeSet<String> {
    names
        .iter()
        .map(|n| n.trim())
        .filter(|n| !n.is_empty() && !NONE_MARKERS.contains(&n.to_lowercase().as_str()))
        .map(str::to_string)
        .collect()
}

/// Hyper-parameters of a training run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Share of records held out for evaluation
    pub test_fraction: f64,
    /// Seed of the train/test shuffle
    pub seed: u64,
    pub softmax: SoftmaxParams,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_fraction: 0.2,
            seed: 42,
            softmax: SoftmaxParams::default(),
        }
    }
}

/// Encoded dataset: one feature row and one label index per target per record.
#[derive(Debug, Clone)]
pub struct TrainingSet {
    pub schema: FeatureSchema,
    pub rows: Vec<FeatureVector>,
    /// Sorted unique labels per target
    pub labels: BTreeMap<PredictionTarget, Vec<String>>,
    /// Label index per record per target
    pub targets: BTreeMap<PredictionTarget, Vec<usize>>,
}

impl TrainingSet {
    /// Derive the schema and label orderings from the records and encode them.
    ///
    /// Symptom, chronic-condition and label orderings are sorted unique values,
    /// so the same dataset always yields the same layout.
    ///
    /// # Errors
    /// Returns error if there are no records or the schema is empty.
    pub fn from_records(records: &[TrainingRecord]) -> Result<Self> {
        if records.is_empty() {
            return Err(PulsaiError::Validation("Training dataset is empty".into()));
        }

        let symptoms: BTreeSet<String> = records.iter().flat_map(|r| r.symptom_set()).collect();
        let chronic: BTreeSet<String> = records.iter().flat_map(|r| r.chronic_set()).collect();
        let schema = FeatureSchema::new(symptoms, chronic)?;

        let rows = records
            .iter()
            .map(|r| schema.encode(&r.symptom_set(), r.age, r.gender, &r.chronic_set()))
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let mut labels = BTreeMap::new();
        let mut targets = BTreeMap::new();
        for target in PredictionTarget::ALL {
            let ordered: Vec<String> = records
                .iter()
                .map(|r| r.label(target).to_string())
                .collect::<BTreeSet<_>>()
                .into_iter()
                .collect();
            let index: BTreeMap<&str, usize> = ordered
                .iter()
                .enumerate()
                .map(|(i, l)| (l.as_str(), i))
                .collect();
            let encoded = records
                .iter()
                .map(|r| index[r.label(target)])
                .collect::<Vec<_>>();
            targets.insert(target, encoded);
            labels.insert(target, ordered);
        }

        tracing::info!(
            "Encoded {} records: {} symptoms, {} chronic conditions, width {}",
            records.len(),
            schema.symptom_order.len(),
            schema.chronic_order.len(),
            schema.width()
        );

        Ok(Self {
            schema,
            rows,
            labels,
            targets,
        })
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Seeded shuffle split into (train, test) record indices.
    #[must_use]
    pub fn split(&self, test_fraction: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
        let n = self.len();
        let mut indices: Vec<usize> = (0..n).collect();
        let mut rng = ChaCha20Rng::seed_from_u64(seed);
        indices.shuffle(&mut rng);

        let fraction = test_fraction.clamp(0.0, 1.0);
        let n_test = ((n as f64 * fraction).ceil() as usize).min(n.saturating_sub(1));
        let test = indices.split_off(n - n_test);
        (indices, test)
    }
}

/// Held-out accuracy per target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub n_train: usize,
    pub n_test: usize,
    pub feature_width: usize,
    /// `None` when there was no held-out data
    pub accuracy: BTreeMap<PredictionTarget, Option<f64>>,
}

/// Output of a training run, ready for the model store.
#[derive(Debug, Clone)]
pub struct TrainedModels {
    pub schema: FeatureSchema,
    pub bundles: Vec<ClassifierBundle<SoftmaxClassifier>>,
    pub report: TrainingReport,
}

/// Fit one classifier per target on a seeded train split.
///
/// # Errors
/// Returns error if the dataset is empty or a classifier cannot be fit.
pub fn train(records: &[TrainingRecord], config: &TrainingConfig) -> Result<TrainedModels> {
    let set = TrainingSet::from_records(records)?;
    let (train_idx, test_idx) = set.split(config.test_fraction, config.seed);

    let train_rows: Vec<&[f64]> = train_idx.iter().map(|&i| set.rows[i].as_slice()).collect();

    let mut bundles = Vec::with_capacity(PredictionTarget::ALL.len());
    let mut accuracy = BTreeMap::new();

    for target in PredictionTarget::ALL {
        let labels = set.labels[&target].clone();
        let all_targets = &set.targets[&target];
        let y: Vec<usize> = train_idx.iter().map(|&i| all_targets[i]).collect();

        let model = SoftmaxClassifier::fit(&train_rows, &y, labels.len(), &config.softmax)?;

        let acc = if test_idx.is_empty() {
            None
        } else {
            let correct = test_idx
                .iter()
                .filter(|&&i| {
                    argmax(&model.predict_proba(set.rows[i].as_slice())) == Some(all_targets[i])
                })
                .count();
            Some(correct as f64 / test_idx.len() as f64)
        };
        match acc {
            Some(a) => tracing::info!("{target} model: held-out accuracy {:.1}%", a * 100.0),
            None => tracing::info!("{target} model: no held-out data"),
        }
        accuracy.insert(target, acc);

        bundles.push(ClassifierBundle::new(target, model, labels)?);
    }

    Ok(TrainedModels {
        schema: set.schema.clone(),
        bundles,
        report: TrainingReport {
            n_train: train_idx.len(),
            n_test: test_idx.len(),
            feature_width: set.schema.width(),
            accuracy,
        },
    })
}

#[cfg(test)]
pub(crate) mod sample {
    use super::*;

    fn record(
        symptoms: &str,
        age: u32,
        gender: Gender,
        diagnosis: &str,
        severity: &str,
        department: &str,
        chronic: &str,
    ) -> TrainingRecord {
        let split = |s: &str| s.split(',').map(str::to_string).collect::<Vec<_>>();
        TrainingRecord {
            symptoms: split(symptoms),
            age,
            gender,
            diagnosis: diagnosis.to_string(),
            severity: severity.to_string(),
            department: department.to_string(),
            chronic_conditions: split(chronic),
        }
    }

    /// Small English-labelled dataset with three clear clusters.
    pub fn records() -> Vec<TrainingRecord> {
        use Gender::{Female as F, Male as M};
        vec![
            record("fever,cough,sore throat", 45, M, "Flu", "low", "Internal Medicine", "none"),
            record("fever,cough,fatigue", 33, F, "Flu", "low", "Internal Medicine", "none"),
            record("fever,muscle pain,cough", 25, M, "Flu", "low", "Internal Medicine", "asthma"),
            record("sore throat,cough,fever", 31, F, "Flu", "low", "Internal Medicine", "none"),
            record("fever,fatigue,sore throat", 37, M, "Flu", "low", "Internal Medicine", "none"),
            record("headache,nausea,vomiting", 28, F, "Migraine", "medium", "Neurology", "none"),
            record("headache,blurred vision", 47, F, "Migraine", "medium", "Neurology", "migraine"),
            record("headache,nausea,dizziness", 42, F, "Migraine", "medium", "Neurology", "none"),
            record("headache,vomiting", 39, M, "Migraine", "medium", "Neurology", "none"),
            record("chest pain,shortness of breath,palpitations", 62, M, "Heart attack", "high", "Cardiology", "diabetes,hypertension"),
            record("chest pain,sweating,shortness of breath", 68, F, "Heart attack", "high", "Cardiology", "hypertension"),
            record("chest pain,palpitations,sweating", 58, M, "Heart attack", "high", "Cardiology", "heart disease"),
            record("chest pain,shortness of breath,sweating", 66, M, "Heart attack", "high", "Cardiology", "diabetes"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::sample::records;
    use super::*;

    #[test]
    fn test_schema_and_labels_are_sorted() {
        let set = TrainingSet::from_records(&records()).expect("Should encode");

        let mut sorted = set.schema.symptom_order.clone();
        sorted.sort();
        assert_eq!(set.schema.symptom_order, sorted);
        assert!(!set.schema.chronic_order.contains(&"none".to_string()));
        assert_eq!(
            set.labels[&PredictionTarget::Severity],
            vec!["high".to_string(), "low".to_string(), "medium".to_string()]
        );
        assert!(set.rows.iter().all(|r| r.len() == set.schema.width()));
    }

    #[test]
    fn test_gender_encoding_matches_inference() {
        let set = TrainingSet::from_records(&records()).expect("Should encode");
        let gender_col = set.schema.symptom_order.len() + 1;

        // first record is male, second female
        assert_eq!(set.rows[0].as_slice()[gender_col], 1.0);
        assert_eq!(set.rows[1].as_slice()[gender_col], 0.0);
    }

    #[test]
    fn test_split_is_seeded() {
        let set = TrainingSet::from_records(&records()).expect("Should encode");
        let (train_a, test_a) = set.split(0.2, 42);
        let (train_b, test_b) = set.split(0.2, 42);

        assert_eq!((train_a.clone(), test_a.clone()), (train_b, test_b));
        assert_eq!(test_a.len(), 3);
        assert_eq!(train_a.len() + test_a.len(), set.len());
    }

    #[test]
    fn test_train_produces_all_bundles() {
        let trained = train(&records(), &TrainingConfig::default()).expect("Should train");

        assert_eq!(trained.bundles.len(), 3);
        assert_eq!(trained.report.n_train + trained.report.n_test, records().len());
        for bundle in &trained.bundles {
            assert_eq!(bundle.n_features(), trained.schema.width());
        }
    }

    #[test]
    fn test_saved_models_reproduce_predictions() {
        use crate::adapters::model_store::ModelStore;
        use crate::application::EnsembleBuilder;
        use std::collections::BTreeSet;

        let trained = train(&records(), &TrainingConfig::default()).expect("Should train");
        let dir = tempfile::tempdir().expect("Should create temp dir");
        let store = ModelStore::new(dir.path()).require_manifest(true);
        store
            .save(&trained.schema, &trained.bundles)
            .expect("Should save");

        let loaded = store.load().expect("Should load");
        assert_eq!(loaded.schema, trained.schema);

        let build = |bundles: Vec<ClassifierBundle<SoftmaxClassifier>>| {
            bundles
                .into_iter()
                .fold(EnsembleBuilder::new(), EnsembleBuilder::with_bundle)
                .build()
                .expect("Should build ensemble")
        };
        let before = build(trained.bundles.clone());
        let after = build(loaded.bundles);

        let symptoms: BTreeSet<String> = ["chest pain", "sweating"].map(String::from).into();
        let vector = loaded
            .schema
            .encode(&symptoms, 61, Gender::Male, &BTreeSet::new())
            .expect("Should encode");

        assert_eq!(
            before.predict_all(&vector).expect("Should predict"),
            after.predict_all(&vector).expect("Should predict")
        );
    }

    #[test]
    fn test_trained_models_separate_clusters() {
        use std::collections::BTreeSet;

        let trained = train(
            &records(),
            &TrainingConfig {
                test_fraction: 0.0,
                ..TrainingConfig::default()
            },
        )
        .expect("Should train");
        assert_eq!(trained.report.n_test, 0);
        assert_eq!(trained.report.accuracy[&PredictionTarget::Diagnosis], None);

        let symptoms: BTreeSet<String> = ["headache", "nausea"].map(String::from).into();
        let vector = trained
            .schema
            .encode(&symptoms, 35, Gender::Female, &BTreeSet::new())
            .expect("Should encode");
        let diagnosis = &trained.bundles[0];
        assert_eq!(diagnosis.target, PredictionTarget::Diagnosis);
        let prediction = diagnosis.predict(vector.as_slice()).expect("Should predict");
        assert_eq!(prediction.label, "Migraine");
    }

    #[test]
    fn test_empty_dataset_is_rejected() {
        assert!(matches!(
            train(&[], &TrainingConfig::default()),
            Err(PulsaiError::Validation(_))
        ));
    }
}
