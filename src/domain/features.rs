//! Feature schema and encoder.
//!
//! The layout of a vector is
//! `[symptom one-hot..., age, gender, chronic one-hot...]`, in schema order.
//! The same schema is persisted next to the trained classifiers so a reloaded
//! model stays index-compatible with newly encoded vectors.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use super::Gender;

/// Number of demographic columns between the symptom and chronic blocks.
pub const DEMOGRAPHIC_FIELDS: usize = 2;

/// Errors raised while building or applying a feature schema.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodingError {
    #[error("Feature schema is empty: no symptoms or chronic conditions registered")]
    EmptySchema,

    #[error("Duplicate feature name in schema: {0}")]
    DuplicateFeature(String),
}

/// Column ordering shared by training and inference.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureSchema {
    /// Symptom names in column order
    pub symptom_order: Vec<String>,

    /// Chronic-condition names in column order
    pub chronic_order: Vec<String>,
}

impl FeatureSchema {
    /// Build a schema from explicit column orders.
    ///
    /// # Errors
    /// Returns `EncodingError::DuplicateFeature` if a name repeats within a block.
    pub fn new<S, C>(symptoms: S, chronic: C) -> Result<Self, EncodingError>
    where
        S: IntoIterator,
        S::Item: Into<String>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        let symptom_order: Vec<String> = symptoms.into_iter().map(Into::into).collect();
        let chronic_order: Vec<String> = chronic.into_iter().map(Into::into).collect();

        for block in [&symptom_order, &chronic_order] {
            let mut seen = HashSet::with_capacity(block.len());
            for name in block {
                if !seen.insert(name.as_str()) {
                    return Err(EncodingError::DuplicateFeature(name.clone()));
                }
            }
        }

        Ok(Self {
            symptom_order,
            chronic_order,
        })
    }

    /// True when no symptom and no chronic column exist.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.symptom_order.is_empty() && self.chronic_order.is_empty()
    }

    /// Total vector width: symptoms + age + gender + chronic conditions.
    #[must_use]
    pub fn width(&self) -> usize {
        self.symptom_order.len() + DEMOGRAPHIC_FIELDS + self.chronic_order.len()
    }

    /// Column names, in vector order.
    #[must_use]
    pub fn feature_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        names.extend(self.symptom_order.iter().map(|s| format!("symptom_{s}")));
        names.push("age".to_string());
        names.push("gender_encoded".to_string());
        names.extend(self.chronic_order.iter().map(|c| format!("chronic_{c}")));
        names
    }

    /// Encode one patient's intake values.
    ///
    /// Names absent from the schema are ignored. Age is appended unscaled.
    ///
    /// # Errors
    /// Returns `EncodingError::EmptySchema` if the schema has no columns to fill.
    pub fn encode(
        &self,
        selected_symptoms: &BTreeSet<String>,
        age: u32,
        gender: Gender,
        chronic_conditions: &BTreeSet<String>,
    ) -> Result<FeatureVector, EncodingError> {
        if self.is_empty() {
            return Err(EncodingError::EmptySchema);
        }

        let mut values = Vec::with_capacity(self.width());
        values.extend(
            self.symptom_order
                .iter()
                .map(|s| one_hot(selected_symptoms.contains(s))),
        );
        values.push(f64::from(age));
        values.push(gender.as_feature());
        values.extend(
            self.chronic_order
                .iter()
                .map(|c| one_hot(chronic_conditions.contains(c))),
        );

        let ignored = selected_symptoms
            .iter()
            .filter(|s| !self.symptom_order.contains(s))
            .count()
            + chronic_conditions
                .iter()
                .filter(|c| !self.chronic_order.contains(c))
                .count();
        if ignored > 0 {
            tracing::debug!("Ignored {ignored} intake value(s) not present in the feature schema");
        }

        Ok(FeatureVector(values))
    }
}

fn one_hot(present: bool) -> f64 {
    if present {
        1.0
    } else {
        0.0
    }
}

/// Encode intake values against a schema (free-function form of [`FeatureSchema::encode`]).
///
/// # Errors
/// Returns `EncodingError::EmptySchema` if the schema is empty.
pub fn encode(
    selected_symptoms: &BTreeSet<String>,
    age: u32,
    gender: Gender,
    chronic_conditions: &BTreeSet<String>,
    schema: &FeatureSchema,
) -> Result<FeatureVector, EncodingError> {
    schema.encode(selected_symptoms, age, gender, chronic_conditions)
}

/// Fixed-order numeric encoding of one intake.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    /// Wrap raw values (training rows already laid out in schema order).
    #[must_use]
    pub fn from_values(values: Vec<f64>) -> Self {
        Self(values)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| (*s).to_string()).collect()
    }

    fn schema() -> FeatureSchema {
        FeatureSchema::new(
            ["cough", "fever", "headache"],
            ["asthma", "diabetes"],
        )
        .expect("Valid schema")
    }

    #[test]
    fn test_encode_layout() {
        let v = schema()
            .encode(&set(&["fever", "cough"]), 45, Gender::Male, &set(&[]))
            .expect("Should encode");

        assert_eq!(v.as_slice(), &[1.0, 1.0, 0.0, 45.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_width_is_constant() {
        let schema = schema();
        let a = schema
            .encode(&set(&[]), 20, Gender::Female, &set(&[]))
            .expect("Should encode");
        let b = schema
            .encode(
                &set(&["fever", "unknown thing", "headache"]),
                80,
                Gender::Male,
                &set(&["diabetes", "gout"]),
            )
            .expect("Should encode");

        assert_eq!(a.len(), 3 + 2 + 2);
        assert_eq!(b.len(), schema.width());
        assert_eq!(b.as_slice(), &[0.0, 1.0, 1.0, 80.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_empty_schema_fails() {
        let err = FeatureSchema::default()
            .encode(&set(&["fever"]), 30, Gender::Male, &set(&[]))
            .expect_err("Empty schema must fail");
        assert_eq!(err, EncodingError::EmptySchema);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = FeatureSchema::new(["fever", "fever"], Vec::<String>::new())
            .expect_err("Duplicates must fail");
        assert_eq!(err, EncodingError::DuplicateFeature("fever".into()));
    }

    #[test]
    fn test_feature_names_follow_vector_order() {
        let names = schema().feature_names();
        assert_eq!(names.len(), schema().width());
        assert_eq!(names[0], "symptom_cough");
        assert_eq!(names[3], "age");
        assert_eq!(names[4], "gender_encoded");
        assert_eq!(names[6], "chronic_diabetes");
    }
}
