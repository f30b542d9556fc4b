//! Intake form types: what the patient reports at the start of a triage.
//!
//! Free-text fields are kept as-is; only the encoder and the scorers decide
//! which values are meaningful.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::FusionInputError;

/// Biological sex as recorded on the intake form.
///
/// Deserialization goes through `FromStr`, so JSON and CLI accept the same
/// spellings in any case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", try_from = "String")]
pub enum Gender {
    Male,
    Female,
}

impl TryFrom<String> for Gender {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl Gender {
    /// Binary encoding used in the feature vector (male = 1, female = 0).
    #[must_use]
    pub fn as_feature(self) -> f64 {
        match self {
            Self::Male => 1.0,
            Self::Female => 0.0,
        }
    }
}

impl FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "male" | "m" | "erkek" | "e" => Ok(Self::Male),
            "female" | "f" | "kadın" | "kadin" | "k" => Ok(Self::Female),
            other => Err(format!("Unknown gender '{other}' (expected male or female)")),
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Male => write!(f, "male"),
            Self::Female => write!(f, "female"),
        }
    }
}

/// Self-reported eating habits.
///
/// Informational only: diet does not enter any numeric risk score.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Diet {
    #[serde(alias = "sağlıklı", alias = "saglikli")]
    Healthy,
    #[default]
    #[serde(alias = "orta")]
    Moderate,
    #[serde(alias = "sağlıksız", alias = "sagliksiz")]
    Unhealthy,
}

/// Lifestyle answers from the intake form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LifestyleChoices {
    #[serde(default)]
    pub smoking: bool,
    #[serde(default)]
    pub exercise: bool,
    #[serde(default)]
    pub diet: Diet,
}

/// One relative with a history of a disease, as submitted.
///
/// `degree` stays a raw integer here; the genetic scorer validates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelativeEntry {
    pub degree: i32,
}

impl RelativeEntry {
    #[must_use]
    pub fn first_degree() -> Self {
        Self { degree: 1 }
    }

    #[must_use]
    pub fn second_degree() -> Self {
        Self { degree: 2 }
    }
}

/// Family history keyed by disease name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FamilyHistory(pub BTreeMap<String, Vec<RelativeEntry>>);

impl FamilyHistory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add relatives from the per-degree counters used by intake forms.
    ///
    /// A negative counter makes the whole disease entry malformed: it is
    /// logged and left out, the rest of the history is kept.
    #[must_use]
    pub fn with_counts(mut self, disease: impl Into<String>, first: i64, second: i64) -> Self {
        let disease = disease.into();
        if first < 0 || second < 0 {
            let err = FusionInputError::NegativeRelativeCount {
                disease,
                first,
                second,
            };
            tracing::warn!("Skipping family history entry: {err}");
            return self;
        }
        let entries = self.0.entry(disease).or_default();
        entries.extend((0..first).map(|_| RelativeEntry::first_degree()));
        entries.extend((0..second).map(|_| RelativeEntry::second_degree()));
        self
    }

    /// Add a single relative entry for a disease.
    #[must_use]
    pub fn with_relative(mut self, disease: impl Into<String>, entry: RelativeEntry) -> Self {
        self.0.entry(disease.into()).or_default().push(entry);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<RelativeEntry>)> {
        self.0.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Pharmacogenetic phenotype for a gene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetabolizerStatus {
    PoorMetabolizer,
    NormalMetabolizer,
    RapidMetabolizer,
}

/// Everything the patient submits for one triage request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeForm {
    /// Symptoms picked from the known list
    #[serde(default)]
    pub symptoms: BTreeSet<String>,

    /// Complaints typed by the patient that are not in the list
    #[serde(default)]
    pub additional_symptoms: String,

    pub age: u32,

    pub gender: Gender,

    #[serde(default)]
    pub chronic_conditions: BTreeSet<String>,

    #[serde(default)]
    pub family_history: FamilyHistory,

    #[serde(default)]
    pub lifestyle: LifestyleChoices,

    /// Current medications (generic names, lowercase)
    #[serde(default)]
    pub medications: Vec<String>,

    /// Known gene -> metabolizer phenotype results
    #[serde(default)]
    pub genetic_profile: BTreeMap<String, MetabolizerStatus>,
}

impl IntakeForm {
    /// Create a minimal intake with demographics only.
    #[must_use]
    pub fn new(age: u32, gender: Gender) -> Self {
        Self {
            symptoms: BTreeSet::new(),
            additional_symptoms: String::new(),
            age,
            gender,
            chronic_conditions: BTreeSet::new(),
            family_history: FamilyHistory::default(),
            lifestyle: LifestyleChoices::default(),
            medications: Vec::new(),
            genetic_profile: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn with_symptoms<I, S>(mut self, symptoms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symptoms.extend(symptoms.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_chronic_conditions<I, S>(mut self, conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.chronic_conditions
            .extend(conditions.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn with_family_history(mut self, history: FamilyHistory) -> Self {
        self.family_history = history;
        self
    }

    #[must_use]
    pub fn with_lifestyle(mut self, lifestyle: LifestyleChoices) -> Self {
        self.lifestyle = lifestyle;
        self
    }

    /// An intake must name at least one symptom, listed or free-text.
    ///
    /// # Errors
    /// Returns a plain-language message if nothing was reported.
    pub fn validate(&self) -> Result<(), String> {
        if self.symptoms.is_empty() && self.additional_symptoms.trim().is_empty() {
            return Err("Select at least one symptom or describe your complaint".to_string());
        }
        if self.age > 120 {
            return Err(format!("Age {} out of range [0, 120]", self.age));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gender_encoding() {
        assert!((Gender::Male.as_feature() - 1.0).abs() < f64::EPSILON);
        assert!(Gender::Female.as_feature().abs() < f64::EPSILON);
        assert_eq!("Erkek".parse::<Gender>().expect("Should parse"), Gender::Male);
        assert_eq!("K".parse::<Gender>().expect("Should parse"), Gender::Female);
        assert!("other".parse::<Gender>().is_err());
    }

    #[test]
    fn test_family_history_from_counts() {
        let history = FamilyHistory::new()
            .with_counts("diyabet", 2, 1)
            .with_counts("kanser", 0, 0);

        assert_eq!(history.0["diyabet"].len(), 3);
        assert_eq!(history.0["diyabet"][2].degree, 2);
        assert!(history.0["kanser"].is_empty());
    }

    #[test]
    fn test_negative_counts_are_skipped() {
        let history = FamilyHistory::new()
            .with_counts("diyabet", -1, 2)
            .with_counts("kanser", 1, 0);

        assert!(!history.0.contains_key("diyabet"));
        assert_eq!(history.0["kanser"].len(), 1);
    }

    #[test]
    fn test_intake_deserializes_with_defaults() {
        let intake: IntakeForm = serde_json::from_str(
            r#"{"symptoms": ["fever", "cough"], "age": 45, "gender": "erkek"}"#,
        )
        .expect("Should parse");

        assert_eq!(intake.gender, Gender::Male);
        assert_eq!(intake.symptoms.len(), 2);
        assert!(intake.family_history.is_empty());
        assert_eq!(intake.lifestyle.diet, Diet::Moderate);
    }

    #[test]
    fn test_intake_gender_accepts_form_spellings() {
        for (raw, expected) in [
            ("Erkek", Gender::Male),
            ("Kadın", Gender::Female),
            ("MALE", Gender::Male),
            ("k", Gender::Female),
        ] {
            let json = format!(r#"{{"symptoms": ["ateş"], "age": 45, "gender": "{raw}"}}"#);
            let intake: IntakeForm = serde_json::from_str(&json).expect("Should parse");
            assert_eq!(intake.gender, expected, "{raw}");
            assert_eq!(raw.parse::<Gender>(), Ok(expected));
        }

        let json = r#"{"symptoms": ["ateş"], "age": 45, "gender": "other"}"#;
        assert!(serde_json::from_str::<IntakeForm>(json).is_err());
        assert_eq!(
            serde_json::to_string(&Gender::Female).expect("Should serialize"),
            "\"female\""
        );
    }

    #[test]
    fn test_intake_validation() {
        let empty = IntakeForm::new(30, Gender::Female);
        assert!(empty.validate().is_err());

        let mut typed = IntakeForm::new(30, Gender::Female);
        typed.additional_symptoms = "back pain since monday".into();
        assert!(typed.validate().is_ok());

        let listed = IntakeForm::new(30, Gender::Female).with_symptoms(["fever"]);
        assert!(listed.validate().is_ok());
    }
}
