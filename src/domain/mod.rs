//! Domain layer: Core triage types and logic.
//!
//! Pure Rust types with no I/O. Everything here is deterministic given its
//! inputs; timestamps are supplied by the caller where they matter.

mod analysis;
mod features;
mod fusion;
mod genetic;
mod guidance;
mod intake;
pub mod lifestyle;
mod patient;
mod target;

pub use analysis::{
    AnalysisResult, PersonalizedRecommendation, RiskBand, SeverityTier, VisitRecord, WarningLevel,
};
pub use features::{encode, EncodingError, FeatureSchema, FeatureVector, DEMOGRAPHIC_FIELDS};
pub use fusion::{dynamic_risk_score, FusionEngine, FusionInputs, RiskThresholds};
pub use genetic::{
    Degree, DegreeWeights, DrugGeneWarning, FusionInputError, GeneticProfile, GeneticRiskScorer,
};
pub use guidance::{emotional_support, phrases, EmotionalSupport, GuidanceRegistry, Language, Localized};
pub use intake::{
    Diet, FamilyHistory, Gender, IntakeForm, LifestyleChoices, MetabolizerStatus, RelativeEntry,
};
pub use lifestyle::{LifestyleFactor, LifestyleProfile, LifestyleWeights};
pub use patient::{patient_id, PatientRecord};
pub use target::{
    argmax, ClassPrediction, DepartmentPrediction, EnsemblePrediction, PredictionTarget,
};

#[cfg(test)]
pub(crate) use analysis::fixtures;
