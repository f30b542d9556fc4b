//! Triage service: runs one intake through encoding, the ensemble, risk
//! scoring and fusion, then records the visit.
//!
//! The service is generic over the classifier and the visit recorder so tests
//! can plug in fixed-output classifiers and an in-memory database.

use std::sync::Arc;

use crate::adapters::StorageError;
use crate::domain::{
    lifestyle, AnalysisResult, FeatureSchema, FeatureVector, FusionEngine, FusionInputs,
    GeneticRiskScorer, IntakeForm, Language, LifestyleWeights, PatientRecord, VisitRecord,
};
use crate::ports::{Classifier, VisitPage, VisitRecorder};
use crate::{PulsaiError, Result};

use super::ClassifierEnsemble;

/// One triage request for a registered patient.
#[derive(Debug, Clone)]
pub struct TriageRequest {
    pub patient_id: String,
    pub language: Language,
    pub intake: IntakeForm,
}

/// Service for running triage and keeping visit history.
pub struct TriageService<C, R>
where
    C: Classifier,
    R: VisitRecorder,
{
    ensemble: Arc<ClassifierEnsemble<C>>,
    schema: FeatureSchema,
    recorder: Arc<R>,
    fusion: FusionEngine,
    genetic: GeneticRiskScorer,
    lifestyle_weights: LifestyleWeights,
}

impl<C, R> TriageService<C, R>
where
    C: Classifier,
    R: VisitRecorder,
    R::Error: Into<StorageError>,
{
    /// Create a service with default scorers and thresholds.
    ///
    /// # Errors
    /// Returns `PulsaiError::SchemaMismatch` if the schema width differs from
    /// the width the ensemble was fit on.
    pub fn new(
        ensemble: Arc<ClassifierEnsemble<C>>,
        schema: FeatureSchema,
        recorder: Arc<R>,
    ) -> Result<Self> {
        if schema.width() != ensemble.n_features() {
            return Err(PulsaiError::SchemaMismatch {
                expected: ensemble.n_features(),
                actual: schema.width(),
            });
        }

        Ok(Self {
            ensemble,
            schema,
            recorder,
            fusion: FusionEngine::default(),
            genetic: GeneticRiskScorer::default(),
            lifestyle_weights: LifestyleWeights::default(),
        })
    }

    #[must_use]
    pub fn with_fusion(mut self, fusion: FusionEngine) -> Self {
        self.fusion = fusion;
        self
    }

    #[must_use]
    pub fn with_genetic_scorer(mut self, genetic: GeneticRiskScorer) -> Self {
        self.genetic = genetic;
        self
    }

    #[must_use]
    pub fn with_lifestyle_weights(mut self, weights: LifestyleWeights) -> Self {
        self.lifestyle_weights = weights;
        self
    }

    /// Encode an intake against the loaded schema.
    ///
    /// # Errors
    /// Returns `PulsaiError::Encoding` if the schema is empty.
    pub fn encode(&self, intake: &IntakeForm) -> Result<FeatureVector> {
        Ok(self.schema.encode(
            &intake.symptoms,
            intake.age,
            intake.gender,
            &intake.chronic_conditions,
        )?)
    }

    /// Analyze an intake without recording anything.
    ///
    /// # Errors
    /// Returns error if the intake is invalid or prediction fails.
    pub fn analyze(&self, intake: &IntakeForm, language: Language) -> Result<AnalysisResult> {
        intake.validate().map_err(PulsaiError::Validation)?;

        let vector = self.encode(intake)?;
        let prediction = self.ensemble.predict_all(&vector)?;

        let genetic = self.genetic.score(&intake.family_history);
        let lifestyle = lifestyle::score_with(&intake.lifestyle, &self.lifestyle_weights);
        let drug_warnings = self
            .genetic
            .check_drug_interactions(&intake.genetic_profile, &intake.medications);
        let symptoms: Vec<String> = intake.symptoms.iter().cloned().collect();

        let inputs = FusionInputs {
            diagnosis: &prediction.diagnosis,
            severity: &prediction.severity,
            department: &prediction.department,
            genetic: &genetic,
            lifestyle: &lifestyle,
            symptoms: &symptoms,
            drug_warnings: &drug_warnings,
        };
        Ok(self.fusion.fuse(&inputs, language, chrono::Utc::now()))
    }

    /// Analyze an intake and append the visit to the patient's history.
    ///
    /// # Errors
    /// Returns error if analysis fails or the visit cannot be saved; nothing
    /// is recorded in either case.
    pub fn run_triage(&self, request: &TriageRequest) -> Result<AnalysisResult> {
        tracing::info!("Running triage ({} symptom(s))", request.intake.symptoms.len());

        let analysis = self.analyze(&request.intake, request.language)?;
        let visit = VisitRecord::new(
            request.patient_id.clone(),
            request.intake.symptoms.iter().cloned().collect(),
            request.intake.additional_symptoms.clone(),
            analysis.clone(),
        );

        self.recorder
            .save_visit(&request.patient_id, &visit)
            .map_err(|e| PulsaiError::Storage(e.into()))?;

        tracing::info!("Triage complete: tier={}", analysis.tier);
        Ok(analysis)
    }

    /// Register (or update) a patient.
    ///
    /// # Errors
    /// Returns error if the recorder fails.
    pub fn register_patient(&self, patient: &PatientRecord) -> Result<()> {
        self.recorder
            .register_patient(patient)
            .map_err(|e| PulsaiError::Storage(e.into()))
    }

    /// Look up a registered patient.
    ///
    /// # Errors
    /// Returns error if the recorder fails.
    pub fn get_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>> {
        self.recorder
            .get_patient(patient_id)
            .map_err(|e| PulsaiError::Storage(e.into()))
    }

    /// Past analyses for a patient, oldest first.
    ///
    /// # Errors
    /// Returns error if the recorder fails.
    pub fn history(&self, patient_id: &str) -> Result<Vec<AnalysisResult>> {
        self.recorder
            .get_history(patient_id)
            .map_err(|e| PulsaiError::Storage(e.into()))
    }

    /// One page of full visit records.
    ///
    /// # Errors
    /// Returns error if the recorder fails.
    pub fn visits(&self, patient_id: &str, offset: usize, limit: usize) -> Result<VisitPage> {
        self.recorder
            .load_visits(patient_id, offset, limit)
            .map_err(|e| PulsaiError::Storage(e.into()))
    }

    /// Delete a patient's visits; returns how many were removed.
    ///
    /// # Errors
    /// Returns error if the recorder fails.
    pub fn clear_history(&self, patient_id: &str) -> Result<usize> {
        let removed = self
            .recorder
            .clear_history(patient_id)
            .map_err(|e| PulsaiError::Storage(e.into()))?;
        tracing::info!("Cleared {removed} visit(s)");
        Ok(removed)
    }
}
