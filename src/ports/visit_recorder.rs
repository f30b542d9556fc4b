//! Visit recorder port: persistence of patients and their triage visits.
//!
//! This trait abstracts the storage backend (SQLite) from the triage service.

use crate::domain::{AnalysisResult, PatientRecord, VisitRecord};

/// A page of visits with pagination metadata.
#[derive(Debug, Clone)]
pub struct VisitPage {
    /// Visits in this page, oldest first
    pub items: Vec<VisitRecord>,
    /// Total count of the patient's visits
    pub total_count: usize,
    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
}

impl VisitPage {
    #[must_use]
    pub fn new(items: Vec<VisitRecord>, total_count: usize, offset: usize, limit: usize) -> Self {
        let has_more = offset + items.len() < total_count;
        Self {
            items,
            total_count,
            offset,
            limit,
            has_more,
        }
    }

    /// Get the next page offset.
    #[must_use]
    pub fn next_offset(&self) -> Option<usize> {
        if self.has_more {
            Some(self.offset + self.limit)
        } else {
            None
        }
    }
}

/// Trait for patient and visit persistence.
pub trait VisitRecorder: Send + Sync {
    /// Error type for recorder operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Store a new patient, or replace the details of an existing one.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn register_patient(&self, patient: &PatientRecord) -> Result<(), Self::Error>;

    /// Look up a patient by id.
    ///
    /// # Returns
    /// `None` if no such patient is registered.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn get_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, Self::Error>;

    /// Append a visit and update the patient's last-visit time atomically.
    ///
    /// # Errors
    /// Returns error if the patient is unknown or the write fails. On error
    /// nothing is persisted.
    fn save_visit(&self, patient_id: &str, visit: &VisitRecord) -> Result<(), Self::Error>;

    /// Analyses of all the patient's visits, oldest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn get_history(&self, patient_id: &str) -> Result<Vec<AnalysisResult>, Self::Error>;

    /// Full visit records with pagination, oldest first.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn load_visits(
        &self,
        patient_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<VisitPage, Self::Error>;

    /// Number of visits recorded for the patient.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn count_visits(&self, patient_id: &str) -> Result<usize, Self::Error>;

    /// Delete the patient's visit history; the patient stays registered.
    ///
    /// # Returns
    /// Number of visits removed.
    ///
    /// # Errors
    /// Returns error if storage operation fails.
    fn clear_history(&self, patient_id: &str) -> Result<usize, Self::Error>;
}
