//! SQLite adapter: Implementation of `VisitRecorder`.
//!
//! Provides local persistence for patients and their triage visits. The full
//! `AnalysisResult` of a visit is stored as a JSON payload; the columns beside
//! it exist for ordering and lookup.
//!
//! # Mutex Behavior
//!
//! The connection is protected by a `Mutex`. A poisoned mutex (from a panic in
//! another thread) is reported as `StorageError::LockPoisoned` rather than
//! recovered.
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension};

use crate::domain::{AnalysisResult, Gender, PatientRecord, VisitRecord};
use crate::ports::{VisitPage, VisitRecorder};

/// Error type for storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Visit belongs to patient {visit}, not {requested}")]
    PatientMismatch { visit: String, requested: String },

    #[error("Database lock poisoned")]
    LockPoisoned,
}

/// SQLite visit recorder.
pub struct SqliteVisitRecorder {
    conn: Mutex<Connection>,
}

impl SqliteVisitRecorder {
    /// Open (or create) the database at the given path.
    ///
    /// # Errors
    /// Returns error if database cannot be opened or initialized.
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let recorder = Self {
            conn: Mutex::new(conn),
        };
        recorder.init_schema()?;
        Ok(recorder)
    }

    /// Create an in-memory SQLite database (for testing).
    ///
    /// # Errors
    /// Returns error if database cannot be created.
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let recorder = Self {
            conn: Mutex::new(conn),
        };
        recorder.init_schema()?;
        Ok(recorder)
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StorageError> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Initialize the database schema.
    fn init_schema(&self) -> Result<(), StorageError> {
        let conn = self.lock()?;

        conn.execute_batch(
            r"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS patients (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                birth_date TEXT NOT NULL,
                gender TEXT NOT NULL,
                contact TEXT NOT NULL,
                registered_at TEXT NOT NULL,
                last_visit TEXT
            );

            CREATE TABLE IF NOT EXISTS visits (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                patient_id TEXT NOT NULL REFERENCES patients(id),
                tier TEXT NOT NULL,
                recorded_at TEXT NOT NULL,
                payload TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_visits_patient
                ON visits(patient_id, seq);
            ",
        )?;

        Ok(())
    }

    fn parse_timestamp(s: &str) -> Result<chrono::DateTime<chrono::Utc>, StorageError> {
        chrono::DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&chrono::Utc))
            .map_err(|e| StorageError::Serialization(format!("Invalid timestamp '{s}': {e}")))
    }

    fn decode_visit(payload: &str) -> Result<VisitRecord, StorageError> {
        serde_json::from_str(payload).map_err(|e| StorageError::Serialization(e.to_string()))
    }
}

impl VisitRecorder for SqliteVisitRecorder {
    type Error = StorageError;

    fn register_patient(&self, patient: &PatientRecord) -> Result<(), Self::Error> {
        let conn = self.lock()?;

        conn.execute(
            r"
            INSERT INTO patients (
                id, name, birth_date, gender, contact, registered_at, last_visit
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                gender = excluded.gender,
                contact = excluded.contact
            ",
            params![
                patient.id,
                patient.name,
                patient.birth_date.format("%Y-%m-%d").to_string(),
                patient.gender.to_string(),
                patient.contact,
                patient.registered_at.to_rfc3339(),
                patient.last_visit.map(|t| t.to_rfc3339()),
            ],
        )?;

        tracing::info!("Registered patient {}", patient.id);
        Ok(())
    }

    fn get_patient(&self, patient_id: &str) -> Result<Option<PatientRecord>, Self::Error> {
        let conn = self.lock()?;

        let row = conn
            .query_row(
                r"
                SELECT id, name, birth_date, gender, contact, registered_at, last_visit
                FROM patients WHERE id = ?1
                ",
                params![patient_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, Option<String>>(6)?,
                    ))
                },
            )
            .optional()?;

        let Some((id, name, birth_date, gender, contact, registered_at, last_visit)) = row else {
            return Ok(None);
        };

        let birth_date = chrono::NaiveDate::parse_from_str(&birth_date, "%Y-%m-%d")
            .map_err(|e| StorageError::Serialization(format!("Invalid birth date: {e}")))?;
        let gender: Gender = gender.parse().map_err(StorageError::Serialization)?;
        let last_visit = last_visit
            .as_deref()
            .map(Self::parse_timestamp)
            .transpose()?;

        Ok(Some(PatientRecord {
            id,
            name,
            birth_date,
            gender,
            contact,
            registered_at: Self::parse_timestamp(&registered_at)?,
            last_visit,
        }))
    }

    fn save_visit(&self, patient_id: &str, visit: &VisitRecord) -> Result<(), Self::Error> {
        if visit.patient_id != patient_id {
            return Err(StorageError::PatientMismatch {
                visit: visit.patient_id.clone(),
                requested: patient_id.to_string(),
            });
        }
        let payload =
            serde_json::to_string(visit).map_err(|e| StorageError::Serialization(e.to_string()))?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let updated = tx.execute(
            "UPDATE patients SET last_visit = ?1 WHERE id = ?2",
            params![visit.recorded_at.to_rfc3339(), patient_id],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("patient {patient_id}")));
        }

        tx.execute(
            r"
            INSERT INTO visits (id, patient_id, tier, recorded_at, payload)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                visit.id,
                patient_id,
                visit.analysis.tier.to_string(),
                visit.recorded_at.to_rfc3339(),
                payload,
            ],
        )?;

        tx.commit()?;
        tracing::debug!("Saved visit {} for patient {}", visit.id, patient_id);
        Ok(())
    }

    fn get_history(&self, patient_id: &str) -> Result<Vec<AnalysisResult>, Self::Error> {
        let conn = self.lock()?;

        let mut stmt =
            conn.prepare("SELECT payload FROM visits WHERE patient_id = ?1 ORDER BY seq ASC")?;
        let payloads = stmt
            .query_map(params![patient_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        payloads
            .iter()
            .map(|p| Self::decode_visit(p).map(|v| v.analysis))
            .collect()
    }

    fn load_visits(
        &self,
        patient_id: &str,
        offset: usize,
        limit: usize,
    ) -> Result<VisitPage, Self::Error> {
        let conn = self.lock()?;

        let total_count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM visits WHERE patient_id = ?1",
            params![patient_id],
            |row| row.get(0),
        )?;

        let mut stmt = conn.prepare(
            r"
            SELECT payload FROM visits
            WHERE patient_id = ?1
            ORDER BY seq ASC
            LIMIT ?2 OFFSET ?3
            ",
        )?;
        let payloads = stmt
            .query_map(params![patient_id, limit as i64, offset as i64], |row| {
                row.get::<_, String>(0)
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let visits = payloads
            .iter()
            .map(|p| Self::decode_visit(p))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(VisitPage::new(visits, total_count as usize, offset, limit))
    }

    fn count_visits(&self, patient_id: &str) -> Result<usize, Self::Error> {
        let conn = self.lock()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM visits WHERE patient_id = ?1",
            params![patient_id],
            |row| row.get(0),
        )?;

        Ok(count as usize)
    }

    fn clear_history(&self, patient_id: &str) -> Result<usize, Self::Error> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM visits WHERE patient_id = ?1", params![patient_id])?;
        tracing::warn!("Cleared {removed} visit(s) for patient {patient_id}");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::routine_analysis;

    fn patient() -> PatientRecord {
        PatientRecord::register(
            "12345678901",
            "Ayşe Yılmaz",
            chrono::NaiveDate::from_ymd_opt(1980, 5, 17).expect("Valid date"),
            Gender::Female,
            "0555 123 45 67",
        )
        .expect("Should register")
    }

    fn visit(patient_id: &str, diagnosis: &str) -> VisitRecord {
        let mut analysis = routine_analysis();
        analysis.diagnosis = diagnosis.to_string();
        VisitRecord::new(patient_id, vec!["fever".into()], "", analysis)
    }

    #[test]
    fn test_patient_roundtrip() {
        let recorder = SqliteVisitRecorder::in_memory().expect("Should create db");
        let patient = patient();

        assert!(recorder.get_patient(&patient.id).expect("Should query").is_none());
        recorder.register_patient(&patient).expect("Should register");

        let loaded = recorder
            .get_patient(&patient.id)
            .expect("Should query")
            .expect("Should exist");
        assert_eq!(loaded.name, patient.name);
        assert_eq!(loaded.birth_date, patient.birth_date);
        assert_eq!(loaded.gender, Gender::Female);
        assert!(loaded.last_visit.is_none());
    }

    #[test]
    fn test_history_is_oldest_first() {
        let recorder = SqliteVisitRecorder::in_memory().expect("Should create db");
        let patient = patient();
        recorder.register_patient(&patient).expect("Should register");

        for diagnosis in ["Grip", "Bronşit", "Migren"] {
            recorder
                .save_visit(&patient.id, &visit(&patient.id, diagnosis))
                .expect("Should save");
        }

        let history = recorder.get_history(&patient.id).expect("Should load");
        let names: Vec<_> = history.iter().map(|a| a.diagnosis.as_str()).collect();
        assert_eq!(names, ["Grip", "Bronşit", "Migren"]);
        assert_eq!(recorder.count_visits(&patient.id).expect("Should count"), 3);

        let loaded = recorder
            .get_patient(&patient.id)
            .expect("Should query")
            .expect("Should exist");
        assert!(loaded.last_visit.is_some());
    }

    #[test]
    fn test_visit_for_unknown_patient_is_not_persisted() {
        let recorder = SqliteVisitRecorder::in_memory().expect("Should create db");

        let err = recorder
            .save_visit("missing", &visit("missing", "Grip"))
            .expect_err("Should fail");
        assert!(matches!(err, StorageError::NotFound(_)));
        assert_eq!(recorder.count_visits("missing").expect("Should count"), 0);
    }

    #[test]
    fn test_patient_mismatch_is_rejected() {
        let recorder = SqliteVisitRecorder::in_memory().expect("Should create db");
        let err = recorder
            .save_visit("a", &visit("b", "Grip"))
            .expect_err("Should fail");
        assert!(matches!(err, StorageError::PatientMismatch { .. }));
    }

    #[test]
    fn test_pagination_and_clear() {
        let recorder = SqliteVisitRecorder::in_memory().expect("Should create db");
        let patient = patient();
        recorder.register_patient(&patient).expect("Should register");
        for i in 0..5 {
            recorder
                .save_visit(&patient.id, &visit(&patient.id, &format!("D{i}")))
                .expect("Should save");
        }

        let page = recorder.load_visits(&patient.id, 0, 2).expect("Should load");
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.next_offset(), Some(2));
        assert_eq!(page.items[0].analysis.diagnosis, "D0");

        let last = recorder.load_visits(&patient.id, 4, 2).expect("Should load");
        assert_eq!(last.items.len(), 1);
        assert!(!last.has_more);

        assert_eq!(recorder.clear_history(&patient.id).expect("Should clear"), 5);
        assert!(recorder.get_history(&patient.id).expect("Should load").is_empty());
        assert!(recorder.get_patient(&patient.id).expect("Should query").is_some());
    }
}
