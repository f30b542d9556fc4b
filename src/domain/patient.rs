//! Registered patients.
//!
//! The national id number is only used to derive the patient id and is never
//! stored.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::Gender;

/// Registration details entered once per patient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatientRecord {
    /// Hex SHA-256 of national id + birth date
    pub id: String,

    pub name: String,

    pub birth_date: chrono::NaiveDate,

    pub gender: Gender,

    /// Phone number or e-mail
    pub contact: String,

    pub registered_at: chrono::DateTime<chrono::Utc>,

    /// Set by the visit recorder on every saved visit
    #[serde(default)]
    pub last_visit: Option<chrono::DateTime<chrono::Utc>>,
}

impl PatientRecord {
    /// Create a new record, deriving the id from the national id number.
    ///
    /// # Errors
    /// Returns validation errors as a vector of strings.
    pub fn register(
        national_id: &str,
        name: impl Into<String>,
        birth_date: chrono::NaiveDate,
        gender: Gender,
        contact: impl Into<String>,
    ) -> Result<Self, Vec<String>> {
        let name = name.into();
        let contact = contact.into();

        let mut errors = Vec::new();
        if !is_valid_national_id(national_id) {
            errors.push("National id must be exactly 11 digits".to_string());
        }
        if name.trim().is_empty() {
            errors.push("Name must not be empty".to_string());
        }
        if contact.trim().is_empty() {
            errors.push("Contact must not be empty".to_string());
        }
        if birth_date > chrono::Utc::now().date_naive() {
            errors.push(format!("Birth date {birth_date} is in the future"));
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            id: patient_id(national_id, birth_date),
            name,
            birth_date,
            gender,
            contact,
            registered_at: chrono::Utc::now(),
            last_visit: None,
        })
    }

    /// Age in whole years on the given day.
    #[must_use]
    pub fn age_on(&self, day: chrono::NaiveDate) -> u32 {
        day.years_since(self.birth_date).unwrap_or(0)
    }
}

/// Stable patient id: hex SHA-256 of `national_id + birth_date (YYYY-MM-DD)`.
#[must_use]
pub fn patient_id(national_id: &str, birth_date: chrono::NaiveDate) -> String {
    let digest = Sha256::digest(format!("{}{}", national_id.trim(), birth_date.format("%Y-%m-%d")));
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn is_valid_national_id(national_id: &str) -> bool {
    let trimmed = national_id.trim();
    trimmed.len() == 11 && trimmed.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> chrono::NaiveDate {
        chrono::NaiveDate::from_ymd_opt(y, m, d).expect("Should be a valid date")
    }

    #[test]
    fn test_patient_id_is_stable() {
        let a = patient_id("12345678901", date(1980, 5, 17));
        let b = patient_id("12345678901", date(1980, 5, 17));
        let c = patient_id("12345678901", date(1980, 5, 18));

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_register_validates_input() {
        let ok = PatientRecord::register(
            "12345678901",
            "Ayşe Yılmaz",
            date(1980, 5, 17),
            Gender::Female,
            "0555 123 45 67",
        )
        .expect("Should register");
        assert!(ok.last_visit.is_none());
        assert_eq!(ok.age_on(date(2020, 5, 17)), 40);

        let errors = PatientRecord::register("1234", " ", date(1980, 1, 1), Gender::Male, "x")
            .expect_err("Should reject");
        assert_eq!(errors.len(), 2);
    }
}
