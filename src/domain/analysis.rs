//! Triage outcome types.
//!
//! `AnalysisResult` is produced once per request by the fusion engine and is
//! only read afterwards: by the visit recorder and by the report renderer.

use serde::{Deserialize, Serialize};

use super::{DrugGeneWarning, EmotionalSupport, GeneticProfile, Language, LifestyleProfile};

/// Urgency tier driving the patient-facing recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SeverityTier {
    /// Nearest emergency care
    Red,
    /// Predicted department, soon
    Yellow,
    /// Routine follow-up
    Green,
}

impl SeverityTier {
    /// Get a human-readable description.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Red => "Emergency - go to the nearest emergency department",
            Self::Yellow => "Urgent - visit the recommended department soon",
            Self::Green => "Routine - follow up if symptoms persist",
        }
    }
}

impl std::fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Red => write!(f, "RED"),
            Self::Yellow => write!(f, "YELLOW"),
            Self::Green => write!(f, "GREEN"),
        }
    }
}

/// Band of an inherited-risk score that is worth reporting.
///
/// Scores at or below the medium threshold have no band and are not reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskBand {
    High,
    Medium,
}

impl RiskBand {
    #[must_use]
    pub fn label(&self, language: Language) -> &'static str {
        match (self, language) {
            (Self::High, Language::En) => "High",
            (Self::Medium, Language::En) => "Medium",
            (Self::High, Language::Tr) => "Yüksek",
            (Self::Medium, Language::Tr) => "Orta",
        }
    }
}

impl std::fmt::Display for RiskBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label(Language::En))
    }
}

/// Early-warning level from the strongest diagnosis probability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WarningLevel {
    Low,
    Moderate,
    High,
}

/// Screening and prevention plan for one disease with notable inherited risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonalizedRecommendation {
    pub disease: String,
    pub risk: f64,
    pub risk_level: RiskBand,
    pub screening: String,
    pub prevention: Vec<String>,
}

/// Complete result of one triage request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub diagnosis: String,
    pub diagnosis_confidence: f64,

    pub severity: String,
    pub severity_confidence: f64,

    pub department: String,

    pub tier: SeverityTier,
    pub recommendation_text: String,

    pub genetic_risks: GeneticProfile,
    pub lifestyle_risks: LifestyleProfile,
    pub personalized_recommendations: Vec<PersonalizedRecommendation>,

    /// Mean of all genetic and lifestyle values. Instrumentation only.
    pub dynamic_risk_score: f64,

    pub early_warning: WarningLevel,
    pub early_warning_text: String,

    pub diagnosis_description: String,

    #[serde(default)]
    pub emotional_support: Vec<EmotionalSupport>,

    #[serde(default)]
    pub drug_warnings: Vec<DrugGeneWarning>,

    pub language: Language,

    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl AnalysisResult {
    #[must_use]
    pub fn is_emergency(&self) -> bool {
        self.tier == SeverityTier::Red
    }
}

/// A persisted visit: the analysis plus what the patient reported.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitRecord {
    /// Unique identifier
    pub id: String,

    pub patient_id: String,

    pub symptoms: Vec<String>,

    #[serde(default)]
    pub additional_symptoms: String,

    pub analysis: AnalysisResult,

    pub recorded_at: chrono::DateTime<chrono::Utc>,
}

impl VisitRecord {
    /// Create a visit record for a patient.
    #[must_use]
    pub fn new(
        patient_id: impl Into<String>,
        symptoms: Vec<String>,
        additional_symptoms: impl Into<String>,
        analysis: AnalysisResult,
    ) -> Self {
        Self {
            id: uuid_v4(),
            patient_id: patient_id.into(),
            symptoms,
            additional_symptoms: additional_symptoms.into(),
            analysis,
            recorded_at: chrono::Utc::now(),
        }
    }
}

/// Generate a random (v4) UUID string from a ChaCha20 CSPRNG.
fn uuid_v4() -> String {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    let mut rng = ChaCha20Rng::from_entropy();
    let mut bytes: [u8; 16] = rng.gen();
    bytes[6] = (bytes[6] & 0x0f) | 0x40;
    bytes[8] = (bytes[8] & 0x3f) | 0x80;

    let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tier_display_and_serde() {
        assert_eq!(SeverityTier::Red.to_string(), "RED");
        let json = serde_json::to_string(&SeverityTier::Yellow).expect("Should serialize");
        assert_eq!(json, "\"YELLOW\"");
    }

    #[test]
    fn test_risk_band_labels() {
        assert_eq!(RiskBand::High.label(Language::Tr), "Yüksek");
        assert_eq!(RiskBand::Medium.to_string(), "Medium");
    }

    #[test]
    fn test_visit_record_creation() {
        let visit = VisitRecord::new(
            "patient-1",
            vec!["fever".into()],
            "",
            fixtures::routine_analysis(),
        );
        assert_eq!(visit.patient_id, "patient-1");
        assert!(!visit.analysis.is_emergency());
    }

    #[test]
    fn test_uuid_generation() {
        let id1 = uuid_v4();
        let id2 = uuid_v4();
        assert_ne!(id1, id2);
        assert_eq!(id1.len(), 36);
        assert_eq!(&id1[14..15], "4");
    }
}
