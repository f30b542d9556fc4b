//! Plain-text health report for one analysis.
//!
//! The renderer only reads the `AnalysisResult`; patient details and the
//! intake are optional context for the header sections.

use crate::domain::{AnalysisResult, Gender, IntakeForm, Language, Localized, PatientRecord};

const TITLE: Localized = Localized::new("SAĞLIK RAPORU", "HEALTH REPORT");
const DATE: Localized = Localized::new("Tarih", "Date");
const PATIENT: Localized = Localized::new("HASTA BİLGİLERİ", "PATIENT");
const NAME: Localized = Localized::new("Ad Soyad", "Name");
const AGE: Localized = Localized::new("Yaş", "Age");
const GENDER: Localized = Localized::new("Cinsiyet", "Gender");
const MALE: Localized = Localized::new("Erkek", "male");
const FEMALE: Localized = Localized::new("Kadın", "female");
const CHRONIC: Localized = Localized::new("Kronik Hastalıklar", "Chronic conditions");
const NONE: Localized = Localized::new("Yok", "None");
const SYMPTOMS: Localized = Localized::new("BELİRTİLER", "SYMPTOMS");
const SELECTED: Localized = Localized::new("Seçilen Belirtiler", "Selected symptoms");
const ADDITIONAL: Localized = Localized::new("Ek Şikayetler", "Additional complaints");
const RESULTS: Localized = Localized::new("ANALİZ SONUÇLARI", "ANALYSIS");
const DIAGNOSIS: Localized = Localized::new("Olası Tanı", "Probable diagnosis");
const CONFIDENCE: Localized = Localized::new("Güven Oranı", "Confidence");
const SEVERITY: Localized = Localized::new("Risk Seviyesi", "Severity");
const DEPARTMENT: Localized = Localized::new("Önerilen Bölüm", "Recommended department");
const TIER: Localized = Localized::new("Aciliyet", "Urgency");
const RECOMMENDATION: Localized = Localized::new("ÖNERİLER", "RECOMMENDATION");
const EARLY_WARNING: Localized = Localized::new("Erken Uyarı", "Early warning");
const GENETIC: Localized = Localized::new("GENETİK RİSK", "INHERITED RISK");
const SCREENING: Localized = Localized::new("Tarama", "Screening");
const DRUGS: Localized = Localized::new("İLAÇ-GEN ETKİLEŞİMLERİ", "DRUG-GENE INTERACTIONS");
const SUPPORT: Localized = Localized::new("PSİKOLOJİK DESTEK", "PSYCHOLOGICAL SUPPORT");
const DYNAMIC_RISK: Localized = Localized::new("Dinamik Risk Skoru", "Dynamic risk score");
const DISCLAIMER: Localized = Localized::new(
    "NOT: Bu rapor PulsAI tarafından oluşturulmuştur ve sadece bilgilendirme amaçlıdır. Kesin tanı için mutlaka bir sağlık kuruluşuna başvurunuz.",
    "NOTE: This report was generated by PulsAI for information only. See a healthcare provider for a diagnosis.",
);

/// Rendering switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportOptions {
    /// Include the internal dynamic risk score
    pub show_dynamic_risk: bool,
}

/// Render a report in the analysis' language.
#[must_use]
pub fn render_report(
    analysis: &AnalysisResult,
    patient: Option<&PatientRecord>,
    intake: Option<&IntakeForm>,
    options: ReportOptions,
) -> String {
    let lang = analysis.language;
    let mut out = Report::default();

    out.line(TITLE.get(lang));
    out.field(DATE, lang, analysis.created_at.format("%d/%m/%Y %H:%M:%S"));

    if patient.is_some() || intake.is_some() {
        out.heading(PATIENT.get(lang));
        if let Some(patient) = patient {
            out.field(NAME, lang, &patient.name);
        }
        // Intake answers win over the patient record.
        match (intake, patient) {
            (Some(intake), _) => {
                out.field(AGE, lang, intake.age);
                out.field(GENDER, lang, gender_label(intake.gender, lang));
                out.field(CHRONIC, lang, join_or_none(intake.chronic_conditions.iter(), lang));
            }
            (None, Some(patient)) => {
                out.field(AGE, lang, patient.age_on(analysis.created_at.date_naive()));
                out.field(GENDER, lang, gender_label(patient.gender, lang));
            }
            (None, None) => {}
        }
    }

    if let Some(intake) = intake {
        out.heading(SYMPTOMS.get(lang));
        out.field(SELECTED, lang, join_or_none(intake.symptoms.iter(), lang));
        if !intake.additional_symptoms.trim().is_empty() {
            out.field(ADDITIONAL, lang, intake.additional_symptoms.trim());
        }
    }

    out.heading(RESULTS.get(lang));
    out.field(DIAGNOSIS, lang, &analysis.diagnosis);
    out.field(CONFIDENCE, lang, percent(analysis.diagnosis_confidence, lang));
    if !analysis.diagnosis_description.is_empty() {
        out.line(&analysis.diagnosis_description);
    }
    out.blank();
    out.field(SEVERITY, lang, &analysis.severity);
    out.field(CONFIDENCE, lang, percent(analysis.severity_confidence, lang));
    out.field(TIER, lang, analysis.tier);
    out.field(DEPARTMENT, lang, &analysis.department);
    out.field(EARLY_WARNING, lang, &analysis.early_warning_text);
    if options.show_dynamic_risk {
        out.field(DYNAMIC_RISK, lang, format!("{:.3}", analysis.dynamic_risk_score));
    }

    out.heading(RECOMMENDATION.get(lang));
    out.line(&analysis.recommendation_text);

    if !analysis.personalized_recommendations.is_empty() {
        out.heading(GENETIC.get(lang));
        for rec in &analysis.personalized_recommendations {
            out.line(&format!(
                "- {} ({}, {})",
                rec.disease,
                rec.risk_level.label(lang),
                percent(rec.risk, lang)
            ));
            out.line(&format!("  {}: {}", SCREENING.get(lang), rec.screening));
            for step in &rec.prevention {
                out.line(&format!("  * {step}"));
            }
        }
    }

    if !analysis.drug_warnings.is_empty() {
        out.heading(DRUGS.get(lang));
        for warning in &analysis.drug_warnings {
            out.line(&format!("- {}", warning.message()));
        }
    }

    if !analysis.emotional_support.is_empty() {
        out.heading(SUPPORT.get(lang));
        for note in &analysis.emotional_support {
            out.line(&format!("- {}: {} {}", note.symptom, note.effect, note.advice));
        }
    }

    out.blank();
    out.line(DISCLAIMER.get(lang));
    out.finish()
}

fn percent(value: f64, lang: Language) -> String {
    match lang {
        Language::Tr => format!("%{:.1}", value * 100.0),
        Language::En => format!("{:.1}%", value * 100.0),
    }
}

fn gender_label(gender: Gender, lang: Language) -> &'static str {
    match gender {
        Gender::Male => MALE.get(lang),
        Gender::Female => FEMALE.get(lang),
    }
}

fn join_or_none<'a, I>(items: I, lang: Language) -> String
where
    I: Iterator<Item = &'a String>,
{
    let joined = items.map(String::as_str).collect::<Vec<_>>().join(", ");
    if joined.is_empty() {
        NONE.get(lang).to_string()
    } else {
        joined
    }
}

#[derive(Default)]
struct Report {
    lines: Vec<String>,
}

impl Report {
    fn line(&mut self, text: &str) {
        self.lines.push(text.to_string());
    }

    fn blank(&mut self) {
        self.lines.push(String::new());
    }

    fn heading(&mut self, title: &str) {
        self.blank();
        self.lines.push(title.to_string());
        self.lines.push("-".repeat(title.chars().count()));
    }

    fn field(&mut self, label: Localized, lang: Language, value: impl std::fmt::Display) {
        self.lines.push(format!("{}: {value}", label.get(lang)));
    }

    fn finish(self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::fixtures::routine_analysis;
    use crate::domain::{Gender, PersonalizedRecommendation, RiskBand};

    #[test]
    fn test_report_hides_dynamic_risk_by_default() {
        let analysis = routine_analysis();

        let report = render_report(&analysis, None, None, ReportOptions::default());
        assert!(!report.contains("Dynamic risk score"));

        let report = render_report(
            &analysis,
            None,
            None,
            ReportOptions {
                show_dynamic_risk: true,
            },
        );
        assert!(report.contains("Dynamic risk score: 0.450"));
    }

    #[test]
    fn test_report_includes_core_results() {
        let analysis = routine_analysis();
        let intake = IntakeForm::new(45, Gender::Male).with_symptoms(["fever", "cough"]);

        let report = render_report(&analysis, None, Some(&intake), ReportOptions::default());

        assert!(report.starts_with("HEALTH REPORT"));
        assert!(report.contains("Probable diagnosis: Grip"));
        assert!(report.contains("Confidence: 62.0%"));
        assert!(report.contains("Selected symptoms: cough, fever"));
        assert!(report.contains("Chronic conditions: None"));
        assert!(report.contains("Urgency: GREEN"));
        assert!(report.contains("routine follow-up"));
    }

    #[test]
    fn test_report_is_localized() {
        let mut analysis = routine_analysis();
        analysis.language = Language::Tr;
        analysis.personalized_recommendations.push(PersonalizedRecommendation {
            disease: "diyabet".into(),
            risk: 0.5,
            risk_level: RiskBand::Medium,
            screening: "Yılda bir kez açlık kan şekeri".into(),
            prevention: vec!["Düzenli egzersiz".into()],
        });

        let report = render_report(&analysis, None, None, ReportOptions::default());

        assert!(report.starts_with("SAĞLIK RAPORU"));
        assert!(report.contains("Güven Oranı: %62.0"));
        assert!(report.contains("- diyabet (Orta, %50.0)"));
        assert!(report.contains("  * Düzenli egzersiz"));
    }

    fn patient() -> PatientRecord {
        PatientRecord::register(
            "12345678901",
            "Ayşe Yılmaz",
            chrono::NaiveDate::from_ymd_opt(1980, 1, 1).expect("Should be a valid date"),
            Gender::Female,
            "0555 123 45 67",
        )
        .expect("Should validate")
    }

    #[test]
    fn test_report_uses_patient_age() {
        let analysis = routine_analysis();
        let patient = patient();

        let report = render_report(&analysis, Some(&patient), None, ReportOptions::default());
        let expected_age = patient.age_on(analysis.created_at.date_naive());

        assert!(report.contains("Name: Ayşe Yılmaz"));
        assert!(report.contains(&format!("Age: {expected_age}")));
        assert!(report.contains("Gender: female"));
    }

    #[test]
    fn test_report_prefers_intake_answers() {
        let analysis = routine_analysis();
        let patient = patient();
        let intake = IntakeForm::new(30, Gender::Female).with_symptoms(["fever"]);

        let report = render_report(&analysis, Some(&patient), Some(&intake), ReportOptions::default());

        assert!(report.contains("Name: Ayşe Yılmaz"));
        assert!(report.contains("Age: 30\n"));
        assert!(report.contains("Gender: female"));
    }

    #[test]
    fn test_report_localizes_gender() {
        let mut analysis = routine_analysis();
        analysis.language = Language::Tr;
        let intake = IntakeForm::new(45, Gender::Male).with_symptoms(["ateş"]);

        let report = render_report(&analysis, None, Some(&intake), ReportOptions::default());
        assert!(report.contains("Cinsiyet: Erkek"));
        assert!(!report.contains("Cinsiyet: male"));

        let report = render_report(&analysis, Some(&patient()), None, ReportOptions::default());
        assert!(report.contains("Cinsiyet: Kadın"));
    }
}
