//! Risk fusion: classifier confidence + genetic + lifestyle -> one recommendation.
//!
//! Fusion is a pure function of its inputs. The caller supplies the timestamp,
//! so the same inputs always yield the same `AnalysisResult`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{
    emotional_support, phrases, AnalysisResult, ClassPrediction, DepartmentPrediction,
    DrugGeneWarning, FusionInputError, GeneticProfile, GuidanceRegistry, Language,
    LifestyleProfile, PersonalizedRecommendation, RiskBand, SeverityTier, WarningLevel,
};

/// Cut-offs used by fusion. All comparisons are strict (`>`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskThresholds {
    /// Severity confidence above this is RED.
    pub emergency: f64,
    /// Severity confidence above this is YELLOW.
    pub urgent: f64,
    pub high_genetic: f64,
    pub medium_genetic: f64,
    pub warning_high: f64,
    pub warning_moderate: f64,
}

impl Default for RiskThresholds {
    fn default() -> Self {
        Self {
            emergency: 0.7,
            urgent: 0.4,
            high_genetic: 0.5,
            medium_genetic: 0.3,
            warning_high: 0.7,
            warning_moderate: 0.4,
        }
    }
}

impl RiskThresholds {
    #[must_use]
    pub fn severity_tier(&self, severity_confidence: f64) -> SeverityTier {
        if severity_confidence > self.emergency {
            SeverityTier::Red
        } else if severity_confidence > self.urgent {
            SeverityTier::Yellow
        } else {
            SeverityTier::Green
        }
    }

    /// Band for an inherited-risk score; `None` when not worth reporting.
    #[must_use]
    pub fn risk_band(&self, risk: f64) -> Option<RiskBand> {
        if risk > self.high_genetic {
            Some(RiskBand::High)
        } else if risk > self.medium_genetic {
            Some(RiskBand::Medium)
        } else {
            None
        }
    }

    #[must_use]
    pub fn early_warning(&self, max_probability: f64) -> WarningLevel {
        if max_probability > self.warning_high {
            WarningLevel::High
        } else if max_probability > self.warning_moderate {
            WarningLevel::Moderate
        } else {
            WarningLevel::Low
        }
    }
}

/// Mean of every genetic and lifestyle value, 0.0 when there are none.
#[must_use]
pub fn dynamic_risk_score(genetic: &GeneticProfile, lifestyle: &LifestyleProfile) -> f64 {
    let (sum, count) = genetic
        .values()
        .chain(lifestyle.values())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if count == 0 {
        0.0
    } else {
        sum / count as f64
    }
}

/// Everything fusion reads for one request.
#[derive(Debug, Clone, Copy)]
pub struct FusionInputs<'a> {
    pub diagnosis: &'a ClassPrediction,
    pub severity: &'a ClassPrediction,
    pub department: &'a DepartmentPrediction,
    pub genetic: &'a GeneticProfile,
    pub lifestyle: &'a LifestyleProfile,
    pub symptoms: &'a [String],
    pub drug_warnings: &'a [DrugGeneWarning],
}

/// Combines model outputs and risk profiles into an `AnalysisResult`.
#[derive(Debug, Clone, Default)]
pub struct FusionEngine {
    thresholds: RiskThresholds,
    guidance: GuidanceRegistry,
}

impl FusionEngine {
    #[must_use]
    pub fn new(thresholds: RiskThresholds, guidance: GuidanceRegistry) -> Self {
        Self {
            thresholds,
            guidance,
        }
    }

    /// Fuse one request's predictions and risk profiles.
    #[must_use]
    pub fn fuse(
        &self,
        inputs: &FusionInputs<'_>,
        language: Language,
        created_at: chrono::DateTime<chrono::Utc>,
    ) -> AnalysisResult {
        let genetic_risks = in_range_profile(inputs.genetic);
        let lifestyle_risks = in_range_lifestyle(inputs.lifestyle);

        let severity_confidence = inputs.severity.confidence();
        let tier = self.thresholds.severity_tier(severity_confidence);
        let department = inputs.department.label.as_str();
        let recommendation_text = match tier {
            SeverityTier::Red => phrases::EMERGENCY.get(language).to_string(),
            SeverityTier::Yellow => phrases::urgent(department, language),
            SeverityTier::Green => phrases::routine(department, language),
        };

        let personalized_recommendations = genetic_risks
            .iter()
            .filter_map(|(disease, &risk)| {
                let risk_level = self.thresholds.risk_band(risk)?;
                Some(PersonalizedRecommendation {
                    disease: disease.clone(),
                    risk,
                    risk_level,
                    screening: self.guidance.screening(disease, language),
                    prevention: self.guidance.prevention(disease, language),
                })
            })
            .collect();

        let max_probability = inputs
            .diagnosis
            .probabilities
            .iter()
            .copied()
            .filter(|p| p.is_finite())
            .fold(0.0_f64, f64::max);
        let early_warning = self.thresholds.early_warning(max_probability);
        let early_warning_text = match early_warning {
            WarningLevel::High => phrases::WARNING_HIGH,
            WarningLevel::Moderate => phrases::WARNING_MODERATE,
            WarningLevel::Low => phrases::WARNING_LOW,
        }
        .get(language)
        .to_string();

        let dynamic_risk_score = dynamic_risk_score(&genetic_risks, &lifestyle_risks);
        tracing::debug!(
            "Fused analysis: tier={tier}, early_warning={early_warning:?}, dynamic_risk={dynamic_risk_score:.3}"
        );

        AnalysisResult {
            diagnosis: inputs.diagnosis.label.clone(),
            diagnosis_confidence: inputs.diagnosis.confidence(),
            severity: inputs.severity.label.clone(),
            severity_confidence,
            department: department.to_string(),
            tier,
            recommendation_text,
            genetic_risks,
            lifestyle_risks,
            personalized_recommendations,
            dynamic_risk_score,
            early_warning,
            early_warning_text,
            diagnosis_description: self
                .guidance
                .describe_diagnosis(&inputs.diagnosis.label, language),
            emotional_support: emotional_support(inputs.symptoms, language),
            drug_warnings: inputs.drug_warnings.to_vec(),
            language,
            created_at,
        }
    }
}

fn is_unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn in_range_profile(profile: &GeneticProfile) -> GeneticProfile {
    let kept: BTreeMap<String, f64> = profile
        .iter()
        .filter(|&(disease, &risk)| {
            if is_unit(risk) {
                return true;
            }
            let e = FusionInputError::OutOfRange {
                factor: disease.clone(),
                value: risk,
            };
            tracing::warn!("Skipping genetic risk: {e}");
            false
        })
        .map(|(disease, &risk)| (disease.clone(), risk))
        .collect();
    GeneticProfile(kept)
}

fn in_range_lifestyle(profile: &LifestyleProfile) -> LifestyleProfile {
    let mut kept = profile.clone();
    kept.factors.retain(|factor, value| {
        if is_unit(*value) {
            return true;
        }
        let e = FusionInputError::OutOfRange {
            factor: factor.to_string(),
            value: *value,
        };
        tracing::warn!("Skipping lifestyle risk: {e}");
        false
    });
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{lifestyle, FamilyHistory, GeneticRiskScorer, LifestyleChoices};

    fn prediction(label: &str, probabilities: Vec<f64>) -> ClassPrediction {
        let class_index = crate::domain::argmax(&probabilities).expect("Should have classes");
        ClassPrediction {
            label: label.to_string(),
            class_index,
            probabilities,
        }
    }

    fn department() -> DepartmentPrediction {
        DepartmentPrediction {
            label: "Dahiliye".into(),
            class_index: 0,
        }
    }

    /// Distribution whose top class (index 0) has exactly `confidence`.
    fn top_class_with(confidence: f64) -> Vec<f64> {
        let rest = 1.0 - confidence;
        let others = (rest / confidence).ceil() as usize + 1;
        std::iter::once(confidence)
            .chain(std::iter::repeat(rest / others as f64).take(others))
            .collect()
    }

    fn fuse_with(severity_confidence: f64, genetic: &GeneticProfile) -> AnalysisResult {
        let diagnosis = prediction("Grip", vec![0.6, 0.4]);
        let severity = prediction("yüksek", top_class_with(severity_confidence));
        let department = department();
        let lifestyle = lifestyle::score(&LifestyleChoices::default());
        let inputs = FusionInputs {
            diagnosis: &diagnosis,
            severity: &severity,
            department: &department,
            genetic,
            lifestyle: &lifestyle,
            symptoms: &[],
            drug_warnings: &[],
        };
        FusionEngine::default().fuse(&inputs, Language::En, chrono::Utc::now())
    }

    #[test]
    fn test_emergency_threshold_is_strict() {
        let genetic = GeneticProfile::default();
        assert_eq!(fuse_with(0.7, &genetic).tier, SeverityTier::Yellow);
        assert_eq!(fuse_with(0.70001, &genetic).tier, SeverityTier::Red);
        assert!(fuse_with(0.9, &genetic).recommendation_text.contains("EMERGENCY"));
    }

    #[test]
    fn test_severity_helper_keeps_requested_confidence() {
        for confidence in [0.2, 0.35, 0.55, 0.7, 0.9] {
            let probabilities = top_class_with(confidence);
            assert_eq!(crate::domain::argmax(&probabilities), Some(0));
            assert!((probabilities.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        }
        let result = fuse_with(0.2, &GeneticProfile::default());
        assert!((result.severity_confidence - 0.2).abs() < 1e-12);
        assert_eq!(result.tier, SeverityTier::Green);
    }

    #[test]
    fn test_tier_boundaries() {
        assert_eq!(
            fuse_with(0.55, &GeneticProfile::default()).tier,
            SeverityTier::Yellow
        );

        let thresholds = RiskThresholds::default();
        assert_eq!(thresholds.severity_tier(0.41), SeverityTier::Yellow);
        assert_eq!(thresholds.severity_tier(0.4), SeverityTier::Green);
        assert_eq!(thresholds.severity_tier(0.35), SeverityTier::Green);
    }

    #[test]
    fn test_green_text_mentions_routine_follow_up() {
        let diagnosis = prediction("Grip", vec![0.5, 0.5]);
        let severity = prediction("düşük", vec![0.34, 0.33, 0.33]);
        let department = department();
        let genetic = GeneticProfile::default();
        let lifestyle = lifestyle::score(&LifestyleChoices::default());
        let inputs = FusionInputs {
            diagnosis: &diagnosis,
            severity: &severity,
            department: &department,
            genetic: &genetic,
            lifestyle: &lifestyle,
            symptoms: &[],
            drug_warnings: &[],
        };

        let result = FusionEngine::default().fuse(&inputs, Language::En, chrono::Utc::now());
        assert_eq!(result.tier, SeverityTier::Green);
        assert!(result.recommendation_text.contains("routine follow-up"));
        assert!(result.recommendation_text.contains("Dahiliye"));
        assert_eq!(result.early_warning, WarningLevel::Moderate);
    }

    #[test]
    fn test_genetic_bands() {
        let history = FamilyHistory::new()
            .with_counts("diyabet", 1, 0)
            .with_counts("kalp_hastaliklari", 2, 1)
            .with_counts("kanser", 0, 2);
        let genetic = GeneticRiskScorer::default().score(&history);
        let result = fuse_with(0.2, &genetic);
        assert_eq!(result.tier, SeverityTier::Green);

        let recs: BTreeMap<_, _> = result
            .personalized_recommendations
            .iter()
            .map(|r| (r.disease.as_str(), r.risk_level))
            .collect();
        assert_eq!(recs.get("diyabet"), Some(&RiskBand::Medium));
        assert_eq!(recs.get("kalp_hastaliklari"), Some(&RiskBand::Medium));
        assert!(!recs.contains_key("kanser"));
        assert_eq!(RiskThresholds::default().risk_band(0.51), Some(RiskBand::High));
    }

    #[test]
    fn test_unknown_disease_gets_fallback_guidance() {
        let genetic = GeneticProfile(BTreeMap::from([("lupus".to_string(), 0.6)]));
        let result = fuse_with(0.2, &genetic);
        assert_eq!(result.tier, SeverityTier::Green);

        let rec = &result.personalized_recommendations[0];
        assert_eq!(rec.risk_level, RiskBand::High);
        assert_eq!(rec.screening, "Consult your physician");
    }

    #[test]
    fn test_out_of_range_values_are_skipped() {
        let genetic = GeneticProfile(BTreeMap::from([
            ("diyabet".to_string(), 1.5),
            ("kanser".to_string(), f64::NAN),
        ]));
        let result = fuse_with(0.2, &genetic);
        assert!(result.genetic_risks.is_empty());
        assert!(result.personalized_recommendations.is_empty());
    }

    #[test]
    fn test_dynamic_risk_score() {
        let lifestyle = lifestyle::score(&LifestyleChoices {
            smoking: true,
            exercise: false,
            ..Default::default()
        });
        let genetic = GeneticProfile(BTreeMap::from([("diyabet".to_string(), 0.5)]));

        let score = dynamic_risk_score(&genetic, &lifestyle);
        assert!((score - (0.5 + 0.9 + 0.8) / 3.0).abs() < 1e-9);

        let empty = LifestyleProfile {
            factors: BTreeMap::new(),
            diet: Default::default(),
        };
        assert_eq!(dynamic_risk_score(&GeneticProfile::default(), &empty), 0.0);
    }

    #[test]
    fn test_fusion_is_deterministic() {
        let genetic = GeneticProfile(BTreeMap::from([("diyabet".to_string(), 0.5)]));
        let diagnosis = prediction("Grip", vec![0.8, 0.2]);
        let severity = prediction("orta", vec![0.5, 0.5]);
        let department = department();
        let lifestyle = lifestyle::score(&LifestyleChoices::default());
        let symptoms = vec!["anxiety".to_string()];
        let inputs = FusionInputs {
            diagnosis: &diagnosis,
            severity: &severity,
            department: &department,
            genetic: &genetic,
            lifestyle: &lifestyle,
            symptoms: &symptoms,
            drug_warnings: &[],
        };
        let at = chrono::Utc::now();
        let engine = FusionEngine::default();

        let a = engine.fuse(&inputs, Language::Tr, at);
        let b = engine.fuse(&inputs, Language::Tr, at);
        assert_eq!(a, b);
        assert_eq!(a.early_warning, WarningLevel::High);
        assert_eq!(a.emotional_support.len(), 1);
        assert!(a.diagnosis_description.contains("influenza"));
    }
}
