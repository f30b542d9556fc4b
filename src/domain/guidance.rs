//! Fixed guidance texts: screening, prevention, diagnosis descriptions,
//! psychological support and the localized phrases used by recommendations.
//!
//! Every patient-facing string exists in Turkish and English.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Output language for patient-facing text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Tr,
    #[default]
    En,
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tr" | "turkish" | "türkçe" => Ok(Self::Tr),
            "en" | "english" => Ok(Self::En),
            other => Err(format!("Unsupported language '{other}' (expected tr or en)")),
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tr => write!(f, "tr"),
            Self::En => write!(f, "en"),
        }
    }
}

/// A phrase in both supported languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Localized {
    pub tr: &'static str,
    pub en: &'static str,
}

impl Localized {
    #[must_use]
    pub const fn new(tr: &'static str, en: &'static str) -> Self {
        Self { tr, en }
    }

    #[must_use]
    pub fn get(&self, language: Language) -> &'static str {
        match language {
            Language::Tr => self.tr,
            Language::En => self.en,
        }
    }
}

const SCREENING_FALLBACK: Localized =
    Localized::new("Doktorunuza danışın", "Consult your physician");

const PREVENTION_FALLBACK: Localized = Localized::new(
    "Sağlıklı yaşam tarzını sürdürün",
    "Maintain a healthy lifestyle",
);

const DESCRIPTION_FALLBACK: Localized = Localized::new(
    "Bu tanı için açıklama bulunmamaktadır.",
    "No description is available for this diagnosis.",
);

/// Lookup tables for disease guidance.
#[derive(Debug, Clone)]
pub struct GuidanceRegistry {
    screening: BTreeMap<&'static str, Localized>,
    prevention: BTreeMap<&'static str, Vec<Localized>>,
    descriptions: BTreeMap<&'static str, Localized>,
}

impl Default for GuidanceRegistry {
    fn default() -> Self {
        let screening = BTreeMap::from([
            (
                "diyabet",
                Localized::new("Yılda bir HbA1c testi", "Yearly HbA1c test"),
            ),
            (
                "kalp_hastaliklari",
                Localized::new("Yılda bir lipid profili", "Yearly lipid profile"),
            ),
            (
                "kanser",
                Localized::new(
                    "Yaşa ve cinsiyete uygun tarama testleri",
                    "Age- and sex-appropriate screening tests",
                ),
            ),
            (
                "norolojik",
                Localized::new(
                    "Düzenli nörolojik muayene",
                    "Regular neurological examination",
                ),
            ),
        ]);

        let prevention = BTreeMap::from([
            (
                "diyabet",
                vec![
                    Localized::new("Düzenli egzersiz", "Regular exercise"),
                    Localized::new("Şeker tüketimini sınırlama", "Limit sugar intake"),
                ],
            ),
            (
                "kalp_hastaliklari",
                vec![
                    Localized::new("Düşük tuzlu diyet", "Low-salt diet"),
                    Localized::new(
                        "Düzenli kardiyovasküler egzersiz",
                        "Regular cardiovascular exercise",
                    ),
                ],
            ),
            (
                "kanser",
                vec![
                    Localized::new("Sigarayı bırakma", "Quit smoking"),
                    Localized::new("Alkol tüketimini sınırlama", "Limit alcohol consumption"),
                ],
            ),
            (
                "norolojik",
                vec![
                    Localized::new("Zihinsel aktiviteler", "Mental activities"),
                    Localized::new(
                        "Omega-3 açısından zengin beslenme",
                        "Omega-3 rich diet",
                    ),
                ],
            ),
        ]);

        let flu = Localized::new(
            "Grip, influenza virüsünün neden olduğu bir solunum yolu enfeksiyonudur. Yüksek ateş, baş ağrısı ve kas ağrıları ile kendini gösterir.",
            "Flu is a respiratory infection caused by the influenza virus. It presents with high fever, headache and muscle aches.",
        );
        let cold = Localized::new(
            "Soğuk algınlığı, üst solunum yollarını etkileyen viral bir enfeksiyondur. Belirtileri arasında burun akıntısı, boğaz ağrısı ve öksürük bulunur.",
            "The common cold is a viral infection of the upper airways. Symptoms include a runny nose, sore throat and cough.",
        );
        let bronchitis = Localized::new(
            "Bronşit, bronşların iltihaplanmasıdır. Öksürük, balgam ve göğüs ağrısı gibi belirtilerle kendini gösterir.",
            "Bronchitis is inflammation of the bronchi. It presents with cough, phlegm and chest pain.",
        );
        let pneumonia = Localized::new(
            "Zatürre, akciğerlerin iltihaplanmasıdır. Ateş, öksürük ve nefes darlığı gibi belirtilerle kendini gösterir.",
            "Pneumonia is inflammation of the lungs. It presents with fever, cough and shortness of breath.",
        );
        let asthma = Localized::new(
            "Astım, hava yollarının daralması ve iltihaplanması ile karakterize bir hastalıktır. Nefes darlığı, hırıltılı solunum ve öksürük ile kendini gösterir.",
            "Asthma is narrowing and inflammation of the airways. It presents with shortness of breath, wheezing and cough.",
        );
        let vertigo = Localized::new(
            "Vertigo, baş dönmesi hissi ile karakterize bir durumdur. Genellikle iç kulak problemleri veya beyinle ilgili sorunlardan kaynaklanır.",
            "Vertigo is a spinning sensation, usually caused by inner-ear or brain-related problems.",
        );
        let diabetes = Localized::new(
            "Diyabet, vücudun insülin üretiminde veya kullanımında sorun yaşadığı bir durumdur. Belirtileri arasında aşırı susama, sık idrara çıkma ve yorgunluk bulunur.",
            "Diabetes is a problem producing or using insulin. Symptoms include excessive thirst, frequent urination and fatigue.",
        );
        let hypertension = Localized::new(
            "Hipertansiyon, kan basıncının normalden yüksek olduğu bir durumdur. Genellikle belirti vermez.",
            "Hypertension is blood pressure above normal. It usually causes no symptoms.",
        );
        let ulcer = Localized::new(
            "Mide ülseri, midenin iç yüzeyinde oluşan yaralardır. Belirtileri arasında karın ağrısı, mide bulantısı ve hazımsızlık bulunur.",
            "A stomach ulcer is a sore in the stomach lining. Symptoms include abdominal pain, nausea and indigestion.",
        );
        let migraine = Localized::new(
            "Migren, genellikle başın bir tarafında yoğun ağrı ile karakterize bir baş ağrısı türüdür.",
            "Migraine is a headache with intense pain, usually on one side of the head.",
        );
        let anemia = Localized::new(
            "Anemi, vücudun yeterli sağlıklı kırmızı kan hücresine sahip olmaması durumudur.",
            "Anemia is a lack of healthy red blood cells.",
        );
        let rheumatism = Localized::new(
            "Romatizma, eklemlerde ağrı ve iltihaplanma ile karakterize bir durumdur.",
            "Rheumatism is pain and inflammation in the joints.",
        );
        let psoriasis = Localized::new(
            "Sedef hastalığı, cildin aşırı hızlı yenilenmesi sonucu oluşan bir durumdur. Kırmızı, pullu lezyonlarla kendini gösterir.",
            "Psoriasis is caused by overly fast skin renewal. It presents with red, scaly patches.",
        );
        let kidney_stone = Localized::new(
            "Böbrek taşı, böbreklerde oluşan sert mineral ve tuz birikintileridir. Belirtileri arasında şiddetli bel ağrısı ve idrarda kan bulunur.",
            "Kidney stones are hard mineral and salt deposits in the kidneys. Symptoms include severe flank pain and blood in urine.",
        );

        let descriptions = BTreeMap::from([
            ("Grip", flu),
            ("Flu", flu),
            ("Soğuk algınlığı", cold),
            ("Common cold", cold),
            ("Bronşit", bronchitis),
            ("Bronchitis", bronchitis),
            ("Zatürre", pneumonia),
            ("Pneumonia", pneumonia),
            ("Astım", asthma),
            ("Asthma", asthma),
            ("Vertigo", vertigo),
            ("Diyabet", diabetes),
            ("Diabetes", diabetes),
            ("Hipertansiyon", hypertension),
            ("Hypertension", hypertension),
            ("Mide ülseri", ulcer),
            ("Stomach ulcer", ulcer),
            ("Migren", migraine),
            ("Migraine", migraine),
            ("Anemi", anemia),
            ("Anemia", anemia),
            ("Romatizma", rheumatism),
            ("Rheumatism", rheumatism),
            ("Sedef hastalığı", psoriasis),
            ("Psoriasis", psoriasis),
            ("Böbrek taşı", kidney_stone),
            ("Kidney stone", kidney_stone),
        ]);

        Self {
            screening,
            prevention,
            descriptions,
        }
    }
}

impl GuidanceRegistry {
    /// Screening advice for a disease, or the generic fallback.
    #[must_use]
    pub fn screening(&self, disease: &str, language: Language) -> String {
        self.screening
            .get(disease)
            .unwrap_or(&SCREENING_FALLBACK)
            .get(language)
            .to_string()
    }

    /// Prevention strategies for a disease, or the generic fallback.
    #[must_use]
    pub fn prevention(&self, disease: &str, language: Language) -> Vec<String> {
        match self.prevention.get(disease) {
            Some(items) => items.iter().map(|p| p.get(language).to_string()).collect(),
            None => vec![PREVENTION_FALLBACK.get(language).to_string()],
        }
    }

    /// Short description of a predicted diagnosis label.
    #[must_use]
    pub fn describe_diagnosis(&self, diagnosis: &str, language: Language) -> String {
        self.descriptions
            .get(diagnosis)
            .unwrap_or(&DESCRIPTION_FALLBACK)
            .get(language)
            .to_string()
    }
}

/// Recommendation wording per severity tier.
pub mod phrases {
    use super::{Language, Localized};

    pub const EMERGENCY: Localized = Localized::new(
        "ACİL DURUM! En yakın acil servise başvurunuz!",
        "EMERGENCY! Go to the nearest emergency department now!",
    );

    #[must_use]
    pub fn urgent(department: &str, language: Language) -> String {
        match language {
            Language::Tr => format!("En kısa sürede {department} bölümüne başvurunuz."),
            Language::En => format!("Visit the {department} department as soon as possible."),
        }
    }

    #[must_use]
    pub fn routine(department: &str, language: Language) -> String {
        match language {
            Language::Tr => format!(
                "Durumunuz şu an için ciddi görünmüyor. Şikayetleriniz devam ederse rutin kontrol için {department} bölümüne başvurun."
            ),
            Language::En => format!(
                "Your condition does not look serious right now. If your symptoms continue, book a routine follow-up with the {department} department."
            ),
        }
    }

    pub const WARNING_HIGH: Localized = Localized::new(
        "Yüksek risk! Hemen bir doktora başvurun.",
        "High risk! See a doctor immediately.",
    );

    pub const WARNING_MODERATE: Localized =
        Localized::new("Orta risk! Kontrol önerilir.", "Moderate risk! A check-up is advised.");

    pub const WARNING_LOW: Localized = Localized::new(
        "Düşük risk. Sağlıklı yaşam tarzına devam edin.",
        "Low risk. Keep up a healthy lifestyle.",
    );
}

/// Psychological effect and support advice for mood-related symptoms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmotionalSupport {
    pub symptom: String,
    pub effect: String,
    pub advice: String,
}

/// Map mood-related symptoms to a support note; other symptoms yield nothing.
#[must_use]
pub fn emotional_support<'a, I>(symptoms: I, language: Language) -> Vec<EmotionalSupport>
where
    I: IntoIterator<Item = &'a String>,
{
    const EFFECT: Localized = Localized::new(
        "Bu belirtiler psikolojik stresin bir göstergesi olabilir.",
        "These symptoms can be a sign of psychological stress.",
    );
    const EXERCISE: Localized = Localized::new(
        "Düzenli egzersiz yapmayı deneyin.",
        "Try to exercise regularly.",
    );
    const BREATHING: Localized = Localized::new(
        "Meditasyon veya derin nefes alma tekniklerini uygulayın.",
        "Practice meditation or deep-breathing techniques.",
    );

    symptoms
        .into_iter()
        .filter_map(|symptom| {
            let advice = match symptom.to_lowercase().as_str() {
                "depresyon" | "depression" => EXERCISE,
                "anksiyete" | "anxiety" => BREATHING,
                _ => return None,
            };
            Some(EmotionalSupport {
                symptom: symptom.clone(),
                effect: EFFECT.get(language).to_string(),
                advice: advice.get(language).to_string(),
            })
        })
        .collect()
}
