//! Runtime configuration read from `PULSAI_*` environment variables.
//!
//! Supported:
//! - `PULSAI_DB_PATH` (default `pulsai.db`)
//! - `PULSAI_MODEL_PATH` (default `models`)
//! - `PULSAI_LANGUAGE` = `tr` | `en` (default `en`)
//! - `PULSAI_REQUIRE_MODEL_MANIFEST` = `1` | `true` | `yes`
//! - `PULSAI_LOG_MODE` = `file` | `stderr` | `auto`
//! - `PULSAI_LOG_FILE` (default `pulsai.log`)
//!
//! Risk calibration, comma-separated values in [0, 1]:
//! - `PULSAI_SEVERITY_THRESHOLDS="emergency,urgent"` (default `0.7,0.4`)
//! - `PULSAI_GENETIC_BANDS="high,medium"` (default `0.5,0.3`)
//! - `PULSAI_WARNING_THRESHOLDS="high,moderate"` (default `0.7,0.4`)
//! - `PULSAI_DEGREE_WEIGHTS="first,second"` (default `0.5,0.25`)
//! - `PULSAI_LIFESTYLE_WEIGHTS="smoker,non_smoker,exercises,sedentary"`
//!   (default `0.9,0.1,0.2,0.8`)

use std::path::PathBuf;
use std::str::FromStr;

use crate::domain::{DegreeWeights, Language, LifestyleWeights, RiskThresholds};

/// Where log output goes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogMode {
    File,
    Stderr,
    /// File when stdout is a terminal, stderr otherwise
    #[default]
    Auto,
}

impl FromStr for LogMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "file" => Ok(Self::File),
            "stderr" | "stdout" => Ok(Self::Stderr),
            "auto" => Ok(Self::Auto),
            other => Err(format!("Unknown log mode '{other}' (expected file, stderr or auto)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub language: Language,
    /// Refuse to load models without a manifest
    pub require_model_manifest: bool,
    pub log_mode: LogMode,
    pub log_file: PathBuf,
    pub thresholds: RiskThresholds,
    pub degree_weights: DegreeWeights,
    pub lifestyle_weights: LifestyleWeights,
    /// Rejected values, to be logged once a subscriber is installed
    pub warnings: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("pulsai.db"),
            model_path: PathBuf::from("models"),
            language: Language::En,
            require_model_manifest: false,
            log_mode: LogMode::Auto,
            log_file: PathBuf::from("pulsai.log"),
            thresholds: RiskThresholds::default(),
            degree_weights: DegreeWeights::default(),
            lifestyle_weights: LifestyleWeights::default(),
            warnings: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Read configuration from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    ///
    /// Invalid values fall back to the default and are recorded in `warnings`.
    #[must_use]
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();

        if let Some(v) = non_empty(lookup("PULSAI_DB_PATH")) {
            cfg.db_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty(lookup("PULSAI_MODEL_PATH")) {
            cfg.model_path = PathBuf::from(v);
        }
        if let Some(v) = non_empty(lookup("PULSAI_LANGUAGE")) {
            match v.parse() {
                Ok(language) => cfg.language = language,
                Err(e) => cfg.warn("PULSAI_LANGUAGE", &e),
            }
        }
        cfg.require_model_manifest = lookup("PULSAI_REQUIRE_MODEL_MANIFEST")
            .as_deref()
            .is_some_and(parse_bool);
        if let Some(v) = non_empty(lookup("PULSAI_LOG_MODE")) {
            match v.parse() {
                Ok(mode) => cfg.log_mode = mode,
                Err(e) => cfg.warn("PULSAI_LOG_MODE", &e),
            }
        }
        if let Some(v) = non_empty(lookup("PULSAI_LOG_FILE")) {
            cfg.log_file = PathBuf::from(v);
        }

        if let Some([high, low]) = cfg.ordered_pair(&lookup, "PULSAI_SEVERITY_THRESHOLDS") {
            cfg.thresholds.emergency = high;
            cfg.thresholds.urgent = low;
        }
        if let Some([high, low]) = cfg.ordered_pair(&lookup, "PULSAI_GENETIC_BANDS") {
            cfg.thresholds.high_genetic = high;
            cfg.thresholds.medium_genetic = low;
        }
        if let Some([high, low]) = cfg.ordered_pair(&lookup, "PULSAI_WARNING_THRESHOLDS") {
            cfg.thresholds.warning_high = high;
            cfg.thresholds.warning_moderate = low;
        }
        if let Some([first, second]) = cfg.ordered_pair(&lookup, "PULSAI_DEGREE_WEIGHTS") {
            cfg.degree_weights = DegreeWeights { first, second };
        }
        if let Some([smoker, non_smoker, exercises, sedentary]) =
            cfg.unit_values(&lookup, "PULSAI_LIFESTYLE_WEIGHTS")
        {
            cfg.lifestyle_weights = LifestyleWeights {
                smoker,
                non_smoker,
                exercises,
                sedentary,
            };
        }

        cfg
    }

    fn warn(&mut self, name: &str, reason: &str) {
        self.warnings.push(format!("Ignoring {name}: {reason}"));
    }

    fn unit_values<F, const N: usize>(&mut self, lookup: &F, name: &str) -> Option<[f64; N]>
    where
        F: Fn(&str) -> Option<String>,
    {
        let raw = non_empty(lookup(name))?;
        let parsed = parse_unit_values::<N>(&raw);
        if parsed.is_none() {
            self.warn(name, &format!("expected {N} comma-separated values in [0, 1]"));
        }
        parsed
    }

    /// Two values where the first must be at least the second.
    fn ordered_pair<F>(&mut self, lookup: &F, name: &str) -> Option<[f64; 2]>
    where
        F: Fn(&str) -> Option<String>,
    {
        let [a, b] = self.unit_values::<F, 2>(lookup, name)?;
        if a < b {
            self.warn(name, "first value must not be below the second");
            return None;
        }
        Some([a, b])
    }
}

fn parse_unit_values<const N: usize>(raw: &str) -> Option<[f64; N]> {
    let parts: Vec<f64> = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>().ok())
        .collect::<Option<_>>()?;
    let values: [f64; N] = parts.try_into().ok()?;
    values
        .iter()
        .all(|v| v.is_finite() && (0.0..=1.0).contains(v))
        .then_some(values)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> bool {
    matches!(value.trim(), "1" | "true" | "TRUE" | "yes" | "YES")
}
