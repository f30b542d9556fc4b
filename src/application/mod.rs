//! Application layer: Use cases and services.
//!
//! This module orchestrates domain logic with ports to implement
//! the core use cases of the application.

pub mod ensemble;
pub mod report;
pub mod training;
pub mod triage;

pub use ensemble::{ClassifierEnsemble, EnsembleBuilder};
pub use report::{render_report, ReportOptions};
pub use training::{train, TrainedModels, TrainingConfig, TrainingRecord, TrainingReport, TrainingSet};
pub use triage::{TriageRequest, TriageService};
