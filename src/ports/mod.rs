//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the triage pipeline and the model/storage backends.

mod classifier;
mod visit_recorder;

pub use classifier::{BundleError, Classifier, ClassifierBundle};
pub use visit_recorder::{VisitPage, VisitRecorder};
