//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with external libraries:
//! - `softmax`: multinomial logistic regression implementing `Classifier`
//! - `model_store`: JSON model artifacts bound by a SHA-256 manifest
//! - `sqlite`: SQLite for patient and visit storage
//! - `sanitize`: PII filtering for logs

pub mod model_store;
pub mod sanitize;
pub mod softmax;
pub mod sqlite;

// Re-export error types for lib.rs
pub use model_store::ModelStoreError;
pub use softmax::SoftmaxError;
pub use sqlite::StorageError;
