//! # PulsAI
//!
//! Symptom-intake triage core.
//!
//! This crate provides:
//! - Feature encoding of intake forms against a persisted schema
//! - A three-target classifier ensemble (diagnosis, severity, department)
//! - Genetic and lifestyle risk scoring fused into one recommendation
//! - Local persistence of patients and visits
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core triage types and pure logic (encoder, scorers, fusion)
//! - `ports`: Trait definitions for classifiers and visit persistence
//! - `adapters`: Concrete implementations (softmax model, model store, SQLite)
//! - `application`: Use cases orchestrating domain and ports
//! - `config`: Environment-driven settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use domain::{AnalysisResult, IntakeForm, Language, SeverityTier};

/// Result type for PulsAI operations
pub type Result<T> = std::result::Result<T, PulsaiError>;

/// Main error type for PulsAI
#[derive(Debug, thiserror::Error)]
pub enum PulsaiError {
    #[error("Feature encoding failed: {0}")]
    Encoding(#[from] domain::EncodingError),

    #[error("Model not loaded: {0}")]
    ModelNotLoaded(String),

    #[error("Feature vector has {actual} columns but the models expect {expected}")]
    SchemaMismatch { expected: usize, actual: usize },

    #[error("Classifier bundle error: {0}")]
    Bundle(#[from] ports::BundleError),

    #[error("Classifier error: {0}")]
    Classifier(#[from] adapters::SoftmaxError),

    #[error("Model store error: {0}")]
    ModelStore(#[from] adapters::ModelStoreError),

    #[error("Storage operation failed: {0}")]
    Storage(#[from] adapters::StorageError),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
