//! Model store adapter: persistence of the trained bundles and feature schema.
//!
//! A model directory holds:
//! - `feature_schema.json`
//! - `diagnosis_model.json`, `severity_model.json`, `department_model.json`
//! - `manifest.json` with the SHA-256 of each file above
//!
//! Every file is written to a temporary file in the same directory and then
//! renamed into place. The manifest is written last, so a directory with a
//! manifest always has a complete artifact set.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::softmax::SoftmaxClassifier;
use crate::domain::{FeatureSchema, PredictionTarget};
use crate::ports::ClassifierBundle;
use crate::{PulsaiError, Result};

pub const SCHEMA_FILE: &str = "feature_schema.json";
pub const MANIFEST_FILE: &str = "manifest.json";
const MANIFEST_VERSION: u32 = 1;

/// Error type for model directory operations.
#[derive(Debug, thiserror::Error)]
pub enum ModelStoreError {
    #[error("Failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {file}: {source}")]
    Format {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("manifest.json missing (required by configuration)")]
    ManifestMissing,

    #[error("Unsupported manifest version: {0}")]
    UnsupportedVersion(u32),

    #[error("manifest.json does not bind {0}")]
    Unbound(String),

    #[error("File hash mismatch for {0}")]
    HashMismatch(String),

    #[error("Invalid model in {file}: {reason}")]
    InvalidModel { file: String, reason: String },
}

/// SHA-256 bindings of every artifact in a model directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelManifest {
    pub version: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    /// Relative file name -> lowercase hex SHA-256
    pub files: BTreeMap<String, String>,
}

/// Everything needed to rebuild the ensemble and encode new intakes.
#[derive(Debug, Clone)]
pub struct ModelArtifacts {
    pub schema: FeatureSchema,
    pub bundles: Vec<ClassifierBundle<SoftmaxClassifier>>,
}

/// A model directory on local disk.
#[derive(Debug, Clone)]
pub struct ModelStore {
    dir: PathBuf,
    require_manifest: bool,
}

fn sha256_hex_bytes(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

fn artifact_files() -> Vec<String> {
    std::iter::once(SCHEMA_FILE.to_string())
        .chain(PredictionTarget::ALL.iter().map(|t| t.artifact_name()))
        .collect()
}

impl ModelStore {
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            require_manifest: false,
        }
    }

    /// Refuse to load a directory without `manifest.json`.
    #[must_use]
    pub fn require_manifest(mut self, require: bool) -> Self {
        self.require_manifest = require;
        self
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the schema and one bundle per target, then the manifest.
    ///
    /// # Errors
    /// Returns error if a target is missing, a bundle is inconsistent with
    /// the schema, or a write fails.
    pub fn save(
        &self,
        schema: &FeatureSchema,
        bundles: &[ClassifierBundle<SoftmaxClassifier>],
    ) -> Result<ModelManifest> {
        for target in PredictionTarget::ALL {
            let bundle = bundles
                .iter()
                .find(|b| b.target == target)
                .ok_or_else(|| PulsaiError::ModelNotLoaded(format!("{target} classifier")))?;
            check_width(schema, bundle)?;
        }

        fs::create_dir_all(&self.dir).map_err(|source| ModelStoreError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut files = BTreeMap::new();
        let schema_bytes = serde_json::to_vec_pretty(schema)?;
        files.insert(SCHEMA_FILE.to_string(), self.write_atomic(SCHEMA_FILE, &schema_bytes)?);

        for bundle in bundles {
            let name = bundle.target.artifact_name();
            let bytes = serde_json::to_vec_pretty(bundle)?;
            let hash = self.write_atomic(&name, &bytes)?;
            files.insert(name, hash);
        }

        let manifest = ModelManifest {
            version: MANIFEST_VERSION,
            created_at: chrono::Utc::now(),
            files,
        };
        let manifest_bytes = serde_json::to_vec_pretty(&manifest)?;
        self.write_atomic(MANIFEST_FILE, &manifest_bytes)?;

        tracing::info!(
            "Saved {} model artifacts to {}",
            manifest.files.len(),
            self.dir.display()
        );
        Ok(manifest)
    }

    /// Write bytes via temp file + rename; returns the SHA-256 of the content.
    fn write_atomic(&self, name: &str, bytes: &[u8]) -> std::result::Result<String, ModelStoreError> {
        let path = self.dir.join(name);
        let io_err = |source| ModelStoreError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(bytes).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        Ok(sha256_hex_bytes(bytes))
    }

    /// Read `manifest.json` and check every bound file against its hash.
    ///
    /// # Returns
    /// `None` if there is no manifest and none is required.
    ///
    /// # Errors
    /// Returns error on a missing required manifest, an artifact the manifest
    /// does not bind, or a hash mismatch.
    pub fn verify(&self) -> std::result::Result<Option<ModelManifest>, ModelStoreError> {
        let manifest_path = self.dir.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            if self.require_manifest {
                return Err(ModelStoreError::ManifestMissing);
            }
            tracing::warn!(
                "No {MANIFEST_FILE} in {}; loading models without integrity check",
                self.dir.display()
            );
            return Ok(None);
        }

        let content = fs::read(&manifest_path).map_err(|source| ModelStoreError::Io {
            path: manifest_path.clone(),
            source,
        })?;
        let manifest: ModelManifest =
            serde_json::from_slice(&content).map_err(|source| ModelStoreError::Format {
                file: MANIFEST_FILE.to_string(),
                source,
            })?;
        if manifest.version != MANIFEST_VERSION {
            return Err(ModelStoreError::UnsupportedVersion(manifest.version));
        }

        for name in artifact_files() {
            if !manifest.files.contains_key(&name) {
                return Err(ModelStoreError::Unbound(name));
            }
        }

        for (rel, expected_hex) in &manifest.files {
            let path = self.dir.join(rel);
            let bytes = fs::read(&path).map_err(|source| ModelStoreError::Io {
                path: path.clone(),
                source,
            })?;
            if sha256_hex_bytes(&bytes) != expected_hex.to_lowercase() {
                return Err(ModelStoreError::HashMismatch(rel.clone()));
            }
        }

        tracing::debug!("Verified {} files against {MANIFEST_FILE}", manifest.files.len());
        Ok(Some(manifest))
    }

    /// Load the schema and all three bundles.
    ///
    /// # Errors
    /// Returns `PulsaiError::ModelNotLoaded` if any artifact is absent, and an
    /// integrity error for hash, format or width mismatches.
    pub fn load(&self) -> Result<ModelArtifacts> {
        for name in artifact_files() {
            if !self.dir.join(&name).is_file() {
                return Err(PulsaiError::ModelNotLoaded(format!(
                    "{} not found in {}",
                    name,
                    self.dir.display()
                )));
            }
        }

        self.verify()?;

        let schema: FeatureSchema = self.read_json(SCHEMA_FILE)?;
        if schema.is_empty() {
            return Err(ModelStoreError::InvalidModel {
                file: SCHEMA_FILE.to_string(),
                reason: "schema has no columns".to_string(),
            }
            .into());
        }

        let mut bundles = Vec::with_capacity(PredictionTarget::ALL.len());
        for target in PredictionTarget::ALL {
            let name = target.artifact_name();
            let bundle: ClassifierBundle<SoftmaxClassifier> = self.read_json(&name)?;

            if bundle.target != target {
                return Err(ModelStoreError::InvalidModel {
                    file: name,
                    reason: format!("contains a {} bundle", bundle.target),
                }
                .into());
            }
            bundle
                .classifier
                .validate()
                .map_err(|e| ModelStoreError::InvalidModel {
                    file: name.clone(),
                    reason: e.to_string(),
                })?;
            bundle.validate()?;
            check_width(&schema, &bundle)?;
            bundles.push(bundle);
        }

        tracing::info!(
            "Loaded models from {} (feature width {})",
            self.dir.display(),
            schema.width()
        );
        Ok(ModelArtifacts { schema, bundles })
    }

    fn read_json<T: serde::de::DeserializeOwned>(
        &self,
        name: &str,
    ) -> std::result::Result<T, ModelStoreError> {
        let path = self.dir.join(name);
        let bytes = fs::read(&path).map_err(|source| ModelStoreError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ModelStoreError::Format {
            file: name.to_string(),
            source,
        })
    }
}

fn check_width(
    schema: &FeatureSchema,
    bundle: &ClassifierBundle<SoftmaxClassifier>,
) -> Result<()> {
    if bundle.n_features() != schema.width() {
        return Err(PulsaiError::SchemaMismatch {
            expected: schema.width(),
            actual: bundle.n_features(),
        });
    }
    Ok(())
}
