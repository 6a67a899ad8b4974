//! Trained artifact loading
//!
//! The regression model and its two scalers are read from disk once per
//! process and shared read-only afterwards.

use super::inference::{MlpRegressor, OnnxRegressor};
use super::scaler::Scaler;
use super::Regressor;
use crate::models::FEATURE_COLUMNS;
use once_cell::sync::OnceCell;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Hex characters of the model digest kept in the version string
const VERSION_DIGEST_LEN: usize = 12;

/// Artifact that could not be loaded
#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("checksum mismatch for {path:?}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
    #[error("unsupported model format for {path:?} (expected .onnx or .json)")]
    UnsupportedFormat { path: PathBuf },
    #[error("invalid artifact {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

/// Locations of the three trained artifacts
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArtifactPaths {
    pub model: PathBuf,
    pub input_scaler: PathBuf,
    pub output_scaler: PathBuf,
}

impl Default for ArtifactPaths {
    fn default() -> Self {
        Self {
            model: PathBuf::from("artifacts/modelo_corbel.onnx"),
            input_scaler: PathBuf::from("artifacts/scaler_x.json"),
            output_scaler: PathBuf::from("artifacts/scaler_y.json"),
        }
    }
}

/// Optional SHA256 digests (hex) verified before parsing
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ArtifactChecksums {
    pub model: Option<String>,
    pub input_scaler: Option<String>,
    pub output_scaler: Option<String>,
}

/// The fitted model and its matching scaler pair
pub struct TrainedArtifacts {
    model: Box<dyn Regressor>,
    input_scaler: Scaler,
    output_scaler: Scaler,
    model_version: String,
}

impl fmt::Debug for TrainedArtifacts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainedArtifacts")
            .field("model_format", &self.model.format())
            .field("input_scaler", &self.input_scaler)
            .field("output_scaler", &self.output_scaler)
            .field("model_version", &self.model_version)
            .finish()
    }
}

impl TrainedArtifacts {
    /// Assemble artifacts, checking that the scalers fit the model's input and output
    pub fn new(
        model: Box<dyn Regressor>,
        input_scaler: Scaler,
        output_scaler: Scaler,
        model_version: impl Into<String>,
    ) -> anyhow::Result<Self> {
        input_scaler.expect_columns(&FEATURE_COLUMNS)?;
        output_scaler.expect_width(1)?;
        Ok(Self {
            model,
            input_scaler,
            output_scaler,
            model_version: model_version.into(),
        })
    }

    /// Read, verify and parse all three artifacts
    pub fn load(
        paths: &ArtifactPaths,
        checksums: &ArtifactChecksums,
    ) -> Result<Self, ArtifactError> {
        let model_bytes = read_verified(&paths.model, checksums.model.as_deref())?;
        let input_bytes = read_verified(&paths.input_scaler, checksums.input_scaler.as_deref())?;
        let output_bytes = read_verified(&paths.output_scaler, checksums.output_scaler.as_deref())?;

        let model = parse_model(&paths.model, &model_bytes)?;
        let input_scaler =
            Scaler::from_json(&input_bytes).map_err(|source| ArtifactError::Invalid {
                path: paths.input_scaler.clone(),
                source: source.into(),
            })?;
        let output_scaler =
            Scaler::from_json(&output_bytes).map_err(|source| ArtifactError::Invalid {
                path: paths.output_scaler.clone(),
                source: source.into(),
            })?;

        input_scaler
            .expect_columns(&FEATURE_COLUMNS)
            .map_err(|e| ArtifactError::Invalid {
                path: paths.input_scaler.clone(),
                source: e.into(),
            })?;
        output_scaler.expect_width(1).map_err(|e| ArtifactError::Invalid {
            path: paths.output_scaler.clone(),
            source: e.into(),
        })?;

        let model_version = model_version(&paths.model, &model_bytes);
        debug!(
            model = ?paths.model,
            model_format = model.format(),
            model_version = %model_version,
            "Trained artifacts loaded"
        );

        Ok(Self {
            model,
            input_scaler,
            output_scaler,
            model_version,
        })
    }

    pub fn model(&self) -> &dyn Regressor {
        self.model.as_ref()
    }

    pub fn input_scaler(&self) -> &Scaler {
        &self.input_scaler
    }

    pub fn output_scaler(&self) -> &Scaler {
        &self.output_scaler
    }

    pub fn model_version(&self) -> &str {
        &self.model_version
    }
}

fn read_verified(path: &Path, expected: Option<&str>) -> Result<Vec<u8>, ArtifactError> {
    let bytes = std::fs::read(path).map_err(|source| ArtifactError::Read {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(expected) = expected {
        let actual = sha256_hex(&bytes);
        if !actual.eq_ignore_ascii_case(expected.trim()) {
            return Err(ArtifactError::ChecksumMismatch {
                path: path.to_path_buf(),
                expected: expected.to_string(),
                actual,
            });
        }
        debug!(path = ?path, "Artifact checksum verified");
    }

    Ok(bytes)
}

fn parse_model(path: &Path, bytes: &[u8]) -> Result<Box<dyn Regressor>, ArtifactError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let parsed: anyhow::Result<Box<dyn Regressor>> = match extension.as_deref() {
        Some("onnx") => OnnxRegressor::new(bytes).map(|m| Box::new(m) as Box<dyn Regressor>),
        Some("json") => MlpRegressor::from_json(bytes).map(|m| Box::new(m) as Box<dyn Regressor>),
        _ => {
            return Err(ArtifactError::UnsupportedFormat {
                path: path.to_path_buf(),
            })
        }
    };

    parsed.map_err(|source| ArtifactError::Invalid {
        path: path.to_path_buf(),
        source: source.into(),
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

/// `<file stem>-<digest prefix>`
fn model_version(path: &Path, bytes: &[u8]) -> String {
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    let digest = sha256_hex(bytes);
    format!("{}-{}", stem, &digest[..VERSION_DIGEST_LEN])
}

/// Process-wide, load-once artifact cache
#[derive(Debug)]
pub struct ArtifactLoader {
    paths: ArtifactPaths,
    checksums: ArtifactChecksums,
    cell: OnceCell<Arc<TrainedArtifacts>>,
}

impl ArtifactLoader {
    pub fn new(paths: ArtifactPaths, checksums: ArtifactChecksums) -> Self {
        Self {
            paths,
            checksums,
            cell: OnceCell::new(),
        }
    }

    /// Return the cached artifacts, loading them on first call
    pub fn get(&self) -> Result<Arc<TrainedArtifacts>, ArtifactError> {
        self.cell
            .get_or_try_init(|| TrainedArtifacts::load(&self.paths, &self.checksums).map(Arc::new))
            .cloned()
    }

    #[cfg(test)]
    fn is_loaded(&self) -> bool {
        self.cell.get().is_some()
    }

    #[cfg(test)]
    fn paths(&self) -> &ArtifactPaths {
        &self.paths
    }
}
