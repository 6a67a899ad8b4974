//! Fitted feature scalers
//!
//! Scalers are exported from training as JSON and describe a per-column
//! affine transform. The input scaler is applied forward before inference and
//! the output scaler is applied inverse to recover physical units.

use serde::Deserialize;
use thiserror::Error;

/// Scaler document rejected at load time
#[derive(Debug, Error, PartialEq)]
pub enum ScalerError {
    #[error("scaler has {offsets} offsets but {scales} scales")]
    LengthMismatch { offsets: usize, scales: usize },
    #[error("scaler expects {expected} features, got {actual}")]
    FeatureCount { expected: usize, actual: usize },
    #[error("scale for feature {index} must be finite and non-zero")]
    ZeroScale { index: usize },
    #[error("scaler feature names {found:?} do not match expected columns {expected:?}")]
    FeatureNames {
        expected: Vec<String>,
        found: Vec<String>,
    },
}

/// Kind of fitted transform
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScalerKind {
    /// `z = (x - mean) / scale`
    Standard { mean: Vec<f64>, scale: Vec<f64> },
    /// `z = x * scale + min`
    MinMax { min: Vec<f64>, scale: Vec<f64> },
}

/// A fitted, reversible per-column scaler
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Scaler {
    #[serde(flatten)]
    kind: ScalerKind,
    #[serde(default)]
    feature_names: Option<Vec<String>>,
}

impl Scaler {
    pub fn standard(mean: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalerError> {
        let scaler = Self {
            kind: ScalerKind::Standard { mean, scale },
            feature_names: None,
        };
        scaler.check_consistency()?;
        Ok(scaler)
    }

    pub fn min_max(min: Vec<f64>, scale: Vec<f64>) -> Result<Self, ScalerError> {
        let scaler = Self {
            kind: ScalerKind::MinMax { min, scale },
            feature_names: None,
        };
        scaler.check_consistency()?;
        Ok(scaler)
    }

    /// Parse a scaler from its JSON export
    pub fn from_json(bytes: &[u8]) -> anyhow::Result<Self> {
        let scaler: Scaler = serde_json::from_slice(bytes)?;
        scaler.check_consistency()?;
        Ok(scaler)
    }

    pub fn n_features(&self) -> usize {
        match &self.kind {
            ScalerKind::Standard { scale, .. } | ScalerKind::MinMax { scale, .. } => scale.len(),
        }
    }

    fn check_consistency(&self) -> Result<(), ScalerError> {
        let (offset, scale) = match &self.kind {
            ScalerKind::Standard { mean, scale } => (mean, scale),
            ScalerKind::MinMax { min, scale } => (min, scale),
        };
        if offset.len() != scale.len() {
            return Err(ScalerError::LengthMismatch {
                offsets: offset.len(),
                scales: scale.len(),
            });
        }
        if let Some(index) = scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(ScalerError::ZeroScale { index });
        }
        Ok(())
    }

    /// Require exactly `width` features
    pub fn expect_width(&self, width: usize) -> Result<(), ScalerError> {
        if self.n_features() != width {
            return Err(ScalerError::FeatureCount {
                expected: width,
                actual: self.n_features(),
            });
        }
        Ok(())
    }

    /// Require the fitted columns, and their names when the export carries them
    pub fn expect_columns(&self, columns: &[&str]) -> Result<(), ScalerError> {
        self.expect_width(columns.len())?;
        if let Some(names) = &self.feature_names {
            if names.iter().map(String::as_str).ne(columns.iter().copied()) {
                return Err(ScalerError::FeatureNames {
                    expected: columns.iter().map(|c| c.to_string()).collect(),
                    found: names.clone(),
                });
            }
        }
        Ok(())
    }

    /// Forward transform of one row
    pub fn transform(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        self.check_row(row)?;
        let scaled = match &self.kind {
            ScalerKind::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(x, (m, s))| (x - m) / s)
                .collect(),
            ScalerKind::MinMax { min, scale } => row
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(x, (m, s))| x * s + m)
                .collect(),
        };
        Ok(scaled)
    }

    /// Inverse transform of one row
    pub fn inverse_transform(&self, row: &[f64]) -> Result<Vec<f64>, ScalerError> {
        self.check_row(row)?;
        let restored = match &self.kind {
            ScalerKind::Standard { mean, scale } => row
                .iter()
                .zip(mean.iter().zip(scale))
                .map(|(z, (m, s))| z * s + m)
                .collect(),
            ScalerKind::MinMax { min, scale } => row
                .iter()
                .zip(min.iter().zip(scale))
                .map(|(z, (m, s))| (z - m) / s)
                .collect(),
        };
        Ok(restored)
    }

    fn check_row(&self, row: &[f64]) -> Result<(), ScalerError> {
        if row.len() != self.n_features() {
            return Err(ScalerError::FeatureCount {
                expected: self.n_features(),
                actual: row.len(),
            });
        }
        Ok(())
    }
}
