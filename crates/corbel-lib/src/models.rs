//! Core data models for the corbel audit

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column order the scalers and the model were fitted on
pub const FEATURE_COLUMNS: [&str; 5] = ["fc", "b", "d", "a", "rho"];

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = FEATURE_COLUMNS.len();

/// Declared range and presentation of one design parameter
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ParameterSpec {
    pub column: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
    /// Decimals used when displaying the value
    pub decimals: usize,
}

impl ParameterSpec {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn format(&self, value: f64) -> String {
        format!("{:.*}", self.decimals, value)
    }
}

/// Bounds of the five design parameters, in feature column order
pub const PARAMETER_SPECS: [ParameterSpec; NUM_FEATURES] = [
    ParameterSpec {
        column: "fc",
        label: "Concrete strength f'c",
        unit: "MPa",
        min: 21.0,
        max: 35.0,
        default: 28.0,
        step: 1.0,
        decimals: 0,
    },
    ParameterSpec {
        column: "b",
        label: "Section width b",
        unit: "mm",
        min: 200.0,
        max: 400.0,
        default: 300.0,
        step: 1.0,
        decimals: 0,
    },
    ParameterSpec {
        column: "d",
        label: "Effective depth d",
        unit: "mm",
        min: 300.0,
        max: 600.0,
        default: 500.0,
        step: 1.0,
        decimals: 0,
    },
    ParameterSpec {
        column: "a",
        label: "Lever arm a",
        unit: "mm",
        min: 100.0,
        max: 500.0,
        default: 250.0,
        step: 1.0,
        decimals: 0,
    },
    ParameterSpec {
        column: "rho",
        label: "Reinforcement ratio \u{03c1}",
        unit: "",
        min: 0.0040,
        max: 0.0150,
        default: 0.0100,
        step: 0.0001,
        decimals: 4,
    },
];

/// Rejected design parameter
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParameterError {
    #[error("{column} must be a finite number")]
    NonFinite { column: &'static str },
    #[error("{column} = {value} is outside the allowed range [{min}, {max}]")]
    OutOfRange {
        column: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
}

/// The five corbel design parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DesignParameters {
    /// Concrete compressive strength (MPa)
    pub fc: f64,
    /// Section width (mm)
    pub b: f64,
    /// Effective depth (mm)
    pub d: f64,
    /// Lever arm / shear span (mm)
    pub a: f64,
    /// Reinforcement ratio
    pub rho: f64,
}

impl Default for DesignParameters {
    fn default() -> Self {
        Self::from_feature_row([
            PARAMETER_SPECS[0].default,
            PARAMETER_SPECS[1].default,
            PARAMETER_SPECS[2].default,
            PARAMETER_SPECS[3].default,
            PARAMETER_SPECS[4].default,
        ])
    }
}

impl DesignParameters {
    /// Values in the fixed training column order
    pub fn to_feature_row(&self) -> [f64; NUM_FEATURES] {
        [self.fc, self.b, self.d, self.a, self.rho]
    }

    pub fn from_feature_row(row: [f64; NUM_FEATURES]) -> Self {
        let [fc, b, d, a, rho] = row;
        Self { fc, b, d, a, rho }
    }

    /// Check every value against its declared range
    pub fn validate(&self) -> Result<(), ParameterError> {
        for (spec, value) in PARAMETER_SPECS.iter().zip(self.to_feature_row()) {
            if !value.is_finite() {
                return Err(ParameterError::NonFinite { column: spec.column });
            }
            if !spec.contains(value) {
                return Err(ParameterError::OutOfRange {
                    column: spec.column,
                    value,
                    min: spec.min,
                    max: spec.max,
                });
            }
        }
        Ok(())
    }
}

/// Structural classification surfaced by the a/d check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    ShortCorbel,
}

/// Outcome of the narrative call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum NarrativeOutcome {
    Generated { text: String },
    Failed { error: String },
}

impl NarrativeOutcome {
    pub fn text(&self) -> Option<&str> {
        match self {
            NarrativeOutcome::Generated { text } => Some(text),
            NarrativeOutcome::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, NarrativeOutcome::Failed { .. })
    }
}

/// Result of one audit cycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub parameters: DesignParameters,
    pub predicted_load_kn: f64,
    pub ad_ratio: f64,
    pub classification: Option<Classification>,
    pub warning: Option<String>,
    pub narrative: NarrativeOutcome,
    pub model_version: String,
    pub generated_at: i64,
}

/// Audit request as submitted by the page, the API or the CLI
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRequest {
    pub parameters: DesignParameters,
    #[serde(default)]
    pub api_key: Option<String>,
}
