//! Load-capacity prediction engine

mod artifacts;
mod inference;
mod pipeline;
mod scaler;

pub use artifacts::{
    ArtifactChecksums, ArtifactError, ArtifactLoader, ArtifactPaths, TrainedArtifacts,
};
pub use inference::{Activation, MlpRegressor, OnnxRegressor};
pub use pipeline::{InferenceError, InferencePipeline};
pub use scaler::{Scaler, ScalerError, ScalerKind};

use anyhow::Result;

/// Trait for regression model implementations
pub trait Regressor: Send + Sync {
    /// Predict one scaled target value from one scaled feature row
    fn predict(&self, scaled_row: &[f64]) -> Result<f64>;

    /// Short name of the artifact format
    fn format(&self) -> &'static str;
}
