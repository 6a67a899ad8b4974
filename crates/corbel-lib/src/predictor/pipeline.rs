//! Standardize → predict → inverse-standardize

use super::artifacts::TrainedArtifacts;
use super::scaler::ScalerError;
use crate::models::DesignParameters;
use std::sync::Arc;
use thiserror::Error;

/// Failure of one inference run
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("scaling failed: {0}")]
    Scaling(#[from] ScalerError),
    #[error("model evaluation failed: {0}")]
    Model(String),
    #[error("model produced a non-finite load ({0})")]
    NonFinite(f64),
}

/// Runs the trained artifacts on one set of design parameters
#[derive(Debug, Clone)]
pub struct InferencePipeline {
    artifacts: Arc<TrainedArtifacts>,
}

impl InferencePipeline {
    pub fn new(artifacts: Arc<TrainedArtifacts>) -> Self {
        Self { artifacts }
    }

    pub fn model_version(&self) -> &str {
        self.artifacts.model_version()
    }

    /// Predicted ultimate load capacity in kN.
    ///
    /// The input scaler is applied forward and the output scaler inverse.
    /// The result is not bounded; only non-finite values are rejected.
    pub fn predict_load_kn(&self, params: &DesignParameters) -> Result<f64, InferenceError> {
        let row = params.to_feature_row();
        let scaled = self.artifacts.input_scaler().transform(&row)?;

        let scaled_load = self
            .artifacts
            .model()
            .predict(&scaled)
            .map_err(|e| InferenceError::Model(format!("{e:#}")))?;

        let load = self
            .artifacts
            .output_scaler()
            .inverse_transform(&[scaled_load])?[0];

        if !load.is_finite() {
            return Err(InferenceError::NonFinite(load));
        }
        Ok(load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PARAMETER_SPECS;
    use crate::predictor::{Activation, MlpRegressor, Regressor, Scaler};

    fn input_scaler() -> Scaler {
        Scaler::standard(
            vec![28.0, 300.0, 450.0, 300.0, 0.0095],
            vec![4.3, 58.0, 87.0, 116.0, 0.0032],
        )
        .unwrap()
    }

    fn output_scaler() -> Scaler {
        Scaler::standard(vec![650.0], vec![180.0]).unwrap()
    }

    fn mlp() -> MlpRegressor {
        MlpRegressor::from_weights(
            Activation::Relu,
            vec![
                vec![
                    vec![0.4, -0.2, 0.1],
                    vec![0.3, 0.1, -0.1],
                    vec![0.5, 0.2, 0.3],
                    vec![-0.6, -0.1, 0.2],
                    vec![0.4, 0.3, -0.2],
                ],
                vec![vec![0.9], vec![-0.5], vec![0.4]],
            ],
            vec![vec![0.1, 0.0, -0.1], vec![0.05]],
        )
        .unwrap()
    }

    fn pipeline() -> InferencePipeline {
        let artifacts =
            TrainedArtifacts::new(Box::new(mlp()), input_scaler(), output_scaler(), "test-v1")
                .unwrap();
        InferencePipeline::new(Arc::new(artifacts))
    }

    #[test]
    fn test_prediction_matches_manual_pipeline() {
        let params = DesignParameters::default();
        let scaled = input_scaler().transform(&params.to_feature_row()).unwrap();
        let expected = mlp().predict(&scaled).unwrap() * 180.0 + 650.0;

        let load = pipeline().predict_load_kn(&params).unwrap();
        assert!((load - expected).abs() < 1e-9);
    }

    #[test]
    fn test_finite_across_bounds_grid() {
        let pipeline = pipeline();
        let steps = 4;
        for i in 0..=steps {
            for j in 0..=steps {
                let t = i as f64 / steps as f64;
                let u = j as f64 / steps as f64;
                let mut row = PARAMETER_SPECS.map(|s| s.min + t * (s.max - s.min));
                // vary geometry independently of material
                let (d, a) = (PARAMETER_SPECS[2], PARAMETER_SPECS[3]);
                row[2] = d.min + u * (d.max - d.min);
                row[3] = a.max - u * (a.max - a.min);
                let params = DesignParameters::from_feature_row(row);
                let load = pipeline.predict_load_kn(&params).unwrap();
                assert!(load.is_finite(), "non-finite load for {params:?}");
            }
        }
    }

    #[test]
    fn test_swapped_scalers_are_rejected() {
        let err = TrainedArtifacts::new(Box::new(mlp()), output_scaler(), input_scaler(), "swapped")
            .unwrap_err();
        assert!(err.to_string().contains("expects 5 features"));
    }

    #[test]
    fn test_output_scaler_pairing_matters() {
        let params = DesignParameters::default();
        let other = TrainedArtifacts::new(
            Box::new(mlp()),
            input_scaler(),
            Scaler::standard(vec![500.0], vec![100.0]).unwrap(),
            "other",
        )
        .unwrap();
        let a = pipeline().predict_load_kn(&params).unwrap();
        let b = InferencePipeline::new(Arc::new(other))
            .predict_load_kn(&params)
            .unwrap();
        assert!((a - b).abs() > 1e-6);
    }

    struct NanModel;

    impl Regressor for NanModel {
        fn predict(&self, _scaled_row: &[f64]) -> anyhow::Result<f64> {
            Ok(f64::NAN)
        }

        fn format(&self) -> &'static str {
            "nan"
        }
    }

    #[test]
    fn test_non_finite_rejected() {
        let artifacts =
            TrainedArtifacts::new(Box::new(NanModel), input_scaler(), output_scaler(), "nan")
                .unwrap();
        let err = InferencePipeline::new(Arc::new(artifacts))
            .predict_load_kn(&DesignParameters::default())
            .unwrap_err();
        assert!(matches!(err, InferenceError::NonFinite(_)));
    }
}
