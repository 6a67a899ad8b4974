//! Regression model inference
//!
//! The load-capacity surrogate is an MLP. It is either exported to ONNX and
//! run with tract, or exported as plain JSON weights and evaluated directly.

use super::Regressor;
use crate::models::NUM_FEATURES;
use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::time::Instant;
use tract_onnx::prelude::tract_ndarray::{Array1, Array2, ArrayView1};
use tract_onnx::prelude::*;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 5;

type TractModel = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

/// ONNX-based regressor using tract for lightweight inference
pub struct OnnxRegressor {
    model: TractModel,
}

impl OnnxRegressor {
    /// Create a new regressor from model bytes
    pub fn new(model_bytes: &[u8]) -> Result<Self> {
        let model = tract_onnx::onnx()
            .model_for_read(&mut std::io::Cursor::new(model_bytes))
            .context("Failed to parse ONNX model")?
            .with_input_fact(0, f32::fact([1, NUM_FEATURES]).into())
            .context("Failed to set input shape")?
            .into_optimized()
            .context("Failed to optimize model")?
            .into_runnable()
            .context("Failed to create runnable model")?;
        Ok(Self { model })
    }

    fn row_to_tensor(row: &[f64]) -> Result<Tensor> {
        let data: Vec<f32> = row.iter().map(|v| *v as f32).collect();
        let array = tract_ndarray::Array2::from_shape_vec((1, NUM_FEATURES), data)
            .context("Scaled row does not match the model input shape")?;
        Ok(array.into())
    }
}

impl Regressor for OnnxRegressor {
    fn predict(&self, scaled_row: &[f64]) -> Result<f64> {
        let start = Instant::now();
        let input = Self::row_to_tensor(scaled_row)?;

        let result = self.model.run(tvec!(input.into()))?;
        let output = result.first().context("No output from model")?;
        let value = output
            .to_array_view::<f32>()?
            .iter()
            .next()
            .copied()
            .context("Model output is empty")?;

        log_latency(start);
        Ok(value as f64)
    }

    fn format(&self) -> &'static str {
        "onnx"
    }
}

/// Hidden-layer activation of an exported MLP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Activation {
    Relu,
    Tanh,
    Logistic,
    Identity,
}

impl Activation {
    fn apply(self, x: f64) -> f64 {
        match self {
            Activation::Relu => x.max(0.0),
            Activation::Tanh => x.tanh(),
            Activation::Logistic => 1.0 / (1.0 + (-x).exp()),
            Activation::Identity => x,
        }
    }
}

/// JSON export of a fitted MLP regressor
#[derive(Debug, Deserialize)]
struct MlpExport {
    activation: Activation,
    /// Per-layer weight matrices, `[n_in][n_out]`
    coefs: Vec<Vec<Vec<f64>>>,
    /// Per-layer bias vectors
    intercepts: Vec<Vec<f64>>,
}

/// Dense layer `y = x W + b`
struct Layer {
    weights: Array2<f64>,
    bias: Array1<f64>,
}

/// Feed-forward regressor evaluated from exported weights.
///
/// Hidden layers use the exported activation; the output layer is identity.
pub struct MlpRegressor {
    activation: Activation,
    layers: Vec<Layer>,
}

impl MlpRegressor {
    pub fn from_json(bytes: &[u8]) -> Result<Self> {
        let export: MlpExport =
            serde_json::from_slice(bytes).context("Failed to parse MLP weights")?;
        Self::from_weights(export.activation, export.coefs, export.intercepts)
    }

    pub fn from_weights(
        activation: Activation,
        coefs: Vec<Vec<Vec<f64>>>,
        intercepts: Vec<Vec<f64>>,
    ) -> Result<Self> {
        if coefs.is_empty() || coefs.len() != intercepts.len() {
            bail!(
                "MLP has {} weight matrices and {} bias vectors",
                coefs.len(),
                intercepts.len()
            );
        }

        let mut layers = Vec::with_capacity(coefs.len());
        let mut width = NUM_FEATURES;
        for (index, (matrix, bias)) in coefs.into_iter().zip(intercepts).enumerate() {
            let n_in = matrix.len();
            let n_out = matrix.first().map(Vec::len).unwrap_or(0);
            if n_in != width {
                bail!("layer {index} expects {n_in} inputs, previous layer yields {width}");
            }
            if bias.len() != n_out || matrix.iter().any(|row| row.len() != n_out) {
                bail!("layer {index} has inconsistent output width");
            }
            let flat: Vec<f64> = matrix.into_iter().flatten().collect();
            layers.push(Layer {
                weights: Array2::from_shape_vec((n_in, n_out), flat)?,
                bias: Array1::from(bias),
            });
            width = n_out;
        }

        if width != 1 {
            bail!("MLP must produce a single output, got {width}");
        }

        Ok(Self { activation, layers })
    }

    fn forward(&self, input: ArrayView1<f64>) -> Array1<f64> {
        let last = self.layers.len() - 1;
        let mut hidden = input.to_owned();
        for (index, layer) in self.layers.iter().enumerate() {
            hidden = hidden.dot(&layer.weights) + &layer.bias;
            if index < last {
                hidden.mapv_inplace(|x| self.activation.apply(x));
            }
        }
        hidden
    }
}

impl Regressor for MlpRegressor {
    fn predict(&self, scaled_row: &[f64]) -> Result<f64> {
        if scaled_row.len() != NUM_FEATURES {
            bail!(
                "Scaled row has {} values, expected {}",
                scaled_row.len(),
                NUM_FEATURES
            );
        }
        let start = Instant::now();
        let output = self.forward(ArrayView1::from(scaled_row));
        log_latency(start);
        Ok(output[0])
    }

    fn format(&self) -> &'static str {
        "mlp-json"
    }
}

fn log_latency(start: Instant) {
    let elapsed = start.elapsed();
    if elapsed.as_millis() > MAX_INFERENCE_MS {
        warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
    } else {
        debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
    }
}
