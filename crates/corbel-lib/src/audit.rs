//! One audit cycle: credential check, inference, a/d evaluation, narrative

use crate::classification::GeometryAssessment;
use crate::health::{components, HealthRegistry};
use crate::models::{AuditReport, AuditRequest, NarrativeOutcome, ParameterError};
use crate::narrative::{build_prompt, NarrativeGenerator, NarrativeInput, PromptLanguage};
use crate::observability::{AuditMetrics, StructuredLogger};
use crate::predictor::{InferenceError, InferencePipeline};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::debug;

/// Audit rejected before a report could be produced
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("please enter an API key to generate the technical report")]
    MissingCredential,
    #[error("invalid design parameter: {0}")]
    InvalidParameter(#[from] ParameterError),
    #[error("load prediction failed: {0}")]
    Inference(#[from] InferenceError),
}

impl AuditError {
    /// Stable error code for API responses and metrics
    pub fn code(&self) -> &'static str {
        match self {
            AuditError::MissingCredential => "missing_credential",
            AuditError::InvalidParameter(_) => "invalid_parameter",
            AuditError::Inference(_) => "inference_failed",
        }
    }
}

/// Runs audits against the loaded artifacts and a narrative backend
#[derive(Clone)]
pub struct AuditService {
    pipeline: InferencePipeline,
    narrator: Arc<dyn NarrativeGenerator>,
    language: PromptLanguage,
    health: HealthRegistry,
    metrics: AuditMetrics,
    logger: StructuredLogger,
}

impl AuditService {
    pub fn new(
        pipeline: InferencePipeline,
        narrator: Arc<dyn NarrativeGenerator>,
        language: PromptLanguage,
        health: HealthRegistry,
    ) -> Self {
        Self {
            pipeline,
            narrator,
            language,
            health,
            metrics: AuditMetrics::new(),
            logger: StructuredLogger::new("corbel-audit"),
        }
    }

    pub fn model_version(&self) -> &str {
        self.pipeline.model_version()
    }

    /// Run one audit.
    ///
    /// A blank credential is rejected before any work is done. A failed
    /// narrative call does not fail the audit; it is carried in the report.
    pub async fn run(&self, request: &AuditRequest) -> Result<AuditReport, AuditError> {
        let api_key = match request.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => key,
            _ => return Err(self.reject(AuditError::MissingCredential)),
        };

        let params = request.parameters;
        params.validate().map_err(|e| self.reject(e.into()))?;

        let start = Instant::now();
        // In-range parameters must always evaluate; a failure means the artifacts are unusable
        let predicted_load_kn = match self.pipeline.predict_load_kn(&params) {
            Ok(load) => {
                self.health.set_healthy(components::ARTIFACTS).await;
                load
            }
            Err(e) => {
                self.health
                    .set_unhealthy(components::ARTIFACTS, e.to_string())
                    .await;
                return Err(self.reject(e.into()));
            }
        };
        self.metrics
            .observe_inference_latency(start.elapsed().as_secs_f64());

        let assessment = GeometryAssessment::evaluate(&params);
        if assessment.is_short_corbel() {
            self.metrics.inc_short_corbels();
        }

        let prompt = build_prompt(
            &NarrativeInput {
                parameters: &params,
                ad_ratio: assessment.ad_ratio,
                predicted_load_kn,
            },
            self.language,
        );
        debug!(prompt_chars = prompt.len(), "Requesting narrative");

        let start = Instant::now();
        let narrative = match self.narrator.generate(&prompt, api_key).await {
            Ok(text) => {
                self.health.set_healthy(components::NARRATOR).await;
                NarrativeOutcome::Generated { text }
            }
            Err(e) => {
                self.metrics.inc_narrative_errors(e.kind());
                self.logger
                    .log_narrative_failure(self.narrator.model_name(), e.kind(), &e.to_string());
                self.health
                    .set_degraded(components::NARRATOR, e.to_string())
                    .await;
                NarrativeOutcome::Failed {
                    error: e.to_string(),
                }
            }
        };
        self.metrics
            .observe_narrative_latency(start.elapsed().as_secs_f64());

        let report = AuditReport {
            parameters: params,
            predicted_load_kn,
            ad_ratio: assessment.ad_ratio,
            classification: assessment.classification,
            warning: assessment.warning().map(str::to_string),
            narrative,
            model_version: self.pipeline.model_version().to_string(),
            generated_at: chrono::Utc::now().timestamp(),
        };

        self.metrics.inc_audits();
        self.logger.log_audit(&report);
        Ok(report)
    }

    fn reject(&self, error: AuditError) -> AuditError {
        self.metrics.inc_rejected_requests(error.code());
        error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::SHORT_CORBEL_WARNING;
    use crate::models::{Classification, DesignParameters};
    use crate::narrative::NarrativeError;
    use crate::predictor::{Activation, MlpRegressor, Scaler, TrainedArtifacts};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// Narrator returning a canned result and recording prompts
    struct ScriptedNarrator {
        result: Result<String, NarrativeError>,
        calls: AtomicUsize,
        last_prompt: Mutex<Option<String>>,
    }

    impl ScriptedNarrator {
        fn new(result: Result<String, NarrativeError>) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: AtomicUsize::new(0),
                last_prompt: Mutex::new(None),
            })
        }
    }

    #[async_trait]
    impl NarrativeGenerator for ScriptedNarrator {
        async fn generate(&self, prompt: &str, _api_key: &str) -> Result<String, NarrativeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = Some(prompt.to_string());
            self.result.clone()
        }

        fn model_name(&self) -> &str {
            "scripted"
        }
    }

    fn pipeline() -> InferencePipeline {
        let model = MlpRegressor::from_weights(
            Activation::Relu,
            vec![
                vec![
                    vec![0.4, 0.1],
                    vec![0.3, 0.0],
                    vec![0.5, 0.2],
                    vec![-0.6, 0.1],
                    vec![0.4, -0.3],
                ],
                vec![vec![0.8], vec![0.3]],
            ],
            vec![vec![0.1, 0.0], vec![0.0]],
        )
        .unwrap();
        let artifacts = TrainedArtifacts::new(
            Box::new(model),
            Scaler::standard(
                vec![28.0, 300.0, 450.0, 300.0, 0.0095],
                vec![4.3, 58.0, 87.0, 116.0, 0.0032],
            )
            .unwrap(),
            Scaler::standard(vec![650.0], vec![180.0]).unwrap(),
            "unit-test",
        )
        .unwrap();
        InferencePipeline::new(Arc::new(artifacts))
    }

    fn service(narrator: Arc<ScriptedNarrator>) -> (AuditService, HealthRegistry) {
        let health = HealthRegistry::new();
        let service = AuditService::new(pipeline(), narrator, PromptLanguage::En, health.clone());
        (service, health)
    }

    fn request(parameters: DesignParameters, api_key: Option<&str>) -> AuditRequest {
        AuditRequest {
            parameters,
            api_key: api_key.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_skips_pipeline_and_network() {
        let narrator = ScriptedNarrator::new(Ok("unused".to_string()));
        let (service, _) = service(narrator.clone());

        for key in [None, Some(""), Some("   ")] {
            let err = service
                .run(&request(DesignParameters::default(), key))
                .await
                .unwrap_err();
            assert!(matches!(err, AuditError::MissingCredential));
        }
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_short_corbel_report() {
        let narrator = ScriptedNarrator::new(Ok("Three paragraphs.".to_string()));
        let (service, _) = service(narrator.clone());
        let params = DesignParameters {
            a: 100.0,
            d: 600.0,
            ..DesignParameters::default()
        };

        let report = service.run(&request(params, Some("key"))).await.unwrap();

        assert!((report.ad_ratio - 0.1667).abs() < 1e-4);
        assert_eq!(report.classification, Some(Classification::ShortCorbel));
        assert_eq!(report.warning.as_deref(), Some(SHORT_CORBEL_WARNING));
        assert_eq!(report.narrative.text(), Some("Three paragraphs."));
        assert!(report.predicted_load_kn.is_finite());
        assert_eq!(report.model_version, "unit-test");

        let prompt = narrator.last_prompt.lock().unwrap().clone().unwrap();
        assert!(prompt.contains("a/d ratio: 0.17"));
        assert!(prompt.contains(&format!("{:.2} kN", report.predicted_load_kn)));
    }

    #[tokio::test]
    async fn test_long_lever_arm_has_no_warning() {
        let (service, _) = service(ScriptedNarrator::new(Ok("ok".to_string())));
        let params = DesignParameters {
            a: 500.0,
            d: 300.0,
            ..DesignParameters::default()
        };

        let report = service.run(&request(params, Some("key"))).await.unwrap();

        assert!((report.ad_ratio - 1.6667).abs() < 1e-4);
        assert!(report.classification.is_none());
        assert!(report.warning.is_none());
    }

    #[tokio::test]
    async fn test_narrative_failure_is_reported_without_text() {
        let narrator =
            ScriptedNarrator::new(Err(NarrativeError::Transport("connection refused".to_string())));
        let (service, health) = service(narrator);

        let report = service
            .run(&request(DesignParameters::default(), Some("key")))
            .await
            .unwrap();

        match &report.narrative {
            NarrativeOutcome::Failed { error } => assert!(error.contains("connection refused")),
            other => panic!("expected failure, got {other:?}"),
        }
        assert!(report.narrative.text().is_none());
        assert!(report.predicted_load_kn.is_finite());

        let status = health.health().await.components[components::NARRATOR].status;
        assert_eq!(status, crate::health::ComponentStatus::Degraded);
    }

    struct NanModel;

    impl crate::predictor::Regressor for NanModel {
        fn predict(&self, _scaled_row: &[f64]) -> anyhow::Result<f64> {
            Ok(f64::NAN)
        }

        fn format(&self) -> &'static str {
            "nan"
        }
    }

    #[tokio::test]
    async fn test_inference_failure_marks_artifacts_unhealthy() {
        let artifacts = TrainedArtifacts::new(
            Box::new(NanModel),
            Scaler::standard(vec![0.0; 5], vec![1.0; 5]).unwrap(),
            Scaler::standard(vec![0.0], vec![1.0]).unwrap(),
            "nan",
        )
        .unwrap();
        let narrator = ScriptedNarrator::new(Ok("unused".to_string()));
        let health = HealthRegistry::new();
        health.register(components::ARTIFACTS).await;
        let service = AuditService::new(
            InferencePipeline::new(Arc::new(artifacts)),
            narrator.clone(),
            PromptLanguage::En,
            health.clone(),
        );

        let err = service
            .run(&request(DesignParameters::default(), Some("key")))
            .await
            .unwrap_err();

        assert_eq!(err.code(), "inference_failed");
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 0);
        let artifacts = &health.health().await.components[components::ARTIFACTS];
        assert_eq!(artifacts.status, crate::health::ComponentStatus::Unhealthy);
        assert!(artifacts.message.as_deref().unwrap().contains("non-finite"));
    }

    #[tokio::test]
    async fn test_out_of_range_parameter_rejected() {
        let narrator = ScriptedNarrator::new(Ok("unused".to_string()));
        let (service, _) = service(narrator.clone());
        let params = DesignParameters {
            fc: 50.0,
            ..DesignParameters::default()
        };

        let err = service.run(&request(params, Some("key"))).await.unwrap_err();

        assert_eq!(err.code(), "invalid_parameter");
        assert_eq!(narrator.calls.load(Ordering::SeqCst), 0);
    }
}
