//! API client for communicating with the audit service

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

/// API client for the audit service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client.
    ///
    /// The timeout covers the narrative call made by the service during an audit.
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// GET a probe endpoint, which answers 503 with a body when not ready
    pub async fn probe<T: DeserializeOwned>(&self, path: &str) -> Result<(StatusCode, T)> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            let body = response.json().await.context("Failed to parse response")?;
            return Ok((status, body));
        }
        Ok((status, Self::decode(response).await?))
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| format!("{} [{}]", e.error, e.code))
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API request/response types

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct DesignParameters {
    pub fc: f64,
    pub b: f64,
    pub d: f64,
    pub a: f64,
    pub rho: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditRequest {
    pub parameters: DesignParameters,
    pub api_key: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Narrative {
    Generated { text: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    pub parameters: DesignParameters,
    pub predicted_load_kn: f64,
    pub ad_ratio: f64,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(default)]
    pub warning: Option<String>,
    pub narrative: Narrative,
    pub model_version: String,
    pub generated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub column: String,
    pub label: String,
    pub unit: String,
    pub min: f64,
    pub max: f64,
    pub default: f64,
    pub step: f64,
    pub decimals: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub updated_at: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: std::collections::BTreeMap<String, ComponentHealth>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> DesignParameters {
        DesignParameters {
            fc: 28.0,
            b: 300.0,
            d: 500.0,
            a: 250.0,
            rho: 0.01,
        }
    }

    #[tokio::test]
    async fn test_post_audit_decodes_report() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/audit")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "api_key": "secret",
                "parameters": {"a": 250.0}
            })))
            .with_status(200)
            .with_body(
                r#"{"parameters":{"fc":28.0,"b":300.0,"d":500.0,"a":250.0,"rho":0.01},
                    "predicted_load_kn":731.2,"ad_ratio":0.5,"classification":"short_corbel",
                    "warning":"Element classified as a short corbel (a/d < 1.0).",
                    "narrative":{"status":"generated","text":"Report."},
                    "model_version":"modelo_corbel-0123456789ab","generated_at":1700000000}"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let report: AuditReport = client
            .post(
                "api/v1/audit",
                &AuditRequest {
                    parameters: params(),
                    api_key: "secret".to_string(),
                },
            )
            .await
            .unwrap();

        assert_eq!(report.classification.as_deref(), Some("short_corbel"));
        assert!(matches!(report.narrative, Narrative::Generated { ref text } if text == "Report."));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_body_surfaces_code() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/v1/audit")
            .with_status(400)
            .with_body(r#"{"error":"invalid design parameter: rho","code":"invalid_parameter"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let err = client
            .post::<AuditReport, _>(
                "api/v1/audit",
                &AuditRequest {
                    parameters: params(),
                    api_key: "secret".to_string(),
                },
            )
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("400"));
        assert!(message.contains("[invalid_parameter]"));
    }

    #[tokio::test]
    async fn test_probe_accepts_unavailable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/readyz")
            .with_status(503)
            .with_body(r#"{"ready":false,"reason":"Trained artifacts not loaded"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(&server.url()).unwrap();
        let (status, readiness): (_, ReadinessResponse) = client.probe("readyz").await.unwrap();

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(!readiness.ready);
    }
}
