//! HTTP client for the bridged daemon.

use bridge_core::Workflow;
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("daemon not running at {addr}\n  → start with: bridged\n  → or set BRIDGED_ADDR if using a different address")]
    ConnectionFailed { addr: String },

    #[error("HTTP error: {status} - {message}")]
    Http { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("workflow not found: {0}")]
    WorkflowNotFound(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_connect() {
            let addr = e
                .url()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_string());
            ClientError::ConnectionFailed { addr }
        } else {
            ClientError::Http {
                status: e.status().map_or(0, |s| s.as_u16()),
                message: e.to_string(),
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

/// Request payload for POST /api/workflows/migration.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMigrationRequest {
    pub source_system: String,
    pub target_system: String,
    pub project_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Value>,
}

/// Row in GET /api/workflows.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSummary {
    pub id: String,
    #[serde(rename = "type")]
    pub workflow_type: String,
    pub state: String,
    pub created_at: DateTime<Utc>,
}

/// Body of GET /health.
#[derive(Debug, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

/// Client for the daemon's local HTTP API.
#[derive(Debug, Clone)]
pub struct Client {
    base_url: String,
    http: reqwest::Client,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        Ok(response.json().await?)
    }

    pub async fn submit_migration(&self, request: &CreateMigrationRequest) -> Result<Workflow> {
        let response = self
            .http
            .post(format!("{}/api/workflows/migration", self.base_url))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>> {
        let response = self
            .http
            .get(format!("{}/api/workflows", self.base_url))
            .send()
            .await?;
        Self::decode(response).await
    }

    pub async fn get_workflow(&self, id: &str) -> Result<Workflow> {
        let response = self
            .http
            .get(format!("{}/api/workflows/{id}", self.base_url))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::WorkflowNotFound(id.to_string()));
        }
        Self::decode(response).await
    }

    pub async fn start_workflow(&self, id: &str) -> Result<Workflow> {
        let response = self
            .http
            .post(format!("{}/api/workflows/{id}/start", self.base_url))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(ClientError::WorkflowNotFound(id.to_string()));
        }
        Self::decode(response).await
    }

    pub async fn cancel_workflow(&self, id: &str) -> Result<()> {
        let response = self
            .http
            .post(format!("{}/api/workflows/{id}/cancel", self.base_url))
            .send()
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ClientError::WorkflowNotFound(id.to_string())),
            status => Err(ClientError::Http {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            }),
        }
    }

    pub async fn retry_step(&self, id: &str, order: u32) -> Result<()> {
        let response = self
            .http
            .post(format!(
                "{}/api/workflows/{id}/steps/{order}/retry",
                self.base_url
            ))
            .send()
            .await?;
        match response.status() {
            StatusCode::NO_CONTENT => Ok(()),
            StatusCode::NOT_FOUND => Err(ClientError::WorkflowNotFound(id.to_string())),
            status => Err(ClientError::Http {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            }),
        }
    }

    async fn decode<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Http {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            });
        }
        response
            .json()
            .await
            .map_err(|e| ClientError::InvalidResponse(e.to_string()))
    }

    async fn error_message(response: reqwest::Response) -> String {
        match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => "unreadable error body".to_string(),
        }
    }
}
