// Copyright (c) 2025 - Cowboy AI, Inc.
//! reqwest adapter for the ARM control plane
//!
//! # Long-running operations
//!
//! ```text
//! PUT ─┬─ Azure-AsyncOperation: poll {status} until Succeeded|Failed|Canceled, then GET
//!      ├─ Location:             poll until the URL stops answering 202, then GET
//!      └─ neither:              body is the resource; GET until provisioningState is terminal
//! ```
//!
//! `Retry-After` (seconds) sets the delay between polls; without it the
//! configured poll interval is used. Failed or canceled operations become
//! [`ProvisionError::OperationFailed`]. Nothing is retried.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, LOCATION, RETRY_AFTER};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::{Duration, Instant};
use tracing::debug;
use uuid::Uuid;

use super::{ControlPlane, OperationOutcome, ResponseDiagnostics, TokenCredential};
use crate::config::ControlPlaneSettings;
use crate::credentials::ServicePrincipalCredentials;
use crate::domain::ResourceId;
use crate::errors::{ProvisionError, ProvisionResult};
use crate::models::{is_terminal_state, provisioning_state_of, STATE_SUCCEEDED};

const ASYNC_OPERATION: &str = "azure-asyncoperation";
const CLIENT_REQUEST_ID: &str = "x-ms-client-request-id";

/// ARM error envelope: `{"error": {"code": .., "message": ..}}`
#[derive(Debug, Default, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Body of an `Azure-AsyncOperation` status resource
#[derive(Debug, Deserialize)]
struct OperationStatus {
    status: String,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

/// Where a PUT said its progress can be observed
enum Tracking {
    AsyncOperation(String),
    Location(String),
    Resource,
}

/// Control plane backed by the ARM REST API
#[derive(Debug)]
pub struct HttpControlPlane {
    client: Client,
    base_url: String,
    credential: TokenCredential,
    poll_interval: Duration,
}

impl HttpControlPlane {
    /// Build the HTTP client and token source; no request is sent yet
    pub fn connect(
        settings: &ControlPlaneSettings,
        credentials: &ServicePrincipalCredentials,
    ) -> ProvisionResult<Self> {
        debug!("Creating ARM client for {}", settings.resource_manager_url);

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .default_headers({
                let mut headers = HeaderMap::new();
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                headers
            })
            .build()
            .map_err(|e| ProvisionError::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            credential: TokenCredential::new(client.clone(), settings, credentials),
            client,
            base_url: settings.resource_manager_url.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
        })
    }

    /// Override the delay used when no `Retry-After` header is sent
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn resource_url(&self, id: &ResourceId, api_version: &str, expand: Option<&str>) -> String {
        let path: Vec<String> = id
            .path_segments()
            .into_iter()
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();

        let mut url = format!(
            "{}/{}?api-version={}",
            self.base_url,
            path.join("/"),
            urlencoding::encode(api_version)
        );
        if let Some(expand) = expand {
            url.push_str("&$expand=");
            url.push_str(&urlencoding::encode(expand));
        }
        url
    }

    /// Attach the bearer token and a fresh client request id, then send
    async fn send(&self, request: RequestBuilder) -> ProvisionResult<Response> {
        let token = self.credential.bearer_token().await?;
        let request_id = Uuid::now_v7().to_string();

        let response = request
            .header(AUTHORIZATION, format!("Bearer {}", token.expose()))
            .header(CLIENT_REQUEST_ID, request_id.as_str())
            .send()
            .await?;

        debug!(
            "ARM {} {} ({})",
            response.status().as_u16(),
            response.url().path(),
            request_id
        );
        Ok(response)
    }

    async fn run_create_or_update(
        &self,
        id: &ResourceId,
        api_version: &str,
        body: Value,
        started: Instant,
    ) -> ProvisionResult<OperationOutcome> {
        let url = self.resource_url(id, api_version, None);
        debug!("PUT {}", url);

        let response = self.send(self.client.put(&url).json(&body)).await?;
        let status = response.status();
        let tracking = tracking_of(response.headers());
        let mut delay = retry_after(response.headers()).unwrap_or(self.poll_interval);
        let text = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        let resource = match tracking {
            Tracking::AsyncOperation(operation_url) => {
                self.poll_async_operation(id, &operation_url, delay).await?;
                self.get(id, api_version, None).await?
            }
            Tracking::Location(location_url) => {
                self.poll_location(&location_url, delay).await?;
                self.get(id, api_version, None).await?
            }
            Tracking::Resource => {
                let mut current: Value = if text.trim().is_empty() {
                    self.get(id, api_version, None).await?
                } else {
                    serde_json::from_str(&text)
                        .map_err(|e| ProvisionError::Deserialization(e.to_string()))?
                };

                while let Some(state) = provisioning_state_of(&current) {
                    if is_terminal_state(state) {
                        break;
                    }
                    debug!("{} is {}, polling again in {:?}", id, state, delay);
                    tokio::time::sleep(delay).await;
                    current = self.get(id, api_version, None).await?;
                    delay = self.poll_interval;
                }
                current
            }
        };

        ensure_succeeded(id, &resource)?;

        Ok(OperationOutcome {
            resource,
            diagnostics: ResponseDiagnostics {
                status_code: status.as_u16(),
                body: text,
                elapsed: started.elapsed(),
            },
        })
    }

    async fn poll_async_operation(
        &self,
        id: &ResourceId,
        operation_url: &str,
        mut delay: Duration,
    ) -> ProvisionResult<()> {
        loop {
            tokio::time::sleep(delay).await;

            let response = self.send(self.client.get(operation_url)).await?;
            let status = response.status();
            delay = retry_after(response.headers()).unwrap_or(self.poll_interval);
            let text = response.text().await?;

            if !status.is_success() {
                return Err(api_error(status, &text));
            }

            let operation: OperationStatus = serde_json::from_str(&text)
                .map_err(|e| ProvisionError::Deserialization(e.to_string()))?;
            debug!("Operation on {} is {}", id, operation.status);

            if operation.status.eq_ignore_ascii_case(STATE_SUCCEEDED) {
                return Ok(());
            }
            if is_terminal_state(&operation.status) {
                return Err(ProvisionError::OperationFailed {
                    resource: id.to_string(),
                    status: operation.status,
                    message: operation
                        .error
                        .and_then(|e| e.message)
                        .unwrap_or_else(|| "no error details".to_string()),
                });
            }
        }
    }

    async fn poll_location(&self, location_url: &str, mut delay: Duration) -> ProvisionResult<()> {
        loop {
            tokio::time::sleep(delay).await;

            let response = self.send(self.client.get(location_url)).await?;
            let status = response.status();
            delay = retry_after(response.headers()).unwrap_or(self.poll_interval);

            if status == StatusCode::ACCEPTED {
                debug!("Operation at {} still running", location_url);
                continue;
            }
            if status.is_success() {
                return Ok(());
            }
            let text = response.text().await?;
            return Err(api_error(status, &text));
        }
    }
}

#[async_trait]
impl ControlPlane for HttpControlPlane {
    async fn create_or_update(
        &self,
        id: &ResourceId,
        api_version: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> ProvisionResult<OperationOutcome> {
        let started = Instant::now();
        let operation = self.run_create_or_update(id, api_version, body, started);

        match timeout {
            Some(limit) => tokio::time::timeout(limit, operation)
                .await
                .map_err(|_| {
                    ProvisionError::Timeout(format!(
                        "{} did not reach a terminal state within {}s",
                        id,
                        limit.as_secs()
                    ))
                })?,
            None => operation.await,
        }
    }

    async fn get(
        &self,
        id: &ResourceId,
        api_version: &str,
        expand: Option<&str>,
    ) -> ProvisionResult<Value> {
        let url = self.resource_url(id, api_version, expand);
        debug!("GET {}", url);

        let response = self.send(self.client.get(&url)).await?;
        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            return Err(ProvisionError::NotFound(id.to_string()));
        }
        if !status.is_success() {
            return Err(api_error(status, &text));
        }

        serde_json::from_str(&text).map_err(|e| ProvisionError::Deserialization(e.to_string()))
    }
}

fn tracking_of(headers: &HeaderMap) -> Tracking {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    };

    if let Some(url) = header(ASYNC_OPERATION) {
        Tracking::AsyncOperation(url)
    } else if let Some(url) = header(LOCATION.as_str()) {
        Tracking::Location(url)
    } else {
        Tracking::Resource
    }
}

fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

fn api_error(status: StatusCode, body: &str) -> ProvisionError {
    let detail = serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|envelope| envelope.error)
        .unwrap_or_default();

    ProvisionError::Api {
        status: status.as_u16(),
        code: detail.code.unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unknown")
                .to_string()
        }),
        message: detail.message.unwrap_or_else(|| body.to_string()),
    }
}

/// A terminal state other than Succeeded fails the operation
fn ensure_succeeded(id: &ResourceId, resource: &Value) -> ProvisionResult<()> {
    match provisioning_state_of(resource) {
        Some(state) if is_terminal_state(state) && !state.eq_ignore_ascii_case(STATE_SUCCEEDED) => {
            Err(ProvisionError::OperationFailed {
                resource: id.to_string(),
                status: state.to_string(),
                message: "resource reported a failed provisioning state".to_string(),
            })
        }
        _ => Ok(()),
    }
}
