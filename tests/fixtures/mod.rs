// Copyright (c) 2025 - Cowboy AI, Inc.
//! Test Fixtures for cim-azure-provisioner
//!
//! Provides deterministic secrets and an in-memory control plane that records
//! every call it receives.
//!
//! # Design Principles
//! - All identifiers and secrets are fixed constants
//! - The fake control plane behaves like ARM create-or-update: a PUT stores
//!   the resource, a GET returns what was stored
//! - Calls are recorded in order so tests can assert on sequencing

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cim_azure_provisioner::arm::{ControlPlane, OperationOutcome, ResponseDiagnostics};
use cim_azure_provisioner::config::{ADMIN_PASSWORD_SECRET, STORAGE_ACCOUNT_KEY_SECRET};
use cim_azure_provisioner::credentials::{
    CLIENT_ID_VAR, CLIENT_SECRET_VAR, SUBSCRIPTION_ID_VAR, TENANT_ID_VAR,
};
use cim_azure_provisioner::domain::ResourceId;
use cim_azure_provisioner::errors::{ProvisionError, ProvisionResult};
use cim_azure_provisioner::service::StageOutcome;
use cim_azure_provisioner::state_machine::Stage;

pub const SUBSCRIPTION_ID: &str = "01934f4a-0001-7000-8000-000000000001";
pub const TENANT_ID: &str = "01934f4a-0002-7000-8000-000000000002";
pub const CLIENT_ID: &str = "01934f4a-0003-7000-8000-000000000003";
pub const CLIENT_SECRET: &str = "fixture-client-secret";
pub const ADMIN_PASSWORD: &str = "Fixture-P@ssw0rd!";
pub const STORAGE_ACCOUNT_KEY: &str = "Zml4dHVyZS1zdG9yYWdlLWtleQ==";

/// Every credential and secret the pipeline may ask for
pub fn secrets() -> HashMap<String, String> {
    [
        (SUBSCRIPTION_ID_VAR, SUBSCRIPTION_ID),
        (TENANT_ID_VAR, TENANT_ID),
        (CLIENT_ID_VAR, CLIENT_ID),
        (CLIENT_SECRET_VAR, CLIENT_SECRET),
        (ADMIN_PASSWORD_SECRET, ADMIN_PASSWORD),
        (STORAGE_ACCOUNT_KEY_SECRET, STORAGE_ACCOUNT_KEY),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// Secrets with one entry removed
pub fn secrets_without(name: &str) -> HashMap<String, String> {
    let mut source = secrets();
    source.remove(name);
    source
}

/// Owned copy of a stage outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Observed {
    Resource(Value),
    Extension(String),
    Inspected,
    Halted(Vec<String>),
}

/// Records every stage outcome a run reports
#[derive(Debug, Clone, Default)]
pub struct StageLog {
    entries: Arc<Mutex<Vec<(Stage, Observed)>>>,
}

impl StageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observer(&self) -> impl FnMut(Stage, StageOutcome<'_>) + Send + 'static {
        let entries = Arc::clone(&self.entries);
        move |stage: Stage, outcome: StageOutcome<'_>| {
            let observed = match outcome {
                StageOutcome::Resource(resource) => Observed::Resource(resource.clone()),
                StageOutcome::Extension(deployment) => Observed::Extension(deployment.name.clone()),
                StageOutcome::Inspected(_) => Observed::Inspected,
                StageOutcome::Halted(output) => Observed::Halted(output.warnings.clone()),
            };
            entries.lock().unwrap().push((stage, observed));
        }
    }

    pub fn entries(&self) -> Vec<(Stage, Observed)> {
        self.entries.lock().unwrap().clone()
    }

    pub fn stages(&self) -> Vec<Stage> {
        self.entries().into_iter().map(|(stage, _)| stage).collect()
    }
}

/// One request seen by the fake control plane
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub id: ResourceId,
    pub api_version: String,
    pub expand: Option<String>,
    pub body: Option<Value>,
    pub timeout: Option<Duration>,
}

impl RecordedCall {
    pub fn is_put(&self) -> bool {
        self.method == "PUT"
    }
}

#[derive(Debug, Default)]
struct FakeState {
    calls: Vec<RecordedCall>,
    resources: HashMap<String, Value>,
    failing_type: Option<String>,
    extension_state: Option<String>,
    uppercase_names: bool,
    lowercase_group_segment: bool,
}

/// In-memory control plane that records calls
#[derive(Debug, Clone, Default)]
pub struct FakeControlPlane {
    state: Arc<Mutex<FakeState>>,
}

impl FakeControlPlane {
    pub fn new() -> Self {
        Self::default()
    }

    /// PUTs of this full ARM type answer with a 409 conflict
    pub fn failing_puts_of(self, full_type: &str) -> Self {
        self.state.lock().unwrap().failing_type = Some(full_type.to_string());
        self
    }

    /// Provisioning state reported for extensions (default `Succeeded`)
    pub fn with_extension_state(self, state: &str) -> Self {
        self.state.lock().unwrap().extension_state = Some(state.to_string());
        self
    }

    /// Report resource names upper-cased, as ARM sometimes does
    pub fn with_uppercase_names(self) -> Self {
        self.state.lock().unwrap().uppercase_names = true;
        self
    }

    /// Report `/resourcegroups/` in lowercase, as ARM does for some providers
    pub fn with_lowercase_group_segment(self) -> Self {
        self.state.lock().unwrap().lowercase_group_segment = true;
        self
    }

    /// Id reported back for the stored resource of the given type
    pub fn returned_id(&self, full_type: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .resources
            .values()
            .find(|r| r["type"] == full_type)
            .and_then(|r| r["id"].as_str().map(str::to_string))
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn puts(&self) -> Vec<RecordedCall> {
        self.calls().into_iter().filter(RecordedCall::is_put).collect()
    }

    /// Full ARM types of every PUT, in order
    pub fn put_types(&self) -> Vec<String> {
        self.puts().iter().map(|c| c.id.full_type()).collect()
    }

    /// Body of the first PUT of the given type
    pub fn put_body(&self, full_type: &str) -> Option<Value> {
        self.puts()
            .into_iter()
            .find(|c| c.id.full_type() == full_type)
            .and_then(|c| c.body)
    }

    fn key(id: &ResourceId) -> String {
        id.to_string().to_ascii_lowercase()
    }

    fn reported_id(state: &FakeState, id: &ResourceId) -> String {
        let mut rendered = id.to_string();
        if state.lowercase_group_segment {
            rendered = rendered.replacen("/resourceGroups/", "/resourcegroups/", 1);
        }
        if !state.uppercase_names {
            return rendered;
        }
        let name = id.name();
        match rendered.strip_suffix(name) {
            Some(prefix) => format!("{}{}", prefix, name.to_uppercase()),
            None => rendered,
        }
    }
}

#[async_trait]
impl ControlPlane for FakeControlPlane {
    async fn create_or_update(
        &self,
        id: &ResourceId,
        api_version: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> ProvisionResult<OperationOutcome> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: "PUT",
            id: id.clone(),
            api_version: api_version.to_string(),
            expand: None,
            body: Some(body.clone()),
            timeout,
        });

        if state.failing_type.as_deref() == Some(id.full_type().as_str()) {
            return Err(ProvisionError::Api {
                status: 409,
                code: "Conflict".to_string(),
                message: format!("{} conflicts with an existing resource", id.name()),
            });
        }

        let provisioning_state = if id.full_type().ends_with("/extensions") {
            state
                .extension_state
                .clone()
                .unwrap_or_else(|| "Succeeded".to_string())
        } else {
            "Succeeded".to_string()
        };

        let mut resource = body;
        resource["id"] = json!(Self::reported_id(&state, id));
        resource["name"] = json!(id.name());
        resource["type"] = json!(id.full_type());
        if resource.get("properties").map_or(true, Value::is_null) {
            resource["properties"] = json!({});
        }
        resource["properties"]["provisioningState"] = json!(provisioning_state);
        if let Some(os_profile) = resource["properties"]
            .get_mut("osProfile")
            .and_then(Value::as_object_mut)
        {
            os_profile.remove("adminPassword");
        }

        state.resources.insert(Self::key(id), resource.clone());

        Ok(OperationOutcome {
            diagnostics: ResponseDiagnostics {
                status_code: 201,
                body: resource.to_string(),
                elapsed: Duration::from_millis(1),
            },
            resource,
        })
    }

    async fn get(
        &self,
        id: &ResourceId,
        api_version: &str,
        expand: Option<&str>,
    ) -> ProvisionResult<Value> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(RecordedCall {
            method: "GET",
            id: id.clone(),
            api_version: api_version.to_string(),
            expand: expand.map(str::to_string),
            body: None,
            timeout: None,
        });

        let mut resource = state
            .resources
            .get(&Self::key(id))
            .cloned()
            .ok_or_else(|| ProvisionError::NotFound(id.to_string()))?;

        if expand == Some("instanceView") {
            resource["properties"]["instanceView"] = json!({
                "computerName": id.name(),
                "disks": [{
                    "name": "osdisk",
                    "statuses": [{
                        "code": "ProvisioningState/succeeded",
                        "displayStatus": "Provisioning succeeded",
                        "time": "2026-01-19T12:00:00Z"
                    }]
                }],
                "statuses": [
                    {
                        "code": "ProvisioningState/succeeded",
                        "displayStatus": "Provisioning succeeded"
                    },
                    { "code": "PowerState/running", "displayStatus": "VM running" }
                ]
            });
        }
        Ok(resource)
    }
}
