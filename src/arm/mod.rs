// Copyright (c) 2025 - Cowboy AI, Inc.
//! Azure Resource Manager control plane
//!
//! The pipeline talks to ARM through the [`ControlPlane`] port. Only two
//! operations are needed:
//!
//! ```text
//! create_or_update: PUT {id}?api-version=..  → wait for terminal state → resource
//! get:              GET {id}?api-version=..[&$expand=..]                → resource
//! ```
//!
//! [`HttpControlPlane`] is the production adapter (reqwest + OAuth2 client
//! credentials). Tests plug in an in-memory implementation.
//!
//! Bodies travel as `serde_json::Value` so the trait stays object safe;
//! [`put_resource`] and [`get_resource`] add the typed layer on top.

pub mod auth;
pub mod http;
pub mod resources;

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;

use crate::domain::ResourceId;
use crate::errors::ProvisionResult;

pub use auth::TokenCredential;
pub use http::HttpControlPlane;
pub use resources::{get_resource, put_resource};

/// `Microsoft.Resources/resourceGroups`
pub const RESOURCES_API_VERSION: &str = "2021-04-01";

/// `Microsoft.Compute` (availability sets, virtual machines, extensions)
pub const COMPUTE_API_VERSION: &str = "2023-03-01";

/// `Microsoft.Network` (public IPs, virtual networks, subnets, NICs)
pub const NETWORK_API_VERSION: &str = "2023-05-01";

/// Raw facts about the initial create-or-update response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseDiagnostics {
    /// HTTP status of the PUT
    pub status_code: u16,

    /// Response body of the PUT, as received
    pub body: String,

    /// Time from sending the PUT until the operation reached a terminal state
    pub elapsed: Duration,
}

/// Result of a completed create-or-update
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOutcome {
    /// Resource as reported once the operation finished
    pub resource: Value,

    pub diagnostics: ResponseDiagnostics,
}

/// Port to the ARM control plane
#[async_trait]
pub trait ControlPlane: Send + Sync {
    /// Create or converge a resource and wait until its operation is terminal
    ///
    /// `timeout` bounds the whole wait (request plus polling). `None` waits
    /// for as long as the service keeps reporting progress.
    async fn create_or_update(
        &self,
        id: &ResourceId,
        api_version: &str,
        body: Value,
        timeout: Option<Duration>,
    ) -> ProvisionResult<OperationOutcome>;

    /// Read a resource; `expand` is passed as `$expand`
    async fn get(
        &self,
        id: &ResourceId,
        api_version: &str,
        expand: Option<&str>,
    ) -> ProvisionResult<Value>;
}
