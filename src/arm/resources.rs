// Copyright (c) 2025 - Cowboy AI, Inc.
//! Typed access on top of [`ControlPlane`]

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

use super::{ControlPlane, ResponseDiagnostics};
use crate::domain::ResourceId;
use crate::errors::{ProvisionError, ProvisionResult};

/// Create or update `id` from a typed body and decode the settled resource
pub async fn put_resource<C, B, R>(
    control_plane: &C,
    id: &ResourceId,
    api_version: &str,
    body: &B,
    timeout: Option<Duration>,
) -> ProvisionResult<(R, ResponseDiagnostics)>
where
    C: ControlPlane + ?Sized,
    B: Serialize,
    R: DeserializeOwned,
{
    let body = serde_json::to_value(body)?;
    let outcome = control_plane
        .create_or_update(id, api_version, body, timeout)
        .await?;

    let resource = decode(id, outcome.resource)?;
    Ok((resource, outcome.diagnostics))
}

/// Read `id` and decode it
pub async fn get_resource<C, R>(
    control_plane: &C,
    id: &ResourceId,
    api_version: &str,
    expand: Option<&str>,
) -> ProvisionResult<R>
where
    C: ControlPlane + ?Sized,
    R: DeserializeOwned,
{
    let value = control_plane.get(id, api_version, expand).await?;
    decode(id, value)
}

fn decode<R: DeserializeOwned>(id: &ResourceId, value: serde_json::Value) -> ProvisionResult<R> {
    serde_json::from_value(value)
        .map_err(|e| ProvisionError::Deserialization(format!("{}: {}", id, e)))
}
