// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service-principal credentials and secret sourcing
//!
//! Credentials and every other secret (VM admin password, storage account
//! key) come from a [`SecretSource`]. The process environment is the default
//! source; tests substitute a map. Secret values are wrapped in
//! [`SecretString`] so they never show up in `Debug` output or logs.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::errors::{ProvisionError, ProvisionResult};

pub const SUBSCRIPTION_ID_VAR: &str = "AZURE_SUBSCRIPTION_ID";
pub const CLIENT_ID_VAR: &str = "AZURE_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "AZURE_CLIENT_SECRET";
pub const TENANT_ID_VAR: &str = "AZURE_TENANT_ID";

/// String whose value is hidden from `Debug` and `Display`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Explicit access to the secret value
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString(<redacted>)")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

/// Where secrets are read from
pub trait SecretSource: Send + Sync {
    /// Look up a secret by name; empty values count as absent
    fn secret(&self, name: &str) -> Option<SecretString>;

    /// Look up a secret that must be present
    fn require(&self, name: &str) -> ProvisionResult<SecretString> {
        self.secret(name)
            .ok_or_else(|| ProvisionError::MissingSecret(name.to_string()))
    }
}

/// Reads secrets from process environment variables
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecrets;

impl SecretSource for EnvSecrets {
    fn secret(&self, name: &str) -> Option<SecretString> {
        std::env::var(name)
            .ok()
            .filter(|v| !v.is_empty())
            .map(SecretString)
    }
}

impl SecretSource for HashMap<String, String> {
    fn secret(&self, name: &str) -> Option<SecretString> {
        self.get(name)
            .filter(|v| !v.is_empty())
            .map(|v| SecretString(v.clone()))
    }
}

/// Azure AD service principal used to authenticate against ARM
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicePrincipalCredentials {
    pub subscription_id: String,
    pub client_id: String,
    pub client_secret: SecretString,
    pub tenant_id: String,
}

impl ServicePrincipalCredentials {
    /// Read the four required values; the first missing one is reported
    pub fn resolve(source: &dyn SecretSource) -> ProvisionResult<Self> {
        let read = |name: &str| {
            source
                .secret(name)
                .ok_or_else(|| ProvisionError::MissingCredential(name.to_string()))
        };

        Ok(Self {
            subscription_id: read(SUBSCRIPTION_ID_VAR)?.0,
            client_id: read(CLIENT_ID_VAR)?.0,
            client_secret: read(CLIENT_SECRET_VAR)?,
            tenant_id: read(TENANT_ID_VAR)?.0,
        })
    }

    /// Read credentials from the process environment
    pub fn from_env() -> ProvisionResult<Self> {
        Self::resolve(&EnvSecrets)
    }
}
