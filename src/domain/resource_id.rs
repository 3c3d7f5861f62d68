// Copyright (c) 2025 - Cowboy AI, Inc.
//! ARM Resource Identifier value object
//!
//! Every Azure Resource Manager resource is addressed by a path:
//!
//! ```text
//! /subscriptions/{sub}/resourceGroups/{rg}
//! /subscriptions/{sub}/resourceGroups/{rg}/providers/{namespace}/{type}/{name}[/{type}/{name}]*
//! ```
//!
//! The fixed segments (`subscriptions`, `resourceGroups`, `providers`) are
//! matched case-insensitively because ARM echoes them back in varying case.
//! Rendering is always canonical.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::ProvisionError;

/// A (type, name) pair below the provider namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypedName {
    pub resource_type: String,
    pub name: String,
}

/// Parsed ARM resource identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ResourceId {
    subscription_id: String,
    resource_group: String,
    namespace: Option<String>,
    segments: Vec<TypedName>,
}

impl ResourceId {
    /// Identifier of a resource group
    pub fn resource_group(
        subscription_id: impl Into<String>,
        resource_group: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: resource_group.into(),
            namespace: None,
            segments: Vec::new(),
        }
    }

    /// Identifier of a top-level provider resource inside this resource group
    pub fn provider(
        &self,
        namespace: impl Into<String>,
        resource_type: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            subscription_id: self.subscription_id.clone(),
            resource_group: self.resource_group.clone(),
            namespace: Some(namespace.into()),
            segments: vec![TypedName {
                resource_type: resource_type.into(),
                name: name.into(),
            }],
        }
    }

    /// Identifier of a child resource (e.g. a subnet of a virtual network)
    pub fn child(&self, resource_type: impl Into<String>, name: impl Into<String>) -> Self {
        let mut child = self.clone();
        child.segments.push(TypedName {
            resource_type: resource_type.into(),
            name: name.into(),
        });
        child
    }

    pub fn subscription_id(&self) -> &str {
        &self.subscription_id
    }

    pub fn resource_group_name(&self) -> &str {
        &self.resource_group
    }

    /// Provider namespace, `None` for a resource group
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Name of the addressed resource (the resource group name for groups)
    pub fn name(&self) -> &str {
        self.segments
            .last()
            .map(|s| s.name.as_str())
            .unwrap_or(&self.resource_group)
    }

    /// Full ARM type, e.g. `Microsoft.Network/virtualNetworks/subnets`
    pub fn full_type(&self) -> String {
        match &self.namespace {
            None => "Microsoft.Resources/resourceGroups".to_string(),
            Some(ns) => {
                let mut out = ns.clone();
                for segment in &self.segments {
                    out.push('/');
                    out.push_str(&segment.resource_type);
                }
                out
            }
        }
    }

    /// Whether the two ids address the same resource (ARM ids are case-insensitive)
    pub fn same_resource(&self, other: &ResourceId) -> bool {
        self.to_string().eq_ignore_ascii_case(&other.to_string())
    }

    /// Path segments for building request URLs
    pub fn path_segments(&self) -> Vec<&str> {
        let mut out = vec![
            "subscriptions",
            self.subscription_id.as_str(),
            "resourceGroups",
            self.resource_group.as_str(),
        ];
        if let Some(ns) = &self.namespace {
            out.push("providers");
            out.push(ns);
            for segment in &self.segments {
                out.push(&segment.resource_type);
                out.push(&segment.name);
            }
        }
        out
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in self.path_segments() {
            write!(f, "/{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for ResourceId {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ProvisionError::InvalidResourceId(format!("{s}: {reason}"));

        let parts: Vec<&str> = s.trim_matches('/').split('/').collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(invalid("empty path segment"));
        }
        if parts.len() < 4
            || !parts[0].eq_ignore_ascii_case("subscriptions")
            || !parts[2].eq_ignore_ascii_case("resourceGroups")
        {
            return Err(invalid("expected /subscriptions/{id}/resourceGroups/{name}"));
        }

        let group = ResourceId::resource_group(parts[1], parts[3]);
        let rest = &parts[4..];
        if rest.is_empty() {
            return Ok(group);
        }

        if !rest[0].eq_ignore_ascii_case("providers") || rest.len() < 4 {
            return Err(invalid("expected /providers/{namespace}/{type}/{name}"));
        }
        let typed = &rest[2..];
        if typed.len() % 2 != 0 {
            return Err(invalid("resource type without a name"));
        }

        let mut id = group.provider(rest[1], typed[0], typed[1]);
        for pair in typed[2..].chunks(2) {
            id = id.child(pair[0], pair[1]);
        }
        Ok(id)
    }
}

impl TryFrom<String> for ResourceId {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ResourceId> for String {
    fn from(id: ResourceId) -> Self {
        id.to_string()
    }
}
