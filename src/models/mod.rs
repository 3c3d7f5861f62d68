// Copyright (c) 2025 - Cowboy AI, Inc.
//! Azure Resource Manager wire models
//!
//! Every ARM resource shares one JSON envelope:
//!
//! ```text
//! { "id", "name", "type", "location", "sku", "tags", "properties": { ... } }
//! ```
//!
//! [`Resource<P>`] models the envelope once; each resource kind only defines
//! its `properties` payload. Field names are camelCase on the wire. Output-only
//! fields (`id`, `provisioningState`, `instanceView`, ...) are optional so the
//! same types serve as request bodies and responses.

pub mod compute;
pub mod network;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::ResourceId;
use crate::errors::{ProvisionError, ProvisionResult};

pub use compute::{
    AvailabilitySet, AvailabilitySetProperties, DiskInstanceView, HardwareProfile,
    ImageReference, InstanceViewStatus, NetworkInterfaceReference, NetworkProfile, OsDisk,
    OsProfile, ProtectedSettings, StorageProfile, VirtualMachine, VirtualMachineExtension,
    VirtualMachineExtensionInstanceView, VirtualMachineExtensionProperties,
    VirtualMachineInstanceView, VirtualMachineProperties, WindowsConfiguration,
};
pub use network::{
    AddressSpace, IpConfiguration, IpConfigurationProperties, NetworkInterface,
    NetworkInterfaceProperties, PublicIpAddress, PublicIpAddressProperties, Subnet,
    SubnetProperties, VirtualNetwork, VirtualNetworkProperties,
};

/// Generic ARM resource envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    rename_all = "camelCase",
    bound(deserialize = "P: Deserialize<'de> + Default")
)]
pub struct Resource<P> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub resource_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<Sku>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub tags: BTreeMap<String, String>,

    #[serde(default)]
    pub properties: P,
}

impl<P: Default> Resource<P> {
    /// Request body for a located resource
    pub fn located(location: impl Into<String>, properties: P) -> Self {
        Self {
            location: Some(location.into()),
            properties,
            ..Default::default()
        }
    }

    /// Request body for a child resource that carries no location
    pub fn unlocated(properties: P) -> Self {
        Self {
            properties,
            ..Default::default()
        }
    }
}

impl<P> Resource<P> {
    /// Parsed resource id; fails if the control plane did not return one
    pub fn resource_id(&self) -> ProvisionResult<ResourceId> {
        self.returned_id()?.parse()
    }

    /// Reference to this resource carrying the id exactly as returned
    ///
    /// The returned id must parse and address `expected`; its text (including
    /// the casing ARM chose) is passed on unchanged.
    pub fn reference_to(&self, expected: &ResourceId) -> ProvisionResult<SubResource> {
        let raw = self.returned_id()?;
        let returned: ResourceId = raw.parse()?;
        if !returned.same_resource(expected) {
            return Err(ProvisionError::InvalidResourceId(format!(
                "expected {} but the control plane returned {}",
                expected, raw
            )));
        }
        Ok(SubResource { id: raw.to_string() })
    }

    fn returned_id(&self) -> ProvisionResult<&str> {
        self.id.as_deref().ok_or_else(|| {
            ProvisionError::InvalidResourceId(format!(
                "resource {} has no id",
                self.name.as_deref().unwrap_or("<unnamed>")
            ))
        })
    }
}

/// SKU block (`{"name": "Aligned"}`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sku {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
}

impl Sku {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tier: None,
        }
    }
}

/// Reference to another resource by id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubResource {
    pub id: String,
}

/// Resource group has only a provisioning state in its properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type ResourceGroup = Resource<ResourceGroupProperties>;

/// Terminal provisioning states reported by ARM
pub const STATE_SUCCEEDED: &str = "Succeeded";
pub const STATE_FAILED: &str = "Failed";
pub const STATE_CANCELED: &str = "Canceled";

/// Whether an ARM provisioning/operation state is terminal
pub fn is_terminal_state(state: &str) -> bool {
    [STATE_SUCCEEDED, STATE_FAILED, STATE_CANCELED]
        .iter()
        .any(|s| s.eq_ignore_ascii_case(state))
}

/// Read `properties.provisioningState` from an untyped resource body
pub fn provisioning_state_of(body: &serde_json::Value) -> Option<&str> {
    body.get("properties")
        .and_then(|p| p.get("provisioningState"))
        .and_then(|s| s.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_group_body() {
        let group = ResourceGroup::located("centralus", ResourceGroupProperties::default());
        let json = serde_json::to_value(&group).unwrap();
        assert_eq!(json, json!({ "location": "centralus", "properties": {} }));
    }

    #[test]
    fn test_envelope_deserialization() {
        let group: ResourceGroup = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg",
            "name": "rg",
            "type": "Microsoft.Resources/resourceGroups",
            "location": "centralus",
            "properties": { "provisioningState": "Succeeded" }
        }))
        .unwrap();

        assert_eq!(group.resource_type.as_deref(), Some("Microsoft.Resources/resourceGroups"));
        assert_eq!(group.properties.provisioning_state.as_deref(), Some("Succeeded"));
        assert_eq!(group.resource_id().unwrap().name(), "rg");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let group = ResourceGroup::located("centralus", ResourceGroupProperties::default());
        assert!(matches!(
            group.resource_id(),
            Err(ProvisionError::InvalidResourceId(_))
        ));
    }

    #[test]
    fn test_reference_keeps_returned_text() {
        let raw = "/subscriptions/s/resourcegroups/rg/providers/Microsoft.Compute/availabilitySets/myAVSet";
        let avset: AvailabilitySet = serde_json::from_value(json!({ "id": raw })).unwrap();
        let expected = ResourceId::resource_group("s", "rg").provider(
            "Microsoft.Compute",
            "availabilitySets",
            "myAVSet",
        );

        let reference = avset.reference_to(&expected).unwrap();
        assert_eq!(reference.id, raw);
    }

    #[test]
    fn test_reference_to_other_resource_rejected() {
        let avset: AvailabilitySet = serde_json::from_value(json!({
            "id": "/subscriptions/s/resourceGroups/rg/providers/Microsoft.Compute/availabilitySets/other"
        }))
        .unwrap();
        let expected = ResourceId::resource_group("s", "rg").provider(
            "Microsoft.Compute",
            "availabilitySets",
            "myAVSet",
        );

        assert!(matches!(
            avset.reference_to(&expected),
            Err(ProvisionError::InvalidResourceId(_))
        ));
    }

    #[test]
    fn test_terminal_states() {
        assert!(is_terminal_state("Succeeded"));
        assert!(is_terminal_state("failed"));
        assert!(is_terminal_state("Canceled"));
        assert!(!is_terminal_state("Updating"));
        assert!(!is_terminal_state("InProgress"));
    }

    #[test]
    fn test_provisioning_state_of() {
        let body = json!({ "properties": { "provisioningState": "Creating" } });
        assert_eq!(provisioning_state_of(&body), Some("Creating"));
        assert_eq!(provisioning_state_of(&json!({})), None);
    }
}
