// Copyright (c) 2025 - Cowboy AI, Inc.
//! Microsoft.Network resource payloads

use serde::{Deserialize, Serialize};

use super::{Resource, SubResource};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressProperties {
    #[serde(
        rename = "publicIPAllocationMethod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_allocation_method: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type PublicIpAddress = Resource<PublicIpAddressProperties>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    #[serde(default)]
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_space: Option<AddressSpace>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type VirtualNetwork = Resource<VirtualNetworkProperties>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_prefix: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type Subnet = Resource<SubnetProperties>;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationProperties {
    #[serde(
        rename = "publicIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address: Option<SubResource>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<SubResource>,

    #[serde(
        rename = "privateIPAllocationMethod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_allocation_method: Option<String>,

    #[serde(
        rename = "privateIPAddress",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address: Option<String>,
}

/// Named IP configuration of a network interface
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub properties: IpConfigurationProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    #[serde(default)]
    pub ip_configurations: Vec<IpConfiguration>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

pub type NetworkInterface = Resource<NetworkInterfaceProperties>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_public_ip_wire_names() {
        let ip = PublicIpAddress::located(
            "centralus",
            PublicIpAddressProperties {
                public_ip_allocation_method: Some("Dynamic".to_string()),
                ..Default::default()
            },
        );
        assert_eq!(
            serde_json::to_value(&ip).unwrap(),
            json!({
                "location": "centralus",
                "properties": { "publicIPAllocationMethod": "Dynamic" }
            })
        );
    }

    #[test]
    fn test_nic_ip_configuration_wire_names() {
        let nic = NetworkInterface::located(
            "centralus",
            NetworkInterfaceProperties {
                ip_configurations: vec![IpConfiguration {
                    name: "myIPConfig".to_string(),
                    id: None,
                    properties: IpConfigurationProperties {
                        public_ip_address: Some(SubResource { id: "pip".to_string() }),
                        subnet: Some(SubResource { id: "subnet".to_string() }),
                        ..Default::default()
                    },
                }],
                provisioning_state: None,
            },
        );

        let json = serde_json::to_value(&nic).unwrap();
        let config = &json["properties"]["ipConfigurations"][0];
        assert_eq!(config["name"], "myIPConfig");
        assert_eq!(config["properties"]["publicIPAddress"]["id"], "pip");
        assert_eq!(config["properties"]["subnet"]["id"], "subnet");
    }

    #[test]
    fn test_subnet_has_no_location() {
        let subnet = Subnet::unlocated(SubnetProperties {
            address_prefix: Some("10.0.0.0/24".to_string()),
            provisioning_state: None,
        });
        assert_eq!(
            serde_json::to_value(&subnet).unwrap(),
            json!({ "properties": { "addressPrefix": "10.0.0.0/24" } })
        );
    }
}
