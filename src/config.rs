// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning configuration
//!
//! The whole target topology is one explicit [`ProvisionConfig`] that is passed
//! through the pipeline. Defaults describe the single supported topology
//! (one Windows Server VM behind a dynamic public IP in an aligned
//! availability set); a handful of names can be overridden from `PROVISION_*`
//! environment variables.
//!
//! Secrets are not part of the configuration. They are read through a
//! [`SecretSource`](crate::credentials::SecretSource) under the names
//! [`ADMIN_PASSWORD_SECRET`] and [`STORAGE_ACCOUNT_KEY_SECRET`].

use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

use crate::domain::{ensure_subnet_within, AddressPrefix};
use crate::errors::{ProvisionError, ProvisionResult};

pub const ADMIN_PASSWORD_SECRET: &str = "AZURE_VM_ADMIN_PASSWORD";
pub const STORAGE_ACCOUNT_KEY_SECRET: &str = "AZURE_STORAGE_ACCOUNT_KEY";

pub const DEFAULT_RESOURCE_MANAGER_URL: &str = "https://management.azure.com";
pub const DEFAULT_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

/// Upper bound on waiting for an extension to report a terminal state
pub const EXTENSION_TIMEOUT_SECS: u64 = 3600;

/// Complete configuration for one provisioning run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    pub topology: Topology,
    pub extensions: ExtensionSettings,
    pub control_plane: ControlPlaneSettings,
}

/// Names and shapes of every resource the pipeline creates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub resource_group: String,
    pub location: String,
    pub availability_set: AvailabilitySetSpec,
    pub public_ip: PublicIpSpec,
    pub virtual_network: VirtualNetworkSpec,
    pub subnet: SubnetSpec,
    pub network_interface: NetworkInterfaceSpec,
    pub virtual_machine: VirtualMachineSpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilitySetSpec {
    pub name: String,
    pub sku: String,
    pub fault_domain_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicIpSpec {
    pub name: String,
    pub allocation_method: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualNetworkSpec {
    pub name: String,
    pub address_prefixes: Vec<AddressPrefix>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubnetSpec {
    pub name: String,
    pub address_prefix: AddressPrefix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceSpec {
    pub name: String,
    pub ip_configuration_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineSpec {
    pub name: String,
    pub size: String,
    pub admin_username: String,
    pub image: ImageSpec,
}

/// Marketplace image coordinates
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            resource_group: "mb8azure-sample-group-virtual-machines".to_string(),
            location: "centralus".to_string(),
            availability_set: AvailabilitySetSpec {
                name: "myAVSet".to_string(),
                sku: "Aligned".to_string(),
                fault_domain_count: 3,
            },
            public_ip: PublicIpSpec {
                name: "mbIPAddress".to_string(),
                allocation_method: "Dynamic".to_string(),
            },
            virtual_network: VirtualNetworkSpec {
                name: "myVNet".to_string(),
                address_prefixes: vec![AddressPrefix::ipv4_network(Ipv4Addr::new(10, 0, 0, 0), 16)],
            },
            subnet: SubnetSpec {
                name: "mySubnet".to_string(),
                address_prefix: AddressPrefix::ipv4_network(Ipv4Addr::new(10, 0, 0, 0), 24),
            },
            network_interface: NetworkInterfaceSpec {
                name: "mb8azure-sample-nic".to_string(),
                ip_configuration_name: "myIPConfig".to_string(),
            },
            virtual_machine: VirtualMachineSpec {
                name: "mb8WindowsVM".to_string(),
                size: "Standard_DS1".to_string(),
                admin_username: "azureuser".to_string(),
                image: ImageSpec {
                    publisher: "MicrosoftWindowsServer".to_string(),
                    offer: "WindowsServer".to_string(),
                    sku: "2012-R2-Datacenter".to_string(),
                    version: "latest".to_string(),
                },
            },
        }
    }
}

/// Optional post-provisioning VM extensions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionSettings {
    pub deploy_custom_script: bool,
    pub deploy_gpu_driver: bool,
    pub custom_script: CustomScriptSettings,
    pub gpu_driver_name: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomScriptSettings {
    pub name: String,
    pub file_uris: Vec<String>,
    pub command_to_execute: String,
    pub storage_account_name: String,
    pub force_update_tag: String,
}

impl Default for ExtensionSettings {
    fn default() -> Self {
        Self {
            deploy_custom_script: false,
            deploy_gpu_driver: false,
            custom_script: CustomScriptSettings {
                name: "CSEOK".to_string(),
                file_uris: vec![
                    "https://mbtests1.blob.core.windows.net/quickstartblobs1/RC0.ps1".to_string(),
                    "https://mbtests1.blob.core.windows.net/quickstartblobs1/RC2.ps1".to_string(),
                ],
                command_to_execute: "powershell -ExecutionPolicy Unrestricted -File RC2.ps1"
                    .to_string(),
                storage_account_name: "mbtests1".to_string(),
                force_update_tag: "10".to_string(),
            },
            gpu_driver_name: "nvidiaextension".to_string(),
            timeout_secs: EXTENSION_TIMEOUT_SECS,
        }
    }
}

/// How to reach the control plane
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlPlaneSettings {
    pub resource_manager_url: String,
    pub authority_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Poll interval used when the service sends no Retry-After header
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_request_timeout() -> u64 {
    30
}

fn default_poll_interval() -> u64 {
    5
}

impl Default for ControlPlaneSettings {
    fn default() -> Self {
        Self {
            resource_manager_url: DEFAULT_RESOURCE_MANAGER_URL.to_string(),
            authority_url: DEFAULT_AUTHORITY_URL.to_string(),
            request_timeout_secs: default_request_timeout(),
            poll_interval_secs: default_poll_interval(),
        }
    }
}

impl ProvisionConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> ProvisionResult<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from a variable lookup, applying overrides on top of defaults
    pub fn from_lookup<F>(lookup: F) -> ProvisionResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let mut config = Self::default();

        let topology = &mut config.topology;
        if let Some(v) = get("PROVISION_RESOURCE_GROUP") {
            topology.resource_group = v;
        }
        if let Some(v) = get("PROVISION_LOCATION") {
            topology.location = v;
        }
        if let Some(v) = get("PROVISION_VM_NAME") {
            topology.virtual_machine.name = v;
        }
        if let Some(v) = get("PROVISION_VM_SIZE") {
            topology.virtual_machine.size = v;
        }
        if let Some(v) = get("PROVISION_ADMIN_USERNAME") {
            topology.virtual_machine.admin_username = v;
        }
        if let Some(v) = get("PROVISION_NIC_NAME") {
            topology.network_interface.name = v;
        }
        if let Some(v) = get("PROVISION_VNET_ADDRESS_SPACE") {
            topology.virtual_network.address_prefixes = v
                .split(',')
                .map(|p| AddressPrefix::new(p.trim()))
                .collect::<Result<_, _>>()?;
        }
        if let Some(v) = get("PROVISION_SUBNET_PREFIX") {
            topology.subnet.address_prefix = AddressPrefix::new(v.trim())?;
        }

        if let Some(v) = get("PROVISION_DEPLOY_CUSTOM_SCRIPT") {
            config.extensions.deploy_custom_script =
                parse_flag("PROVISION_DEPLOY_CUSTOM_SCRIPT", &v)?;
        }
        if let Some(v) = get("PROVISION_DEPLOY_GPU_DRIVER") {
            config.extensions.deploy_gpu_driver = parse_flag("PROVISION_DEPLOY_GPU_DRIVER", &v)?;
        }

        if let Some(v) = get("AZURE_RESOURCE_MANAGER_URL") {
            config.control_plane.resource_manager_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = get("AZURE_AUTHORITY_HOST") {
            config.control_plane.authority_url = v.trim_end_matches('/').to_string();
        }

        config.validate()?;
        Ok(config)
    }

    /// Check topology invariants before anything is sent to the control plane
    pub fn validate(&self) -> ProvisionResult<()> {
        let topology = &self.topology;

        let names = [
            ("resource group", &topology.resource_group),
            ("location", &topology.location),
            ("availability set", &topology.availability_set.name),
            ("public IP", &topology.public_ip.name),
            ("virtual network", &topology.virtual_network.name),
            ("subnet", &topology.subnet.name),
            ("network interface", &topology.network_interface.name),
            ("IP configuration", &topology.network_interface.ip_configuration_name),
            ("virtual machine", &topology.virtual_machine.name),
            ("admin username", &topology.virtual_machine.admin_username),
        ];
        if let Some((what, _)) = names.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(ProvisionError::Configuration(format!("{what} name is empty")));
        }

        // Windows computer names are limited to 15 characters
        if topology.virtual_machine.name.len() > 15 {
            return Err(ProvisionError::Configuration(format!(
                "VM name '{}' exceeds the 15 character Windows computer name limit",
                topology.virtual_machine.name
            )));
        }

        if !(1..=3).contains(&topology.availability_set.fault_domain_count) {
            return Err(ProvisionError::Configuration(format!(
                "fault domain count {} must be between 1 and 3",
                topology.availability_set.fault_domain_count
            )));
        }

        if topology.virtual_network.address_prefixes.is_empty() {
            return Err(ProvisionError::Configuration(
                "virtual network has no address space".to_string(),
            ));
        }
        ensure_subnet_within(
            &topology.subnet.address_prefix,
            &topology.virtual_network.address_prefixes,
        )?;

        if self.extensions.timeout_secs == 0 {
            return Err(ProvisionError::Configuration(
                "extension timeout must be positive".to_string(),
            ));
        }

        Ok(())
    }
}

fn parse_flag(name: &str, value: &str) -> ProvisionResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProvisionError::Configuration(format!(
            "{name} must be a boolean, got '{other}'"
        ))),
    }
}
