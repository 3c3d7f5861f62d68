// Copyright (c) 2025 - Cowboy AI, Inc.
//! Resource identifiers and request bodies for each stage
//!
//! Pure functions of the [`Topology`]; references to other resources are
//! passed in as [`SubResource`]s built from what the control plane returned,
//! so a body carries those ids verbatim.

use crate::config::Topology;
use crate::credentials::SecretString;
use crate::domain::ResourceId;
use crate::models::{
    AddressSpace, AvailabilitySet, AvailabilitySetProperties, HardwareProfile, ImageReference,
    IpConfiguration, IpConfigurationProperties, NetworkInterface, NetworkInterfaceProperties,
    NetworkInterfaceReference, NetworkProfile, OsDisk, OsProfile, PublicIpAddress,
    PublicIpAddressProperties, ResourceGroup, ResourceGroupProperties, Sku, StorageProfile,
    SubResource, Subnet, SubnetProperties, VirtualMachine, VirtualMachineProperties,
    VirtualNetwork, VirtualNetworkProperties, WindowsConfiguration,
};

const COMPUTE: &str = "Microsoft.Compute";
const NETWORK: &str = "Microsoft.Network";

/// Identifiers of every resource in the topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIds {
    pub resource_group: ResourceId,
    pub availability_set: ResourceId,
    pub public_ip: ResourceId,
    pub virtual_network: ResourceId,
    pub subnet: ResourceId,
    pub network_interface: ResourceId,
    pub virtual_machine: ResourceId,
}

impl ResourceIds {
    pub fn new(subscription_id: &str, topology: &Topology) -> Self {
        let group = ResourceId::resource_group(subscription_id, &topology.resource_group);
        let virtual_network =
            group.provider(NETWORK, "virtualNetworks", &topology.virtual_network.name);

        Self {
            availability_set: group.provider(
                COMPUTE,
                "availabilitySets",
                &topology.availability_set.name,
            ),
            public_ip: group.provider(NETWORK, "publicIPAddresses", &topology.public_ip.name),
            subnet: virtual_network.child("subnets", &topology.subnet.name),
            network_interface: group.provider(
                NETWORK,
                "networkInterfaces",
                &topology.network_interface.name,
            ),
            virtual_machine: group.provider(
                COMPUTE,
                "virtualMachines",
                &topology.virtual_machine.name,
            ),
            virtual_network,
            resource_group: group,
        }
    }

    /// Extension resource below the virtual machine
    pub fn extension(&self, name: &str) -> ResourceId {
        self.virtual_machine.child("extensions", name)
    }
}

pub fn resource_group(topology: &Topology) -> ResourceGroup {
    ResourceGroup::located(&topology.location, ResourceGroupProperties::default())
}

pub fn availability_set(topology: &Topology) -> AvailabilitySet {
    let mut body = AvailabilitySet::located(
        &topology.location,
        AvailabilitySetProperties {
            platform_fault_domain_count: Some(topology.availability_set.fault_domain_count),
            ..Default::default()
        },
    );
    body.sku = Some(Sku::named(&topology.availability_set.sku));
    body
}

pub fn public_ip(topology: &Topology) -> PublicIpAddress {
    PublicIpAddress::located(
        &topology.location,
        PublicIpAddressProperties {
            public_ip_allocation_method: Some(topology.public_ip.allocation_method.clone()),
            ..Default::default()
        },
    )
}

pub fn virtual_network(topology: &Topology) -> VirtualNetwork {
    VirtualNetwork::located(
        &topology.location,
        VirtualNetworkProperties {
            address_space: Some(AddressSpace {
                address_prefixes: topology
                    .virtual_network
                    .address_prefixes
                    .iter()
                    .map(|p| p.as_cidr())
                    .collect(),
            }),
            ..Default::default()
        },
    )
}

pub fn subnet(topology: &Topology) -> Subnet {
    Subnet::unlocated(SubnetProperties {
        address_prefix: Some(topology.subnet.address_prefix.as_cidr()),
        ..Default::default()
    })
}

pub fn network_interface(
    topology: &Topology,
    subnet: SubResource,
    public_ip: SubResource,
) -> NetworkInterface {
    NetworkInterface::located(
        &topology.location,
        NetworkInterfaceProperties {
            ip_configurations: vec![IpConfiguration {
                name: topology.network_interface.ip_configuration_name.clone(),
                id: None,
                properties: IpConfigurationProperties {
                    subnet: Some(subnet),
                    public_ip_address: Some(public_ip),
                    ..Default::default()
                },
            }],
            ..Default::default()
        },
    )
}

pub fn virtual_machine(
    topology: &Topology,
    network_interface: SubResource,
    availability_set: SubResource,
    admin_password: &SecretString,
) -> VirtualMachine {
    let vm = &topology.virtual_machine;

    VirtualMachine::located(
        &topology.location,
        VirtualMachineProperties {
            hardware_profile: Some(HardwareProfile {
                vm_size: Some(vm.size.clone()),
            }),
            storage_profile: Some(StorageProfile {
                image_reference: Some(ImageReference {
                    publisher: Some(vm.image.publisher.clone()),
                    offer: Some(vm.image.offer.clone()),
                    sku: Some(vm.image.sku.clone()),
                    version: Some(vm.image.version.clone()),
                }),
                os_disk: Some(OsDisk {
                    create_option: Some("FromImage".to_string()),
                    ..Default::default()
                }),
            }),
            os_profile: Some(OsProfile {
                computer_name: Some(vm.name.clone()),
                admin_username: Some(vm.admin_username.clone()),
                admin_password: Some(admin_password.clone()),
                windows_configuration: Some(WindowsConfiguration {
                    provision_vm_agent: Some(true),
                    enable_automatic_updates: Some(true),
                }),
            }),
            network_profile: Some(NetworkProfile {
                network_interfaces: vec![NetworkInterfaceReference {
                    id: network_interface.id,
                }],
            }),
            availability_set: Some(availability_set),
            ..Default::default()
        },
    )
}
