// Copyright (c) 2025 - Cowboy AI, Inc.
//! Human-readable VM status dump
//!
//! Formats a virtual machine fetched with `$expand=instanceView`. Fields the
//! service did not return print as `n/a`.

use std::fmt;

use crate::models::{InstanceViewStatus, VirtualMachine};
use crate::service::ExtensionStatus;

const MISSING: &str = "n/a";

/// Status report for one virtual machine
#[derive(Debug, Clone, PartialEq)]
pub struct VmStatusReport {
    vm: VirtualMachine,
}

impl VmStatusReport {
    pub fn new(vm: VirtualMachine) -> Self {
        Self { vm }
    }

    pub fn virtual_machine(&self) -> &VirtualMachine {
        &self.vm
    }
}

fn text(value: Option<&str>) -> &str {
    value.unwrap_or(MISSING)
}

fn flag(value: Option<bool>) -> String {
    value.map_or_else(|| MISSING.to_string(), |v| v.to_string())
}

fn write_statuses(
    f: &mut fmt::Formatter<'_>,
    indent: &str,
    statuses: &[InstanceViewStatus],
    with_time: bool,
) -> fmt::Result {
    for status in statuses {
        writeln!(f, "{indent}code: {}", text(status.code.as_deref()))?;
        writeln!(
            f,
            "{indent}displayStatus: {}",
            text(status.display_status.as_deref())
        )?;
        if with_time {
            match status.time {
                Some(time) => writeln!(f, "{indent}time: {}", time.to_rfc3339())?,
                None => writeln!(f, "{indent}time: {MISSING}")?,
            }
        }
    }
    Ok(())
}

impl fmt::Display for VmStatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let props = &self.vm.properties;
        let hardware = props.hardware_profile.as_ref();
        let storage = props.storage_profile.as_ref();
        let image = storage.and_then(|s| s.image_reference.as_ref());
        let os_disk = storage.and_then(|s| s.os_disk.as_ref());
        let os_profile = props.os_profile.as_ref();
        let windows = os_profile.and_then(|o| o.windows_configuration.as_ref());
        let instance_view = props.instance_view.as_ref();

        writeln!(f, "hardwareProfile")?;
        writeln!(f, "   vmSize: {}", text(hardware.and_then(|h| h.vm_size.as_deref())))?;

        writeln!(f, "\nstorageProfile")?;
        writeln!(f, "  imageReference")?;
        writeln!(f, "    publisher: {}", text(image.and_then(|i| i.publisher.as_deref())))?;
        writeln!(f, "    offer: {}", text(image.and_then(|i| i.offer.as_deref())))?;
        writeln!(f, "    sku: {}", text(image.and_then(|i| i.sku.as_deref())))?;
        writeln!(f, "    version: {}", text(image.and_then(|i| i.version.as_deref())))?;
        writeln!(f, "  osDisk")?;
        writeln!(f, "    osType: {}", text(os_disk.and_then(|d| d.os_type.as_deref())))?;
        writeln!(f, "    name: {}", text(os_disk.and_then(|d| d.name.as_deref())))?;

        writeln!(f, "\nosProfile")?;
        writeln!(
            f,
            "  computerName: {}",
            text(os_profile.and_then(|o| o.computer_name.as_deref()))
        )?;
        writeln!(
            f,
            "  adminUsername: {}",
            text(os_profile.and_then(|o| o.admin_username.as_deref()))
        )?;
        writeln!(
            f,
            "  provisionVMAgent: {}",
            flag(windows.and_then(|w| w.provision_vm_agent))
        )?;
        writeln!(
            f,
            "  enableAutomaticUpdates: {}",
            flag(windows.and_then(|w| w.enable_automatic_updates))
        )?;

        writeln!(f, "\nnetworkProfile")?;
        for nic in props
            .network_profile
            .iter()
            .flat_map(|n| n.network_interfaces.iter())
        {
            writeln!(f, "  networkInterface id: {}", nic.id)?;
        }

        writeln!(f, "\nVM disks")?;
        for disk in instance_view.iter().flat_map(|v| v.disks.iter()) {
            writeln!(f, "  name: {}", text(disk.name.as_deref()))?;
            writeln!(f, "  statuses")?;
            write_statuses(f, "    ", &disk.statuses, true)?;
        }

        writeln!(f, "\nVM general status")?;
        writeln!(f, "  provisioningStatus: {}", text(props.provisioning_state.as_deref()))?;
        writeln!(f, "  id: {}", text(self.vm.id.as_deref()))?;
        writeln!(f, "  name: {}", text(self.vm.name.as_deref()))?;
        writeln!(f, "  type: {}", text(self.vm.resource_type.as_deref()))?;
        writeln!(f, "  location: {}", text(self.vm.location.as_deref()))?;

        writeln!(f, "\nVM instance status")?;
        if let Some(view) = instance_view {
            write_statuses(f, "  ", &view.statuses, false)?;
        }

        let extensions = instance_view.map(|v| v.extensions.as_slice()).unwrap_or(&[]);
        if !extensions.is_empty() {
            writeln!(f, "\nVM extensions")?;
            for extension in extensions {
                writeln!(f, "  name: {}", text(extension.name.as_deref()))?;
                writeln!(f, "  type: {}", text(extension.extension_type.as_deref()))?;
                for status in &extension.statuses {
                    writeln!(
                        f,
                        "    {}: {}",
                        text(status.code.as_deref()),
                        ExtensionStatus::from_status(status)
                    )?;
                }
            }
        }

        Ok(())
    }
}
