// Copyright (c) 2025 - Cowboy AI, Inc.
//! Virtual machine extensions
//!
//! Two optional post-provisioning extensions:
//!
//! | Extension     | Publisher              | Type                     | Handler |
//! |---------------|------------------------|--------------------------|---------|
//! | Custom script | `Microsoft.Compute`    | `CustomScriptExtension`  | 1.10    |
//! | GPU driver    | `Microsoft.HpcCompute` | `NvidiaGpuDriverWindows` | 1.2     |
//!
//! Extension instance-view status codes are classified by prefix:
//!
//! ```text
//! ProvisioningState/succeeded          → Succeeded
//! ProvisioningState/failed/<reason>    → Failed(reason)
//! anything else                        → InProgress
//! ```

use serde_json::json;
use std::fmt;
use std::time::Duration;

use crate::arm::ResponseDiagnostics;
use crate::config::CustomScriptSettings;
use crate::credentials::SecretString;
use crate::models::{
    InstanceViewStatus, ProtectedSettings, VirtualMachineExtension,
    VirtualMachineExtensionProperties,
};

const SUCCEEDED_PREFIX: &str = "ProvisioningState/succeeded";
const FAILED_PREFIX: &str = "ProvisioningState/failed/";

pub const CUSTOM_SCRIPT_PUBLISHER: &str = "Microsoft.Compute";
pub const CUSTOM_SCRIPT_TYPE: &str = "CustomScriptExtension";
pub const CUSTOM_SCRIPT_HANDLER_VERSION: &str = "1.10";

pub const GPU_DRIVER_PUBLISHER: &str = "Microsoft.HpcCompute";
pub const GPU_DRIVER_TYPE: &str = "NvidiaGpuDriverWindows";
pub const GPU_DRIVER_HANDLER_VERSION: &str = "1.2";

/// Custom script extension: downloads `file_uris` and runs the command
pub fn custom_script(
    location: &str,
    settings: &CustomScriptSettings,
    storage_account_key: &SecretString,
) -> VirtualMachineExtension {
    VirtualMachineExtension::located(
        location,
        VirtualMachineExtensionProperties {
            publisher: Some(CUSTOM_SCRIPT_PUBLISHER.to_string()),
            extension_type: Some(CUSTOM_SCRIPT_TYPE.to_string()),
            type_handler_version: Some(CUSTOM_SCRIPT_HANDLER_VERSION.to_string()),
            auto_upgrade_minor_version: Some(true),
            settings: Some(json!({
                "fileUris": settings.file_uris,
                "commandToExecute": settings.command_to_execute,
            })),
            protected_settings: Some(ProtectedSettings(json!({
                "storageAccountName": settings.storage_account_name,
                "storageAccountKey": storage_account_key.expose(),
            }))),
            force_update_tag: Some(settings.force_update_tag.clone()),
            ..Default::default()
        },
    )
}

/// NVIDIA GPU driver extension
pub fn gpu_driver(location: &str) -> VirtualMachineExtension {
    VirtualMachineExtension::located(
        location,
        VirtualMachineExtensionProperties {
            publisher: Some(GPU_DRIVER_PUBLISHER.to_string()),
            extension_type: Some(GPU_DRIVER_TYPE.to_string()),
            type_handler_version: Some(GPU_DRIVER_HANDLER_VERSION.to_string()),
            auto_upgrade_minor_version: Some(true),
            ..Default::default()
        },
    )
}

/// Classified extension status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionStatus {
    Succeeded,
    Failed(String),
    InProgress,
}

impl ExtensionStatus {
    pub fn from_code(code: &str) -> Self {
        if code.starts_with(SUCCEEDED_PREFIX) {
            ExtensionStatus::Succeeded
        } else if let Some(reason) = code.strip_prefix(FAILED_PREFIX) {
            ExtensionStatus::Failed(reason.to_string())
        } else {
            ExtensionStatus::InProgress
        }
    }

    pub fn from_status(status: &InstanceViewStatus) -> Self {
        status
            .code
            .as_deref()
            .map(Self::from_code)
            .unwrap_or(ExtensionStatus::InProgress)
    }
}

impl fmt::Display for ExtensionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtensionStatus::Succeeded => f.write_str("succeeded"),
            ExtensionStatus::Failed(reason) => write!(f, "failed ({})", reason),
            ExtensionStatus::InProgress => f.write_str("in progress"),
        }
    }
}

/// What a deployed extension reported back
#[derive(Debug, Clone)]
pub struct ExtensionDeployment {
    pub name: String,
    pub extension: VirtualMachineExtension,
    pub diagnostics: ResponseDiagnostics,
}

impl ExtensionDeployment {
    pub fn provisioning_state(&self) -> Option<&str> {
        self.extension.properties.provisioning_state.as_deref()
    }

    /// Classified statuses from the extension's instance view
    pub fn statuses(&self) -> Vec<ExtensionStatus> {
        self.extension
            .properties
            .instance_view
            .iter()
            .flat_map(|view| view.statuses.iter())
            .map(ExtensionStatus::from_status)
            .collect()
    }

    pub fn elapsed(&self) -> Duration {
        self.diagnostics.elapsed
    }
}

impl fmt::Display for ExtensionDeployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Extension {}", self.name)?;
        writeln!(f, "  Response status code: {}", self.diagnostics.status_code)?;
        writeln!(f, "  Response time elapsed (seconds): {}", self.elapsed().as_secs())?;
        writeln!(f, "  Response text: {}", self.diagnostics.body)?;
        write!(
            f,
            "  Extension status: {}",
            self.provisioning_state().unwrap_or("n/a")
        )
    }
}
