//! Windows VM provisioning for Azure Resource Manager
//!
//! This crate creates one Windows virtual machine topology (resource group,
//! availability set, public IP, virtual network, subnet, network interface,
//! virtual machine and optional extensions) through the ARM REST API, then
//! reports the VM's instance view.

pub mod arm;
pub mod config;
pub mod credentials;
pub mod domain;
pub mod errors;
pub mod models;
pub mod report;
pub mod service;
pub mod state_machine;

// Re-export commonly used types
pub use arm::{ControlPlane, HttpControlPlane, OperationOutcome, ResponseDiagnostics};
pub use config::ProvisionConfig;
pub use credentials::{EnvSecrets, SecretSource, SecretString, ServicePrincipalCredentials};
pub use errors::{ProvisionError, ProvisionResult};
pub use report::VmStatusReport;
pub use service::{provision, provision_with_observer, Provisioner, ProvisioningReport};
