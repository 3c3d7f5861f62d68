// Copyright (c) 2025 - Cowboy AI, Inc.
//! Service Layer for VM Provisioning
//!
//! Orchestrates the domain values, the pipeline state machine and the ARM
//! control plane.
//!
//! # Architecture
//!
//! ```text
//! ProvisionConfig + SecretSource
//!     ↓
//! provision() ── resolve credentials & secrets (no I/O yet)
//!     ↓
//! Provisioner ── state machine check → request body → ControlPlane
//!     ↓                                  └→ StageOutcome per finished stage
//! ProvisioningReport (stage results, extension diagnostics, status, history)
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use cim_azure_provisioner::arm::HttpControlPlane;
//! use cim_azure_provisioner::config::ProvisionConfig;
//! use cim_azure_provisioner::credentials::EnvSecrets;
//! use cim_azure_provisioner::service::provision;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ProvisionConfig::from_env()?;
//! let report = provision(config, &EnvSecrets, HttpControlPlane::connect).await?;
//! println!("{}", report.status);
//! # Ok(())
//! # }
//! ```

pub mod extensions;
pub mod provisioner;
pub mod requests;

pub use extensions::{ExtensionDeployment, ExtensionStatus};
pub use provisioner::{
    provision, provision_with_observer, ProvisionSecrets, Provisioner, ProvisioningReport,
    StageObserver, StageOutcome,
};
pub use requests::ResourceIds;
