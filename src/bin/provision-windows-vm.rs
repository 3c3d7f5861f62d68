// Copyright (c) 2025 - Cowboy AI, Inc.
//! Windows VM Provisioner
//!
//! Creates the resource group, availability set, public IP, virtual network,
//! subnet, network interface and Windows VM described by the configuration,
//! printing every stage result as soon as the stage finishes and the VM
//! status at the end.
//!
//! Run with: cargo run --bin provision-windows-vm
//!
//! Prerequisites:
//! 1. Service principal in AZURE_SUBSCRIPTION_ID, AZURE_CLIENT_ID,
//!    AZURE_CLIENT_SECRET and AZURE_TENANT_ID
//! 2. VM admin password in AZURE_VM_ADMIN_PASSWORD
//! 3. AZURE_STORAGE_ACCOUNT_KEY when PROVISION_DEPLOY_CUSTOM_SCRIPT is set
//!
//! Logs go to stderr; stdout carries only the report.

use anyhow::{Context, Result};
use cim_azure_provisioner::{
    config::ProvisionConfig, credentials::EnvSecrets, provision_with_observer,
    service::StageOutcome, HttpControlPlane,
};
use tracing::info;

const SEPARATOR: &str = "------------------------------------------------------";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    info!("🚀 Starting Windows VM provisioning");

    // Load configuration
    let config = ProvisionConfig::from_env().context("Invalid provisioning configuration")?;
    let topology = &config.topology;
    info!("📋 Configuration loaded:");
    info!("  - Resource group: {}", topology.resource_group);
    info!("  - Location: {}", topology.location);
    info!(
        "  - VM: {} ({})",
        topology.virtual_machine.name, topology.virtual_machine.size
    );
    info!(
        "  - Custom script extension: {}",
        config.extensions.deploy_custom_script
    );
    info!(
        "  - GPU driver extension: {}",
        config.extensions.deploy_gpu_driver
    );
    info!(
        "  - Resource manager: {}",
        config.control_plane.resource_manager_url
    );

    let report = provision_with_observer(
        config,
        &EnvSecrets,
        HttpControlPlane::connect,
        |stage, outcome| {
            println!("{}", SEPARATOR);
            match outcome {
                StageOutcome::Resource(resource) => {
                    println!("{}:", stage);
                    println!(
                        "{}",
                        serde_json::to_string_pretty(resource)
                            .unwrap_or_else(|_| resource.to_string())
                    );
                }
                StageOutcome::Extension(deployment) => {
                    println!("{}:", stage);
                    println!("{}", deployment);
                }
                StageOutcome::Inspected(status) => print!("{}", status),
                StageOutcome::Halted(output) => {
                    for warning in &output.warnings {
                        println!("{}", warning);
                    }
                }
            }
        },
    )
    .await
    .context("Provisioning failed")?;

    info!(
        "✅ Done after {} pipeline transitions",
        report.history.len()
    );
    Ok(())
}
