// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning pipeline
//!
//! Drives the stages in order against a [`ControlPlane`]:
//!
//! ```text
//! resource group → availability set → public IP → virtual network → subnet
//!   → network interface (GET subnet, GET public IP)
//!   → virtual machine   (GET NIC, GET availability set)
//!   → [custom script extension] → [GPU driver extension]
//!   → inspection        (GET VM $expand=instanceView)
//! ```
//!
//! Before a stage issues any request the pipeline state machine must accept
//! it; afterwards the outcome is recorded as `Complete` or `Fail` and handed
//! to the [`StageObserver`], if any. The first error ends the run. Nothing is
//! retried or rolled back.

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{error, info, warn};

use super::extensions::{self, ExtensionDeployment, ExtensionStatus};
use super::requests::{self, ResourceIds};
use crate::arm::{
    get_resource, put_resource, ControlPlane, COMPUTE_API_VERSION, NETWORK_API_VERSION,
    RESOURCES_API_VERSION,
};
use crate::config::{
    ControlPlaneSettings, ExtensionSettings, ProvisionConfig, ADMIN_PASSWORD_SECRET,
    STORAGE_ACCOUNT_KEY_SECRET,
};
use crate::credentials::{SecretSource, SecretString, ServicePrincipalCredentials};
use crate::domain::ResourceId;
use crate::errors::{ProvisionError, ProvisionResult};
use crate::models::{
    AvailabilitySet, NetworkInterface, PublicIpAddress, Resource, ResourceGroup, Subnet,
    VirtualMachine, VirtualMachineExtension, VirtualNetwork, STATE_FAILED,
};
use crate::report::VmStatusReport;
use crate::state_machine::{
    PipelineInput, PipelineState, Stage, StageOutput, StateMachine, StateMachineWithHistory,
    Transition,
};

/// Secrets the pipeline needs besides the service principal
#[derive(Debug, Clone)]
pub struct ProvisionSecrets {
    pub admin_password: SecretString,
    /// Only present when the custom script extension is enabled
    pub storage_account_key: Option<SecretString>,
}

impl ProvisionSecrets {
    /// Read every secret the enabled stages will need
    pub fn resolve(
        extensions: &ExtensionSettings,
        source: &dyn SecretSource,
    ) -> ProvisionResult<Self> {
        let admin_password = source.require(ADMIN_PASSWORD_SECRET)?;
        let storage_account_key = if extensions.deploy_custom_script {
            Some(source.require(STORAGE_ACCOUNT_KEY_SECRET)?)
        } else {
            None
        };

        Ok(Self {
            admin_password,
            storage_account_key,
        })
    }
}

/// Everything a completed run produced
#[derive(Debug, Clone)]
pub struct ProvisioningReport {
    pub resource_group: ResourceGroup,
    pub availability_set: AvailabilitySet,
    pub public_ip: PublicIpAddress,
    pub virtual_network: VirtualNetwork,
    pub subnet: Subnet,
    pub network_interface: NetworkInterface,
    pub virtual_machine: VirtualMachine,
    pub extensions: Vec<ExtensionDeployment>,
    pub status: VmStatusReport,
    pub history: Vec<Transition<PipelineState, PipelineInput>>,
}

/// What a stage produced, handed over as soon as the stage ends
#[derive(Debug, Clone, Copy)]
pub enum StageOutcome<'a> {
    /// Resource returned by a creation stage
    Resource(&'a Value),
    Extension(&'a ExtensionDeployment),
    Inspected(&'a VmStatusReport),
    /// The stage failed and the pipeline stopped
    Halted(&'a StageOutput),
}

/// Receives every stage outcome in pipeline order
pub type StageObserver = Box<dyn FnMut(Stage, StageOutcome<'_>) + Send>;

trait Observable {
    fn notify(&self, stage: Stage, observer: &mut StageObserver) -> ProvisionResult<()>;
}

impl<P: Serialize> Observable for Resource<P> {
    fn notify(&self, stage: Stage, observer: &mut StageObserver) -> ProvisionResult<()> {
        let value = serde_json::to_value(self)?;
        observer(stage, StageOutcome::Resource(&value));
        Ok(())
    }
}

impl Observable for ExtensionDeployment {
    fn notify(&self, stage: Stage, observer: &mut StageObserver) -> ProvisionResult<()> {
        observer(stage, StageOutcome::Extension(self));
        Ok(())
    }
}

impl Observable for VmStatusReport {
    fn notify(&self, stage: Stage, observer: &mut StageObserver) -> ProvisionResult<()> {
        observer(stage, StageOutcome::Inspected(self));
        Ok(())
    }
}

/// Runs the provisioning stages against one control plane
pub struct Provisioner<C> {
    control_plane: C,
    config: ProvisionConfig,
    ids: ResourceIds,
    secrets: ProvisionSecrets,
    fsm: StateMachineWithHistory<PipelineState>,
    observer: Option<StageObserver>,
}

impl<C: ControlPlane> Provisioner<C> {
    pub fn new(
        control_plane: C,
        config: ProvisionConfig,
        subscription_id: &str,
        secrets: ProvisionSecrets,
    ) -> Self {
        Self {
            ids: ResourceIds::new(subscription_id, &config.topology),
            control_plane,
            config,
            secrets,
            fsm: StateMachineWithHistory::new(PipelineState::NotStarted),
            observer: None,
        }
    }

    /// Hand each stage outcome to `observer` as soon as the stage ends
    pub fn with_observer<F>(mut self, observer: F) -> Self
    where
        F: FnMut(Stage, StageOutcome<'_>) + Send + 'static,
    {
        self.observer = Some(Box::new(observer));
        self
    }

    pub fn state(&self) -> &PipelineState {
        self.fsm.current_state()
    }

    pub fn history(&self) -> &[Transition<PipelineState, PipelineInput>] {
        self.fsm.get_history()
    }

    /// Run every enabled stage in order
    pub async fn run(mut self) -> ProvisionResult<ProvisioningReport> {
        info!(
            "🚀 Provisioning {} in {}",
            self.ids.virtual_machine, self.config.topology.location
        );

        let resource_group = self.create_resource_group().await?;
        let availability_set = self.create_availability_set().await?;
        let public_ip = self.create_public_ip().await?;
        let virtual_network = self.create_virtual_network().await?;
        let subnet = self.create_subnet().await?;
        let network_interface = self.create_network_interface().await?;
        let virtual_machine = self.create_virtual_machine().await?;

        let mut extensions = Vec::new();
        if self.config.extensions.deploy_custom_script {
            extensions.push(self.deploy_custom_script().await?);
        }
        if self.config.extensions.deploy_gpu_driver {
            extensions.push(self.deploy_gpu_driver().await?);
        }

        let status = self.inspect().await?;
        info!("✅ Provisioning finished");

        Ok(ProvisioningReport {
            resource_group,
            availability_set,
            public_ip,
            virtual_network,
            subnet,
            network_interface,
            virtual_machine,
            extensions,
            status,
            history: self.fsm.history,
        })
    }

    pub async fn create_resource_group(&mut self) -> ProvisionResult<ResourceGroup> {
        self.begin(Stage::ResourceGroup)?;
        let result = self
            .put(
                &self.ids.resource_group,
                RESOURCES_API_VERSION,
                &requests::resource_group(&self.config.topology),
            )
            .await;
        self.finish(Stage::ResourceGroup, result)
    }

    pub async fn create_availability_set(&mut self) -> ProvisionResult<AvailabilitySet> {
        self.begin(Stage::AvailabilitySet)?;
        let result = self
            .put(
                &self.ids.availability_set,
                COMPUTE_API_VERSION,
                &requests::availability_set(&self.config.topology),
            )
            .await;
        self.finish(Stage::AvailabilitySet, result)
    }

    pub async fn create_public_ip(&mut self) -> ProvisionResult<PublicIpAddress> {
        self.begin(Stage::PublicIpAddress)?;
        let result = self
            .put(
                &self.ids.public_ip,
                NETWORK_API_VERSION,
                &requests::public_ip(&self.config.topology),
            )
            .await;
        self.finish(Stage::PublicIpAddress, result)
    }

    pub async fn create_virtual_network(&mut self) -> ProvisionResult<VirtualNetwork> {
        self.begin(Stage::VirtualNetwork)?;
        let result = self
            .put(
                &self.ids.virtual_network,
                NETWORK_API_VERSION,
                &requests::virtual_network(&self.config.topology),
            )
            .await;
        self.finish(Stage::VirtualNetwork, result)
    }

    pub async fn create_subnet(&mut self) -> ProvisionResult<Subnet> {
        self.begin(Stage::Subnet)?;
        let result = self
            .put(
                &self.ids.subnet,
                NETWORK_API_VERSION,
                &requests::subnet(&self.config.topology),
            )
            .await;
        self.finish(Stage::Subnet, result)
    }

    /// Reads the subnet and public IP back and references the returned ids
    pub async fn create_network_interface(&mut self) -> ProvisionResult<NetworkInterface> {
        self.begin(Stage::NetworkInterface)?;
        let result = self.put_network_interface().await;
        self.finish(Stage::NetworkInterface, result)
    }

    async fn put_network_interface(&self) -> ProvisionResult<NetworkInterface> {
        let subnet: Subnet =
            get_resource(&self.control_plane, &self.ids.subnet, NETWORK_API_VERSION, None).await?;
        let public_ip: PublicIpAddress =
            get_resource(&self.control_plane, &self.ids.public_ip, NETWORK_API_VERSION, None)
                .await?;

        let body = requests::network_interface(
            &self.config.topology,
            subnet.reference_to(&self.ids.subnet)?,
            public_ip.reference_to(&self.ids.public_ip)?,
        );
        self.put(&self.ids.network_interface, NETWORK_API_VERSION, &body)
            .await
    }

    /// Reads the NIC and availability set back and references the returned ids
    pub async fn create_virtual_machine(&mut self) -> ProvisionResult<VirtualMachine> {
        self.begin(Stage::VirtualMachine)?;
        let result = self.put_virtual_machine().await;
        self.finish(Stage::VirtualMachine, result)
    }

    async fn put_virtual_machine(&self) -> ProvisionResult<VirtualMachine> {
        let nic: NetworkInterface = get_resource(
            &self.control_plane,
            &self.ids.network_interface,
            NETWORK_API_VERSION,
            None,
        )
        .await?;
        let availability_set: AvailabilitySet = get_resource(
            &self.control_plane,
            &self.ids.availability_set,
            COMPUTE_API_VERSION,
            None,
        )
        .await?;

        let body = requests::virtual_machine(
            &self.config.topology,
            nic.reference_to(&self.ids.network_interface)?,
            availability_set.reference_to(&self.ids.availability_set)?,
            &self.secrets.admin_password,
        );
        let mut vm: VirtualMachine = self
            .put(&self.ids.virtual_machine, COMPUTE_API_VERSION, &body)
            .await?;

        // Never carry the password into reports
        if let Some(os_profile) = vm.properties.os_profile.as_mut() {
            os_profile.admin_password = None;
        }
        Ok(vm)
    }

    pub async fn deploy_custom_script(&mut self) -> ProvisionResult<ExtensionDeployment> {
        self.begin(Stage::CustomScriptExtension)?;
        let result = self.put_custom_script().await;
        self.finish(Stage::CustomScriptExtension, result)
    }

    async fn put_custom_script(&self) -> ProvisionResult<ExtensionDeployment> {
        let settings = &self.config.extensions.custom_script;
        let key = self.secrets.storage_account_key.as_ref().ok_or_else(|| {
            ProvisionError::MissingSecret(STORAGE_ACCOUNT_KEY_SECRET.to_string())
        })?;

        let body = extensions::custom_script(&self.config.topology.location, settings, key);
        self.put_extension(&settings.name, &body).await
    }

    pub async fn deploy_gpu_driver(&mut self) -> ProvisionResult<ExtensionDeployment> {
        self.begin(Stage::GpuDriverExtension)?;
        let result = self.put_gpu_driver().await;
        self.finish(Stage::GpuDriverExtension, result)
    }

    async fn put_gpu_driver(&self) -> ProvisionResult<ExtensionDeployment> {
        let body = extensions::gpu_driver(&self.config.topology.location);
        self.put_extension(&self.config.extensions.gpu_driver_name, &body)
            .await
    }

    /// Read-only: fetch the VM with its instance view
    pub async fn inspect(&mut self) -> ProvisionResult<VmStatusReport> {
        self.begin(Stage::Inspection)?;
        let result = get_resource(
            &self.control_plane,
            &self.ids.virtual_machine,
            COMPUTE_API_VERSION,
            Some("instanceView"),
        )
        .await
        .map(VmStatusReport::new);
        self.finish(Stage::Inspection, result)
    }

    async fn put<B, R>(
        &self,
        id: &ResourceId,
        api_version: &str,
        body: &B,
    ) -> ProvisionResult<R>
    where
        B: Serialize + Sync,
        R: serde::de::DeserializeOwned,
    {
        let (resource, _) = put_resource(&self.control_plane, id, api_version, body, None).await?;
        Ok(resource)
    }

    async fn put_extension(
        &self,
        name: &str,
        body: &VirtualMachineExtension,
    ) -> ProvisionResult<ExtensionDeployment> {
        let id = self.ids.extension(name);
        let timeout = Duration::from_secs(self.config.extensions.timeout_secs);

        let (extension, diagnostics): (VirtualMachineExtension, _) =
            put_resource(&self.control_plane, &id, COMPUTE_API_VERSION, body, Some(timeout))
                .await?;

        let deployment = ExtensionDeployment {
            name: name.to_string(),
            extension,
            diagnostics,
        };

        for status in deployment.statuses() {
            if let ExtensionStatus::Failed(reason) = status {
                warn!("Extension {} reported failure: {}", name, reason);
            }
        }

        if let Some(state) = deployment
            .provisioning_state()
            .filter(|state| state.eq_ignore_ascii_case(STATE_FAILED))
        {
            return Err(ProvisionError::OperationFailed {
                resource: id.to_string(),
                status: state.to_string(),
                message: format!("extension {} failed to deploy", name),
            });
        }
        Ok(deployment)
    }

    /// Refuse a stage the state machine would not accept
    fn begin(&self, stage: Stage) -> ProvisionResult<()> {
        self.fsm
            .current_state()
            .transition(&PipelineInput::Complete(stage))?;
        info!("▶ {}", stage);
        Ok(())
    }

    fn finish<T: Observable>(
        &mut self,
        stage: Stage,
        result: ProvisionResult<T>,
    ) -> ProvisionResult<T> {
        match result {
            Ok(value) => {
                let output = self
                    .fsm
                    .transition_with_history(PipelineInput::Complete(stage), Utc::now())?;
                for warning in output.warnings {
                    info!("{}", warning);
                }
                info!("✓ {} done", stage);
                if let Some(observer) = self.observer.as_mut() {
                    value.notify(stage, observer)?;
                }
                Ok(value)
            }
            Err(e) => {
                let output = self
                    .fsm
                    .transition_with_history(PipelineInput::Fail(stage), Utc::now())?;
                for warning in &output.warnings {
                    error!("✗ {}: {}", warning, e);
                }
                if output.is_critical {
                    error!("🛑 Pipeline halted, no further stages run");
                    if let Some(observer) = self.observer.as_mut() {
                        observer(stage, StageOutcome::Halted(&output));
                    }
                }
                Err(e)
            }
        }
    }
}

/// Resolve credentials and secrets, connect, and run the pipeline
///
/// Every credential and secret is read before `connect` is called, so a
/// missing value never results in a request.
pub async fn provision<C, F>(
    config: ProvisionConfig,
    secrets: &dyn SecretSource,
    connect: F,
) -> ProvisionResult<ProvisioningReport>
where
    C: ControlPlane,
    F: FnOnce(&ControlPlaneSettings, &ServicePrincipalCredentials) -> ProvisionResult<C>,
{
    provision_with_observer(config, secrets, connect, |_, _| {}).await
}

/// Like [`provision`], reporting each stage outcome to `observer` as it happens
pub async fn provision_with_observer<C, F, O>(
    config: ProvisionConfig,
    secrets: &dyn SecretSource,
    connect: F,
    observer: O,
) -> ProvisionResult<ProvisioningReport>
where
    C: ControlPlane,
    F: FnOnce(&ControlPlaneSettings, &ServicePrincipalCredentials) -> ProvisionResult<C>,
    O: FnMut(Stage, StageOutcome<'_>) + Send + 'static,
{
    config.validate()?;
    let credentials = ServicePrincipalCredentials::resolve(secrets)?;
    let provision_secrets = ProvisionSecrets::resolve(&config.extensions, secrets)?;

    let control_plane = connect(&config.control_plane, &credentials)?;
    Provisioner::new(
        control_plane,
        config,
        &credentials.subscription_id,
        provision_secrets,
    )
    .with_observer(observer)
    .run()
    .await
}
