// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Pipeline State Machine
//!
//! Orders the provisioning stages. Uses the generic StateMachine trait from
//! the parent module.
//!
//! # State Machine Type
//!
//! This is a **Mealy Machine**: outputs depend on both state and input.
//!
//! # Stages
//!
//! ```text
//! ResourceGroup → AvailabilitySet → PublicIpAddress → VirtualNetwork
//!   → Subnet → NetworkInterface → VirtualMachine
//!   → [CustomScriptExtension] → [GpuDriverExtension] → Inspection
//! ```
//!
//! Bracketed stages are optional. Only the next stage may complete or fail;
//! `Failed(_)` and `Completed(Inspection)` are terminal.

use std::fmt;

use super::{StateMachine, TransitionError, TransitionResult};

/// One step of the provisioning pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    ResourceGroup,
    AvailabilitySet,
    PublicIpAddress,
    VirtualNetwork,
    Subnet,
    NetworkInterface,
    VirtualMachine,
    CustomScriptExtension,
    GpuDriverExtension,
    Inspection,
}

impl Stage {
    /// Every stage, in pipeline order
    pub const ALL: [Stage; 10] = [
        Stage::ResourceGroup,
        Stage::AvailabilitySet,
        Stage::PublicIpAddress,
        Stage::VirtualNetwork,
        Stage::Subnet,
        Stage::NetworkInterface,
        Stage::VirtualMachine,
        Stage::CustomScriptExtension,
        Stage::GpuDriverExtension,
        Stage::Inspection,
    ];

    /// Extension stages run only when enabled
    pub fn is_optional(&self) -> bool {
        matches!(self, Stage::CustomScriptExtension | Stage::GpuDriverExtension)
    }

    /// Stages allowed directly after this one
    pub fn successors(&self) -> &'static [Stage] {
        use Stage::*;

        match self {
            ResourceGroup => &[AvailabilitySet],
            AvailabilitySet => &[PublicIpAddress],
            PublicIpAddress => &[VirtualNetwork],
            VirtualNetwork => &[Subnet],
            Subnet => &[NetworkInterface],
            NetworkInterface => &[VirtualMachine],
            VirtualMachine => &[CustomScriptExtension, GpuDriverExtension, Inspection],
            CustomScriptExtension => &[GpuDriverExtension, Inspection],
            GpuDriverExtension => &[Inspection],
            Inspection => &[],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Stage::ResourceGroup => "resource group",
            Stage::AvailabilitySet => "availability set",
            Stage::PublicIpAddress => "public IP address",
            Stage::VirtualNetwork => "virtual network",
            Stage::Subnet => "subnet",
            Stage::NetworkInterface => "network interface",
            Stage::VirtualMachine => "virtual machine",
            Stage::CustomScriptExtension => "custom script extension",
            Stage::GpuDriverExtension => "GPU driver extension",
            Stage::Inspection => "inspection",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Pipeline progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    NotStarted,
    Completed(Stage),
    Failed(Stage),
}

impl PipelineState {
    /// Stages that may be attempted from this state
    pub fn next_stages(&self) -> &'static [Stage] {
        match self {
            PipelineState::NotStarted => &[Stage::ResourceGroup],
            PipelineState::Completed(stage) => stage.successors(),
            PipelineState::Failed(_) => &[],
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.next_stages().is_empty()
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineState::NotStarted => f.write_str("not started"),
            PipelineState::Completed(stage) => write!(f, "{} completed", stage),
            PipelineState::Failed(stage) => write!(f, "{} failed", stage),
        }
    }
}

/// Stage outcome fed into the machine (FSM input)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineInput {
    Complete(Stage),
    Fail(Stage),
}

impl PipelineInput {
    pub fn stage(&self) -> Stage {
        match self {
            PipelineInput::Complete(stage) | PipelineInput::Fail(stage) => *stage,
        }
    }
}

/// Transition output with metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageOutput {
    /// Warnings generated during transition
    pub warnings: Vec<String>,

    /// Whether the run cannot continue
    pub is_critical: bool,
}

impl StageOutput {
    pub fn ok() -> Self {
        Self {
            warnings: Vec::new(),
            is_critical: false,
        }
    }

    pub fn with_warnings(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: false,
        }
    }

    pub fn critical(warnings: Vec<String>) -> Self {
        Self {
            warnings,
            is_critical: true,
        }
    }
}

impl StateMachine for PipelineState {
    type Input = PipelineInput;
    type Output = StageOutput;

    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)> {
        if self.is_terminal() {
            return Err(TransitionError::Terminal(self.to_string()));
        }

        let stage = input.stage();
        let allowed = self.next_stages();
        if !allowed.contains(&stage) {
            return Err(TransitionError::InvalidTransition {
                from: self.to_string(),
                to: stage.to_string(),
            });
        }

        // Skipped optional stages are worth a note in the history.
        let skipped: Vec<String> = allowed
            .iter()
            .take_while(|candidate| **candidate != stage)
            .map(|candidate| format!("{} skipped", candidate))
            .collect();

        match input {
            PipelineInput::Complete(_) if skipped.is_empty() => {
                Ok((PipelineState::Completed(stage), StageOutput::ok()))
            }
            PipelineInput::Complete(_) => Ok((
                PipelineState::Completed(stage),
                StageOutput::with_warnings(skipped),
            )),
            PipelineInput::Fail(_) => Ok((
                PipelineState::Failed(stage),
                StageOutput::critical(vec![format!("{} failed", stage)]),
            )),
        }
    }

    fn valid_inputs(&self) -> Vec<Self::Input> {
        self.next_stages()
            .iter()
            .flat_map(|stage| [PipelineInput::Complete(*stage), PipelineInput::Fail(*stage)])
            .collect()
    }
}
