// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for the Provisioning Pipeline State Machine
//!
//! Drives the machine with arbitrary input sequences and checks that only
//! forward, gap-free orderings are accepted.

use cim_azure_provisioner::state_machine::{
    PipelineInput, PipelineState, Stage, StateMachine, StateMachineWithHistory, TransitionError,
};
use chrono::Utc;
use proptest::prelude::*;

// ============================================================================
// Generators
// ============================================================================

fn stage() -> impl Strategy<Value = Stage> {
    prop::sample::select(Stage::ALL.to_vec())
}

fn input() -> impl Strategy<Value = PipelineInput> {
    prop_oneof![
        9 => stage().prop_map(PipelineInput::Complete),
        1 => stage().prop_map(PipelineInput::Fail),
    ]
}

fn position(stage: Stage) -> usize {
    Stage::ALL
        .iter()
        .position(|s| *s == stage)
        .expect("every stage is listed")
}

/// Mandatory stages plus the enabled extensions, in order
fn planned_stages(custom_script: bool, gpu_driver: bool) -> Vec<Stage> {
    Stage::ALL
        .iter()
        .copied()
        .filter(|s| match s {
            Stage::CustomScriptExtension => custom_script,
            Stage::GpuDriverExtension => gpu_driver,
            _ => true,
        })
        .collect()
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: every combination of extension flags yields an accepted run
    #[test]
    fn prop_planned_run_accepted(custom_script in any::<bool>(), gpu_driver in any::<bool>()) {
        let mut machine = StateMachineWithHistory::new(PipelineState::NotStarted);
        let plan = planned_stages(custom_script, gpu_driver);

        let mut warnings = 0;
        for stage in &plan {
            let output = machine
                .transition_with_history(PipelineInput::Complete(*stage), Utc::now())
                .expect("planned stage must be accepted");
            prop_assert!(!output.is_critical);
            warnings += output.warnings.len();
        }

        let skipped = usize::from(!custom_script) + usize::from(!gpu_driver);
        prop_assert_eq!(warnings, skipped);
        prop_assert_eq!(machine.current_state(), &PipelineState::Completed(Stage::Inspection));
        prop_assert_eq!(machine.get_history().len(), plan.len());
        prop_assert!(machine.current_state().is_terminal());
    }

    /// Property: accepted stages move strictly forward and never skip a mandatory stage
    #[test]
    fn prop_accepted_stages_move_forward(inputs in prop::collection::vec(input(), 0..40)) {
        let mut machine = StateMachineWithHistory::new(PipelineState::NotStarted);

        for input in inputs {
            let before = *machine.current_state();
            match machine.transition_with_history(input, Utc::now()) {
                Ok(_) => {
                    let stage = input.stage();
                    let expected_next = match before {
                        PipelineState::NotStarted => 0,
                        PipelineState::Completed(done) => position(done) + 1,
                        PipelineState::Failed(_) => unreachable!("failed pipeline accepted input"),
                    };
                    let skipped = &Stage::ALL[expected_next..position(stage)];
                    prop_assert!(skipped.iter().all(Stage::is_optional));
                }
                Err(_) => prop_assert_eq!(machine.current_state(), &before),
            }
        }

        // The history is a gap-free chain of states
        for pair in machine.get_history().windows(2) {
            prop_assert_eq!(pair[0].to, pair[1].from);
        }
    }

    /// Property: once a stage fails nothing else is accepted
    #[test]
    fn prop_failure_is_terminal(
        completed in 0usize..7,
        followups in prop::collection::vec(input(), 1..10),
    ) {
        let mut machine = StateMachineWithHistory::new(PipelineState::NotStarted);
        for stage in &Stage::ALL[..completed] {
            machine
                .transition_with_history(PipelineInput::Complete(*stage), Utc::now())
                .expect("mandatory prefix must be accepted");
        }

        let failing = Stage::ALL[completed];
        let output = machine
            .transition_with_history(PipelineInput::Fail(failing), Utc::now())
            .expect("next stage may fail");
        prop_assert!(output.is_critical);

        let recorded = machine.get_history().len();
        for input in followups {
            let result = machine.transition_with_history(input, Utc::now());
            prop_assert!(matches!(result, Err(TransitionError::Terminal(_))));
        }

        prop_assert_eq!(machine.current_state(), &PipelineState::Failed(failing));
        prop_assert_eq!(machine.get_history().len(), recorded);
    }

    /// Property: valid_inputs lists exactly the inputs the machine accepts
    #[test]
    fn prop_valid_inputs_match_transitions(
        prefix in 0usize..=10,
        candidate in input(),
    ) {
        let state = Stage::ALL[..prefix]
            .iter()
            .fold(PipelineState::NotStarted, |state, stage| {
                state
                    .transition(&PipelineInput::Complete(*stage))
                    .expect("full order is accepted")
                    .0
            });

        prop_assert_eq!(
            state.valid_inputs().contains(&candidate),
            state.transition(&candidate).is_ok()
        );
    }
}
