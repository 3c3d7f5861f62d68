// Copyright (c) 2025 - Cowboy AI, Inc.
//! Finite State Machine Abstractions
//!
//! Generic state machine types used to model the provisioning pipeline.
//! Transitions are deterministic functions with no side effects; the
//! pipeline performs the API call and then feeds the outcome in as input.
//!
//! # Mealy Machine
//!
//! Output depends on both current state and input:
//! ```text
//! (State, Input) → (State, Output)
//! ```
//!
//! # Example
//!
//! ```rust
//! use cim_azure_provisioner::state_machine::{
//!     PipelineInput, PipelineState, Stage, StateMachine,
//! };
//!
//! let state = PipelineState::NotStarted;
//! assert!(state.can_transition(&PipelineInput::Complete(Stage::ResourceGroup)));
//! assert!(!state.can_transition(&PipelineInput::Complete(Stage::VirtualMachine)));
//! ```

pub mod pipeline;

pub use pipeline::{PipelineInput, PipelineState, Stage, StageOutput};

/// Result of a state transition
pub type TransitionResult<S> = Result<S, TransitionError>;

/// Errors that can occur during state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransitionError {
    /// Transition from current state to target state is not allowed
    #[error("Invalid transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },

    /// The machine is in a terminal state
    #[error("State {0} is terminal")]
    Terminal(String),
}

/// Trait for finite state machines
///
/// Implement this trait to define a state machine with typed states,
/// inputs, and outputs.
pub trait StateMachine: Sized + Clone {
    /// Input type that triggers transitions
    type Input;

    /// Output type produced by transitions (use () if none)
    type Output;

    /// Attempt to transition to a new state given an input
    ///
    /// # Returns
    /// - Ok((new_state, output)) if transition is valid
    /// - Err(TransitionError) if transition is invalid
    fn transition(&self, input: &Self::Input) -> TransitionResult<(Self, Self::Output)>;

    /// Check if a transition is valid without performing it
    fn can_transition(&self, input: &Self::Input) -> bool {
        self.transition(input).is_ok()
    }

    /// Get all valid inputs from current state (if enumerable)
    fn valid_inputs(&self) -> Vec<Self::Input>
    where
        Self::Input: Clone,
    {
        Vec::new()
    }
}

/// Transition metadata
///
/// Records information about a state transition for auditing.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S, I> {
    /// State before transition
    pub from: S,

    /// State after transition
    pub to: S,

    /// Input that triggered transition
    pub input: I,

    /// Timestamp of transition
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

impl<S, I> Transition<S, I> {
    /// Create a new transition record
    pub fn new(from: S, to: S, input: I, timestamp: chrono::DateTime<chrono::Utc>) -> Self {
        Self {
            from,
            to,
            input,
            timestamp,
        }
    }
}

/// State machine with history
///
/// Wraps a state machine and tracks transition history.
#[derive(Debug, Clone)]
pub struct StateMachineWithHistory<FSM: StateMachine> {
    /// Current state
    pub current: FSM,

    /// Transition history
    pub history: Vec<Transition<FSM, FSM::Input>>,
}

impl<FSM: StateMachine> StateMachineWithHistory<FSM> {
    /// Create a new state machine with history tracking
    pub fn new(initial: FSM) -> Self {
        Self {
            current: initial,
            history: Vec::new(),
        }
    }

    /// Transition with history recording
    pub fn transition_with_history(
        &mut self,
        input: FSM::Input,
        timestamp: chrono::DateTime<chrono::Utc>,
    ) -> TransitionResult<FSM::Output>
    where
        FSM::Input: Clone,
    {
        let from = self.current.clone();
        let (to, output) = self.current.transition(&input)?;

        self.history
            .push(Transition::new(from, to.clone(), input, timestamp));

        self.current = to;
        Ok(output)
    }

    /// Get transition history
    pub fn get_history(&self) -> &[Transition<FSM, FSM::Input>] {
        &self.history
    }

    /// Get current state
    pub fn current_state(&self) -> &FSM {
        &self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_history_records_each_transition() {
        let mut fsm = StateMachineWithHistory::new(PipelineState::NotStarted);

        fsm.transition_with_history(PipelineInput::Complete(Stage::ResourceGroup), Utc::now())
            .unwrap();
        fsm.transition_with_history(PipelineInput::Complete(Stage::AvailabilitySet), Utc::now())
            .unwrap();

        assert_eq!(
            *fsm.current_state(),
            PipelineState::Completed(Stage::AvailabilitySet)
        );
        assert_eq!(fsm.get_history().len(), 2);
        assert_eq!(fsm.get_history()[0].from, PipelineState::NotStarted);
        assert_eq!(
            fsm.get_history()[1].input,
            PipelineInput::Complete(Stage::AvailabilitySet)
        );
    }

    #[test]
    fn test_rejected_transition_leaves_history_untouched() {
        let mut fsm = StateMachineWithHistory::new(PipelineState::NotStarted);

        let result =
            fsm.transition_with_history(PipelineInput::Complete(Stage::Subnet), Utc::now());

        assert!(result.is_err());
        assert_eq!(*fsm.current_state(), PipelineState::NotStarted);
        assert!(fsm.get_history().is_empty());
    }
}
