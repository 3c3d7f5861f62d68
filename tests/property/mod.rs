// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests Module
//!
//! Properties of the value objects and the pipeline state machine that must
//! hold for all generated inputs.

mod identifiers;
mod pipeline;
