// Copyright (c) 2025 - Cowboy AI, Inc.
//! Provisioning Domain Models
//!
//! Value objects with validation invariants used to describe the target
//! topology before anything is sent to the control plane.
//!
//! - [`AddressPrefix`] - CIDR block for address spaces and subnets
//! - [`ResourceId`] - ARM resource identifier

pub mod network;
pub mod resource_id;

pub use network::{ensure_subnet_within, AddressPrefix, NetworkError};
pub use resource_id::{ResourceId, TypedName};
