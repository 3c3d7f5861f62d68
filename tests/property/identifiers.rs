// Copyright (c) 2025 - Cowboy AI, Inc.
//! Property-Based Tests for Resource Identifiers and Address Prefixes

use cim_azure_provisioner::domain::{ensure_subnet_within, AddressPrefix, ResourceId};
use proptest::prelude::*;
use std::net::{IpAddr, Ipv4Addr};

// ============================================================================
// Generators
// ============================================================================

/// ARM-style resource name (no path separators)
fn resource_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9][a-zA-Z0-9_.-]{0,23}"
}

fn namespace() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Microsoft.Compute".to_string()),
        Just("Microsoft.Network".to_string()),
        "Microsoft\\.[A-Z][a-zA-Z]{2,12}",
    ]
}

/// Resource group, top-level resource or nested child resource
fn resource_id() -> impl Strategy<Value = ResourceId> {
    (
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
        resource_name(),
        prop::option::of((
            namespace(),
            resource_name(),
            resource_name(),
            prop::collection::vec((resource_name(), resource_name()), 0..3),
        )),
    )
        .prop_map(|(subscription, group, provider)| {
            let id = ResourceId::resource_group(subscription, group);
            match provider {
                None => id,
                Some((ns, resource_type, name, children)) => children.into_iter().fold(
                    id.provider(ns, resource_type, name),
                    |parent, (child_type, child_name)| parent.child(child_type, child_name),
                ),
            }
        })
}

/// IPv4 network address with matching prefix length
fn ipv4_prefix() -> impl Strategy<Value = AddressPrefix> {
    (any::<u32>(), 0u8..=32).prop_map(|(raw, length)| {
        let mask = if length == 0 { 0 } else { u32::MAX << (32 - length) };
        let network = Ipv4Addr::from(raw & mask);
        AddressPrefix::new(format!("{}/{}", network, length)).expect("network address")
    })
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Property: rendering then parsing yields the same identifier
    #[test]
    fn prop_resource_id_round_trips(id in resource_id()) {
        let parsed: ResourceId = id.to_string().parse().expect("rendered id must parse");
        prop_assert_eq!(&parsed, &id);
        prop_assert_eq!(parsed.to_string(), id.to_string());
    }

    /// Property: casing of the fixed segments never matters
    #[test]
    fn prop_fixed_segments_case_insensitive(id in resource_id()) {
        let shouted = id
            .to_string()
            .replacen("/subscriptions/", "/SUBSCRIPTIONS/", 1)
            .replacen("/resourceGroups/", "/resourcegroups/", 1)
            .replacen("/providers/", "/PROVIDERS/", 1);

        let parsed: ResourceId = shouted.parse().expect("case variant must parse");
        prop_assert_eq!(parsed, id);
    }

    /// Property: the name of a child is the last segment
    #[test]
    fn prop_child_name_is_last_segment(id in resource_id(), child in resource_name()) {
        prop_assume!(id.namespace().is_some());
        let nested = id.child("extensions", child.clone());

        prop_assert_eq!(nested.name(), child.as_str());
        prop_assert!(nested.full_type().ends_with("/extensions"));
        prop_assert!(nested.to_string().starts_with(&id.to_string()));
    }

    /// Property: a prefix renders to CIDR text that parses back to itself
    #[test]
    fn prop_prefix_round_trips(prefix in ipv4_prefix()) {
        let reparsed = AddressPrefix::new(prefix.as_cidr()).expect("rendered prefix must parse");
        prop_assert_eq!(reparsed, prefix);
    }

    /// Property: every prefix contains itself and any longer prefix carved from it
    #[test]
    fn prop_prefix_contains_subdivisions(prefix in ipv4_prefix(), extra in 0u8..=8) {
        prop_assert!(prefix.contains(&prefix));

        let length = (prefix.prefix_length() + extra).min(32);
        let sub = AddressPrefix::from_parts(prefix.address(), length).expect("valid length");
        prop_assert!(prefix.contains(&sub));
        prop_assert!(ensure_subnet_within(&sub, &[prefix.clone()]).is_ok());
    }

    /// Property: a subnet outside every address space is rejected
    #[test]
    fn prop_disjoint_subnet_rejected(second_octet in 1u8..=255) {
        let space = AddressPrefix::new("10.0.0.0/16").unwrap();
        let subnet = AddressPrefix::new(format!("10.{}.0.0/24", second_octet)).unwrap();

        prop_assert!(!space.contains(&subnet));
        prop_assert!(ensure_subnet_within(&subnet, &[space]).is_err());
    }

    /// Property: host bits below the prefix length are rejected
    #[test]
    fn prop_host_bits_rejected(raw in any::<u32>(), length in 0u8..32) {
        let host_mask = u32::MAX >> length;
        prop_assume!(raw & host_mask != 0);

        let address = IpAddr::V4(Ipv4Addr::from(raw));
        let candidate = format!("{}/{}", address, length);
        prop_assert!(AddressPrefix::new(candidate).is_err());
    }
}
