// Copyright (c) 2025 - Cowboy AI, Inc.
//! Network Value Objects with Validation Invariants

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;
use thiserror::Error;

/// Network validation error
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NetworkError {
    #[error("Invalid IP address format: {0}")]
    InvalidIpAddress(String),

    #[error("Invalid CIDR notation: {0}")]
    InvalidCidr(String),

    #[error("Invalid prefix length: {0} (must be 0-32 for IPv4, 0-128 for IPv6)")]
    InvalidPrefixLength(u8),

    #[error("Host bits set in {0}; expected a network address")]
    HostBitsSet(String),

    #[error("Subnet {subnet} is not inside address space {address_space}")]
    SubnetOutsideAddressSpace {
        subnet: String,
        address_space: String,
    },
}

/// Address prefix value object (CIDR block)
///
/// Used for virtual network address spaces and subnet prefixes.
/// Invariants:
/// - Valid IP address format
/// - Prefix length within valid range for the address family
/// - Address is the network address (no host bits set)
///
/// # Examples
///
/// ```rust
/// use cim_azure_provisioner::domain::AddressPrefix;
///
/// let vnet = AddressPrefix::new("10.0.0.0/16").unwrap();
/// let subnet = AddressPrefix::new("10.0.0.0/24").unwrap();
/// assert!(vnet.contains(&subnet));
/// assert_eq!(subnet.prefix_length(), 24);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AddressPrefix {
    address: IpAddr,
    prefix_length: u8,
}

impl AddressPrefix {
    /// Create a new address prefix from CIDR notation
    ///
    /// # Invariants
    /// - Prefix length 0-32 for IPv4, 0-128 for IPv6
    /// - No host bits set
    pub fn new(cidr: impl AsRef<str>) -> Result<Self, NetworkError> {
        let cidr = cidr.as_ref();

        let (addr_str, prefix_str) = cidr
            .split_once('/')
            .ok_or_else(|| NetworkError::InvalidCidr(cidr.to_string()))?;

        let address = IpAddr::from_str(addr_str)
            .map_err(|_| NetworkError::InvalidIpAddress(addr_str.to_string()))?;

        let prefix_length = prefix_str
            .parse::<u8>()
            .map_err(|_| NetworkError::InvalidCidr(cidr.to_string()))?;

        Self::from_parts(address, prefix_length).and_then(|prefix| {
            if prefix.network_bits() != bits(&address) {
                Err(NetworkError::HostBitsSet(cidr.to_string()))
            } else {
                Ok(prefix)
            }
        })
    }

    /// Create from separate address and prefix length
    pub fn from_parts(address: IpAddr, prefix_length: u8) -> Result<Self, NetworkError> {
        if prefix_length > max_prefix(&address) {
            return Err(NetworkError::InvalidPrefixLength(prefix_length));
        }

        Ok(Self {
            address,
            prefix_length,
        })
    }

    /// IPv4 network prefix; host bits are cleared and the length is capped at 32
    pub fn ipv4_network(address: Ipv4Addr, prefix_length: u8) -> Self {
        let prefix_length = prefix_length.min(32);
        let network = u32::from(address) & (mask(32, prefix_length) as u32);
        Self {
            address: IpAddr::V4(Ipv4Addr::from(network)),
            prefix_length,
        }
    }

    /// Get the network address
    pub fn address(&self) -> IpAddr {
        self.address
    }

    /// Get the prefix length
    pub fn prefix_length(&self) -> u8 {
        self.prefix_length
    }

    /// Check if this is an IPv4 prefix
    pub fn is_ipv4(&self) -> bool {
        matches!(self.address, IpAddr::V4(_))
    }

    /// Whether `other` lies entirely inside this prefix
    pub fn contains(&self, other: &AddressPrefix) -> bool {
        if self.is_ipv4() != other.is_ipv4() || other.prefix_length < self.prefix_length {
            return false;
        }

        let mask = mask(max_prefix(&self.address), self.prefix_length);
        bits(&other.address) & mask == self.network_bits()
    }

    /// Get as CIDR notation string
    pub fn as_cidr(&self) -> String {
        format!("{}/{}", self.address, self.prefix_length)
    }

    fn network_bits(&self) -> u128 {
        bits(&self.address) & mask(max_prefix(&self.address), self.prefix_length)
    }
}

fn max_prefix(address: &IpAddr) -> u8 {
    match address {
        IpAddr::V4(_) => 32,
        IpAddr::V6(_) => 128,
    }
}

fn bits(address: &IpAddr) -> u128 {
    match address {
        IpAddr::V4(v4) => u128::from(u32::from(*v4)),
        IpAddr::V6(v6) => u128::from(*v6),
    }
}

fn mask(width: u8, prefix_length: u8) -> u128 {
    if prefix_length == 0 {
        return 0;
    }
    let full = if width == 128 {
        u128::MAX
    } else {
        (1u128 << width) - 1
    };
    let host_bits = u32::from(width - prefix_length);
    full.checked_shl(host_bits).unwrap_or(0) & full
}

impl fmt::Display for AddressPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_cidr())
    }
}

impl FromStr for AddressPrefix {
    type Err = NetworkError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for AddressPrefix {
    type Error = NetworkError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AddressPrefix> for String {
    fn from(prefix: AddressPrefix) -> Self {
        prefix.as_cidr()
    }
}

/// Ensure `subnet` is contained in at least one of the address space prefixes
pub fn ensure_subnet_within(
    subnet: &AddressPrefix,
    address_space: &[AddressPrefix],
) -> Result<(), NetworkError> {
    if address_space.iter().any(|space| space.contains(subnet)) {
        Ok(())
    } else {
        Err(NetworkError::SubnetOutsideAddressSpace {
            subnet: subnet.as_cidr(),
            address_space: address_space
                .iter()
                .map(AddressPrefix::as_cidr)
                .collect::<Vec<_>>()
                .join(","),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_prefix() {
        let prefix = AddressPrefix::new("10.0.0.0/16").unwrap();
        assert_eq!(prefix.address().to_string(), "10.0.0.0");
        assert_eq!(prefix.prefix_length(), 16);
        assert!(prefix.is_ipv4());
        assert_eq!(prefix.as_cidr(), "10.0.0.0/16");
    }

    #[test]
    fn test_prefix_requires_cidr() {
        assert!(matches!(
            AddressPrefix::new("10.0.0.0"),
            Err(NetworkError::InvalidCidr(_))
        ));
    }

    #[test]
    fn test_invalid_prefix() {
        assert!(AddressPrefix::new("999.0.0.0/8").is_err());
        assert!(AddressPrefix::new("10.0.0.0/33").is_err());
        assert!(AddressPrefix::new("2001:db8::/129").is_err());
    }

    #[test]
    fn test_host_bits_rejected() {
        assert_eq!(
            AddressPrefix::new("10.0.0.1/24"),
            Err(NetworkError::HostBitsSet("10.0.0.1/24".to_string()))
        );
    }

    #[test]
    fn test_ipv4_network_clears_host_bits() {
        let prefix = AddressPrefix::ipv4_network(Ipv4Addr::new(10, 0, 3, 7), 16);
        assert_eq!(prefix.as_cidr(), "10.0.0.0/16");
        assert_eq!(AddressPrefix::ipv4_network(Ipv4Addr::new(10, 0, 0, 1), 40).prefix_length(), 32);
    }

    #[test]
    fn test_contains() {
        let vnet = AddressPrefix::new("10.0.0.0/16").unwrap();
        assert!(vnet.contains(&AddressPrefix::new("10.0.0.0/24").unwrap()));
        assert!(vnet.contains(&AddressPrefix::new("10.0.255.0/24").unwrap()));
        assert!(vnet.contains(&vnet));
        assert!(!vnet.contains(&AddressPrefix::new("10.1.0.0/24").unwrap()));
        assert!(!vnet.contains(&AddressPrefix::new("10.0.0.0/8").unwrap()));
    }

    #[test]
    fn test_ipv6_contains() {
        let space = AddressPrefix::new("2001:db8::/32").unwrap();
        assert!(space.contains(&AddressPrefix::new("2001:db8:1::/48").unwrap()));
        assert!(!space.contains(&AddressPrefix::new("10.0.0.0/24").unwrap()));
    }

    #[test]
    fn test_zero_prefix_contains_everything() {
        let any = AddressPrefix::new("0.0.0.0/0").unwrap();
        assert!(any.contains(&AddressPrefix::new("192.168.10.0/24").unwrap()));
    }

    #[test]
    fn test_ensure_subnet_within() {
        let space = vec![AddressPrefix::new("10.0.0.0/16").unwrap()];
        assert!(ensure_subnet_within(&AddressPrefix::new("10.0.0.0/24").unwrap(), &space).is_ok());

        let err = ensure_subnet_within(&AddressPrefix::new("172.16.0.0/24").unwrap(), &space)
            .unwrap_err();
        assert!(matches!(err, NetworkError::SubnetOutsideAddressSpace { .. }));
    }

    #[test]
    fn test_serde_as_string() {
        let prefix = AddressPrefix::new("10.0.0.0/24").unwrap();
        let json = serde_json::to_string(&prefix).unwrap();
        assert_eq!(json, "\"10.0.0.0/24\"");
        let back: AddressPrefix = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefix);
    }
}
