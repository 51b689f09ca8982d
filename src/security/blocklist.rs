//! Blocked-network rules.
//!
//! A rule is a sequence of leading address bytes. An address is blocked when
//! its leading bytes equal the rule's prefix, byte for byte. The rule set is
//! built once at startup and shared read-only between all requests.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};

/// Address family a prefix rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    #[default]
    Ipv4,
    Ipv6,
}

impl AddressFamily {
    /// Width of an address of this family in bytes.
    pub fn width(self) -> usize {
        match self {
            AddressFamily::Ipv4 => 4,
            AddressFamily::Ipv6 => 16,
        }
    }
}

/// A single byte-prefix rule.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct BlockedNetworkRule {
    #[serde(default)]
    pub family: AddressFamily,
    pub prefix: Vec<u8>,
}

impl BlockedNetworkRule {
    pub fn ipv4(prefix: &[u8]) -> Self {
        Self {
            family: AddressFamily::Ipv4,
            prefix: prefix.to_vec(),
        }
    }

    pub fn ipv6(prefix: &[u8]) -> Self {
        Self {
            family: AddressFamily::Ipv6,
            prefix: prefix.to_vec(),
        }
    }

    /// Link-local and private IPv4 ranges.
    ///
    /// IPv6 unique-local and link-local ranges are not listed; operators add
    /// them through `security.blocked_networks`.
    pub fn defaults() -> Vec<Self> {
        vec![
            // IPv4 link-local
            Self::ipv4(&[169, 254]),
            // IPv4 private
            Self::ipv4(&[10]),
            Self::ipv4(&[172, 16]),
            Self::ipv4(&[192, 168]),
        ]
    }

    /// Check whether `addr` starts with this rule's prefix.
    ///
    /// IPv4-mapped IPv6 addresses are compared as IPv4.
    pub fn matches(&self, addr: IpAddr) -> bool {
        let (family, octets) = address_octets(addr);
        if family != self.family || self.prefix.len() > octets.len() {
            return false;
        }
        self.prefix
            .iter()
            .zip(octets.iter())
            .all(|(rule, octet)| rule == octet)
    }
}

impl std::fmt::Display for BlockedNetworkRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.family {
            AddressFamily::Ipv4 => {
                let parts: Vec<String> = self.prefix.iter().map(|b| b.to_string()).collect();
                write!(f, "{}.*", parts.join("."))
            }
            AddressFamily::Ipv6 => {
                let parts: Vec<String> = self.prefix.iter().map(|b| format!("{:02x}", b)).collect();
                write!(f, "{}*", parts.join(":"))
            }
        }
    }
}

fn address_octets(addr: IpAddr) -> (AddressFamily, Vec<u8>) {
    match addr {
        IpAddr::V4(v4) => (AddressFamily::Ipv4, v4.octets().to_vec()),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => (AddressFamily::Ipv4, v4.octets().to_vec()),
            None => (AddressFamily::Ipv6, v6.octets().to_vec()),
        },
    }
}

/// Immutable set of blocked-network rules.
#[derive(Debug, Clone)]
pub struct BlockList {
    rules: Vec<BlockedNetworkRule>,
}

impl BlockList {
    pub fn new(rules: Vec<BlockedNetworkRule>) -> Self {
        Self { rules }
    }

    /// Return the first rule that blocks `addr`, if any.
    pub fn blocking_rule(&self, addr: IpAddr) -> Option<&BlockedNetworkRule> {
        self.rules.iter().find(|rule| rule.matches(addr))
    }

    pub fn is_blocked(&self, addr: IpAddr) -> bool {
        self.blocking_rule(addr).is_some()
    }
}

impl Default for BlockList {
    fn default() -> Self {
        Self::new(BlockedNetworkRule::defaults())
    }
}
