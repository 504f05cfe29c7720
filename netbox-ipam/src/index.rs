//! Longest-prefix-match index from networks to their inferred gateways.

use std::net::IpAddr;

use ipnet::IpNet;
use tracing::warn;

use crate::gateway::extract_gateway;
use crate::types::Prefix;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEntry {
    pub network: IpNet,
    pub gateway: Option<String>,
}

/// Built fresh from one bulk prefix listing; lookups are a linear scan.
///
/// When two entries of equal length both match (the same network listed
/// twice, e.g. in different VRFs), the one listed first wins.
#[derive(Debug, Clone, Default)]
pub struct PrefixGatewayIndex {
    entries: Vec<GatewayEntry>,
}

impl PrefixGatewayIndex {
    /// Index `prefixes`. Prefixes whose CIDR does not parse are dropped.
    pub fn build(prefixes: &[Prefix]) -> Self {
        let entries = prefixes
            .iter()
            .filter_map(|prefix| match prefix.network() {
                Ok(network) => Some(GatewayEntry {
                    network,
                    gateway: extract_gateway(prefix),
                }),
                Err(e) => {
                    warn!(prefix_id = prefix.id, error = %e, "dropping prefix from gateway index");
                    None
                }
            })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[GatewayEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Gateway of the most specific prefix containing `address`. Unparsable
    /// addresses and addresses outside every prefix yield `None`, as does a
    /// best match that has no gateway.
    pub fn lookup(&self, address: &str) -> Option<&str> {
        let addr = address.trim().parse::<IpAddr>().ok()?;
        self.lookup_addr(addr)
    }

    pub fn lookup_addr(&self, addr: IpAddr) -> Option<&str> {
        longest_match(self.entries.iter().filter(|e| e.network.contains(&addr)))
            .and_then(|e| e.gateway.as_deref())
    }

    /// Gateway of the most specific prefix enclosing all of `network` that
    /// declares one. Used to seed allocation in a prefix without its own.
    pub fn inherited_gateway(&self, network: &IpNet) -> Option<&str> {
        longest_match(
            self.entries
                .iter()
                .filter(|e| e.gateway.is_some() && e.network.contains(network)),
        )
        .and_then(|e| e.gateway.as_deref())
    }
}

/// First entry with the greatest prefix length.
fn longest_match<'a>(candidates: impl Iterator<Item = &'a GatewayEntry>) -> Option<&'a GatewayEntry> {
    candidates.fold(None, |best, entry| match best {
        Some(b) if b.network.prefix_len() >= entry.network.prefix_len() => Some(b),
        _ => Some(entry),
    })
}
