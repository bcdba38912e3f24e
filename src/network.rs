//! Address and CIDR helpers shared by the network-aware generators.

use std::net::IpAddr;

use ipnet::IpNet;

use crate::core::{Cluster, Host, Inventory};

#[derive(Debug, thiserror::Error)]
pub enum NetworkError {
    #[error("Invalid IP address {value}: {reason}")]
    InvalidAddress { value: String, reason: String },

    #[error("Invalid CIDR {value}: {reason}")]
    InvalidCidr { value: String, reason: String },

    #[error("No interface carries address {address}")]
    NoMatchingInterface { address: String },
}

pub type NetworkResult<T> = Result<T, NetworkError>;

pub fn parse_cidr(value: &str) -> NetworkResult<IpNet> {
    value
        .trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|e| NetworkError::InvalidCidr {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Address part of `addr` or `addr/prefix`.
pub fn strip_prefix(value: &str) -> &str {
    value.split('/').next().unwrap_or(value).trim()
}

/// Parse an interface address, with or without a prefix length.
pub fn parse_address(value: &str) -> NetworkResult<IpAddr> {
    strip_prefix(value)
        .parse::<IpAddr>()
        .map_err(|e| NetworkError::InvalidAddress {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

/// Network containing an interface address, e.g. `1.2.3.4/28` -> `1.2.3.0/28`.
pub fn network_of(value: &str) -> NetworkResult<IpNet> {
    value
        .trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|e| NetworkError::InvalidCidr {
            value: value.to_string(),
            reason: e.to_string(),
        })
}

pub fn address_in_cidr(value: &str, cidr: &IpNet) -> NetworkResult<bool> {
    let addr = parse_address(value)?;
    Ok(cidr.contains(&addr))
}

fn has_families(cidrs: &[String]) -> (bool, bool) {
    cidrs.iter().fold((false, false), |(v4, v6), cidr| {
        match cidr.trim().parse::<IpNet>() {
            Ok(IpNet::V4(_)) => (true, v6),
            Ok(IpNet::V6(_)) => (v4, true),
            Err(_) => (v4, v6),
        }
    })
}

/// A cluster is dual-stack when any of its network lists carries both families.
pub fn is_dual_stack(cluster: &Cluster) -> bool {
    [
        &cluster.machine_networks,
        &cluster.service_networks,
        &cluster.cluster_networks,
    ]
    .into_iter()
    .any(|cidrs| has_families(cidrs) == (true, true))
}

/// First configured machine network.
pub fn configured_machine_cidr(cluster: &Cluster) -> NetworkResult<Option<IpNet>> {
    cluster
        .machine_networks
        .first()
        .map(|cidr| parse_cidr(cidr))
        .transpose()
}

/// Network of the first interface address of the inventory, IPv4 preferred.
pub fn inventory_primary_cidr(inventory: &Inventory) -> Option<IpNet> {
    let ipv4 = inventory
        .interfaces
        .iter()
        .flat_map(|i| i.ipv4_addresses.iter())
        .find_map(|addr| network_of(addr).ok());
    ipv4.or_else(|| {
        inventory
            .interfaces
            .iter()
            .flat_map(|i| i.ipv6_addresses.iter())
            .find_map(|addr| network_of(addr).ok())
    })
}

/// Primary machine CIDR: the configured one, else inferred from the
/// bootstrap host's inventory.
pub fn primary_machine_cidr(cluster: &Cluster, hosts: &[Host]) -> NetworkResult<Option<IpNet>> {
    if let Some(cidr) = configured_machine_cidr(cluster)? {
        return Ok(Some(cidr));
    }
    Ok(hosts
        .iter()
        .find(|host| host.bootstrap)
        .and_then(|host| Inventory::parse(&host.inventory).ok())
        .and_then(|inventory| inventory_primary_cidr(&inventory)))
}

/// Inventory addresses inside `cidr`, prefixes stripped.
pub fn addresses_in_cidr(inventory: &Inventory, cidr: &IpNet) -> Vec<String> {
    inventory
        .interfaces
        .iter()
        .flat_map(|i| i.addresses())
        .filter_map(|addr| parse_address(addr).ok())
        .filter(|addr| cidr.contains(addr))
        .map(|addr| addr.to_string())
        .collect()
}
