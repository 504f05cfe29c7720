//! Slim, stable shapes handed back to callers.

use std::collections::BTreeMap;
use std::net::IpAddr;

use serde::Serialize;
use serde_json::Value;

use crate::error::{IpamError, IpamResult};
use crate::gateway::declared_gateway;
use crate::types::{AddressRecord, Choice, Device, Family, Metadata, NamedRef, Prefix, Vlan};

const DEFAULT_VRF: &str = "global";
const DNS_SERVER_KEYS: &[&str] = &["dns_servers", "nameservers"];

/// An address handed out by the allocator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    /// Address without mask.
    pub address: String,
    pub family: Family,
    pub gateway: Option<String>,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrefixSummary {
    pub id: u64,
    pub prefix: String,
    pub family: Option<Family>,
    pub status: String,
    pub vrf: String,
    pub description: String,
    pub site: String,
    pub role: String,
    pub tags: Vec<String>,
    pub gateway: Option<String>,
    pub dns_servers: String,
    pub custom_fields: Metadata,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddressSummary {
    pub id: Option<u64>,
    pub address: String,
    pub family: Option<Family>,
    pub dns_name: String,
    pub description: String,
    pub status: String,
    pub vrf: String,
    pub tags: Vec<String>,
    pub prefix_gateway: Option<String>,
    pub custom_fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VlanSummary {
    pub id: u64,
    pub vid: u16,
    pub name: String,
    pub status: String,
    pub site: String,
    pub group: String,
    pub role: String,
    pub description: String,
    pub tags: Vec<String>,
    pub custom_fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub id: u64,
    pub name: String,
    pub status: String,
    pub site: String,
    pub role: String,
    pub model: String,
    /// Primary address with mask, empty when none is assigned.
    pub primary_ip: String,
    pub description: String,
    pub tags: Vec<String>,
    pub custom_fields: BTreeMap<String, Value>,
}

/// Project an accepted candidate and the gateway known for it.
pub fn project(candidate: &AddressRecord, gateway: Option<String>) -> IpamResult<AllocationResult> {
    let raw = candidate.raw_address();
    let addr: IpAddr = raw
        .parse()
        .map_err(|_| IpamError::InvalidAddress(candidate.address.clone()))?;
    Ok(AllocationResult {
        address: raw.to_string(),
        family: Family::of(&addr),
        gateway,
        description: candidate.description.clone(),
    })
}

pub fn prefix_summary(prefix: &Prefix) -> PrefixSummary {
    PrefixSummary {
        id: prefix.id,
        prefix: prefix.cidr.clone(),
        family: prefix.address_family(),
        status: choice(&prefix.status),
        vrf: vrf_name(&prefix.vrf),
        description: prefix.description.clone(),
        site: name(&prefix.site),
        role: name(&prefix.role),
        tags: tag_names(&prefix.tags),
        gateway: declared_gateway(&prefix.metadata),
        dns_servers: DNS_SERVER_KEYS
            .iter()
            .find_map(|key| prefix.metadata.get(*key).and_then(|v| v.joined(" ")))
            .unwrap_or_default(),
        custom_fields: prefix.metadata.clone(),
    }
}

pub fn address_summary(record: &AddressRecord, prefix_gateway: Option<String>) -> AddressSummary {
    let family = record.family.or_else(|| {
        record
            .raw_address()
            .parse::<IpAddr>()
            .ok()
            .map(|addr| Family::of(&addr))
    });
    AddressSummary {
        id: record.id,
        address: record.address.clone(),
        family,
        dns_name: record.dns_name.clone(),
        description: record.description.clone(),
        status: choice(&record.status),
        vrf: vrf_name(&record.vrf),
        tags: tag_names(&record.tags),
        prefix_gateway,
        custom_fields: record.custom_fields.clone(),
    }
}

pub fn vlan_summary(vlan: &Vlan) -> VlanSummary {
    VlanSummary {
        id: vlan.id,
        vid: vlan.vid,
        name: vlan.name.clone(),
        status: choice(&vlan.status),
        site: name(&vlan.site),
        group: name(&vlan.group),
        role: name(&vlan.role),
        description: vlan.description.clone(),
        tags: tag_names(&vlan.tags),
        custom_fields: vlan.custom_fields.clone(),
    }
}

pub fn device_summary(device: &Device) -> DeviceSummary {
    DeviceSummary {
        id: device.id,
        name: device.name.clone(),
        status: choice(&device.status),
        site: name(&device.site),
        role: name(&device.role),
        model: device
            .device_type
            .as_ref()
            .map(|t| t.model.clone())
            .unwrap_or_default(),
        primary_ip: device
            .primary_ip
            .as_ref()
            .map(|ip| ip.address.clone())
            .unwrap_or_default(),
        description: device.description.clone(),
        tags: tag_names(&device.tags),
        custom_fields: device.custom_fields.clone(),
    }
}

fn choice(value: &Option<Choice>) -> String {
    value.as_ref().map(|c| c.value.clone()).unwrap_or_default()
}

fn name(value: &Option<NamedRef>) -> String {
    value.as_ref().map(|n| n.name.clone()).unwrap_or_default()
}

fn vrf_name(vrf: &Option<NamedRef>) -> String {
    vrf.as_ref()
        .map_or_else(|| DEFAULT_VRF.to_string(), |v| v.name.clone())
}

fn tag_names(tags: &[NamedRef]) -> Vec<String> {
    tags.iter().map(|t| t.name.clone()).collect()
}
