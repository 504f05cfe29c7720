//! Records decoded from the NetBox REST API.
//!
//! NetBox nests most attributes (`status`, `vrf`, `site`, ...) in small
//! objects and sends `null` freely, so decoding here is lenient: missing or
//! null fields fall back to their defaults instead of failing the request.

use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{IpamError, IpamResult};

/// IP address family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "u8")]
pub enum Family {
    V4,
    V6,
}

impl Family {
    pub fn of(addr: &IpAddr) -> Self {
        match addr {
            IpAddr::V4(_) => Family::V4,
            IpAddr::V6(_) => Family::V6,
        }
    }

    pub fn as_u8(self) -> u8 {
        match self {
            Family::V4 => 4,
            Family::V6 => 6,
        }
    }
}

impl From<Family> for u8 {
    fn from(family: Family) -> Self {
        family.as_u8()
    }
}

impl TryFrom<u8> for Family {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            4 => Ok(Family::V4),
            6 => Ok(Family::V6),
            other => Err(format!("unknown address family {other}")),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// NetBox sends `family` as `{"value": 4, "label": "IPv4"}`; older endpoints
/// and hand-written fixtures use the bare integer.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawFamily {
    Bare(u8),
    Nested { value: u8 },
}

impl<'de> Deserialize<'de> for Family {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = match RawFamily::deserialize(deserializer)? {
            RawFamily::Bare(v) | RawFamily::Nested { value: v } => v,
        };
        Family::try_from(value).map_err(serde::de::Error::custom)
    }
}

/// A custom-field value attached to a prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Text(String),
    List(Vec<String>),
    Other(Value),
}

impl MetadataValue {
    /// First non-empty textual value, or `None` for empty and null values.
    pub fn first_text(&self) -> Option<String> {
        match self {
            MetadataValue::Text(s) => non_empty(s),
            MetadataValue::List(items) => items.iter().find_map(|s| non_empty(s)),
            MetadataValue::Other(v) => other_text(v),
        }
    }

    /// All values joined with `sep`, or `None` when there is nothing to join.
    pub fn joined(&self, sep: &str) -> Option<String> {
        match self {
            MetadataValue::List(items) => {
                let parts: Vec<&str> = items
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect();
                (!parts.is_empty()).then(|| parts.join(sep))
            }
            other => other.first_text(),
        }
    }
}

fn non_empty(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn other_text(value: &Value) -> Option<String> {
    match value {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) => non_empty(s),
        Value::Array(items) if items.is_empty() => None,
        Value::Object(map) if map.is_empty() => None,
        v => Some(v.to_string()),
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// `{"value": "active", "label": "Active"}`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Choice {
    #[serde(default, deserialize_with = "null_as_default")]
    pub value: String,
}

/// Any nested object where only the display name matters (VRF, site, tag, ...).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NamedRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
}

/// A network prefix as owned by the IPAM.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Prefix {
    pub id: u64,
    /// Empty when NetBox sends `null`; such prefixes never parse as a network.
    #[serde(rename = "prefix", default, deserialize_with = "null_as_default")]
    pub cidr: String,
    #[serde(default, deserialize_with = "lenient_family")]
    pub family: Option<Family>,
    #[serde(rename = "custom_fields", default, deserialize_with = "null_as_default")]
    pub metadata: Metadata,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default)]
    pub status: Option<Choice>,
    #[serde(default)]
    pub vrf: Option<NamedRef>,
    #[serde(default)]
    pub site: Option<NamedRef>,
    #[serde(default)]
    pub role: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NamedRef>,
}

impl Prefix {
    /// Parsed network with host bits cleared (`10.0.0.5/24` -> `10.0.0.0/24`).
    pub fn network(&self) -> IpamResult<IpNet> {
        parse_network(&self.cidr)
    }

    /// The declared family, else the one implied by the CIDR.
    pub fn address_family(&self) -> Option<Family> {
        self.family
            .or_else(|| self.network().ok().map(|net| Family::of(&net.addr())))
    }
}

pub(crate) fn parse_network(cidr: &str) -> IpamResult<IpNet> {
    cidr.trim()
        .parse::<IpNet>()
        .map(|net| net.trunc())
        .map_err(|e| IpamError::MalformedPrefix {
            cidr: cidr.to_string(),
            reason: e.to_string(),
        })
}

/// An IP address record. The allocation candidates handed out by
/// `available-ips` use the same shape.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AddressRecord {
    #[serde(default)]
    pub id: Option<u64>,
    /// Address with mask, e.g. `10.0.0.42/24`.
    pub address: String,
    #[serde(default, deserialize_with = "lenient_family")]
    pub family: Option<Family>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub dns_name: String,
    #[serde(default)]
    pub status: Option<Choice>,
    #[serde(default)]
    pub vrf: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: BTreeMap<String, Value>,
}

impl AddressRecord {
    /// The address without its mask.
    pub fn raw_address(&self) -> &str {
        self.address
            .split_once('/')
            .map_or(self.address.as_str(), |(addr, _)| addr)
            .trim()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Vlan {
    pub id: u64,
    pub vid: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub status: Option<Choice>,
    #[serde(default)]
    pub site: Option<NamedRef>,
    #[serde(default)]
    pub group: Option<NamedRef>,
    #[serde(default)]
    pub role: Option<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DeviceType {
    #[serde(default, deserialize_with = "null_as_default")]
    pub model: String,
}

/// The `primary_ip` reference of a device.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AddressRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Device {
    pub id: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default)]
    pub status: Option<Choice>,
    #[serde(default)]
    pub site: Option<NamedRef>,
    #[serde(default)]
    pub role: Option<NamedRef>,
    #[serde(default)]
    pub device_type: Option<DeviceType>,
    #[serde(default)]
    pub primary_ip: Option<AddressRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: Vec<NamedRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub custom_fields: BTreeMap<String, Value>,
}

/// Paginated list envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct Page<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// `available-ips` answers with a single object or an array of them.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    pub fn into_first(self) -> Option<T> {
        match self {
            OneOrMany::One(item) => Some(item),
            OneOrMany::Many(items) => items.into_iter().next(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResponse {
    #[serde(rename = "netbox-version", default)]
    pub version: Option<String>,
}

/// Unknown or malformed families decode as `None` instead of failing the
/// whole page.
fn lenient_family<'de, D>(deserializer: D) -> Result<Option<Family>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(Family::deserialize(value).ok())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
