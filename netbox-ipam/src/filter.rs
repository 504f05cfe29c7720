//! Typed list filters. Unset or blank fields never reach the query string.

use crate::types::Family;

/// Upper bound NetBox is asked for in a single page.
pub const MAX_LIST_LIMIT: u32 = 500;

const DEFAULT_ADDRESS_LIMIT: u32 = 100;
const DEFAULT_VLAN_LIMIT: u32 = 200;
const DEFAULT_DEVICE_LIMIT: u32 = 200;

pub(crate) type Query = Vec<(&'static str, String)>;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixFilter {
    pub family: Option<Family>,
    pub status: Option<String>,
    pub site: Option<String>,
    /// Falls back to the client's configured prefix limit.
    pub limit: Option<u32>,
}

impl PrefixFilter {
    /// Everything of one family, as used to build a gateway index.
    pub fn bulk(family: Option<Family>) -> Self {
        Self {
            family,
            ..Self::default()
        }
    }

    pub(crate) fn query(&self, default_limit: u32) -> Query {
        let mut q = vec![("limit", capped(self.limit, default_limit))];
        push_family(&mut q, self.family);
        push_text(&mut q, "status", &self.status);
        push_text(&mut q, "site", &self.site);
        q
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressFilter {
    pub family: Option<Family>,
    pub status: Option<String>,
    /// Parent prefix in CIDR notation.
    pub prefix: Option<String>,
    /// Case-insensitive substring of the DNS name.
    pub dns_name: Option<String>,
    pub limit: Option<u32>,
}

impl AddressFilter {
    pub(crate) fn query(&self) -> Query {
        let mut q = vec![("limit", capped(self.limit, DEFAULT_ADDRESS_LIMIT))];
        push_family(&mut q, self.family);
        push_text(&mut q, "status", &self.status);
        push_text(&mut q, "parent", &self.prefix);
        push_text(&mut q, "dns_name__ic", &self.dns_name);
        q
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanFilter {
    pub site: Option<String>,
    pub group: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    /// Free-text search over name and description.
    pub query: Option<String>,
    pub limit: Option<u32>,
}

impl VlanFilter {
    pub(crate) fn query(&self) -> Query {
        let mut q = vec![("limit", capped(self.limit, DEFAULT_VLAN_LIMIT))];
        push_text(&mut q, "site", &self.site);
        push_text(&mut q, "group", &self.group);
        push_text(&mut q, "role", &self.role);
        push_text(&mut q, "status", &self.status);
        push_text(&mut q, "q", &self.query);
        q
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilter {
    pub site: Option<String>,
    pub role: Option<String>,
    pub status: Option<String>,
    /// Free-text search over name, serial and asset tag.
    pub query: Option<String>,
    pub limit: Option<u32>,
}

impl DeviceFilter {
    pub(crate) fn query(&self) -> Query {
        let mut q = vec![("limit", capped(self.limit, DEFAULT_DEVICE_LIMIT))];
        push_text(&mut q, "site", &self.site);
        push_text(&mut q, "role", &self.role);
        push_text(&mut q, "status", &self.status);
        push_text(&mut q, "q", &self.query);
        q
    }
}

fn capped(limit: Option<u32>, default: u32) -> String {
    limit.unwrap_or(default).min(MAX_LIST_LIMIT).to_string()
}

fn push_family(q: &mut Query, family: Option<Family>) {
    if let Some(family) = family {
        q.push(("family", family.to_string()));
    }
}

fn push_text(q: &mut Query, key: &'static str, value: &Option<String>) {
    if let Some(value) = value.as_deref().map(str::trim)
        && !value.is_empty()
    {
        q.push((key, value.to_string()));
    }
}
