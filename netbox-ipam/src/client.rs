use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use tracing::warn;

use crate::config::ClientConfig;
use crate::error::{IpamError, IpamResult};
use crate::filter::{AddressFilter, DeviceFilter, PrefixFilter, VlanFilter};
use crate::http::HttpClient;
use crate::types::{AddressRecord, Device, OneOrMany, Page, Prefix, StatusResponse, Vlan};

/// The IPAM operations allocation depends on. No business logic lives
/// behind this trait; every failure is reported as
/// [`IpamError::Unavailable`] and never retried here.
#[async_trait]
pub trait IpamClient: Send + Sync {
    /// One page of prefixes matching `filter`.
    async fn list_prefixes(&self, filter: &PrefixFilter) -> IpamResult<Vec<Prefix>>;

    async fn fetch_prefix(&self, prefix_id: u64) -> IpamResult<Prefix>;

    /// Ask the IPAM to create the next free address in `prefix_id`.
    async fn next_free_address(&self, prefix_id: u64, description: &str)
    -> IpamResult<AddressRecord>;

    /// Overwrite an address's description. Mutates remote state.
    async fn mark_address_description(&self, address_id: u64, text: &str) -> IpamResult<()>;
}

/// Reachability report; never an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServiceStatus {
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ServiceStatus {
    fn unreachable(reason: impl Into<String>) -> Self {
        Self {
            reachable: false,
            version: None,
            url: None,
            reason: Some(reason.into()),
        }
    }
}

#[derive(Serialize)]
struct DescriptionBody<'a> {
    description: &'a str,
}

/// reqwest-backed [`IpamClient`] for NetBox.
#[derive(Clone)]
pub struct NetboxClient {
    http: HttpClient,
    prefix_limit: u32,
}

impl NetboxClient {
    pub fn new(config: &ClientConfig) -> IpamResult<Self> {
        Ok(Self {
            http: HttpClient::new(config)?,
            prefix_limit: config.prefix_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        self.http.base_url()
    }

    /// Quick reachability check. A missing token is reported without
    /// touching the network.
    pub async fn status(&self) -> ServiceStatus {
        if !self.http.is_configured() {
            return ServiceStatus::unreachable(IpamError::NotConfigured.to_string());
        }
        match self.fetch_status().await {
            Ok(status) => ServiceStatus {
                reachable: true,
                version: Some(status.version.unwrap_or_else(|| "unknown".to_string())),
                url: Some(self.base_url().to_string()),
                reason: None,
            },
            Err(e) => {
                warn!(error = %e, "netbox unreachable");
                ServiceStatus::unreachable(e.to_string())
            }
        }
    }

    async fn fetch_status(&self) -> IpamResult<StatusResponse> {
        let req = self.http.request(Method::GET, "/status/")?;
        self.http.send("status", req).await
    }

    pub async fn list_addresses(&self, filter: &AddressFilter) -> IpamResult<Vec<AddressRecord>> {
        let req = self
            .http
            .request(Method::GET, "/ipam/ip-addresses/")?
            .query(&filter.query());
        let page: Page<AddressRecord> = self.http.send("list ip addresses", req).await?;
        Ok(page.results)
    }

    pub async fn list_vlans(&self, filter: &VlanFilter) -> IpamResult<Vec<Vlan>> {
        let req = self
            .http
            .request(Method::GET, "/ipam/vlans/")?
            .query(&filter.query());
        let page: Page<Vlan> = self.http.send("list vlans", req).await?;
        Ok(page.results)
    }

    pub async fn list_devices(&self, filter: &DeviceFilter) -> IpamResult<Vec<Device>> {
        let req = self
            .http
            .request(Method::GET, "/dcim/devices/")?
            .query(&filter.query());
        let page: Page<Device> = self.http.send("list devices", req).await?;
        Ok(page.results)
    }
}

#[async_trait]
impl IpamClient for NetboxClient {
    async fn list_prefixes(&self, filter: &PrefixFilter) -> IpamResult<Vec<Prefix>> {
        let req = self
            .http
            .request(Method::GET, "/ipam/prefixes/")?
            .query(&filter.query(self.prefix_limit));
        let page: Page<Prefix> = self.http.send("list prefixes", req).await?;
        Ok(page.results)
    }

    async fn fetch_prefix(&self, prefix_id: u64) -> IpamResult<Prefix> {
        let path = format!("/ipam/prefixes/{prefix_id}/");
        let req = self.http.request(Method::GET, &path)?;
        self.http.send("fetch prefix", req).await
    }

    async fn next_free_address(
        &self,
        prefix_id: u64,
        description: &str,
    ) -> IpamResult<AddressRecord> {
        let path = format!("/ipam/prefixes/{prefix_id}/available-ips/");
        let req = self
            .http
            .request(Method::POST, &path)?
            .json(&DescriptionBody { description });
        let body: OneOrMany<AddressRecord> = self.http.send("next free address", req).await?;
        body.into_first().ok_or_else(|| IpamError::Unavailable {
            operation: "next free address",
            status: None,
            detail: "empty available-ips response".to_string(),
        })
    }

    async fn mark_address_description(&self, address_id: u64, text: &str) -> IpamResult<()> {
        let path = format!("/ipam/ip-addresses/{address_id}/");
        let req = self
            .http
            .request(Method::PATCH, &path)?
            .json(&DescriptionBody { description: text });
        self.http.send_discard("mark address", req).await
    }
}
