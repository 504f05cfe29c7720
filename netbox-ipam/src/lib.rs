//! NetBox IPAM front end for provisioning tools.
//!
//! Allocates addresses out of registered prefixes without handing out
//! network or gateway addresses, and infers each prefix's default gateway
//! from loosely structured NetBox metadata.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), netbox_ipam::IpamError> {
//! use netbox_ipam::{ClientConfig, NetboxClient};
//!
//! let config = ClientConfig::new("https://netbox.example.net", Some("0123abcd".to_string()));
//! let client = NetboxClient::new(&config)?;
//!
//! let result = netbox_ipam::allocate(&client, 42, Some("web-01")).await?;
//! println!("{} via {:?}", result.address, result.gateway);
//! # Ok(())
//! # }
//! ```

mod allocate;
mod client;
mod config;
mod error;
mod filter;
mod gateway;
mod http;
mod index;
mod inventory;
mod project;
mod types;

pub use allocate::{
    AddressShape, AllocationState, BURN_ADOPTED_GATEWAY, BURN_GATEWAY_SHAPED, BURN_NETWORK,
    BURN_UNPARSABLE, MAX_ATTEMPTS, Step, allocate, allocate_within, classify, decide,
};
pub use client::{IpamClient, NetboxClient, ServiceStatus};
pub use config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
pub use error::{IpamError, IpamResult};
pub use filter::{AddressFilter, DeviceFilter, MAX_LIST_LIMIT, PrefixFilter, VlanFilter};
pub use gateway::{GATEWAY_METADATA_KEYS, declared_gateway, extract_gateway};
pub use index::{GatewayEntry, PrefixGatewayIndex};
pub use inventory::{address_summaries, device_summaries, prefix_summaries, vlan_summaries};
pub use project::{
    AddressSummary, AllocationResult, DeviceSummary, PrefixSummary, VlanSummary, address_summary,
    device_summary, prefix_summary, project, vlan_summary,
};
pub use types::{
    AddressRecord, AddressRef, Choice, Device, DeviceType, Family, Metadata, MetadataValue,
    NamedRef, Prefix, Vlan,
};
