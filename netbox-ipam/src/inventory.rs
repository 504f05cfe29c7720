//! Read-only inventory views, enriched where NetBox itself has no answer.

use tracing::warn;

use crate::client::{IpamClient, NetboxClient};
use crate::error::IpamResult;
use crate::filter::{AddressFilter, DeviceFilter, PrefixFilter, VlanFilter};
use crate::index::PrefixGatewayIndex;
use crate::project::{
    AddressSummary, DeviceSummary, PrefixSummary, VlanSummary, address_summary, device_summary,
    prefix_summary, vlan_summary,
};

pub async fn prefix_summaries(
    client: &NetboxClient,
    filter: &PrefixFilter,
) -> IpamResult<Vec<PrefixSummary>> {
    let prefixes = client.list_prefixes(filter).await?;
    Ok(prefixes.iter().map(prefix_summary).collect())
}

/// IP addresses with a best-effort `prefix_gateway`.
///
/// Gateways come from one bulk prefix fetch issued alongside the address
/// listing, never one request per address. If that fetch fails the
/// addresses are still returned, without gateways.
pub async fn address_summaries(
    client: &NetboxClient,
    filter: &AddressFilter,
) -> IpamResult<Vec<AddressSummary>> {
    let bulk = PrefixFilter::bulk(filter.family);
    let (addresses, prefixes) =
        tokio::join!(client.list_addresses(filter), client.list_prefixes(&bulk));
    let addresses = addresses?;

    let index = match prefixes {
        Ok(prefixes) => PrefixGatewayIndex::build(&prefixes),
        Err(e) => {
            warn!(error = %e, "bulk prefix fetch failed; listing addresses without gateways");
            PrefixGatewayIndex::default()
        }
    };

    Ok(addresses
        .iter()
        .map(|record| {
            let gateway = index.lookup(record.raw_address()).map(String::from);
            address_summary(record, gateway)
        })
        .collect())
}

pub async fn vlan_summaries(
    client: &NetboxClient,
    filter: &VlanFilter,
) -> IpamResult<Vec<VlanSummary>> {
    let vlans = client.list_vlans(filter).await?;
    Ok(vlans.iter().map(vlan_summary).collect())
}

pub async fn device_summaries(
    client: &NetboxClient,
    filter: &DeviceFilter,
) -> IpamResult<Vec<DeviceSummary>> {
    let devices = client.list_devices(filter).await?;
    Ok(devices.iter().map(device_summary).collect())
}
