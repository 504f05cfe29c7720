use std::io::Write;

use clap::Args;
use netbox_ipam::{
    AddressFilter, DeviceFilter, Family, NetboxClient, PrefixFilter, VlanFilter,
    address_summaries, device_summaries, prefix_summaries, vlan_summaries,
};
use serde::Serialize;

use crate::error::CliResult;

#[derive(Args)]
pub struct PrefixArgs {
    /// Address family: 4 or 6
    #[arg(long, value_parser = parse_family)]
    family: Option<Family>,
    /// Filter by status, e.g. active
    #[arg(long)]
    status: Option<String>,
    /// Filter by site slug
    #[arg(long)]
    site: Option<String>,
    #[arg(long, default_value_t = 200)]
    limit: u32,
}

#[derive(Args)]
pub struct AddressArgs {
    /// Address family: 4 or 6
    #[arg(long, value_parser = parse_family)]
    family: Option<Family>,
    /// Filter by status, e.g. active
    #[arg(long)]
    status: Option<String>,
    /// Filter by parent prefix (CIDR)
    #[arg(long)]
    prefix: Option<String>,
    /// Filter by DNS name (contains)
    #[arg(long)]
    dns_name: Option<String>,
    #[arg(long, default_value_t = 100)]
    limit: u32,
}

#[derive(Args)]
pub struct VlanArgs {
    /// Filter by site slug
    #[arg(long)]
    site: Option<String>,
    /// Filter by VLAN group slug
    #[arg(long)]
    group: Option<String>,
    /// Filter by role slug
    #[arg(long)]
    role: Option<String>,
    /// Filter by status, e.g. active
    #[arg(long)]
    status: Option<String>,
    /// Free-text search (name or description)
    #[arg(long)]
    query: Option<String>,
    #[arg(long, default_value_t = 200)]
    limit: u32,
}

#[derive(Args)]
pub struct DeviceArgs {
    /// Filter by site slug
    #[arg(long)]
    site: Option<String>,
    /// Filter by role slug
    #[arg(long)]
    role: Option<String>,
    /// Filter by status, e.g. active
    #[arg(long)]
    status: Option<String>,
    /// Free-text search (name, serial or asset tag)
    #[arg(long)]
    query: Option<String>,
    #[arg(long, default_value_t = 200)]
    limit: u32,
}

#[derive(Args)]
pub struct AllocateArgs {
    /// NetBox prefix ID to allocate from
    prefix_id: u64,
    /// Description recorded on the new address
    #[arg(long)]
    description: Option<String>,
}

fn parse_family(s: &str) -> Result<Family, String> {
    let value: u8 = s.parse().map_err(|_| format!("invalid family {s:?}"))?;
    Family::try_from(value)
}

pub async fn run_status(client: &NetboxClient) -> CliResult<()> {
    print_json(&client.status().await)
}

pub async fn run_prefixes(client: &NetboxClient, args: PrefixArgs) -> CliResult<()> {
    let filter = PrefixFilter {
        family: args.family,
        status: args.status,
        site: args.site,
        limit: Some(args.limit),
    };
    print_json(&prefix_summaries(client, &filter).await?)
}

pub async fn run_addresses(client: &NetboxClient, args: AddressArgs) -> CliResult<()> {
    let filter = AddressFilter {
        family: args.family,
        status: args.status,
        prefix: args.prefix,
        dns_name: args.dns_name,
        limit: Some(args.limit),
    };
    print_json(&address_summaries(client, &filter).await?)
}

pub async fn run_vlans(client: &NetboxClient, args: VlanArgs) -> CliResult<()> {
    let filter = VlanFilter {
        site: args.site,
        group: args.group,
        role: args.role,
        status: args.status,
        query: args.query,
        limit: Some(args.limit),
    };
    print_json(&vlan_summaries(client, &filter).await?)
}

pub async fn run_devices(client: &NetboxClient, args: DeviceArgs) -> CliResult<()> {
    let filter = DeviceFilter {
        site: args.site,
        role: args.role,
        status: args.status,
        query: args.query,
        limit: Some(args.limit),
    };
    print_json(&device_summaries(client, &filter).await?)
}

pub async fn run_allocate(client: &NetboxClient, args: AllocateArgs) -> CliResult<()> {
    let result = netbox_ipam::allocate(client, args.prefix_id, args.description.as_deref()).await?;
    print_json(&result)
}

fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let mut out = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut out, value)?;
    writeln!(out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn family_flag() {
        assert_eq!(parse_family("6"), Ok(Family::V6));
        assert!(parse_family("5").is_err());
        assert!(parse_family("ipv4").is_err());
    }
}
