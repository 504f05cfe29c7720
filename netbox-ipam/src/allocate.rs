//! Vetted allocation on top of the IPAM's "next free address" endpoint.
//!
//! The IPAM hands out `.0`/`::` and `.1`/`::1` addresses like any other.
//! Each allocation therefore draws candidates in a bounded loop, burns the
//! ones that must not reach a host (their description is overwritten so they
//! are not offered again) and returns the first ordinary address. If the
//! prefix has no known gateway, the first gateway-shaped candidate is adopted
//! as the gateway instead of being discarded.
//!
//! Burning is not transactional: a failed PATCH is logged and the loop moves
//! on, so that address may be offered again by a later call. A `409 Conflict`
//! on the PATCH is the exception and aborts the allocation.

use std::net::IpAddr;

use chrono::{SecondsFormat, Utc};
use tracing::{debug, info, warn};

use crate::client::IpamClient;
use crate::error::{IpamError, IpamResult};
use crate::filter::PrefixFilter;
use crate::gateway::extract_gateway;
use crate::index::PrefixGatewayIndex;
use crate::project::{AllocationResult, project};
use crate::types::AddressRecord;

/// Candidates drawn per allocation before giving up.
pub const MAX_ATTEMPTS: u32 = 10;

pub const BURN_NETWORK: &str = "Reserved (network address)";
pub const BURN_GATEWAY_SHAPED: &str = "Reserved (gateway-shaped address)";
pub const BURN_ADOPTED_GATEWAY: &str = "Allocated as gateway";
pub const BURN_UNPARSABLE: &str = "Reserved (unparsable address)";

/// What a candidate address looks like by convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressShape {
    /// `x.x.x.0` or `...::`
    Network,
    /// `x.x.x.1` or `...::1`
    GatewayShaped,
    Ordinary,
    /// Not an IP address at all; never handed out.
    Unparsable,
}

/// Classify by the textual suffix of the canonical address form.
pub fn classify(raw_address: &str) -> AddressShape {
    let Ok(addr) = raw_address.parse::<IpAddr>() else {
        return AddressShape::Unparsable;
    };
    let text = addr.to_string();
    if text.ends_with("::") || text.ends_with(".0") {
        AddressShape::Network
    } else if text.ends_with("::1") || text.ends_with(".1") {
        AddressShape::GatewayShaped
    } else {
        AddressShape::Ordinary
    }
}

/// The decision for one drawn candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Hand this candidate to the caller.
    Accept,
    /// Burn the candidate with `reason` and draw again. `adopted_gateway` is
    /// set when the candidate becomes the prefix's gateway.
    Skip {
        reason: &'static str,
        adopted_gateway: Option<String>,
    },
}

/// Pure transition function of the allocation loop.
pub fn decide(known_gateway: Option<&str>, raw_address: &str) -> Step {
    match classify(raw_address) {
        AddressShape::Ordinary => Step::Accept,
        AddressShape::Network => Step::Skip {
            reason: BURN_NETWORK,
            adopted_gateway: None,
        },
        AddressShape::Unparsable => Step::Skip {
            reason: BURN_UNPARSABLE,
            adopted_gateway: None,
        },
        AddressShape::GatewayShaped if known_gateway.is_some() => Step::Skip {
            reason: BURN_GATEWAY_SHAPED,
            adopted_gateway: None,
        },
        AddressShape::GatewayShaped => Step::Skip {
            reason: BURN_ADOPTED_GATEWAY,
            adopted_gateway: Some(raw_address.to_string()),
        },
    }
}

/// Accumulator threaded through the attempts of one allocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationState {
    /// Once set, never replaced within the same allocation.
    pub known_gateway: Option<String>,
    pub attempts: u32,
    /// Addresses skipped so far, in draw order.
    pub skipped: Vec<String>,
}

impl AllocationState {
    pub fn seeded(known_gateway: Option<String>) -> Self {
        Self {
            known_gateway,
            ..Self::default()
        }
    }

    /// Decide on `raw_address` and fold the decision into the state.
    pub fn advance(&mut self, raw_address: &str) -> Step {
        self.attempts += 1;
        let step = decide(self.known_gateway.as_deref(), raw_address);
        if let Step::Skip {
            adopted_gateway, ..
        } = &step
        {
            self.skipped.push(raw_address.to_string());
            if self.known_gateway.is_none() {
                self.known_gateway.clone_from(adopted_gateway);
            }
        }
        step
    }
}

/// Allocate an address in `prefix_id` with the default attempt budget.
pub async fn allocate<C>(
    client: &C,
    prefix_id: u64,
    description: Option<&str>,
) -> IpamResult<AllocationResult>
where
    C: IpamClient + ?Sized,
{
    allocate_within(client, prefix_id, description, MAX_ATTEMPTS).await
}

/// Allocate an address in `prefix_id`, drawing at most `max_attempts`
/// candidates. Fails with [`IpamError::ExhaustedAddressSpace`] when none is
/// acceptable, or with the upstream error if drawing a candidate fails or
/// burning one conflicts.
pub async fn allocate_within<C>(
    client: &C,
    prefix_id: u64,
    description: Option<&str>,
    max_attempts: u32,
) -> IpamResult<AllocationResult>
where
    C: IpamClient + ?Sized,
{
    let description = description
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map_or_else(default_description, String::from);

    let mut state = AllocationState::seeded(seed_gateway(client, prefix_id).await);
    debug!(prefix_id, gateway = ?state.known_gateway, "allocation started");

    while state.attempts < max_attempts {
        let candidate = client.next_free_address(prefix_id, &description).await?;
        let raw = candidate.raw_address().to_string();

        match state.advance(&raw) {
            Step::Accept => {
                info!(
                    prefix_id,
                    address = %raw,
                    gateway = ?state.known_gateway,
                    attempts = state.attempts,
                    "address allocated"
                );
                return project(&candidate, state.known_gateway);
            }
            Step::Skip {
                reason,
                adopted_gateway,
            } => {
                if adopted_gateway.is_some() {
                    info!(prefix_id, gateway = %raw, "adopting gateway-shaped address as gateway");
                } else {
                    debug!(prefix_id, address = %raw, reason, "skipping reserved address");
                }
                burn(client, &candidate, reason).await?;
            }
        }
    }

    warn!(prefix_id, attempts = state.attempts, skipped = ?state.skipped, "address space exhausted");
    Err(IpamError::ExhaustedAddressSpace {
        prefix_id,
        attempts: state.attempts,
    })
}

/// Gateway known before any candidate is drawn: declared on the prefix
/// itself, else inherited from the most specific enclosing prefix that
/// declares one. Best-effort; failures only cost the seed.
async fn seed_gateway<C>(client: &C, prefix_id: u64) -> Option<String>
where
    C: IpamClient + ?Sized,
{
    let prefix = match client.fetch_prefix(prefix_id).await {
        Ok(prefix) => prefix,
        Err(e) => {
            warn!(prefix_id, error = %e, "could not fetch prefix; allocating without a known gateway");
            return None;
        }
    };

    if let Some(gateway) = extract_gateway(&prefix) {
        return Some(gateway);
    }

    let network = match prefix.network() {
        Ok(network) => network,
        Err(e) => {
            warn!(prefix_id, error = %e, "cannot inherit a gateway for this prefix");
            return None;
        }
    };

    match client.list_prefixes(&PrefixFilter::bulk(prefix.address_family())).await {
        Ok(prefixes) => PrefixGatewayIndex::build(&prefixes)
            .inherited_gateway(&network)
            .map(String::from),
        Err(e) => {
            warn!(prefix_id, error = %e, "bulk prefix fetch failed; no inherited gateway");
            None
        }
    }
}

/// Mark a skipped candidate so it is not offered again. Only a conflict is
/// returned; every other failure is logged and swallowed.
async fn burn<C>(client: &C, candidate: &AddressRecord, reason: &str) -> IpamResult<()>
where
    C: IpamClient + ?Sized,
{
    let Some(address_id) = candidate.id else {
        warn!(address = %candidate.address, "skipped candidate has no id; cannot mark it reserved");
        return Ok(());
    };
    match client.mark_address_description(address_id, reason).await {
        Ok(()) => Ok(()),
        Err(
            e @ IpamError::Unavailable {
                status: Some(409), ..
            },
        ) => {
            warn!(address_id, address = %candidate.address, error = %e, "burn conflicted; aborting allocation");
            Err(e)
        }
        Err(e) => {
            warn!(
                address_id,
                address = %candidate.address,
                error = %e,
                "failed to burn skipped address; it may be offered again"
            );
            Ok(())
        }
    }
}

fn default_description() -> String {
    format!(
        "Allocated by netbox-ipam on {}",
        Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
    )
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;
    use crate::types::{Family, MetadataValue, Prefix};

    /// Scripted IPAM: candidates are handed out in order, calls are recorded.
    #[derive(Default)]
    struct ScriptedIpam {
        prefix: Option<Prefix>,
        listing: Vec<Prefix>,
        candidates: Mutex<VecDeque<IpamResult<AddressRecord>>>,
        /// Status every burn fails with.
        fail_burns: Option<u16>,
        burns: Mutex<Vec<(u64, String)>>,
        draws: Mutex<u32>,
        listings: Mutex<u32>,
    }

    impl ScriptedIpam {
        fn with_candidates(addresses: &[&str]) -> Self {
            let candidates = addresses
                .iter()
                .enumerate()
                .map(|(i, addr)| Ok(candidate(i as u64 + 100, addr)))
                .collect();
            Self {
                candidates: Mutex::new(candidates),
                ..Self::default()
            }
        }

        fn prefix(mut self, prefix: Prefix) -> Self {
            self.prefix = Some(prefix);
            self
        }

        fn burns(&self) -> Vec<(u64, String)> {
            self.burns.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl IpamClient for ScriptedIpam {
        async fn list_prefixes(&self, _filter: &PrefixFilter) -> IpamResult<Vec<Prefix>> {
            *self.listings.lock().unwrap() += 1;
            Ok(self.listing.clone())
        }

        async fn fetch_prefix(&self, _prefix_id: u64) -> IpamResult<Prefix> {
            self.prefix.clone().ok_or(IpamError::Unavailable {
                operation: "fetch prefix",
                status: Some(404),
                detail: "Not found.".into(),
            })
        }

        async fn next_free_address(
            &self,
            _prefix_id: u64,
            description: &str,
        ) -> IpamResult<AddressRecord> {
            *self.draws.lock().unwrap() += 1;
            let next = self.candidates.lock().unwrap().pop_front();
            next.unwrap_or_else(|| Ok(candidate(999, "10.0.1.0/24")))
                .map(|mut c| {
                    c.description = description.to_string();
                    c
                })
        }

        async fn mark_address_description(&self, address_id: u64, text: &str) -> IpamResult<()> {
            self.burns.lock().unwrap().push((address_id, text.to_string()));
            if let Some(status) = self.fail_burns {
                return Err(IpamError::Unavailable {
                    operation: "mark address",
                    status: Some(status),
                    detail: "boom".into(),
                });
            }
            Ok(())
        }
    }

    fn candidate(id: u64, address: &str) -> AddressRecord {
        AddressRecord {
            id: Some(id),
            address: address.to_string(),
            family: None,
            description: String::new(),
            dns_name: String::new(),
            status: None,
            vrf: None,
            tags: Vec::new(),
            custom_fields: Default::default(),
        }
    }

    fn prefix(id: u64, cidr: &str, gateway: Option<&str>) -> Prefix {
        Prefix {
            id,
            cidr: cidr.into(),
            family: Some(Family::V4),
            metadata: gateway
                .map(|gw| ("gateway".to_string(), MetadataValue::Text(gw.into())))
                .into_iter()
                .collect(),
            description: String::new(),
            status: None,
            vrf: None,
            site: None,
            role: None,
            tags: Vec::new(),
        }
    }

    #[test]
    fn classify_by_suffix() {
        assert_eq!(classify("10.0.0.0"), AddressShape::Network);
        assert_eq!(classify("10.0.0.1"), AddressShape::GatewayShaped);
        assert_eq!(classify("10.0.0.10"), AddressShape::Ordinary);
        assert_eq!(classify("10.0.0.11"), AddressShape::Ordinary);
        assert_eq!(classify("2001:db8::"), AddressShape::Network);
        assert_eq!(classify("2001:db8::1"), AddressShape::GatewayShaped);
        assert_eq!(classify("2001:db8::1:0:0:0"), AddressShape::Network);
        assert_eq!(classify("2001:db8::42"), AddressShape::Ordinary);
        assert_eq!(classify("bogus"), AddressShape::Unparsable);
        assert_eq!(classify(""), AddressShape::Unparsable);
    }

    #[test]
    fn decide_never_accepts_reserved_shapes() {
        assert_eq!(decide(None, "10.0.0.42"), Step::Accept);
        assert_eq!(
            decide(Some("10.0.0.1"), "10.0.0.0"),
            Step::Skip {
                reason: BURN_NETWORK,
                adopted_gateway: None
            }
        );
        assert_eq!(
            decide(Some("10.0.0.254"), "10.0.0.1"),
            Step::Skip {
                reason: BURN_GATEWAY_SHAPED,
                adopted_gateway: None
            }
        );
        assert_eq!(
            decide(None, "10.0.0.1"),
            Step::Skip {
                reason: BURN_ADOPTED_GATEWAY,
                adopted_gateway: Some("10.0.0.1".into())
            }
        );
        assert_eq!(
            decide(None, "bogus"),
            Step::Skip {
                reason: BURN_UNPARSABLE,
                adopted_gateway: None
            }
        );
    }

    #[test]
    fn first_adopted_gateway_is_kept() {
        let mut state = AllocationState::default();
        state.advance("10.0.1.1");
        state.advance("10.0.2.1");
        assert_eq!(state.known_gateway.as_deref(), Some("10.0.1.1"));
        assert_eq!(state.attempts, 2);
        assert_eq!(state.skipped, vec!["10.0.1.1", "10.0.2.1"]);
    }

    #[tokio::test]
    async fn declared_gateway_is_known_before_drawing() {
        let ipam = ScriptedIpam::with_candidates(&["10.0.0.42/24"])
            .prefix(prefix(1, "10.0.0.0/24", Some("10.0.0.5")));

        let result = allocate(&ipam, 1, Some("web-01")).await.unwrap();

        assert_eq!(result.address, "10.0.0.42");
        assert_eq!(result.gateway.as_deref(), Some("10.0.0.5"));
        assert_eq!(result.family, Family::V4);
        assert_eq!(result.description, "web-01");
        assert_eq!(*ipam.draws.lock().unwrap(), 1);
        assert_eq!(*ipam.listings.lock().unwrap(), 0);
        assert!(ipam.burns().is_empty());
    }

    #[tokio::test]
    async fn network_skipped_then_gateway_adopted() {
        let ipam = ScriptedIpam::with_candidates(&["10.0.1.0/24", "10.0.1.1/24", "10.0.1.2/24"])
            .prefix(prefix(2, "10.0.1.0/24", None));

        let result = allocate(&ipam, 2, None).await.unwrap();

        assert_eq!(result.address, "10.0.1.2");
        assert_eq!(result.gateway.as_deref(), Some("10.0.1.1"));
        assert!(result.description.starts_with("Allocated by netbox-ipam on "));
        assert_eq!(
            ipam.burns(),
            vec![
                (100, BURN_NETWORK.to_string()),
                (101, BURN_ADOPTED_GATEWAY.to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn gateway_shaped_address_is_burned_when_gateway_known() {
        let ipam = ScriptedIpam::with_candidates(&["10.0.0.1/24", "10.0.0.2/24"])
            .prefix(prefix(1, "10.0.0.0/24", Some("10.0.0.254")));

        let result = allocate(&ipam, 1, None).await.unwrap();

        assert_eq!(result.address, "10.0.0.2");
        assert_eq!(result.gateway.as_deref(), Some("10.0.0.254"));
        assert_eq!(ipam.burns(), vec![(100, BURN_GATEWAY_SHAPED.to_string())]);
    }

    #[tokio::test]
    async fn gateway_inherited_from_enclosing_prefix() {
        let mut ipam = ScriptedIpam::with_candidates(&["10.0.5.1/24", "10.0.5.7/24"])
            .prefix(prefix(5, "10.0.5.0/24", None));
        ipam.listing = vec![
            prefix(1, "10.0.0.0/16", Some("10.0.0.1")),
            prefix(5, "10.0.5.0/24", None),
        ];

        let result = allocate(&ipam, 5, None).await.unwrap();

        assert_eq!(result.address, "10.0.5.7");
        assert_eq!(result.gateway.as_deref(), Some("10.0.0.1"));
        assert_eq!(ipam.burns(), vec![(100, BURN_GATEWAY_SHAPED.to_string())]);
    }

    #[tokio::test]
    async fn exhausts_within_attempt_budget() {
        let ipam = ScriptedIpam::with_candidates(&[]).prefix(prefix(3, "10.0.1.0/24", None));

        let err = allocate(&ipam, 3, None).await.unwrap_err();

        assert!(matches!(
            err,
            IpamError::ExhaustedAddressSpace {
                prefix_id: 3,
                attempts: MAX_ATTEMPTS
            }
        ));
        assert_eq!(*ipam.draws.lock().unwrap(), MAX_ATTEMPTS);
        assert_eq!(ipam.burns().len(), MAX_ATTEMPTS as usize);
    }

    #[tokio::test]
    async fn mixed_reserved_addresses_exhaust_with_reasons() {
        let ipam = ScriptedIpam::with_candidates(&[
            "10.0.1.0/24",
            "10.0.1.1/24",
            "10.0.2.1/24",
            "10.0.2.0/24",
            "10.0.3.1/24",
            "10.0.3.0/24",
            "10.0.4.1/24",
            "10.0.4.0/24",
            "10.0.5.1/24",
            "10.0.5.0/24",
            "10.0.6.42/24",
        ])
        .prefix(prefix(3, "10.0.0.0/16", None));

        let err = allocate(&ipam, 3, None).await.unwrap_err();

        assert!(matches!(
            err,
            IpamError::ExhaustedAddressSpace {
                prefix_id: 3,
                attempts: MAX_ATTEMPTS
            }
        ));
        assert_eq!(*ipam.draws.lock().unwrap(), MAX_ATTEMPTS);
        let reasons: Vec<String> = ipam.burns().into_iter().map(|(_, r)| r).collect();
        assert_eq!(
            reasons,
            vec![
                BURN_NETWORK,
                BURN_ADOPTED_GATEWAY,
                BURN_GATEWAY_SHAPED,
                BURN_NETWORK,
                BURN_GATEWAY_SHAPED,
                BURN_NETWORK,
                BURN_GATEWAY_SHAPED,
                BURN_NETWORK,
                BURN_GATEWAY_SHAPED,
                BURN_NETWORK,
            ]
        );
        // the ordinary address after the budget is never drawn
        assert_eq!(ipam.candidates.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn unparsable_candidate_is_burned_not_returned() {
        let ipam = ScriptedIpam::with_candidates(&["bogus/24", "10.0.1.9/24"])
            .prefix(prefix(2, "10.0.1.0/24", Some("10.0.1.1")));

        let result = allocate(&ipam, 2, None).await.unwrap();

        assert_eq!(result.address, "10.0.1.9");
        assert_eq!(ipam.burns(), vec![(100, BURN_UNPARSABLE.to_string())]);
    }

    #[tokio::test]
    async fn burn_conflict_aborts_allocation() {
        let mut ipam = ScriptedIpam::with_candidates(&["10.0.1.0/24", "10.0.1.9/24"])
            .prefix(prefix(2, "10.0.1.0/24", Some("10.0.1.1")));
        ipam.fail_burns = Some(409);

        let err = allocate(&ipam, 2, None).await.unwrap_err();

        assert!(matches!(
            err,
            IpamError::Unavailable {
                operation: "mark address",
                status: Some(409),
                ..
            }
        ));
        assert_eq!(*ipam.draws.lock().unwrap(), 1);
        assert_eq!(ipam.burns().len(), 1);
    }

    #[tokio::test]
    async fn burn_failures_do_not_abort() {
        let mut ipam = ScriptedIpam::with_candidates(&["10.0.1.0/24", "10.0.1.9/24"])
            .prefix(prefix(2, "10.0.1.0/24", Some("10.0.1.1")));
        ipam.fail_burns = Some(500);

        let result = allocate(&ipam, 2, None).await.unwrap();

        assert_eq!(result.address, "10.0.1.9");
        assert_eq!(ipam.burns().len(), 1);
    }

    #[tokio::test]
    async fn prefix_fetch_failure_only_loses_the_seed() {
        let ipam = ScriptedIpam::with_candidates(&["10.0.1.1/24", "10.0.1.2/24"]);

        let result = allocate(&ipam, 2, None).await.unwrap();

        assert_eq!(result.gateway.as_deref(), Some("10.0.1.1"));
        assert_eq!(*ipam.listings.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn draw_failure_is_surfaced() {
        let ipam = ScriptedIpam::with_candidates(&["10.0.1.0/24"])
            .prefix(prefix(2, "10.0.1.0/24", None));
        ipam.candidates.lock().unwrap().push_back(Err(IpamError::Unavailable {
            operation: "next free address",
            status: Some(409),
            detail: "Insufficient space".into(),
        }));

        let err = allocate(&ipam, 2, None).await.unwrap_err();

        assert!(matches!(
            err,
            IpamError::Unavailable {
                status: Some(409),
                ..
            }
        ));
        assert_eq!(*ipam.draws.lock().unwrap(), 2);
    }

    #[tokio::test]
    async fn candidate_without_id_is_skipped_unburned() {
        let ipam = ScriptedIpam::with_candidates(&["10.0.1.2/24"])
            .prefix(prefix(2, "10.0.1.0/24", Some("10.0.1.1")));
        let mut anonymous = candidate(0, "10.0.1.0/24");
        anonymous.id = None;
        ipam.candidates.lock().unwrap().push_front(Ok(anonymous));

        let result = allocate(&ipam, 2, None).await.unwrap();

        assert_eq!(result.address, "10.0.1.2");
        assert!(ipam.burns().is_empty());
    }
}
