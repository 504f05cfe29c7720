//! Best-effort gateway inference from prefix metadata.
//!
//! This is a heuristic: a free-text description such as `"core uplink v2.0"`
//! yields a bogus gateway, and nothing checks that the result lies inside
//! the prefix.

use crate::types::{Metadata, Prefix};

/// Custom-field keys that may declare a gateway, most authoritative first.
pub const GATEWAY_METADATA_KEYS: &[&str] = &["gateway", "default_gateway", "gw"];

/// Infer a gateway for `prefix`: a declared custom field wins, then an
/// address-looking description.
pub fn extract_gateway(prefix: &Prefix) -> Option<String> {
    declared_gateway(&prefix.metadata).or_else(|| gateway_from_description(&prefix.description))
}

/// Gateway declared in custom fields, ignoring the description.
pub fn declared_gateway(metadata: &Metadata) -> Option<String> {
    GATEWAY_METADATA_KEYS
        .iter()
        .find_map(|key| metadata.get(*key).and_then(|v| v.first_text()))
}

fn gateway_from_description(description: &str) -> Option<String> {
    let text = description.trim();
    let address_like = text.contains('.') || text.contains(':');
    (!text.is_empty() && !text.contains('/') && address_like).then(|| text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Family, MetadataValue};

    fn prefix(metadata: &[(&str, MetadataValue)], description: &str) -> Prefix {
        Prefix {
            id: 1,
            cidr: "10.0.0.0/24".into(),
            family: Some(Family::V4),
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
            description: description.into(),
            status: None,
            vrf: None,
            site: None,
            role: None,
            tags: Vec::new(),
        }
    }

    fn text(s: &str) -> MetadataValue {
        MetadataValue::Text(s.into())
    }

    #[test]
    fn keys_are_consulted_in_order() {
        let p = prefix(
            &[("gw", text("10.0.0.254")), ("default_gateway", text("10.0.0.253"))],
            "",
        );
        assert_eq!(extract_gateway(&p), Some("10.0.0.253".into()));

        let p = prefix(
            &[("gateway", text("")), ("gw", text("10.0.0.254"))],
            "10.0.0.9",
        );
        assert_eq!(extract_gateway(&p), Some("10.0.0.254".into()));
    }

    #[test]
    fn list_values_use_first_entry() {
        let p = prefix(
            &[("gateway", MetadataValue::List(vec!["fd00::1".into(), "fd00::2".into()]))],
            "",
        );
        assert_eq!(extract_gateway(&p), Some("fd00::1".into()));
    }

    #[test]
    fn description_fallback() {
        assert_eq!(
            extract_gateway(&prefix(&[], "  10.0.0.1 ")),
            Some("10.0.0.1".into())
        );
        assert_eq!(
            extract_gateway(&prefix(&[], "fe80::1")),
            Some("fe80::1".into())
        );
        // a CIDR is not a gateway
        assert_eq!(extract_gateway(&prefix(&[], "10.0.0.0/24")), None);
        assert_eq!(extract_gateway(&prefix(&[], "office lan")), None);
        assert_eq!(extract_gateway(&prefix(&[], "")), None);
    }

    #[test]
    fn description_ignored_for_declared_gateway() {
        let p = prefix(&[], "10.0.0.1");
        assert_eq!(declared_gateway(&p.metadata), None);
    }

    #[test]
    fn extraction_is_deterministic() {
        let p = prefix(&[("gw", text("10.0.0.1"))], "10.0.0.2");
        assert_eq!(extract_gateway(&p), extract_gateway(&p.clone()));
    }
}
