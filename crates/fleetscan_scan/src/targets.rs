//! CIDR target expansion: parse, reject anything larger than the operator
//! safety floor, enumerate hosts, dedupe across the whole input list.

use ipnetwork::Ipv4Network;
use std::collections::BTreeSet;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Smallest prefix length an operator may scan; anything larger in host
/// count (prefix < 22) is rejected outright.
pub const MIN_PREFIX_LEN: u8 = 22;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("invalid CIDR '{0}'")]
    InvalidCidr(String),
    #[error("CIDR '{0}' has prefix /{1}, smaller than the /{MIN_PREFIX_LEN} floor")]
    PrefixTooLarge(String, u8),
}

/// Parse and expand a list of CIDRs into a deduplicated, sorted host list.
/// Network/broadcast addresses are excluded for prefixes of /30 or larger
/// subnets (i.e. any network with a distinct network/broadcast address);
/// /31 and /32 have no such addresses to exclude.
pub fn expand_targets(cidrs: &[String]) -> Result<Vec<Ipv4Addr>, TargetError> {
    let mut hosts: BTreeSet<Ipv4Addr> = BTreeSet::new();

    for cidr in cidrs {
        let network = Ipv4Network::from_str(cidr).map_err(|_| TargetError::InvalidCidr(cidr.clone()))?;
        if network.prefix() < MIN_PREFIX_LEN {
            return Err(TargetError::PrefixTooLarge(cidr.clone(), network.prefix()));
        }

        if network.prefix() >= 31 {
            hosts.extend(network.iter());
        } else {
            let network_addr = network.network();
            let broadcast_addr = network.broadcast();
            hosts.extend(network.iter().filter(|ip| *ip != network_addr && *ip != broadcast_addr));
        }
    }

    Ok(hosts.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slash_22_is_accepted() {
        let result = expand_targets(&["10.0.0.0/22".to_string()]);
        assert!(result.is_ok());
        assert_eq!(result.unwrap().len(), 1022);
    }

    #[test]
    fn slash_21_is_rejected() {
        let result = expand_targets(&["10.0.0.0/21".to_string()]);
        assert_eq!(result, Err(TargetError::PrefixTooLarge("10.0.0.0/21".to_string(), 21)));
    }

    #[test]
    fn excludes_network_and_broadcast_addresses() {
        let hosts = expand_targets(&["192.0.2.0/30".to_string()]).unwrap();
        assert_eq!(hosts, vec![Ipv4Addr::new(192, 0, 2, 1), Ipv4Addr::new(192, 0, 2, 2)]);
    }

    #[test]
    fn dedupes_overlapping_cidrs() {
        let hosts = expand_targets(&["192.0.2.0/30".to_string(), "192.0.2.0/30".to_string()]).unwrap();
        assert_eq!(hosts.len(), 2);
    }

    #[test]
    fn rejects_malformed_cidr() {
        let result = expand_targets(&["not-a-cidr".to_string()]);
        assert!(matches!(result, Err(TargetError::InvalidCidr(_))));
    }
}
