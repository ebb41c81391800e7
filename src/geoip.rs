//! Locating clients by address.

use ipnet::IpNet;
use std::net::IpAddr;

use crate::config::GeoIpRange;

/// Maps a client address to the country it is located in.
pub trait GeoLookup: Send + Sync {
    /// ISO 3166-1 alpha-2 country code of `client_address`, if known.
    fn country_code(&self, client_address: &str) -> Option<String>;
}

/// Lookup that never locates anyone.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoGeoLookup;

impl GeoLookup for NoGeoLookup {
    fn country_code(&self, _client_address: &str) -> Option<String> {
        None
    }
}

/// Lookup over a fixed table of networks.
///
/// The most specific network containing the address wins.
#[derive(Debug, Clone, Default)]
pub struct StaticGeoLookup {
    ranges: Vec<(IpNet, String)>,
}

impl StaticGeoLookup {
    /// Build a lookup from configured ranges.
    pub fn new(ranges: &[GeoIpRange]) -> Self {
        let mut ranges: Vec<(IpNet, String)> = ranges
            .iter()
            .map(|r| (r.network.trunc(), r.country.clone()))
            .collect();
        ranges.sort_by(|a, b| b.0.prefix_len().cmp(&a.0.prefix_len()));
        Self { ranges }
    }

    /// Number of known networks.
    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }
}

impl GeoLookup for StaticGeoLookup {
    fn country_code(&self, client_address: &str) -> Option<String> {
        let address: IpAddr = client_address.parse().ok()?;
        let address = match address {
            IpAddr::V6(v6) => v6.to_ipv4_mapped().map(IpAddr::V4).unwrap_or(address),
            v4 => v4,
        };
        self.ranges
            .iter()
            .find(|(network, _)| network.contains(&address))
            .map(|(_, country)| country.clone())
    }
}
