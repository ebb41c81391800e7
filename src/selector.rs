//! Choosing a mirror for a client.
//!
//! Mirrors in the client's country are preferred. When none of them is fresh
//! enough any fresh mirror will do. Within a candidate pool the choice is
//! derived from a hash of the client address, so the same client keeps
//! landing on the same mirror while different clients spread over all of them.

use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, info};

use crate::catalog::{Catalog, Mirror, MirrorFilter, Protocol};
use crate::error::{MirrorError, MirrorResult};
use crate::freshness::FreshnessRequirement;
use crate::geoip::GeoLookup;

/// Protocol mirrors must support to be eligible.
pub const REQUIRED_PROTOCOL: Protocol = Protocol::Https;

/// Derive a stable selection seed from a client address.
pub fn client_seed(client_address: &str) -> u64 {
    let digest = Sha256::digest(client_address.as_bytes());
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(bytes)
}

/// Pick one of `candidates` for `seed`.
///
/// The candidates are ordered by URL first so the result does not depend on
/// the order the catalog returned them in.
pub fn pick_mirror(mut candidates: Vec<Mirror>, seed: u64) -> Option<Mirror> {
    if candidates.is_empty() {
        return None;
    }
    candidates.sort_by(|a, b| {
        a.url
            .cmp(&b.url)
            .then_with(|| a.country_code.cmp(&b.country_code))
    });
    let index = (seed % candidates.len() as u64) as usize;
    Some(candidates.swap_remove(index))
}

/// Selects a mirror that is fresh enough for a request.
#[derive(Clone)]
pub struct MirrorSelector {
    catalog: Arc<dyn Catalog>,
    geoip: Arc<dyn GeoLookup>,
    default_country: String,
}

impl MirrorSelector {
    /// Create a selector falling back to `default_country` for unknown clients.
    pub fn new(
        catalog: Arc<dyn Catalog>,
        geoip: Arc<dyn GeoLookup>,
        default_country: String,
    ) -> Self {
        Self {
            catalog,
            geoip,
            default_country,
        }
    }

    /// Country the selector prefers for `client_address`.
    pub fn client_country(&self, client_address: &str) -> String {
        self.geoip
            .country_code(client_address)
            .unwrap_or_else(|| self.default_country.clone())
    }

    async fn candidates(&self, filter: &MirrorFilter) -> MirrorResult<Vec<Mirror>> {
        let mut mirrors = self.catalog.mirrors(filter).await?;
        mirrors.retain(|mirror| filter.matches(mirror));
        Ok(mirrors)
    }

    /// Select a mirror that synced after `freshness` for `client_address`.
    pub async fn select(
        &self,
        freshness: FreshnessRequirement,
        client_address: &str,
    ) -> MirrorResult<Mirror> {
        let seed = client_seed(client_address);
        let country = self.client_country(client_address);

        let mut filter = MirrorFilter {
            freshness,
            country_code: Some(country),
            protocol: REQUIRED_PROTOCOL,
        };

        if let Some(mirror) = pick_mirror(self.candidates(&filter).await?, seed) {
            debug!("Selected {} in {} for {}", mirror.url, mirror.country_code, client_address);
            return Ok(mirror);
        }

        // Let's see if any mirror is recent enough
        let country = filter.country_code.take();
        if let Some(mirror) = pick_mirror(self.candidates(&filter).await?, seed) {
            info!(
                "No mirror in {:?} synced after {}, using {} in {}",
                country,
                freshness.timestamp(),
                mirror.url,
                mirror.country_code
            );
            return Ok(mirror);
        }

        Err(MirrorError::NoMirrorAvailable)
    }
}
